use opentelemetry::KeyValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A single integer observation and the attribute set it is tagged with.
///
/// The metric name is not part of the measurement: it belongs to the
/// instrument the measurement is recorded on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: i64,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Measurement {
    pub fn new(value: i64) -> Self {
        Self {
            value,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn key_values(&self) -> Vec<KeyValue> {
        self.attributes
            .iter()
            .map(|(k, v)| KeyValue::new(k.clone(), v.clone()))
            .collect()
    }

    pub fn describe(&self) -> String {
        let attrs = self
            .attributes
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",");
        format!("{} {{{}}}", self.value, attrs)
    }
}

/// Number of distinct attribute sets, i.e. the timeseries one flush carries
/// for a single instrument.
pub fn distinct_series(measurements: &[Measurement]) -> usize {
    measurements
        .iter()
        .map(|m| &m.attributes)
        .collect::<BTreeSet<_>>()
        .len()
}
