use dupts_core::{
    distinct_series, literal_sequence,
    pipeline::DEFAULT_COLLECT_PERIOD,
    producer::{DEFAULT_METRIC_NAME, DEFAULT_WAIT},
    AggregatorSelector, Measurement,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to record, on which instrument, and how long to wait afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub metric: String,
    #[serde(default)]
    pub selector: AggregatorSelector,
    #[serde(with = "humantime_serde", default = "default_collect_period")]
    pub collect_period: Duration,
    #[serde(with = "humantime_serde", default = "default_wait")]
    pub wait: Duration,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub scenario: Scenario,
}

fn default_collect_period() -> Duration {
    DEFAULT_COLLECT_PERIOD
}

fn default_wait() -> Duration {
    DEFAULT_WAIT
}

impl Scenario {
    pub fn builder() -> ScenarioBuilder {
        ScenarioBuilder::default()
    }

    /// Distinct attribute sets, i.e. timeseries per flush.
    pub fn series_count(&self) -> usize {
        distinct_series(&self.measurements)
    }

    /// True when the wait covers at least one collect period.
    pub fn flushes_before_exit(&self) -> bool {
        self.wait >= self.collect_period
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Scenario name cannot be empty".to_string());
        }

        if self.metric.is_empty() {
            return Err(format!("Scenario '{}' metric name cannot be empty", self.name));
        }

        if self.collect_period.is_zero() {
            return Err(format!(
                "Scenario '{}' collect period must be > 0",
                self.name
            ));
        }

        if self.measurements.is_empty() {
            return Err(format!(
                "Scenario '{}' must have at least one measurement",
                self.name
            ));
        }

        for (i, measurement) in self.measurements.iter().enumerate() {
            if measurement.attributes.keys().any(|key| key.is_empty()) {
                return Err(format!(
                    "Measurement {} in scenario '{}' has an empty attribute key",
                    i, self.name
                ));
            }
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct ScenarioBuilder {
    name: Option<String>,
    description: Option<String>,
    metric: Option<String>,
    selector: AggregatorSelector,
    collect_period: Option<Duration>,
    wait: Option<Duration>,
    measurements: Vec<Measurement>,
}

impl ScenarioBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = Some(metric.into());
        self
    }

    pub fn selector(mut self, selector: AggregatorSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn collect_period(mut self, collect_period: Duration) -> Self {
        self.collect_period = Some(collect_period);
        self
    }

    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = Some(wait);
        self
    }

    pub fn add_measurement(mut self, measurement: Measurement) -> Self {
        self.measurements.push(measurement);
        self
    }

    pub fn measurements(mut self, measurements: impl IntoIterator<Item = Measurement>) -> Self {
        self.measurements.extend(measurements);
        self
    }

    pub fn build(self) -> Scenario {
        Scenario {
            name: self.name.unwrap_or_else(|| "unnamed".to_string()),
            description: self.description,
            metric: self.metric.unwrap_or_else(|| DEFAULT_METRIC_NAME.to_string()),
            selector: self.selector,
            collect_period: self.collect_period.unwrap_or(DEFAULT_COLLECT_PERIOD),
            wait: self.wait.unwrap_or(DEFAULT_WAIT),
            measurements: self.measurements,
        }
    }
}

/// Built-in scenarios, the first one being the default run.
pub fn builtin_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::builder()
            .name("duplicate-timeseries")
            .description("Value recorder exported as a gauge; two attribute sets, four points share one")
            .metric(DEFAULT_METRIC_NAME)
            .selector(AggregatorSelector::Exact)
            .measurements(literal_sequence())
            .build(),
        Scenario::builder()
            .name("duplicate-timeseries-histogram")
            .description("Same record sequence on a second instrument aggregated as a histogram")
            .metric("test.dummy.two")
            .selector(AggregatorSelector::Histogram)
            .measurements(literal_sequence())
            .build(),
    ]
}

pub fn builtin_scenario(name: &str) -> Option<Scenario> {
    builtin_scenarios().into_iter().find(|s| s.name == name)
}

impl Default for Scenario {
    fn default() -> Self {
        builtin_scenarios().remove(0)
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario_matches_literal_run() {
        let scenario = Scenario::default();

        assert_eq!(scenario.name, "duplicate-timeseries");
        assert_eq!(scenario.metric, "test.dummy.one");
        assert_eq!(scenario.selector, AggregatorSelector::Exact);
        assert_eq!(scenario.collect_period, Duration::from_secs(2));
        assert_eq!(scenario.wait, Duration::from_secs(5));
        assert_eq!(scenario.measurements, literal_sequence());
        assert_eq!(scenario.series_count(), 2);
        assert!(scenario.flushes_before_exit());
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn test_builtin_lookup() {
        let histogram = builtin_scenario("duplicate-timeseries-histogram").unwrap();
        assert_eq!(histogram.metric, "test.dummy.two");
        assert_eq!(histogram.selector, AggregatorSelector::Histogram);

        assert!(builtin_scenario("missing").is_none());
    }

    #[test]
    fn test_scenario_validation() {
        let valid = Scenario::builder()
            .name("valid")
            .add_measurement(Measurement::new(1).with_attribute("k", "v"))
            .build();
        assert!(valid.validate().is_ok());

        let invalid = Scenario::builder().name("empty").build();
        assert!(invalid.validate().is_err());

        let invalid = Scenario::builder()
            .name("blank-key")
            .add_measurement(Measurement::new(1).with_attribute("", "v"))
            .build();
        assert!(invalid.validate().unwrap_err().contains("empty attribute key"));

        let invalid = Scenario::builder()
            .name("zero-period")
            .collect_period(Duration::ZERO)
            .add_measurement(Measurement::new(1))
            .build();
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_short_wait_does_not_flush() {
        let scenario = Scenario::builder()
            .name("short")
            .collect_period(Duration::from_secs(2))
            .wait(Duration::from_secs(1))
            .build();
        assert!(!scenario.flushes_before_exit());
    }
}
