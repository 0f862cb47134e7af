use crate::error::ReproError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bucket bounds used by the `histogram` selector.
pub const HISTOGRAM_BOUNDARIES: [f64; 11] = [
    5_000.0,
    10_000.0,
    25_000.0,
    50_000.0,
    100_000.0,
    250_000.0,
    500_000.0,
    1_000_000.0,
    2_500_000.0,
    5_000_000.0,
    10_000_000.0,
];

/// How raw measurements are summarized by the SDK before export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregatorSelector {
    /// Count, sum, min and max only.
    Inexpensive,
    /// Last recorded value, exported as a gauge.
    #[default]
    Exact,
    /// Explicit-bucket histogram over [`HISTOGRAM_BOUNDARIES`].
    Histogram,
}

impl AggregatorSelector {
    pub const ALL: [AggregatorSelector; 3] = [
        AggregatorSelector::Inexpensive,
        AggregatorSelector::Exact,
        AggregatorSelector::Histogram,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AggregatorSelector::Inexpensive => "inexpensive",
            AggregatorSelector::Exact => "exact",
            AggregatorSelector::Histogram => "histogram",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AggregatorSelector::Inexpensive => "count/sum/min/max summary (histogram without buckets)",
            AggregatorSelector::Exact => "last value per attribute set (gauge)",
            AggregatorSelector::Histogram => "explicit-bucket histogram, bounds 5000..10000000",
        }
    }

    /// Bucket boundaries for histogram-backed selectors, `None` for the gauge.
    pub fn boundaries(&self) -> Option<Vec<f64>> {
        match self {
            AggregatorSelector::Inexpensive => Some(Vec::new()),
            AggregatorSelector::Exact => None,
            AggregatorSelector::Histogram => Some(HISTOGRAM_BOUNDARIES.to_vec()),
        }
    }
}

impl fmt::Display for AggregatorSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AggregatorSelector {
    type Err = ReproError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|selector| selector.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names = Self::ALL.map(|selector| selector.name()).join(", ");
                ReproError::InvalidConfig(format!(
                    "Unknown aggregator selector '{}' (expected one of: {})",
                    s, names
                ))
            })
    }
}
