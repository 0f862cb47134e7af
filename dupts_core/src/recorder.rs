use crate::{measurement::Measurement, selector::AggregatorSelector};
use opentelemetry::metrics::{Gauge, Histogram, Meter};
use tracing::debug;

/// Sink for the producer's record calls.
#[cfg_attr(test, mockall::automock)]
pub trait Recorder: Send + Sync {
    fn record(&self, measurement: &Measurement);

    /// Name of the instrument measurements end up on.
    fn metric_name(&self) -> &str;
}

enum Instrument {
    Gauge(Gauge<i64>),
    Histogram(Histogram<f64>),
}

/// A recording instrument registered on an OpenTelemetry meter.
pub struct OtelRecorder {
    name: String,
    instrument: Instrument,
}

impl OtelRecorder {
    pub fn register(meter: &Meter, name: impl Into<String>, selector: AggregatorSelector) -> Self {
        let name = name.into();
        let instrument = match selector.boundaries() {
            None => Instrument::Gauge(meter.i64_gauge(name.clone()).build()),
            Some(boundaries) => Instrument::Histogram(
                meter
                    .f64_histogram(name.clone())
                    .with_boundaries(boundaries)
                    .build(),
            ),
        };

        debug!("Registered instrument '{}' ({})", name, selector);

        Self { name, instrument }
    }
}

impl Recorder for OtelRecorder {
    fn record(&self, measurement: &Measurement) {
        let attributes = measurement.key_values();
        match &self.instrument {
            Instrument::Gauge(gauge) => gauge.record(measurement.value, &attributes),
            Instrument::Histogram(histogram) => {
                histogram.record(measurement.value as f64, &attributes)
            }
        }
    }

    fn metric_name(&self) -> &str {
        &self.name
    }
}
