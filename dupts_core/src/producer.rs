use crate::{measurement::Measurement, recorder::Recorder};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

pub const DEFAULT_METRIC_NAME: &str = "test.dummy.one";
pub const DEFAULT_WAIT: Duration = Duration::from_secs(5);
pub const RPC_METHOD: &str = "rpc.method";

/// The record sequence that triggers the duplicate timeseries rejection:
/// one `Hello` point followed by four `Hi` points that share an attribute set.
pub fn literal_sequence() -> Vec<Measurement> {
    [(100, "Hello"), (20, "Hi"), (20, "Hi"), (25, "Hi"), (25, "Hi")]
        .into_iter()
        .map(|(value, method)| Measurement::new(value).with_attribute(RPC_METHOD, method))
        .collect()
}

/// Issues record calls against a single instrument.
pub struct Producer<R> {
    recorder: R,
}

impl<R: Recorder> Producer<R> {
    pub fn new(recorder: R) -> Self {
        Self { recorder }
    }

    /// Records every measurement in order and returns how many were issued.
    pub fn emit(&self, measurements: &[Measurement]) -> usize {
        for measurement in measurements {
            debug!(
                "record {} <- {}",
                self.recorder.metric_name(),
                measurement.describe()
            );
            self.recorder.record(measurement);
        }
        info!(
            "Recorded {} measurements on '{}'",
            measurements.len(),
            self.recorder.metric_name()
        );
        measurements.len()
    }

    /// Sleeps so the background reader gets a chance to flush. Best effort:
    /// nothing here observes whether an export actually happened.
    pub async fn settle(&self, wait: Duration) -> Duration {
        info!("Waiting {:?} for metrics to be collected", wait);
        let start = Instant::now();
        tokio::time::sleep(wait).await;
        start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::MockRecorder;
    use mockall::{predicate::eq, Sequence};

    #[test]
    fn test_literal_sequence() {
        let sequence = literal_sequence();
        let described: Vec<String> = sequence.iter().map(Measurement::describe).collect();

        assert_eq!(
            described,
            vec![
                "100 {rpc.method=Hello}",
                "20 {rpc.method=Hi}",
                "20 {rpc.method=Hi}",
                "25 {rpc.method=Hi}",
                "25 {rpc.method=Hi}",
            ]
        );
        assert_eq!(crate::measurement::distinct_series(&sequence), 2);
    }

    #[test]
    fn test_emit_records_exact_sequence_in_order() {
        let mut recorder = MockRecorder::new();
        let mut seq = Sequence::new();

        recorder
            .expect_metric_name()
            .return_const(DEFAULT_METRIC_NAME.to_string());

        for measurement in literal_sequence() {
            recorder
                .expect_record()
                .with(eq(measurement))
                .times(1)
                .in_sequence(&mut seq)
                .return_const(());
        }

        let producer = Producer::new(recorder);
        assert_eq!(producer.emit(&literal_sequence()), 5);
    }

    #[test]
    fn test_emit_nothing() {
        let mut recorder = MockRecorder::new();
        recorder.expect_metric_name().return_const("noop".to_string());
        recorder.expect_record().never();

        let producer = Producer::new(recorder);
        assert_eq!(producer.emit(&[]), 0);
    }

    #[tokio::test]
    async fn test_settle_waits_at_least_the_duration() {
        let producer = Producer::new(MockRecorder::new());
        let elapsed = producer.settle(Duration::from_millis(50)).await;
        assert!(elapsed >= Duration::from_millis(50));
    }
}
