pub mod error;
pub mod measurement;
pub mod pipeline;
pub mod producer;
pub mod recorder;
pub mod selector;

pub use error::{ReproError, Result};
pub use measurement::{distinct_series, Measurement};
pub use pipeline::{Endpoint, Pipeline, PipelineConfig};
pub use producer::{literal_sequence, Producer};
pub use recorder::{OtelRecorder, Recorder};
pub use selector::AggregatorSelector;
