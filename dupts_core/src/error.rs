use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReproError {
    #[error("Client construction failed: {0}")]
    ClientConstruction(String),

    #[error("Pipeline startup failed: {0}")]
    PipelineStart(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ReproError>;
