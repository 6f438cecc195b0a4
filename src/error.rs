use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The completion service errored out, returned an empty stream, or
    /// produced chunk structure the demux could not interpret. Never
    /// recovered inside the engine; the match driver decides what to do.
    #[error("completion service failure: {0}")]
    CompletionFailure(String),

    /// A reply carried no usable bracket-integer directive. Recovered
    /// locally as an abstention.
    #[error("no valid directive in reply from seat {seat}")]
    DirectiveParse { seat: u32 },

    /// The role pool cannot satisfy the minimum composition. Fatal at
    /// match construction.
    #[error("invalid match configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
