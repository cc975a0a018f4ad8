use thiserror::Error;

/// Library level error type used throughout the crate.
///
/// Malformed observation values and unrecognized severity tokens are not
/// errors; they degrade to text values and the fail-open level. The variants
/// below cover configuration problems and ownership-discipline violations in
/// the ingestion path.
#[derive(Error, Debug)]
pub enum QuarryError {
    /// I/O related failure
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error while parsing YAML configuration files
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Error while rendering attributes as JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Requested data item is not registered
    #[error("Data item not found: {0}")]
    DataItemNotFound(String),

    /// Chain operation attempted on a source that is not condition-shaped
    #[error("Data item '{0}' does not carry conditions")]
    NotConditionSource(String),

    /// The observation was already appended to a chain
    #[error("Observation {sequence} is already linked into a condition chain")]
    AlreadyLinked { sequence: u64 },

    /// The observation or chain head belongs to another source's chain
    #[error("Observation {sequence} does not belong to the chain of '{data_item}'")]
    ForeignLink { sequence: u64, data_item: String },

    /// A walk found a link that breaks the strictly-backward rule
    #[error("Condition chain corrupted at observation {sequence}: {detail}")]
    ChainCorrupted { sequence: u64, detail: String },

    /// Adapter supplied a sequence that does not advance the agent's counter
    #[error("Sequence regression: last assigned {last}, got {got}")]
    SequenceRegression { last: u64, got: u64 },

    /// The sequence counter cannot advance any further
    #[error("Sequence numbers exhausted after {last}")]
    SequenceExhausted { last: u64 },
}

/// Convenient alias over [`Result`] using [`QuarryError`]
pub type Result<T> = std::result::Result<T, QuarryError>;
