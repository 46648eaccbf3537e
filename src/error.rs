use thiserror::Error;

/// Error is returned when a flag, an operator, or a flag document cannot be built from the
/// data it was given.
#[derive(Debug, Error)]
pub enum Error {
    /// The raw value has a shape that cannot be classified, e.g. a keyed map.
    #[error("unsupported flag value type: {0}")]
    UnsupportedType(String),

    /// The operator name does not match any known operator.
    #[error("unknown operator: '{0}'")]
    UnknownOperator(String),

    /// A flag was constructed with an empty name.
    #[error("flag name cannot be empty")]
    EmptyName,

    /// The document is not an object holding a `flags` array.
    #[error("invalid input structure: {0}")]
    InvalidStructure(String),

    /// A flag record carries data of the wrong shape.
    #[error("invalid input data: {0}")]
    InvalidData(String),

    /// The document bytes are not valid JSON.
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
