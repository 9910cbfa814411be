use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ChannelError {
    #[error("Channel must have at least one Kraus operator")]
    Empty,

    #[error("Kraus operators do not sum to Identity (Trace preserving relation failed)")]
    NotComplete,

    #[error("Invalid operator dimensions: Kraus operators must be 2x2")]
    InvalidDimensions,

    #[error("Invalid probability: {0}. Must be between 0.0 and 1.0")]
    InvalidProbability(f64),
}

/// Errors surfaced by a protocol run.
///
/// A run either completes with a full record or fails here before any
/// randomness is consumed. An empty final key is not an error.
#[derive(Error, Debug, Clone)]
pub enum ProtocolError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<ChannelError> for ProtocolError {
    fn from(err: ChannelError) -> Self {
        ProtocolError::InvalidConfiguration(err.to_string())
    }
}
