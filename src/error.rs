use std::{error, fmt};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by multigrain.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// An invalid parameter id, value or configuration option.
    ParameterError(String),
    /// Sample data which can't be used to create a [`Sample`](crate::Sample).
    SampleError(String),
    /// A full or disconnected event queue.
    SendError(String),
    /// The engine's synth state got poisoned by a panicking thread.
    EngineError(String),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParameterError(str) => write!(f, "Invalid parameter: {str}"),
            Self::SampleError(str) => write!(f, "Invalid sample data: {str}"),
            Self::SendError(str) => write!(f, "Failed to send synth event: {str}"),
            Self::EngineError(str) => write!(f, "Synth engine failure: {str}"),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Error::EngineError(err.to_string())
    }
}
