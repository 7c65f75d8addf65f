use std::fmt::{Display, Formatter};

/// Error type for separator, live-buffer and mixer operations.
#[derive(Debug, Clone, PartialEq)]
pub enum CenterCutError {
    InvalidConfig(String),
    InvalidFormat(String),
    /// The separator's output queue is full. `accepted` frames of the push
    /// were consumed before the queue filled; drain and retry the rest.
    OutputQueueFull { accepted: usize },
    Underrun { requested: usize, available: usize },
    Fft(String),
}

impl Display for CenterCutError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig(err) => write!(f, "invalid config: {}", err),
            Self::InvalidFormat(err) => write!(f, "invalid format: {}", err),
            Self::OutputQueueFull { accepted } => write!(
                f,
                "output queue full after accepting {} frames",
                accepted
            ),
            Self::Underrun {
                requested,
                available,
            } => write!(
                f,
                "underrun: requested {} frames, {} available",
                requested, available
            ),
            Self::Fft(err) => write!(f, "fft error: {}", err),
        }
    }
}

impl std::error::Error for CenterCutError {}

#[cfg(feature = "real-fft")]
impl From<realfft::FftError> for CenterCutError {
    fn from(value: realfft::FftError) -> Self {
        Self::Fft(value.to_string())
    }
}

impl From<serde_json::Error> for CenterCutError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidConfig(value.to_string())
    }
}
