use std::fmt::{Display, Formatter};

use centercut_lib::CenterCutError;

/// Failure of a CLI command.
#[derive(Debug)]
pub enum CliError {
    Usage(String),
    Io(std::io::Error),
    Wav(hound::Error),
    Engine(CenterCutError),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usage(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Wav(err) => write!(f, "wav error: {}", err),
            Self::Engine(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<hound::Error> for CliError {
    fn from(value: hound::Error) -> Self {
        Self::Wav(value)
    }
}

impl From<CenterCutError> for CliError {
    fn from(value: CenterCutError) -> Self {
        Self::Engine(value)
    }
}
