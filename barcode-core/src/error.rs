use std::fmt;

use thiserror::Error;

/// Terminal failure of a generation run. Every variant maps to one
/// [`ErrorKind`] so callers can report `kind: message` without matching.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Overflow(String),

    #[error("{0}")]
    Rendering(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("run cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigurationError,
    OverflowError,
    RenderingError,
    IoError,
    Cancelled,
}

impl SheetError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        SheetError::Configuration(msg.into())
    }

    pub fn rendering(msg: impl Into<String>) -> Self {
        SheetError::Rendering(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SheetError::Configuration(_) => ErrorKind::ConfigurationError,
            SheetError::Overflow(_) => ErrorKind::OverflowError,
            SheetError::Rendering(_) => ErrorKind::RenderingError,
            SheetError::Io(_) => ErrorKind::IoError,
            SheetError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ConfigurationError => "ConfigurationError",
            ErrorKind::OverflowError => "OverflowError",
            ErrorKind::RenderingError => "RenderingError",
            ErrorKind::IoError => "IOError",
            ErrorKind::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, SheetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_convert_to_io_kind() {
        let err: SheetError = std::io::Error::other("disk full").into();
        assert_eq!(err.kind(), ErrorKind::IoError);
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_kind_display_names() {
        assert_eq!(ErrorKind::IoError.to_string(), "IOError");
        assert_eq!(
            SheetError::configuration("bad").kind().to_string(),
            "ConfigurationError"
        );
    }
}
