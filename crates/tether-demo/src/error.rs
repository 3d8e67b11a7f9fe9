use std::path::PathBuf;

use tether_core::BindError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DemoError>;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Bind(#[from] BindError),

    #[error("cannot parse `{input}`: {message}")]
    Parse { input: String, message: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("script does not exist: {path}")]
    MissingScript { path: PathBuf },

    #[error("logging setup failed: {message}")]
    Logging { message: String },
}

impl DemoError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } | Self::MissingScript { .. } => 2,
            _ => 1,
        }
    }

    /// Whether a session can report this error and keep reading commands.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Bind(_) | Self::Parse { .. })
    }

    #[must_use]
    pub fn parse(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_errors_are_recoverable() {
        let err = DemoError::from(BindError::out_of_bounds("remove_at", 4, 2));
        assert!(err.is_recoverable());
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "remove_at: index 4 out of bounds (length 2)");
    }

    #[test]
    fn argument_errors_exit_with_usage_code() {
        let err = DemoError::invalid("--log: bad directive");
        assert!(!err.is_recoverable());
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            DemoError::parse("add", "missing price").to_string(),
            "cannot parse `add`: missing price"
        );
    }
}
