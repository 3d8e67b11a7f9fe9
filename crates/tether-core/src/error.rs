#![forbid(unsafe_code)]

//! Error types for the recoverable forms of collection mutators.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BindError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum BindError {
    /// An index fell outside the range the operation accepts.
    #[error("{op}: index {index} out of bounds (length {len})")]
    IndexOutOfBounds {
        op: &'static str,
        index: usize,
        len: usize,
    },
}

impl BindError {
    #[must_use]
    pub fn out_of_bounds(op: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { op, index, len }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_operation_and_bounds() {
        let err = BindError::out_of_bounds("remove_at", 4, 2);
        assert_eq!(err.to_string(), "remove_at: index 4 out of bounds (length 2)");
    }
}
