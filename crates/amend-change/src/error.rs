//! Change validation errors

use crate::operation::ChangeOperation;

/// Reasons a candidate cannot become a [`Change`](crate::Change)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChangeError {
    /// Operation name outside the known taxonomy
    #[error("unknown operation: '{0}'")]
    UnknownOperation(String),

    /// Required field absent for this operation
    #[error("{operation} requires field '{field}'")]
    MissingField {
        operation: ChangeOperation,
        field: &'static str,
    },

    /// Field present but unusable
    #[error("invalid field '{field}': {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

impl ChangeError {
    /// Missing field for `operation`
    pub fn missing(operation: ChangeOperation, field: &'static str) -> Self {
        Self::MissingField { operation, field }
    }

    /// Invalid value in `field`
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }
}
