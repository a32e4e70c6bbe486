//! Error types for message construction and typed parameter access
//!
//! Payload access fails closed: reading a parameter that is missing or that
//! holds a different kind of value is reported as a [`MessageError`] instead of
//! being silently coerced.

use thiserror::Error;

/// Errors raised while reading or building typed message content
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MessageError {
    /// Named parameter is not present on the message
    #[error("Missing parameter '{name}'")]
    MissingParameter { name: String },

    /// Named parameter exists but holds a different kind of value
    #[error("Parameter '{name}' has type {found}, expected {expected}")]
    ParameterType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A payload was read from (or written to) a message type that does not carry it
    #[error("Payload {payload} is not carried by message type '{message_type}'")]
    WrongMessageType {
        payload: &'static str,
        message_type: String,
    },

    /// Parameter holds a value outside the accepted domain
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidValue { name: String, reason: String },
}

impl MessageError {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error only indicates an absent optional field
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingParameter { .. })
    }
}
