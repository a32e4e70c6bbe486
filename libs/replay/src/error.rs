//! Replay error types

use crate::records::LogState;
use sim_actors::ActorError;
use sim_types::MessageError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Failures of a replay stream backend
#[derive(Debug, Error)]
pub enum LogStreamError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Encoding error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("No log is open")]
    NotOpen,

    #[error("Log '{name}' is open for reading and cannot be written")]
    ReadOnly { name: String },

    #[error("Log '{name}' does not exist")]
    UnknownLog { name: String },

    #[error("Keyframe {id} is not part of the open log")]
    UnknownKeyframe { id: Uuid },

    #[error("Malformed log '{name}': {reason}")]
    Malformed { name: String, reason: String },
}

impl LogStreamError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// The named log or keyframe does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownLog { .. } | Self::UnknownKeyframe { .. })
    }
}

/// Failures of the replay recorder
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Stream error: {0}")]
    Stream(#[from] LogStreamError),

    #[error("Cannot {request} while in {state} state")]
    WrongState {
        request: &'static str,
        state: LogState,
    },

    #[error("Malformed keyframe '{keyframe}': {reason}")]
    MalformedKeyframe { keyframe: String, reason: String },

    #[error("Log '{log}' has no initial keyframe")]
    NoInitialKeyframe { log: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Message error: {0}")]
    Message(#[from] MessageError),

    #[error("Actor error: {0}")]
    Actor(#[from] ActorError),
}

impl ReplayError {
    pub fn wrong_state(request: &'static str, state: LogState) -> Self {
        Self::WrongState { request, state }
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub fn malformed_keyframe(keyframe: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedKeyframe {
            keyframe: keyframe.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReplayError>;
