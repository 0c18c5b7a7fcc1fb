//! Error types for Orpheus.

use std::time::Duration;

use crate::flow::model::Screen;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// A custom interview script that cannot drive a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("Interview script needs a greeting and a closing line, got {steps} step(s)")]
    TooShort { steps: usize },
}

/// An action the session flow refused. Rejected actions never change state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("User name is empty")]
    EmptyUserName,

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("Session has already been rated")]
    AlreadyRated,

    #[error("Assistant is still composing a reply")]
    ReplyPending,

    #[error("Interview has already concluded")]
    InterviewConcluded,

    #[error("Cannot go from {from} to {to}")]
    InvalidTransition { from: Screen, to: Screen },

    #[error("Action needs the {expected} screen, but {actual} is showing")]
    WrongScreen { expected: Screen, actual: Screen },

    #[error("No active session")]
    NoActiveSession,
}

/// Content generation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation failed: {reason}")]
    Failed { reason: String },

    #[error("Generation timed out after {after:?}")]
    Timeout { after: Duration },
}

/// Presentation channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
