//! Error taxonomy for the engine, its graph nodes, and the narration channel.
//!
//! Only profile/config lookups hand errors back to callers. Engine commands
//! log capability and node failures and carry on.

use thiserror::Error;

/// Errors returned by lookups, configuration, and context providers.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown fan profile '{0}'")]
    ProfileNotFound(String),

    #[error("unknown fan speed '{0}'")]
    UnknownSpeed(String),

    #[error("unknown noise color '{0}'")]
    UnknownNoiseColor(String),

    /// The host could not provide an audio (or other) capability.
    #[error("audio capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    #[error("failed to parse engine config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Errors raised by individual graph nodes and parameters.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum NodeError {
    #[error("generator was already started")]
    AlreadyStarted,

    /// Stopping a generator that is not running.
    #[error("generator is not running")]
    NotRunning,

    #[error("exponential ramp target must be positive and finite, got {0}")]
    NonPositiveRampTarget(f64),
}

/// Errors reported by a speech backend. The narrator only logs these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NarrationError {
    #[error("speech output is unavailable")]
    Unavailable,

    #[error("speech request rejected: {0}")]
    Rejected(String),
}
