#![forbid(unsafe_code)]

//! Error types shared by the core and its hosts.
//!
//! None of these escape an event handler: entry points driven by DOM events
//! log and swallow them. Only construction and configuration paths return
//! them to the caller.

use crate::host::Listener;

/// Failure reported by a host environment or terminal surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// A required browser capability is absent; the feature degrades to a no-op.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    /// Teardown of a listener the host no longer knows about.
    #[error("listener not registered")]
    ListenerNotRegistered,
    #[error("failed to register {listener:?} listener: {reason}")]
    ListenerRegistration { listener: Listener, reason: String },
    /// Any other DOM-level failure, carried as its stringified JS error.
    #[error("dom: {0}")]
    Dom(String),
}

/// Preferences could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("preferences must be a JSON object")]
    NotAnObject,
    #[error("preference {key:?} has invalid value: expected {expected}")]
    InvalidValue { key: String, expected: &'static str },
}

/// An input payload could not be turned into UTF-8 bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("payload contains an unpaired UTF-16 surrogate at unit {index}")]
    InvalidUtf16 { index: usize },
}
