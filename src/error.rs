//! Unified error types for the TagRing firmware.
//!
//! A single `Error` enum that every subsystem can convert into, so that
//! start-up code in `main` handles failures uniformly.  All variants are
//! `Copy` so they pass through the loop without allocation.
//!
//! Only configuration and init errors reach it.  Network failures are
//! folded into [`CallOutcome::Failure`](crate::webhook::CallOutcome) and
//! audio errors are logged and skipped by the orchestrator.

use core::fmt;

use crate::config::ConfigError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible start-up operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid; the loop must not start.
    Config(ConfigError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
