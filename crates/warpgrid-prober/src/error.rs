//! Error types for probes and probe loops.

use std::time::Duration;

use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias for probe operations.
///
/// `Ok(())` is a successful probe; `Err` describes why it failed.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while probing a target.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid probe target {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid probe header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid probe config: {0}")]
    InvalidConfig(String),

    #[error("probe request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("unexpected status code: want {expected:?}, got {actual} (body: {body:?})")]
    UnexpectedStatus {
        expected: Vec<u16>,
        actual: u16,
        body: String,
    },

    #[error("missing expected header {name:?}")]
    MissingHeader { name: String },

    #[error("unexpected header {name:?} value: want {expected:?}, got {actual:?}")]
    UnexpectedHeader {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("unexpected body: want {expected:?}, got {actual:?}")]
    UnexpectedBody { expected: String, actual: String },

    /// `attempts` counts only attempts that ran to completion.
    #[error("probe timed out after {timeout:?} ({attempts} attempts)")]
    Timeout {
        timeout: Duration,
        attempts: u32,
        #[source]
        last_error: Option<Box<ProbeError>>,
    },

    #[error("probe cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl ProbeError {
    /// The retry loop gave up because its deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// The retry loop was stopped by its cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The round trip could not complete (dial, reset, body read).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// A response arrived but did not satisfy the expectations.
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedStatus { .. }
                | Self::MissingHeader { .. }
                | Self::UnexpectedHeader { .. }
                | Self::UnexpectedBody { .. }
        )
    }

    /// The probe could not even be built from its inputs.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. } | Self::InvalidHeader { .. } | Self::InvalidConfig(_)
        )
    }
}
