//! Error types for zonectl
//!
//! A single closed error enumeration covers the whole core, so callers
//! pattern-match on kinds instead of downcasting. Shell code (main, config)
//! wraps these in `anyhow` for reporting.

use std::fmt;

use thiserror::Error;

//==============================================================================
// Types
//==============================================================================

/// Where an RPC fault originated, per the envelope's fault code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOrigin {
    /// The request was at fault (bad arguments, malformed envelope)
    Client,
    /// The service failed or rejected the request
    Server,
}

impl fmt::Display for FaultOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultOrigin::Client => write!(f, "client"),
            FaultOrigin::Server => write!(f, "server"),
        }
    }
}

/// All failures the core can produce.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or unsupported wire value. Never retryable; indicates a
    /// protocol-version mismatch or a bug.
    #[error("coding error: {0}")]
    Coding(String),

    /// RPC fault returned inside a response envelope.
    #[error("{origin} fault: {message}")]
    Fault {
        origin: FaultOrigin,
        message: String,
    },

    /// The response header did not confirm authentication.
    #[error("authentication failed")]
    Auth,

    /// A decoded body result had an unexpected kind.
    #[error("result has unexpected type {found} (expecting {expected})")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A required input was missing or invalid before any network call.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Reconciliation found existing records that do not match the desired
    /// state and overwriting was not permitted.
    #[error("record group {0} already exists with different values; set overwrite to replace it")]
    Conflict(String),

    /// A named header or body result was absent from the response.
    #[error("no {section} result named \"{name}\"")]
    MissingResult {
        section: &'static str,
        name: String,
    },

    /// Connection-level transport failure (not an HTTP error status).
    #[error("connection error: {0}")]
    Network(String),
}

impl Error {
    /// True when this is a server fault carrying exactly `message`.
    pub fn is_server_fault(&self, message: &str) -> bool {
        matches!(
            self,
            Error::Fault {
                origin: FaultOrigin::Server,
                message: m,
            } if m == message
        )
    }
}

//==============================================================================
// Tests
//==============================================================================
