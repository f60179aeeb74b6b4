//! Error types for the gateway client.
//!
//! All errors use `thiserror` for ergonomic error handling and proper
//! error chains. The client never retries: every failure is surfaced to
//! the nearest caller.

use thiserror::Error;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for the gateway client.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// A capability required for an operation or message field was not
    /// negotiated with the daemon. Reported before any RPC is issued.
    #[error("capability {id} is not supported by the daemon")]
    MissingCapability { id: String },

    /// A reference produced by a different client was passed in.
    #[error("invalid reference: created by a different client")]
    InvalidReference,

    /// The legacy return path needs the solve request that produced a
    /// ref, but none was recorded for it.
    #[error("no solve request recorded for return reference {id}")]
    MissingRequest { id: String },

    /// The operation was cut short by client release or caller
    /// cancellation.
    #[error("context canceled")]
    Canceled,

    /// A signal number with no canonical name was passed to `signal`.
    #[error("unknown signal {signal}")]
    UnknownSignal { signal: i32 },

    /// Image-config resolution succeeded at the source layer but the
    /// source did not resolve to an image.
    #[error("source {reference} resolved to a non-image result: {updated}")]
    ResolveToNonImage { reference: String, updated: String },

    /// A container process exited with a meaningful non-zero code.
    #[error("exit code: {code}")]
    Exit {
        code: u32,
        #[source]
        inner: Box<GatewayError>,
    },

    /// A status triple reported by the daemon.
    #[error("{message}")]
    RemoteStatus { code: i32, message: String },

    /// The exec stream could not be started or broke down.
    #[error("exec stream failed: {reason}")]
    ExecStream { reason: String },

    /// An unexpected message or state on an otherwise healthy channel.
    #[error("{reason}")]
    Protocol { reason: String },

    #[error("rpc error: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("failed to decode definition: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Exit code carried by this error, if it is a process-exit error.
    pub fn exit_code(&self) -> Option<u32> {
        match self {
            GatewayError::Exit { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether this error is a missing-capability failure for `id`.
    pub fn is_missing_capability(&self, id: &str) -> bool {
        matches!(self, GatewayError::MissingCapability { id: have } if have == id)
    }
}
