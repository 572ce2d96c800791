//! Shared error type across eventlink crates.

use thiserror::Error;

/// Stable error codes surfaced to UI layers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed envelope on the wire.
    Decode,
    /// Envelope could not be serialized.
    Encode,
    /// Invalid configuration.
    Config,
    /// Unsupported config/protocol version.
    UnsupportedVersion,
    /// The session collaborator could not supply a token.
    AuthUnavailable,
    /// Socket-level failure.
    Transport,
    /// No auth ack within the handshake window.
    HandshakeTimeout,
    /// A subscriber failed while handling an envelope.
    Handler,
    /// `connect()` was called outside a tokio runtime.
    NoRuntime,
}

impl ErrorCode {
    /// String representation used in logs and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Decode => "DECODE",
            ErrorCode::Encode => "ENCODE",
            ErrorCode::Config => "CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::AuthUnavailable => "AUTH_UNAVAILABLE",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::HandshakeTimeout => "HANDSHAKE_TIMEOUT",
            ErrorCode::Handler => "HANDLER",
            ErrorCode::NoRuntime => "NO_RUNTIME",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, EventLinkError>;

/// Unified error type used by core and client.
#[derive(Debug, Error)]
pub enum EventLinkError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("auth token unavailable: {0}")]
    AuthUnavailable(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("handshake timed out")]
    HandshakeTimeout,
    #[error("handler failed: {0}")]
    Handler(String),
    #[error("no tokio runtime available")]
    NoRuntime,
}

impl EventLinkError {
    /// Map to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            EventLinkError::Decode(_) => ErrorCode::Decode,
            EventLinkError::Encode(_) => ErrorCode::Encode,
            EventLinkError::Config(_) => ErrorCode::Config,
            EventLinkError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            EventLinkError::AuthUnavailable(_) => ErrorCode::AuthUnavailable,
            EventLinkError::Transport(_) => ErrorCode::Transport,
            EventLinkError::HandshakeTimeout => ErrorCode::HandshakeTimeout,
            EventLinkError::Handler(_) => ErrorCode::Handler,
            EventLinkError::NoRuntime => ErrorCode::NoRuntime,
        }
    }

    /// Convenience constructor for handler failures.
    pub fn handler(msg: impl Into<String>) -> Self {
        EventLinkError::Handler(msg.into())
    }
}
