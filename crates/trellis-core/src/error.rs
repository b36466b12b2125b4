//! Error types for trellis-core

use thiserror::Error;

/// Result type alias for trellis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the trellis HTTP server toolkit
#[derive(Debug, Error)]
pub enum Error {
    /// Route registration rejected by the route tree
    #[error("invalid route: {0}")]
    InvalidRoute(#[from] trellis_router::InsertError),

    /// A route was registered without any handler
    #[error("there must be at least one handler")]
    EmptyHandlerChain,

    /// Render failure while writing a response body
    #[error("render error: {0}")]
    Render(String),

    /// JSON serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MessagePack serialization failure
    #[error("MessagePack error: {0}")]
    MsgPack(#[from] rmp_serde::encode::Error),

    /// Unparseable listen address
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
