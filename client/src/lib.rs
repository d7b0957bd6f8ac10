mod backoff;
pub mod chat;
pub mod client;
pub mod config;
pub mod services;
pub mod socket;
pub mod sync;

pub use client::Client;
pub use client::RetryPolicy;
pub use config::{Endpoints, ReconnectPolicy};
pub use socket::{Channel, Loopback, Socket, Subscription};
pub use sync::{Feed, Synced, View};

use maffisol_types::{rules::AttackRefusal, EventError, IdentityError};
use socket::protocol::ProtocolError;
use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed: {0}")]
    Failed(reqwest::StatusCode),
    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },
    /// The backend refused the action and said why (`{"message": ...}`).
    #[error("rejected ({status}): {message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("event error: {0}")]
    Event(#[from] EventError),
    #[error("attack refused: {0}")]
    Refused(#[from] AttackRefusal),
    #[error("invalid identity: {0}")]
    Identity(#[from] IdentityError),
    #[error("server refused connection: {0}")]
    ConnectRefused(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("dial timeout")]
    DialTimeout,
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
}

impl Error {
    /// HTTP status carried by the error, if the request reached the server.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Error::Failed(status)
            | Error::FailedWithBody { status, .. }
            | Error::Rejected { status, .. } => Some(*status),
            Error::Reqwest(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(reqwest::StatusCode::NOT_FOUND)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
