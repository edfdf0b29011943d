//! [libs/infra/connectors/src/errors.rs]

use thiserror::Error;

/// `TransientTransport` per §7: every variant here is retried by the
/// reconnect loop, never propagated to the rest of the process.
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("websocket transport error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("stream ended unexpectedly")]
    StreamClosed,

    #[error("malformed inbound payload, dropped: {0}")]
    Validation(String),

    #[error("router rejected publish: {0}")]
    Router(#[from] fabric_core_router::RouterError),
}
