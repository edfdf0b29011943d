//! [libs/infra/connectors/src/orchestrator.rs]
//! Bidirectional, persistent session to the orchestrator (§6 "Orchestrator
//! session"). Grounded on the teacher's `WorkerClient` uplink shape
//! (handshake-then-loop, one `ClientError` enum) but over a websocket
//! rather than request/response HTTP, since this session is long-lived and
//! bidirectional — the same justification that led the pack's
//! `dashflow-observability` crate to reach for `tokio-tungstenite`.

use fabric_core_router::EventRouter;
use fabric_domain_models::{EventType, RouterEvent};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, instrument, warn};

use crate::errors::ConnectorError;

pub struct OrchestratorConnector {
    url: String,
    proxy_id: String,
}

impl OrchestratorConnector {
    pub fn new(url: impl Into<String>, proxy_id: impl Into<String>) -> Self {
        Self { url: url.into(), proxy_id: proxy_id.into() }
    }

    /// One connection attempt: handshake, then loop until the socket
    /// closes or errors. `outbound` carries events produced elsewhere in
    /// the daemon (decisions, alerts, reports) that this session forwards
    /// to the orchestrator.
    #[instrument(skip(self, router, outbound), fields(url = %self.url))]
    pub async fn run(&self, router: &EventRouter, outbound: &mut mpsc::UnboundedReceiver<Value>) -> Result<(), ConnectorError> {
        let (stream, _response) = connect_async(&self.url).await?;
        let (mut writer, mut reader) = stream.split();

        let registration = json!({
            "type": "registration",
            "proxy_id": self.proxy_id,
            "capabilities": ["resource_prediction", "allocation_execution", "performance_monitoring"],
        });
        writer.send(Message::Text(registration.to_string())).await?;
        info!("orchestrator session registered");

        loop {
            tokio::select! {
                inbound = reader.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            if let Err(err) = handle_inbound(router, &text) {
                                warn!(error = %err, "dropping malformed orchestrator message");
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => return Err(ConnectorError::StreamClosed),
                        Some(Ok(_)) => {}
                        Some(Err(err)) => return Err(err.into()),
                    }
                }
                message = outbound.recv() => {
                    match message {
                        Some(payload) => { writer.send(Message::Text(payload.to_string())).await?; }
                        None => return Err(ConnectorError::StreamClosed),
                    }
                }
            }
        }
    }
}

fn handle_inbound(router: &EventRouter, text: &str) -> Result<(), ConnectorError> {
    let payload: Value = serde_json::from_str(text).map_err(|err| ConnectorError::Validation(err.to_string()))?;
    let message_type = payload.get("type").and_then(Value::as_str).ok_or_else(|| ConnectorError::Validation("missing type field".into()))?;

    let event_type = match message_type {
        "allocation_request" => EventType::AllocationRequest,
        "system_alert" => EventType::SystemAlert,
        "orchestrator_command" => EventType::OrchestratorCommand,
        other => return Err(ConnectorError::Validation(format!("unknown message type {other}"))),
    };

    let timestamp = payload.get("timestamp").and_then(Value::as_u64).unwrap_or(0);
    router.publish(RouterEvent::new(event_type, "orchestrator_connector", payload, 7, timestamp))?;
    Ok(())
}
