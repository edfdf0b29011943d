//! [libs/infra/connectors/src/intent_feed.rs]
//! Inbound line-delimited JSON intent feed (§6): each line becomes one
//! `intent_prediction` router event.

use fabric_core_router::EventRouter;
use fabric_domain_models::{EventType, RouterEvent};
use serde_json::Value;
use tracing::{instrument, warn};

use crate::errors::ConnectorError;
use crate::ndjson::LineStream;

pub struct IntentFeedConnector {
    url: String,
}

impl IntentFeedConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    #[instrument(skip(self, router), fields(url = %self.url))]
    pub async fn run(&self, router: &EventRouter) -> Result<(), ConnectorError> {
        let response = reqwest::get(&self.url).await?.error_for_status()?;
        let mut lines = LineStream::new(response);

        while let Some(line) = lines.next_line().await? {
            if let Err(err) = handle_line(router, &line) {
                warn!(error = %err, "dropping malformed intent feed line");
            }
        }
        Err(ConnectorError::StreamClosed)
    }
}

fn handle_line(router: &EventRouter, line: &str) -> Result<(), ConnectorError> {
    let payload: Value = serde_json::from_str(line).map_err(|err| ConnectorError::Validation(err.to_string()))?;
    if !payload.get("predictions").map(Value::is_array).unwrap_or(false) {
        return Err(ConnectorError::Validation("missing predictions array".into()));
    }

    let timestamp = payload.get("timestamp").and_then(Value::as_u64).unwrap_or(0);
    router.publish(RouterEvent::new(EventType::IntentPrediction, "intent_feed_connector", payload, 5, timestamp))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_domain_models::EventType;
    use serde_json::json;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn a_predictions_line_becomes_an_intent_prediction_event() {
        let router = EventRouter::new(16);
        let mut stream = router.subscribe(EventType::IntentPrediction);

        handle_line(&router, &json!({"predictions": [{"intent_type": "file_operation", "confidence": 0.8, "probability": 0.6}]}).to_string()).unwrap();

        let received = tokio::time::timeout(std::time::Duration::from_secs(1), stream.next()).await.unwrap().unwrap();
        assert_eq!(received.event_type, EventType::IntentPrediction);
    }

    #[test]
    fn a_line_without_predictions_is_rejected() {
        let router = EventRouter::new(16);
        assert!(handle_line(&router, &json!({"other": 1}).to_string()).is_err());
    }
}
