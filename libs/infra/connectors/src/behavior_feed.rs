//! [libs/infra/connectors/src/behavior_feed.rs]
//! Inbound line-delimited JSON behavior feed (§6): each line becomes one
//! `behavior_pattern` router event.

use fabric_core_router::EventRouter;
use fabric_domain_models::{EventType, RouterEvent};
use serde_json::Value;
use tracing::{instrument, warn};

use crate::errors::ConnectorError;
use crate::ndjson::LineStream;

pub struct BehaviorFeedConnector {
    url: String,
}

impl BehaviorFeedConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    #[instrument(skip(self, router), fields(url = %self.url))]
    pub async fn run(&self, router: &EventRouter) -> Result<(), ConnectorError> {
        let response = reqwest::get(&self.url).await?.error_for_status()?;
        let mut lines = LineStream::new(response);

        while let Some(line) = lines.next_line().await? {
            if let Err(err) = handle_line(router, &line) {
                warn!(error = %err, "dropping malformed behavior feed line");
            }
        }
        Err(ConnectorError::StreamClosed)
    }
}

fn handle_line(router: &EventRouter, line: &str) -> Result<(), ConnectorError> {
    let payload: Value = serde_json::from_str(line).map_err(|err| ConnectorError::Validation(err.to_string()))?;
    if !payload.get("resource_patterns").map(Value::is_object).unwrap_or(false) {
        return Err(ConnectorError::Validation("missing resource_patterns object".into()));
    }

    let timestamp = payload.get("timestamp").and_then(Value::as_u64).unwrap_or(0);
    router.publish(RouterEvent::new(EventType::BehaviorPattern, "behavior_feed_connector", payload, 5, timestamp))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_domain_models::EventType;
    use serde_json::json;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn a_resource_patterns_line_becomes_a_behavior_pattern_event() {
        let router = EventRouter::new(16);
        let mut stream = router.subscribe(EventType::BehaviorPattern);

        handle_line(&router, &json!({"resource_patterns": {"n1": {"anomaly_score": 0.9}}}).to_string()).unwrap();

        let received = tokio::time::timeout(std::time::Duration::from_secs(1), stream.next()).await.unwrap().unwrap();
        assert_eq!(received.event_type, EventType::BehaviorPattern);
    }

    #[test]
    fn a_line_without_resource_patterns_is_rejected() {
        let router = EventRouter::new(16);
        assert!(handle_line(&router, &json!({"other": 1}).to_string()).is_err());
    }
}
