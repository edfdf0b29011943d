//! [libs/infra/connectors/src/market_feed.rs]
//! Periodic market data poll (§6): every tick produces a
//! `market_data_update` event, plus a `cost_optimization_opportunity` when
//! the spot price drops sharply or a `cost_optimization_warning` when it
//! spikes.

use std::time::Duration;

use fabric_core_router::EventRouter;
use fabric_domain_models::{EventType, RouterEvent};
use serde_json::Value;
use tracing::{instrument, warn};

use crate::errors::ConnectorError;

const OPPORTUNITY_THRESHOLD: f64 = -0.2;
const WARNING_THRESHOLD: f64 = 0.3;

pub struct MarketFeedConnector {
    url: String,
    poll_interval: Duration,
}

impl MarketFeedConnector {
    pub fn new(url: impl Into<String>, poll_interval: Duration) -> Self {
        Self { url: url.into(), poll_interval }
    }

    #[instrument(skip(self, router), fields(url = %self.url))]
    pub async fn run(&self, router: &EventRouter) -> Result<(), ConnectorError> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            let payload = reqwest::get(&self.url).await?.error_for_status()?.json::<Value>().await?;
            if let Err(err) = handle_payload(router, payload) {
                warn!(error = %err, "dropping malformed market feed payload");
            }
        }
    }
}

fn handle_payload(router: &EventRouter, payload: Value) -> Result<(), ConnectorError> {
    let change = payload
        .get("spot_price_change")
        .and_then(Value::as_f64)
        .ok_or_else(|| ConnectorError::Validation("missing spot_price_change".into()))?;
    let timestamp = payload.get("timestamp").and_then(Value::as_u64).unwrap_or(0);

    router.publish(RouterEvent::new(EventType::MarketDataUpdate, "market_feed_connector", payload.clone(), 4, timestamp))?;

    if let Some(event_type) = classify_price_change(change) {
        router.publish(RouterEvent::new(event_type, "market_feed_connector", payload, 6, timestamp))?;
    }
    Ok(())
}

/// `spot_price_change <= -0.2` is a cost optimization opportunity (cheaper
/// capacity available); `>= 0.3` is a warning (capacity about to get more
/// expensive) (§6).
fn classify_price_change(change: f64) -> Option<EventType> {
    if change <= OPPORTUNITY_THRESHOLD {
        Some(EventType::CostOptimizationOpportunity)
    } else if change >= WARNING_THRESHOLD {
        Some(EventType::CostOptimizationWarning)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn a_sharp_drop_is_an_opportunity() {
        assert_eq!(classify_price_change(-0.25), Some(EventType::CostOptimizationOpportunity));
    }

    #[test]
    fn a_spike_is_a_warning() {
        assert_eq!(classify_price_change(0.35), Some(EventType::CostOptimizationWarning));
    }

    #[test]
    fn a_small_move_is_neither() {
        assert_eq!(classify_price_change(0.05), None);
    }

    #[test]
    fn payload_without_spot_price_change_is_rejected() {
        let router = EventRouter::new(16);
        assert!(handle_payload(&router, json!({"other": 1})).is_err());
    }

    #[tokio::test]
    async fn a_drop_emits_both_market_update_and_opportunity() {
        let router = EventRouter::new(16);
        let mut market_stream = router.subscribe(EventType::MarketDataUpdate);
        let mut opportunity_stream = router.subscribe(EventType::CostOptimizationOpportunity);

        handle_payload(&router, json!({"spot_price_change": -0.4, "timestamp": 10})).unwrap();

        use tokio_stream::StreamExt;
        tokio::time::timeout(std::time::Duration::from_secs(1), market_stream.next()).await.unwrap().unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), opportunity_stream.next()).await.unwrap().unwrap();
    }
}
