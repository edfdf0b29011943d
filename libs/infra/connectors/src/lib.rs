//! [libs/infra/connectors] External Connectors (§4.8, §6): each connector
//! is a `TransientTransport` (§7) — connection and protocol errors are
//! retried by `fabric_infra_transport::reconnect_loop` and never bubble up
//! to the rest of the daemon; malformed inbound payloads are logged and
//! dropped rather than treated as fatal.

mod errors;
mod ndjson;

pub mod behavior_feed;
pub mod intent_feed;
pub mod market_feed;
pub mod orchestrator;

pub use behavior_feed::BehaviorFeedConnector;
pub use errors::ConnectorError;
pub use intent_feed::IntentFeedConnector;
pub use market_feed::MarketFeedConnector;
pub use orchestrator::OrchestratorConnector;
