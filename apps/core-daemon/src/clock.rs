//! [apps/core-daemon/src/clock.rs]
//! The only place permitted to read the wall clock (§16: "no pure
//! computation function reads the wall clock; only the daemon entry points
//! and persistence `created_at` columns call `SystemTime::now`"). Every
//! task reads the current time through here so that swapping the source
//! later (e.g. for a deterministic test clock) touches one file.

use std::time::{SystemTime, UNIX_EPOCH};

pub fn unix_timestamp() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
