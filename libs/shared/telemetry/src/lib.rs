//! [libs/shared/telemetry/src/lib.rs]
//! Structured logging setup (SPEC_FULL §12), adapted from the teacher's
//! observability crate: `tracing` + `tracing-subscriber` with an
//! `EnvFilter`, compact human-readable output in debug builds and
//! flattened JSON in release builds, plus a panic hook that routes panic
//! location and payload through `tracing::error!` before the default hook
//! runs, so a panic in any spawned task (§5) surfaces in the structured
//! log stream rather than only on stderr.

use std::panic;

use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global `tracing` subscriber and panic hook for
/// `service_name`. Call once, from `apps/core-daemon::main`.
pub fn init_tracing(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };
        format!("{service_name}={default_level},tower_http=warn,hyper=warn").into()
    });

    if cfg!(debug_assertions) {
        tracing_subscriber::registry().with(filter).with(fmt::layer().compact().with_target(false)).init();
    } else {
        tracing_subscriber::registry().with(filter).with(fmt::layer().json().flatten_event(true)).init();
    }

    install_panic_hook(service_name);
}

fn install_panic_hook(service_name: &str) {
    let service_name = service_name.to_string();
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("<non-string panic payload>");

        error!(target: "panic", service = %service_name, location = %location, "task panicked: {payload}");
        default_hook(panic_info);
    }));
}
