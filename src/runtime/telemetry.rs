use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset: this crate at `info`, the HTTP stack
/// and everything else at `warn`.
pub const DEFAULT_LOG_DIRECTIVES: &str = "warn,run_telemetry=info";

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a stderr subscriber for hosts that do not set up `tracing`
/// themselves.
///
/// Events go to stderr, leaving stdout to the host. A no-op after the first
/// call or when a global subscriber exists.
pub fn init_tracing() {
    TRACING_INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(default_filter())
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES))
}
