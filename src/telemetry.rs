use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes structured logging.
/// Emits JSON lines on stdout; the level is controlled by `RUST_LOG`
/// (default `info`). Records from the `log` facade are forwarded too.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_telemetry() -> bool {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_initialization_is_refused() {
        // Tests share one process, so the first call may already have
        // happened elsewhere; a second call must never succeed.
        init_telemetry();
        assert!(!init_telemetry());
    }
}
