//! Observability: tracing init.
//!
//! Uses config::ObservabilityConfig for PARLEY_QUIET, PARLEY_LOG_LEVEL, PARLEY_LOG_JSON.

use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::ObservabilityConfig;

/// Resolve the filter directive: quiet mode keeps warnings only.
fn filter_directive(cfg: &ObservabilityConfig) -> String {
    if cfg.quiet {
        "parley=warn,parley_agent=warn,parley_core=warn".to_string()
    } else {
        cfg.log_level.clone()
    }
}

/// Initialize tracing. Call once at process startup; later calls are no-ops.
/// `RUST_LOG` takes precedence over PARLEY_LOG_LEVEL.
pub fn init_tracing() {
    let cfg = ObservabilityConfig::from_env();
    let level = filter_directive(cfg);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_overrides_level() {
        let cfg = ObservabilityConfig {
            quiet: true,
            log_level: "parley=debug".into(),
            log_json: false,
        };
        assert!(filter_directive(&cfg).starts_with("parley=warn"));

        let cfg = ObservabilityConfig {
            quiet: false,
            ..cfg
        };
        assert_eq!(filter_directive(&cfg), "parley=debug");
    }

    #[test]
    fn init_twice_is_harmless() {
        init_tracing();
        init_tracing();
    }
}
