use crate::Environment;
use tracing::{debug, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Install `color-eyre` as the panic/error report handler. Call once at the
/// very start of `main`, before any fallible setup, so early failures get
/// colored backtraces instead of the default panic hook.
pub fn install_color_eyre() {
    if let Err(e) = color_eyre::install() {
        debug!(error = %e, "color-eyre already installed, skipping");
    }
}

/// Initialize tracing with environment-aware configuration
///
/// - **Production** (`APP_ENV=production`):
///   - JSON format (for log aggregation tools like ELK, Datadog, CloudWatch)
///   - Hides module targets for cleaner logs
///
/// - **Development** (default):
///   - Pretty-printed format (human-readable)
///   - Shows module targets for debugging
///
/// Environment variables:
/// - `APP_ENV`: Set to "production" for JSON logs (default: "development")
/// - `RUST_LOG`: Override log levels (e.g., "debug", "zerg_api=trace")
///
/// This function is infallible - if tracing is already initialized, it silently continues.
pub fn init_tracing(environment: &Environment) {
    let is_production = environment.is_production();

    // Create a filter with granular defaults
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if is_production {
            // Production: Less verbose, focus on warnings and errors
            EnvFilter::new("info,tower_http=info,sea_orm=warn")
        } else {
            // Development: More verbose for debugging
            EnvFilter::new("debug,tower_http=debug,sea_orm=info")
        }
    });

    let fmt_layer = if is_production {
        // Production: JSON format for log aggregation
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(false) // Hide module paths in production
            .boxed()
    } else {
        // Development: Pretty format for readability
        tracing_subscriber::fmt::layer()
            .with_target(true) // Show module paths for debugging
            .pretty()
            .boxed()
    };

    // ErrorLayer captures span context so color-eyre reports include the
    // active span trace, not just the error chain.
    let result = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init();

    // Handle initialization result
    match result {
        Ok(_) => {
            info!("Tracing initialized. Environment: {:?}", environment);
        }
        Err(_) => {
            // Tracing already initialized, which is fine (common in tests)
            debug!("Tracing already initialized, skipping re-initialization");
        }
    }
}
