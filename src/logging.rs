use once_cell::sync::OnceCell;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{fmt::time::UtcTime, EnvFilter};

static INIT: OnceCell<()> = OnceCell::new();

/// Installs the global fmt subscriber. `RUST_LOG` overrides `default_filter`;
/// later calls are no-ops.
pub fn init(default_filter: &str) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        let result = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(UtcTime::new(Rfc3339))
            .with_target(false)
            .try_init();

        if let Err(err) = result {
            eprintln!("Unable to set global tracing subscriber: {}", err);
        }
    });
}
