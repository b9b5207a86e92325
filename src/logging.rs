use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static LOGGING_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Install the fmt subscriber. `RUST_LOG` overrides the default `stripview=info`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init() {
    LOGGING_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("stripview=info"));

        // A host application may already own the global subscriber.
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}
