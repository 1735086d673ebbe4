use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "IRON_MIGRATE_LOG";

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

/// Installs the stderr subscriber. `IRON_MIGRATE_LOG` takes precedence over
/// `--verbose`; stdout stays reserved for the command report.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
