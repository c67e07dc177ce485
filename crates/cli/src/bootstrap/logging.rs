use horizon_dns_domain::Config;
use tracing::info;

pub fn init(config: &Config, verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        config.logging.level.parse().unwrap_or(tracing::Level::INFO)
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_max_level(level)
        .init();

    info!(level = %level, "Logging initialized");
}
