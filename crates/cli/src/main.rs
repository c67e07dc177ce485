//! Horizon DNS: a split-horizon DNS forwarder.

mod bootstrap;
mod server;

use clap::Parser;
use horizon_dns_domain::Config;
use horizon_dns_infrastructure::dns::server::{shared, DnsServerHandler};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "horizon-dns")]
#[command(version)]
#[command(about = "Split-horizon DNS forwarder")]
struct Cli {
    /// Path to the configuration file
    #[arg(short = 'c', long, default_value = "config.toml")]
    config: String,

    /// Log at debug level regardless of the configured level
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    bootstrap::logging::init(&config, cli.verbose);

    let dispatcher = bootstrap::runtime::build_dispatcher(&config)?;
    let runtime = shared(dispatcher);

    if let Some(http_address) = config.server.http_address.clone() {
        let state = server::http::AppState {
            runtime: runtime.clone(),
            config_path: Arc::from(cli.config.as_str()),
            doh_enabled: config.server.doh_enabled,
        };
        tokio::spawn(async move {
            if let Err(e) = server::http::serve(&http_address, state).await {
                tracing::error!(error = %e, "HTTP server exited");
            }
        });
    }

    info!(bind = %config.server.bind_address, "Horizon DNS is listening");
    let handler = DnsServerHandler::new(runtime);
    server::dns::serve(&config.server.bind_address, handler).await
}
