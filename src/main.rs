//! Anthropic-compatible model gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request          ┌──────────────────────────────────────────────┐
//!     ────────────────────────┼─▶ http server ──▶ proxy engine ──▶ adapter ──┼──▶ Upstream
//!                             │   (request id,     (model lookup,  (url,     │    Provider
//!                             │    access log)      rewrite)        auth)    │
//!     Client Response         │                                              │
//!     ◀───────────────────────┼── buffered / streamed relay ◀────────────────┼───
//!                             │                                              │
//!                             │   config · routing · observability · lifecycle
//!                             └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use anthropic_gateway::config::load_config;
use anthropic_gateway::http::GatewayServer;
use anthropic_gateway::lifecycle;
use anthropic_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "anthropic-gateway")]
#[command(about = "Route Anthropic Messages API calls to compatible upstream providers", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", cli.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if cli.check {
        return match GatewayServer::new(config) {
            Ok(_) => {
                println!("{}: ok", cli.config.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {}", cli.config.display(), e);
                ExitCode::FAILURE
            }
        };
    }

    logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.bind_address(),
        models = config.model_list.len(),
        "anthropic-gateway starting"
    );

    match lifecycle::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Gateway failed");
            ExitCode::FAILURE
        }
    }
}
