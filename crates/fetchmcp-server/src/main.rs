//! Process entry point: parse args, load configuration, build state, and
//! run either transport.

use clap::Parser;

use fetchmcp_server::config::{LogFormat, ServiceConfig};
use fetchmcp_server::{routes, stdio, AppState};

#[derive(Parser)]
#[command(name = "fetchmcp-server")]
#[command(about = "MCP web-content ingestion service")]
struct Args {
    /// Serve the streamable-HTTP transport instead of stdio.
    #[arg(long)]
    http: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fetchmcp-server: configuration error: {err}");
            std::process::exit(err.exit_code());
        }
    };

    init_tracing(config.log_format, config.debug);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_addr = %config.bind_addr,
        deployment = ?config.deployment,
        "starting fetchmcp-server"
    );

    let bind_addr = config.bind_addr;
    let use_http = args.http;

    let state = match AppState::build(config).await {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error = %err, "failed to initialize application state");
            std::process::exit(1);
        }
    };

    let result = if use_http {
        routes::serve(state, bind_addr).await.map_err(anyhow::Error::from)
    } else {
        stdio::run(state).await
    };

    if let Err(err) = result {
        tracing::error!(error = %err, "fetchmcp-server exited with an error");
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat, debug: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default_level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_level.into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
