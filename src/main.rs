use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use axum::http::Method;
use clap::Parser;
use tokio::net::TcpListener;

use concierge::config::{load_config, ServerConfig};
use concierge::dispatch::Dispatcher;
use concierge::http::HttpServer;
use concierge::lifecycle::{signals, Shutdown, Startup};
use concierge::observability::{init_logging, metrics};
use concierge::resources::MemoryResources;
use concierge::view::load_view;

#[derive(Debug, Parser)]
#[command(name = "concierge", version, about = "Negotiated HTTP dispatch server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    let base_dir = args
        .config
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    init_logging(&config.observability, args.log_level.as_deref());
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "concierge starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_body_bytes = config.listener.max_body_bytes,
        request_timeout_secs = config.timeouts.request_secs,
        views = config.views.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // No backends are declared in configuration; the barrier still orders
    // startup for embedders that register their own.
    let mut ready = Startup::new().connect_all().await?;

    let default_locale = config
        .negotiation
        .default_locales
        .iter()
        .find(|l| l.as_str() != "*")
        .cloned()
        .unwrap_or_else(|| "en-us".to_string());
    for view in &config.views {
        let handlers = load_view(view, &base_dir, &default_locale)?;
        let method = Method::from_str(&view.method.to_uppercase())?;
        ready.register(&view.path, method, handlers)?;
        tracing::info!(view = %view.name, path = %view.path, method = %view.method, "View bound");
    }

    let resources = MemoryResources::from_config(&config.resources, &base_dir)?;
    let dispatcher = Dispatcher::new(
        ready.into_route_table(),
        config.dispatch.clone(),
        config.negotiation.default_locales.clone(),
    )
    .with_resources(Arc::new(resources));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(&config, Arc::new(dispatcher));
    let serving = server.run(listener, shutdown.subscribe());

    let signal_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        signals::forward_signals(&signal_shutdown).await;
        tracing::info!("Draining connections");
    });

    serving.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
