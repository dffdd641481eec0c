//! Module proxy server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use modproxy_core::config::AppConfig;
use modproxy_server::{AppState, create_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// modproxyd - A Go module proxy backed by the go command
#[derive(Parser, Debug)]
#[command(name = "modproxyd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "MODPROXY_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Startup banner
    tracing::info!("modproxyd v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    // Register Prometheus metrics
    modproxy_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    // Initialize the module toolchain
    let toolchain = modproxy_toolchain::from_config(&config.toolchain)
        .await
        .context("failed to initialize module toolchain")?;
    tracing::info!(
        backend = toolchain.name(),
        go_binary = %config.toolchain.go_binary.display(),
        cache_dir = %config.toolchain.cache_dir.display(),
        upstream = %config.toolchain.upstream,
        "Module toolchain initialized"
    );

    let addr = config.server.bind_addr().map_err(anyhow::Error::msg)?;
    let mount_prefix = config.server.mount_prefix.clone();

    // Create application state and router
    let state = AppState::new(config, toolchain);
    let app = create_router(state);

    tracing::info!(mount_prefix = %mount_prefix, "Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Load configuration from the optional TOML file, overridden by
/// `MODPROXY_` environment variables (`__` separates nested keys).
fn load_config(path: &str) -> Result<AppConfig> {
    let config_path = std::path::Path::new(path);
    let mut figment = Figment::new();

    if config_path.exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}, using defaults", path);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("MODPROXY_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}
