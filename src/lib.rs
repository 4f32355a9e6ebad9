pub mod error;
pub mod modules;
pub mod proxy; // Proxy service module

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use modules::logger;
use proxy::{AxumServer, ProxyConfig};

/// OpenAI-compatible gateway in front of the AI search chat service
#[derive(Debug, Parser)]
#[command(name = "aisearch-proxy", version, about)]
pub struct Cli {
    /// Listen port (overrides the config file)
    #[arg(long)]
    pub port: Option<u16>,

    /// Listen on 0.0.0.0 instead of 127.0.0.1
    #[arg(long)]
    pub host_lan: bool,

    /// Config file path (default: ~/.aisearch_proxy/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Bearer token clients must present
    #[arg(long, env = "AISEARCH_PROXY_API_KEY")]
    pub api_key: Option<String>,
}

impl Cli {
    /// Command-line values win over the file.
    pub fn apply(&self, config: &mut ProxyConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.host_lan {
            config.allow_lan_access = true;
        }
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            config.api_key = key.clone();
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = modules::get_data_dir().ok();
    logger::init_logger(data_dir.as_deref());

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => modules::default_config_path().map_err(anyhow::Error::msg)?,
    };
    let mut config = modules::load_app_config(&config_path)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("loading {}", config_path.display()))?;
    cli.apply(&mut config);

    info!(
        config = %config_path.display(),
        upstream = %config.api_domain_trimmed(),
        max_conversation_count = config.max_conversation_count,
        "Starting proxy service"
    );

    let (server, handle) = AxumServer::start(config)
        .await
        .context("failed to start proxy server")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    server.stop();
    let _ = handle.await;
    Ok(())
}
