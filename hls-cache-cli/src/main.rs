use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use hls_cache_engine::{CacheManager, HlsCacheProxy, ProxyConfig};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;
use url::Url;

mod cli;
mod error;
mod utils;

use cli::{CliArgs, Command};
use error::AppError;
use utils::{format_bytes, parse_size};

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        // Log the full error for debugging
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    match args.command {
        Command::Serve {
            urls,
            bind,
            cache_dir,
            max_size,
            timeout,
            connect_timeout,
            strip_params,
            user_agent,
        } => {
            serve(
                urls,
                bind,
                cache_dir,
                &max_size,
                timeout,
                connect_timeout,
                strip_params,
                user_agent,
            )
            .await
        }
        Command::ClearCache { cache_dir } => clear_cache(cache_dir).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn serve(
    urls: Vec<String>,
    bind: SocketAddr,
    cache_dir: Option<PathBuf>,
    max_size: &str,
    timeout: u64,
    connect_timeout: u64,
    strip_params: Vec<String>,
    user_agent: Option<String>,
) -> Result<(), AppError> {
    let max_size = parse_size(max_size)?;

    let mut builder = ProxyConfig::builder()
        .with_bind_addr(bind)
        .with_max_disk_cache_size(max_size)
        .with_timeout(Duration::from_secs(timeout))
        .with_connect_timeout(Duration::from_secs(connect_timeout));
    if let Some(dir) = cache_dir {
        builder = builder.with_cache_dir(dir);
    }
    if let Some(ua) = user_agent {
        builder = builder.with_user_agent(ua);
    }
    for name in strip_params {
        builder = builder.with_strip_query_param(name);
    }

    let proxy = HlsCacheProxy::start(builder.build()).await?;
    info!(
        "Proxy listening on {} (disk cache limit: {})",
        proxy.local_addr(),
        format_bytes(max_size)
    );

    for raw in urls {
        let remote =
            Url::parse(&raw).map_err(|e| AppError::InvalidInput(format!("{raw}: {e}")))?;
        match proxy.reverse_proxy_url(&remote) {
            Some(local) => println!("{remote} -> {local}"),
            None => {
                return Err(AppError::InvalidInput(format!(
                    "{raw} cannot be proxied (http/https URLs only)"
                )));
            }
        }
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    proxy.shutdown().await;
    Ok(())
}

async fn clear_cache(cache_dir: Option<PathBuf>) -> Result<(), AppError> {
    let mut builder = ProxyConfig::builder();
    if let Some(dir) = cache_dir {
        builder = builder.with_cache_dir(dir);
    }
    let config = builder.build();

    // No server needed, operate on the store directly
    let manager = CacheManager::new(config.cache).await?;
    manager.clear().await?;
    info!("Cache cleared");
    Ok(())
}
