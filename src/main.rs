use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use clap::Parser;
use log::info;

use mstar_studio::{StudioClient, StudioConfig};

/// Content generation API for M-Star AI Studio
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args
{   /// JSON configuration file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>
  , /// Interface to bind
    #[arg(long, env = "MSTAR_HOST")]
    host: Option<String>
  , /// Port to bind
    #[arg(long, env = "MSTAR_PORT")]
    port: Option<u16>
  , /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>>
{   let args = Args::parse();
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or(args.log_level.as_str())
    ).init();

    let mut config = match &args.config
    {   Some(path) => StudioConfig::from_file(path)?
      , None => StudioConfig::default()
    };
    if let Some(host) = args.host
    {   config.server.host = host;
    }
    if let Some(port) = args.port
    {   config.server.port = port;
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
      .parse()?;
    let client = StudioClient::from_env(config)?;
    info!(
      "Loaded {} backends with credentials",
      client.backends().len()
    );

    mstar_studio::server::serve(Arc::new(client), addr).await?;
    Ok(())
}
