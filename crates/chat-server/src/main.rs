use std::net::IpAddr;

use clap::Parser;

use chat_server::config::ServerConfig;
use chat_server::{hub, server};

/// Real-time multi-room chat server.
#[derive(Parser, Debug)]
#[command(name = "chat-server", version, about)]
struct Cli {
    /// Interface to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(long, default_value_t = 8765)]
    port: u16,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
    };

    let (hub_handle, hub_join) = hub::spawn();

    tokio::select! {
        result = server::run(config, hub_handle) => {
            if let Err(err) = result {
                log::error!("server failed: {err}");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("shutdown requested, exiting");
        }
    }

    hub_join.abort();
}
