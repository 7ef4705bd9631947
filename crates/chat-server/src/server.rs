use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::ChatResult;
use crate::hub::HubHandle;
use crate::session;

/// Accepts TCP connections, upgrades each to a WebSocket, and spawns a
/// session task per connection. Runs until the process is asked to shut down.
pub async fn run(config: ServerConfig, hub: HubHandle) -> ChatResult<()> {
    let listener = TcpListener::bind((config.host, config.port)).await?;
    log::info!("listening on {}:{}", config.host, config.port);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                log::warn!("accept failed: {err}");
                continue;
            }
        };

        let hub = hub.clone();
        tokio::spawn(async move {
            log::trace!("connection accepted from {peer}");
            let ws = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(err) => {
                    log::warn!("websocket upgrade failed for {peer}: {err}");
                    return;
                }
            };
            if let Err(err) = session::run(ws, hub).await {
                log::info!("session with {peer} ended: {err}");
            }
        });
    }
}
