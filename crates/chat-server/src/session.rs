use std::time::Duration;

use chat_protocol::Frame;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::error::{ChatError, ChatResult};
use crate::handler;
use crate::hub::{HubHandle, OUTBOX_CAPACITY};

const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a connection currently sits in the handshake state machine:
/// unauthenticated connections may only send `connect`; once registered a
/// session is tied to a stable id and display name.
pub(crate) enum State {
    Unauthenticated,
    Registered { session_id: String },
    Closed,
}

impl State {
    pub(crate) fn session_id(&self) -> Option<&str> {
        match self {
            State::Registered { session_id } => Some(session_id),
            _ => None,
        }
    }
}

/// Drives one client connection end to end: the WebSocket read/write loop,
/// heartbeat, and handshake state machine. Runs as its own Tokio task.
pub async fn run(ws: WebSocketStream<TcpStream>, hub: HubHandle) -> ChatResult<()> {
    let (mut sink, mut stream) = ws.split();
    let (outbox_tx, mut outbox_rx) = mpsc::channel::<Frame>(OUTBOX_CAPACITY);

    let mut state = State::Unauthenticated;
    let mut ping_interval = tokio::time::interval_at(Instant::now() + PING_INTERVAL, PING_INTERVAL);
    // Set once a ping goes unanswered; fires the loop's timeout branch if no
    // pong arrives within PONG_TIMEOUT.
    let mut pong_deadline: Option<Instant> = None;
    let mut outcome: ChatResult<()> = Ok(());

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match Frame::decode(&text) {
                            Ok(frame) => {
                                handler::dispatch(&hub, &mut state, frame.body, &outbox_tx).await;
                            }
                            Err(err) => {
                                log::warn!("malformed frame: {err}");
                                let _ = outbox_tx.try_send(Frame::error("mensaje inválido"));
                            }
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        pong_deadline = None;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        log::trace!("peer closed connection");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping / binary frames require no action from us.
                    }
                    Some(Err(err)) => {
                        outcome = Err(err.into());
                        break;
                    }
                }
            }
            outgoing = outbox_rx.recv() => {
                let Some(frame) = outgoing else {
                    outcome = Err(ChatError::ChannelClosed);
                    break;
                };
                if let Err(err) = sink.send(Message::Text(frame.encode())).await {
                    outcome = Err(err.into());
                    break;
                }
            }
            _ = ping_interval.tick() => {
                if let Err(err) = sink.send(Message::Ping(Vec::new())).await {
                    outcome = Err(err.into());
                    break;
                }
                pong_deadline = Some(Instant::now() + PONG_TIMEOUT);
            }
            _ = wait_for_pong_deadline(pong_deadline) => {
                log::warn!("heartbeat timeout for {:?}", state.session_id());
                outcome = Err(ChatError::HeartbeatTimeout);
                break;
            }
        }

        if matches!(state, State::Closed) {
            break;
        }
    }

    if let Some(session_id) = state.session_id() {
        let _ = hub.disconnect(session_id.to_string()).await;
    }
    let _ = sink.close().await;
    outcome
}

async fn wait_for_pong_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
