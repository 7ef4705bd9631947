use thiserror::Error;

/// Failures that can terminate a session or abort startup.
///
/// Rejections that stay on the wire (`connection_error`, `error` frames) are
/// plain data returned from hub operations, not variants here — see
/// `chat_protocol::MessageBody`.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("IO")]
    Io(#[from] std::io::Error),
    #[error("websocket")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("protocol")]
    Protocol(#[from] chat_protocol::DecodeError),
    #[error("channel closed")]
    ChannelClosed,
    #[error("heartbeat timeout")]
    HeartbeatTimeout,
}

pub type ChatResult<T> = Result<T, ChatError>;
