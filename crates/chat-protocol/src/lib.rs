//! Wire protocol for the chat server.
//!
//! A frame is a UTF-8 JSON object with exactly three fields: `type`, `payload`
//! and `timestamp`. This crate only knows how to turn [`Frame`] values into
//! that JSON shape and back; it has no notion of sockets, rooms or the hub.

pub mod error;
pub mod message;

pub use error::DecodeError;
pub use message::{Frame, MessageBody, RoomSummary};
