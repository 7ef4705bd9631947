//! Real-time multi-room chat server.
//!
//! The hub (`hub`) is the single actor that owns every session and room; it
//! is the only place mutation happens, by construction rather than by lock.
//! Everything else — the session task, the dispatcher, the acceptor — only
//! ever talks to it through a cloneable [`hub::HubHandle`].

pub mod config;
pub mod error;
pub mod hub;
pub mod room;
pub mod server;

mod handler;
mod session;

pub use error::{ChatError, ChatResult};
pub use hub::HubHandle;
