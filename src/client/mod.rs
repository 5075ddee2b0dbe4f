//! Client half of the room protocol: identity, join handshake, debounced
//! document sync, chat and language, over an explicitly owned connection.

pub mod connection;
pub mod document;
pub mod identity;
pub mod runner;
pub mod session;

use thiserror::Error;

pub use connection::Connection;
pub use identity::{FileNameStore, IdentityResolver, MemoryNameStore, NamePrompt, NameStore};
pub use runner::{run_session, ClientConfig, Command};
pub use session::{ConnectionState, RoomSession, SessionEvent};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("invalid frame: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("name store error: {0}")]
    Store(#[from] std::io::Error),
    #[error("not connected")]
    NotConnected,
    #[error("not joined to a room yet")]
    NotJoined,
    #[error("empty message")]
    EmptyMessage,
}
