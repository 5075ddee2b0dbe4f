pub mod handler;
pub mod msg_chat_handler;
pub mod msg_code_handler;
pub mod msg_join_handler;
pub mod msg_language_handler;
pub mod msg_name_handler;
pub mod msg_ping_handler;

pub use handler::websocket_handler;
