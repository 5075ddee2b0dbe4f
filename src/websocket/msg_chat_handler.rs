use tracing::debug;
use crate::models::{ChatSendMessage, ProtocolError};
use crate::ws::connctx::ConnCtx;

/// Handle ChatSendMessage
pub fn handle_chat_message(chat_msg: &ChatSendMessage, ctx: &ConnCtx) -> Result<(), ProtocolError> {
    debug!("Chat from {} in room {} ({} chars)", ctx.conn_id, chat_msg.room, chat_msg.text.len());
    ctx.send_chat(&chat_msg.room, &chat_msg.text)
}
