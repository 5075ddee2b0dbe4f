use tracing::info;
use crate::models::{LanguageUpdateMessage, ProtocolError};
use crate::ws::connctx::ConnCtx;

/// Handle LanguageUpdateMessage
pub fn handle_language_message(lang_msg: &LanguageUpdateMessage, ctx: &ConnCtx) -> Result<(), ProtocolError> {
    let language = ctx.update_language(&lang_msg.room, &lang_msg.language)?;
    info!("Room {} language set to {} by {}", lang_msg.room, language, ctx.conn_id);
    Ok(())
}
