use tracing::debug;
use crate::models::{CodeMessage, ProtocolError};
use crate::ws::connctx::ConnCtx;

/// Handle a `code:update`. Last write received wins.
pub fn handle_code_message(code_msg: &CodeMessage, ctx: &ConnCtx) -> Result<(), ProtocolError> {
    let changed = ctx.update_document(&code_msg.room, &code_msg.text)?;
    debug!(
        "Document update from {} in room {}: {} bytes, changed={}",
        ctx.conn_id,
        code_msg.room,
        code_msg.text.len(),
        changed
    );
    Ok(())
}
