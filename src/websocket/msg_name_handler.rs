use tracing::info;
use crate::models::{NameMessage, ProtocolError};
use crate::ws::connctx::ConnCtx;

/// Handle a rename request. The applied name is confirmed with `you:renamed`.
pub fn handle_name_message(name_msg: &NameMessage, ctx: &mut ConnCtx) -> Result<(), ProtocolError> {
    let previous = ctx.name().unwrap_or("<unnamed>").to_string();
    let applied = ctx.rename(&name_msg.name)?;
    info!("Connection {} renamed from {} to {}", ctx.conn_id, previous, applied);
    Ok(())
}
