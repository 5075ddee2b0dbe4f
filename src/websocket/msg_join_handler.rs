use tracing::info;
use crate::models::{JoinMessage, ProtocolError};
use crate::ws::connctx::ConnCtx;

/// Handle JoinMessage
pub fn handle_join_message(join_msg: &JoinMessage, ctx: &mut ConnCtx) -> Result<(), ProtocolError> {
    info!("Join requested by {}: room={}, name={}", ctx.conn_id, join_msg.room, join_msg.name);
    ctx.join(&join_msg.room, &join_msg.name)
}
