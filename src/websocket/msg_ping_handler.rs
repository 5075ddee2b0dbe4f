use tracing::debug;
use crate::models::ProtocolError;
use crate::ws::connctx::ConnCtx;

/// Handle PingMessage
pub fn handle_ping_message(ctx: &ConnCtx) -> Result<(), ProtocolError> {
    // Reply with pong
    debug!("Ping received from {}", ctx.conn_id);
    ctx.pong();
    Ok(())
}
