use std::sync::Arc;
use axum::{
    extract::{State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn, error, debug};

use crate::AppState;
use crate::models::{ReceivedMessage, SendMessage};
use crate::ws::connctx::ConnCtx;
use crate::websocket::msg_chat_handler::handle_chat_message;
use crate::websocket::msg_code_handler::handle_code_message;
use crate::websocket::msg_join_handler::handle_join_message;
use crate::websocket::msg_language_handler::handle_language_message;
use crate::websocket::msg_name_handler::handle_name_message;
use crate::websocket::msg_ping_handler::handle_ping_message;

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    // Everything addressed to this connection goes through one ordered outbox
    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<SendMessage>();
    let mut ctx = ConnCtx::new(app_state.registry.clone(), outbox);
    let connection_id = ctx.conn_id.clone();
    info!("WebSocket connection established with connection_id: {}", connection_id);

    // Drain the outbox into the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize outbound message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Process incoming frames in arrival order
    let recv_loop = async {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => dispatch(&text, &mut ctx),
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!("WebSocket error on connection {}: {}", connection_id, e);
                    break;
                }
            }
        }
    };

    // Wait for either side to finish
    tokio::select! {
        _ = recv_loop => {},
        _ = (&mut send_task) => {},
    };
    send_task.abort();

    // Leaves the room and broadcasts the new presence
    drop(ctx);
    info!("WebSocket connection {} terminated", connection_id);
}

/// Parse a text frame and route it. Malformed or out-of-sequence frames are logged and dropped.
pub(crate) fn dispatch(text: &str, ctx: &mut ConnCtx) {
    let received: ReceivedMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Dropping malformed frame from {}: {}", ctx.conn_id, e);
            return;
        }
    };
    debug!("Received from {}: {:?}", ctx.conn_id, received);

    let result = match &received {
        ReceivedMessage::Join(msg) => handle_join_message(msg, ctx),
        ReceivedMessage::ChatSend(msg) => handle_chat_message(msg, ctx),
        ReceivedMessage::CodeUpdate(msg) => handle_code_message(msg, ctx),
        ReceivedMessage::LanguageUpdate(msg) => handle_language_message(msg, ctx),
        ReceivedMessage::NameUpdate(msg) => handle_name_message(msg, ctx),
        ReceivedMessage::Ping => handle_ping_message(ctx),
    };
    if let Err(e) = result {
        warn!("Protocol violation on connection {}: {}", ctx.conn_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PresenceMessage;
    use crate::ws::registry::{RegistrySettings, RoomRegistry};
    use tokio::sync::mpsc::unbounded_channel;

    #[test_log::test]
    fn malformed_frames_do_not_disturb_the_connection() {
        let registry = Arc::new(RoomRegistry::new(RegistrySettings::default()));
        let (tx, mut rx) = unbounded_channel();
        let mut ctx = ConnCtx::new(registry.clone(), tx);

        dispatch("not json", &mut ctx);
        dispatch(r#"{"type":"chat:send","room":"r1","text":"early"}"#, &mut ctx);
        dispatch(r#"{"type":"teleport"}"#, &mut ctx);
        assert!(rx.try_recv().is_err());

        dispatch(r#"{"type":"join","room":"r1","name":"Ada"}"#, &mut ctx);
        assert!(matches!(rx.try_recv(), Ok(SendMessage::RoomState(_))));
        assert_eq!(
            rx.try_recv().ok(),
            Some(SendMessage::Presence(PresenceMessage { members: vec!["Ada".into()] }))
        );

        dispatch(r#"{"type":"ping"}"#, &mut ctx);
        assert!(matches!(rx.try_recv(), Ok(SendMessage::Pong(_))));
    }
}
