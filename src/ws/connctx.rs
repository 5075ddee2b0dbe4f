use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Language, NameMessage, PongMessage, ProtocolError, SendMessage};
use super::registry::RoomRegistry;
use super::room::{Member, Outbox};

pub const MAX_ROOM_CHARS: usize = 128;
pub const MAX_NAME_CHARS: usize = 32;

/// Server side of one WebSocket connection.
///
/// A connection is in at most one room. Dropping the context leaves that room,
/// so every exit path of the socket task triggers the presence update.
pub struct ConnCtx {
    registry: Arc<RoomRegistry>,
    pub conn_id: String,
    name: Option<String>,
    room: Option<String>,
    outbox: Outbox,
}

pub fn validate_room(room: &str) -> Result<String, ProtocolError> {
    let room = room.trim();
    if room.is_empty() || room.chars().count() > MAX_ROOM_CHARS || room.chars().any(char::is_control) {
        return Err(ProtocolError::InvalidRoom(room.to_string()));
    }
    Ok(room.to_string())
}

/// Trims and truncates a requested display name. The result is what the server applies.
pub fn normalize_name(name: &str) -> Result<String, ProtocolError> {
    let name = name.trim();
    if name.is_empty() || name.chars().any(char::is_control) {
        return Err(ProtocolError::InvalidName(name.to_string()));
    }
    Ok(name.chars().take(MAX_NAME_CHARS).collect::<String>().trim_end().to_string())
}

impl ConnCtx {
    pub fn new(registry: Arc<RoomRegistry>, outbox: Outbox) -> Self {
        Self {
            registry,
            conn_id: Uuid::new_v4().to_string(),
            name: None,
            room: None,
            outbox,
        }
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn join(&mut self, room: &str, name: &str) -> Result<(), ProtocolError> {
        let room = validate_room(room)?;
        let name = normalize_name(name)?;
        self.leave();
        let member = Member::new(self.conn_id.clone(), name.clone(), self.outbox.clone());
        self.registry.join(&room, member);
        self.name = Some(name);
        self.room = Some(room);
        Ok(())
    }

    fn joined_room(&self, requested: &str) -> Result<&str, ProtocolError> {
        let joined = self.room.as_deref().ok_or(ProtocolError::NotJoined)?;
        if joined != requested.trim() {
            return Err(ProtocolError::WrongRoom {
                joined: joined.to_string(),
                requested: requested.to_string(),
            });
        }
        Ok(joined)
    }

    pub fn send_chat(&self, room: &str, text: &str) -> Result<(), ProtocolError> {
        let room = self.joined_room(room)?;
        if text.trim().is_empty() {
            return Err(ProtocolError::EmptyChat);
        }
        self.registry
            .append_chat(room, &self.conn_id, text.to_string())
            .map(|_| ())
            .ok_or(ProtocolError::NotJoined)
    }

    /// Returns whether the room document changed.
    pub fn update_document(&self, room: &str, text: &str) -> Result<bool, ProtocolError> {
        let room = self.joined_room(room)?;
        Ok(self.registry.write_document(room, &self.conn_id, text.to_string()))
    }

    pub fn update_language(&self, room: &str, language: &str) -> Result<Language, ProtocolError> {
        let room = self.joined_room(room)?;
        let language: Language = language
            .parse()
            .map_err(|_| ProtocolError::UnknownLanguage(language.to_string()))?;
        self.registry.set_language(room, language);
        Ok(language)
    }

    /// Applies a rename. The requester hears `you:renamed` before the presence broadcast.
    pub fn rename(&mut self, name: &str) -> Result<String, ProtocolError> {
        let name = normalize_name(name)?;
        self.name = Some(name.clone());
        self.send(SendMessage::Renamed(NameMessage { name: name.clone() }));
        if let Some(room) = &self.room {
            self.registry.rename(room, &self.conn_id, &name);
        }
        Ok(name)
    }

    pub fn pong(&self) {
        self.send(SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() }));
    }

    pub fn leave(&mut self) {
        if let Some(room) = self.room.take() {
            self.registry.leave(&room, &self.conn_id);
        }
    }

    fn send(&self, msg: SendMessage) {
        if self.outbox.send(msg).is_err() {
            debug!("Outbox closed for connection {}", self.conn_id);
        }
    }
}

impl Drop for ConnCtx {
    fn drop(&mut self) {
        if self.room.is_some() {
            info!("Connection {} closing, leaving room", self.conn_id);
        }
        self.leave();
    }
}
