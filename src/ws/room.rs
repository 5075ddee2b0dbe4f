use chrono::Utc;
use std::collections::VecDeque;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::models::{
    ChatEntry, CodeMessage, Language, LanguageApplyMessage, PresenceMessage, RoomStateMessage,
    SendMessage,
};

/// Outbound queue of a single connection.
pub type Outbox = UnboundedSender<SendMessage>;

/// The part of a room that outlives its members for the retention window.
#[derive(Clone, Debug, Default)]
pub struct RoomContent {
    pub document: String,
    pub language: Language,
    pub chat: VecDeque<ChatEntry>,
}

#[derive(Debug)]
pub struct Member {
    pub conn_id: String,
    pub name: String,
    outbox: Outbox,
}

impl Member {
    pub fn new(conn_id: String, name: String, outbox: Outbox) -> Self {
        Self {
            conn_id,
            name,
            outbox,
        }
    }

    fn send(&self, msg: SendMessage) {
        // A closed outbox means the connection is tearing down and will leave shortly.
        if self.outbox.send(msg).is_err() {
            debug!("Dropping message for closed connection {}", self.conn_id);
        }
    }
}

/// Authoritative state of one room. Every mutation goes through `&mut self`,
/// so holding the room's lock serializes them.
#[derive(Debug)]
pub struct Room {
    key: String,
    members: Vec<Member>,
    content: RoomContent,
    chat_history_limit: usize,
}

impl Room {
    pub fn new(key: String, content: RoomContent, chat_history_limit: usize) -> Self {
        Self {
            key,
            members: Vec::new(),
            content,
            chat_history_limit: chat_history_limit.max(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Display names in join order. Duplicates are allowed.
    pub fn member_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    pub fn document(&self) -> &str {
        &self.content.document
    }

    pub fn language(&self) -> Language {
        self.content.language
    }

    pub fn chat(&self) -> impl Iterator<Item = &ChatEntry> {
        self.content.chat.iter()
    }

    pub fn content(&self) -> &RoomContent {
        &self.content
    }

    /// Admits a member: snapshot to the newcomer only, then presence to everyone.
    pub fn admit(&mut self, member: Member) {
        info!("{} joined room {} as {}", member.conn_id, self.key, member.name);
        self.members.push(member);
        if let Some(member) = self.members.last() {
            member.send(SendMessage::RoomState(self.snapshot_for(member)));
        }
        self.broadcast_presence();
    }

    pub fn remove(&mut self, conn_id: &str) -> Option<Member> {
        let idx = self.members.iter().position(|m| m.conn_id == conn_id)?;
        let member = self.members.remove(idx);
        info!("{} ({}) left room {}", member.conn_id, member.name, self.key);
        if !self.members.is_empty() {
            self.broadcast_presence();
        }
        Some(member)
    }

    pub fn rename(&mut self, conn_id: &str, name: &str) -> bool {
        match self.members.iter_mut().find(|m| m.conn_id == conn_id) {
            Some(member) => {
                member.name = name.to_string();
                self.broadcast_presence();
                true
            }
            None => false,
        }
    }

    /// Appends in arrival order and delivers to every member, the sender included.
    pub fn append_chat(&mut self, conn_id: &str, text: String) -> Option<ChatEntry> {
        let sender_name = self.members.iter().find(|m| m.conn_id == conn_id)?.name.clone();
        let entry = ChatEntry {
            sender_name,
            text,
            timestamp: Utc::now(),
        };
        self.content.chat.push_back(entry.clone());
        while self.content.chat.len() > self.chat_history_limit {
            self.content.chat.pop_front();
        }
        self.broadcast(SendMessage::ChatRecv(entry.clone()), None);
        Some(entry)
    }

    /// Last write wins. Returns false when the text is unchanged and nothing was sent.
    pub fn write_document(&mut self, conn_id: &str, text: String) -> bool {
        if self.content.document == text {
            return false;
        }
        self.content.document = text;
        let apply = SendMessage::CodeApply(CodeMessage {
            room: self.key.clone(),
            text: self.content.document.clone(),
        });
        self.broadcast(apply, Some(conn_id));
        true
    }

    /// Last write wins, rebroadcast to every member as confirmation.
    pub fn set_language(&mut self, language: Language) {
        self.content.language = language;
        self.broadcast(
            SendMessage::LanguageApply(LanguageApplyMessage {
                room: self.key.clone(),
                language,
            }),
            None,
        );
    }

    pub fn snapshot_for(&self, member: &Member) -> RoomStateMessage {
        RoomStateMessage {
            you: member.name.clone(),
            members: self.member_names(),
            chat: self.content.chat.iter().cloned().collect(),
            document: self.content.document.clone(),
            language: self.content.language,
        }
    }

    fn broadcast_presence(&self) {
        let members = self.member_names();
        debug!("Presence for room {}: {:?}", self.key, members);
        self.broadcast(SendMessage::Presence(PresenceMessage { members }), None);
    }

    fn broadcast(&self, msg: SendMessage, except: Option<&str>) {
        for member in &self.members {
            if Some(member.conn_id.as_str()) == except {
                continue;
            }
            member.send(msg.clone());
        }
    }
}
