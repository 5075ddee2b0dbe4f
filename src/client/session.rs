use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::models::{
    ChatEntry, ChatSendMessage, CodeMessage, JoinMessage, Language, LanguageUpdateMessage,
    NameMessage, ReceivedMessage, SendMessage,
};
use super::document::DocumentSync;
use super::ClientError;

/// Lifecycle of one transport connection, as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    ConnectedUnjoined,
    Joined,
}

/// A chat line shown before the server has confirmed it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChat {
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// What the user interface needs to redraw.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected,
    Joined { you: String },
    Members(Vec<String>),
    Chat(ChatEntry),
    Document(String),
    Language(Language),
    Renamed(String),
    Disconnected,
    Rejected(String),
}

/// Client-side room state machine.
///
/// Everything here is synchronous and driven by one event loop: transport
/// events, user commands and the debounce deadline are fed in one at a time.
/// Outgoing frames collect in an outbox the loop drains after every step.
/// Local values are tentative and overwritten by the next authoritative
/// message for the same key.
#[derive(Debug)]
pub struct RoomSession {
    room: String,
    state: ConnectionState,
    name: Option<String>,
    join_sent: bool,
    members: Vec<String>,
    chat: Vec<ChatEntry>,
    pending_chat: VecDeque<PendingChat>,
    language: Language,
    document: DocumentSync,
    outbox: Vec<ReceivedMessage>,
}

impl RoomSession {
    pub fn new(room: impl Into<String>, debounce: Duration) -> Self {
        let room = room.into();
        Self {
            document: DocumentSync::new(room.clone(), debounce),
            room,
            state: ConnectionState::Disconnected,
            name: None,
            join_sent: false,
            members: Vec::new(),
            chat: Vec::new(),
            pending_chat: VecDeque::new(),
            language: Language::default(),
            outbox: Vec::new(),
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Confirmed entries in server order.
    pub fn chat(&self) -> &[ChatEntry] {
        &self.chat
    }

    pub fn pending_chat(&self) -> impl Iterator<Item = &PendingChat> {
        self.pending_chat.iter()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn document(&self) -> &str {
        self.document.text()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.document.deadline()
    }

    pub fn take_outbox(&mut self) -> Vec<ReceivedMessage> {
        std::mem::take(&mut self.outbox)
    }

    pub fn transport_connecting(&mut self) {
        self.state = ConnectionState::Connecting;
        self.join_sent = false;
    }

    pub fn transport_connected(&mut self) {
        self.state = ConnectionState::ConnectedUnjoined;
        self.join_sent = false;
        self.try_join();
    }

    pub fn transport_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.join_sent = false;
        self.document.cancel();
        self.outbox.clear();
    }

    /// Supplies the locally resolved display name; joining waits for it.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
        self.try_join();
    }

    /// Join goes out once per connection, only when connected and named.
    fn try_join(&mut self) {
        if self.state != ConnectionState::ConnectedUnjoined || self.join_sent {
            return;
        }
        if let Some(name) = &self.name {
            info!("Joining room {} as {}", self.room, name);
            self.outbox.push(ReceivedMessage::Join(JoinMessage {
                room: self.room.clone(),
                name: name.clone(),
            }));
            self.join_sent = true;
        }
    }

    /// Applies a frame from the relay.
    pub fn handle(&mut self, msg: SendMessage) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        match msg {
            SendMessage::RoomState(state) => {
                if self.state != ConnectionState::ConnectedUnjoined || !self.join_sent {
                    warn!("Ignoring unexpected room snapshot in state {:?}", self.state);
                    return events;
                }
                self.state = ConnectionState::Joined;
                if self.name.as_deref() != Some(state.you.as_str()) {
                    events.push(SessionEvent::Renamed(state.you.clone()));
                }
                self.name = Some(state.you.clone());
                self.members = state.members.clone();
                self.chat = state.chat;
                self.pending_chat.clear();
                self.document.reset(&state.document);
                self.language = state.language;
                events.push(SessionEvent::Joined { you: state.you });
                events.push(SessionEvent::Members(state.members));
                events.push(SessionEvent::Document(state.document));
                events.push(SessionEvent::Language(state.language));
            }
            SendMessage::Presence(presence) => {
                self.members = presence.members.clone();
                events.push(SessionEvent::Members(presence.members));
            }
            SendMessage::ChatRecv(entry) => {
                let own = self.name.as_deref() == Some(entry.sender_name.as_str());
                if own && self.pending_chat.front().is_some_and(|p| p.text == entry.text) {
                    self.pending_chat.pop_front();
                    debug!("Server confirmed own chat message");
                }
                self.chat.push(entry.clone());
                events.push(SessionEvent::Chat(entry));
            }
            SendMessage::CodeApply(code) => {
                if self.document.apply_remote(&code.room, &code.text) {
                    events.push(SessionEvent::Document(code.text));
                }
            }
            SendMessage::LanguageApply(apply) => {
                if apply.room == self.room {
                    self.language = apply.language;
                    events.push(SessionEvent::Language(apply.language));
                }
            }
            SendMessage::Renamed(renamed) => {
                self.name = Some(renamed.name.clone());
                events.push(SessionEvent::Renamed(renamed.name));
            }
            SendMessage::Pong(pong) => {
                debug!("Pong at {}", pong.date);
            }
        }
        events
    }

    /// Shows the message immediately as pending and sends it.
    pub fn send_chat(&mut self, text: &str) -> Result<(), ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        self.ensure_joined()?;
        self.pending_chat.push_back(PendingChat {
            text: text.to_string(),
            sent_at: Utc::now(),
        });
        self.outbox.push(ReceivedMessage::ChatSend(ChatSendMessage {
            room: self.room.clone(),
            text: text.to_string(),
        }));
        Ok(())
    }

    /// Asks for a new name. Local state changes only on `you:renamed`.
    pub fn request_rename(&mut self, name: &str) -> Result<bool, ClientError> {
        let name = name.trim();
        if name.is_empty() || self.name.as_deref() == Some(name) {
            return Ok(false);
        }
        if matches!(self.state, ConnectionState::Disconnected | ConnectionState::Connecting) {
            return Err(ClientError::NotConnected);
        }
        self.outbox.push(ReceivedMessage::NameUpdate(NameMessage { name: name.to_string() }));
        Ok(true)
    }

    /// Optimistically switches the language and asks the room to follow.
    pub fn select_language(&mut self, language: Language) -> Result<(), ClientError> {
        self.ensure_joined()?;
        self.language = language;
        self.outbox.push(ReceivedMessage::LanguageUpdate(LanguageUpdateMessage {
            room: self.room.clone(),
            language: language.to_string(),
        }));
        Ok(())
    }

    /// A local editor change. Sent after the quiet interval, if still joined.
    pub fn edit_document(&mut self, text: impl Into<String>, now: Instant) {
        self.document.local_change(text.into(), now);
    }

    /// Fires the debounce if it is due.
    pub fn poll(&mut self, now: Instant) {
        if let Some(text) = self.document.take_due(now) {
            if self.state == ConnectionState::Joined {
                self.outbox.push(ReceivedMessage::CodeUpdate(CodeMessage {
                    room: self.room.clone(),
                    text,
                }));
            } else {
                debug!("Dropping document update while not joined");
            }
        }
    }

    pub fn ping(&mut self) {
        if self.state != ConnectionState::Disconnected {
            self.outbox.push(ReceivedMessage::Ping);
        }
    }

    fn ensure_joined(&self) -> Result<(), ClientError> {
        match self.state {
            ConnectionState::Joined => Ok(()),
            ConnectionState::Disconnected | ConnectionState::Connecting => Err(ClientError::NotConnected),
            ConnectionState::ConnectedUnjoined => Err(ClientError::NotJoined),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::document::DEBOUNCE;
    use crate::models::{LanguageApplyMessage, PresenceMessage, RoomStateMessage};
    use pretty_assertions::assert_eq;

    fn snapshot(you: &str, document: &str) -> SendMessage {
        SendMessage::RoomState(RoomStateMessage {
            you: you.to_string(),
            members: vec![you.to_string()],
            chat: Vec::new(),
            document: document.to_string(),
            language: Language::Python,
        })
    }

    fn entry(sender: &str, text: &str) -> ChatEntry {
        ChatEntry {
            sender_name: sender.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
        }
    }

    fn joined(name: &str) -> RoomSession {
        let mut session = RoomSession::new("r1", DEBOUNCE);
        session.set_name(name);
        session.transport_connecting();
        session.transport_connected();
        session.take_outbox();
        session.handle(snapshot(name, ""));
        session
    }

    #[test]
    fn join_waits_for_connection_and_name() {
        let mut session = RoomSession::new("r1", DEBOUNCE);
        session.transport_connecting();
        session.transport_connected();
        assert!(session.take_outbox().is_empty());

        session.set_name("Ada");
        assert_eq!(
            session.take_outbox(),
            vec![ReceivedMessage::Join(JoinMessage { room: "r1".into(), name: "Ada".into() })]
        );
    }

    #[test]
    fn name_before_connection_joins_on_connect() {
        let mut session = RoomSession::new("r1", DEBOUNCE);
        session.set_name("Ada");
        assert!(session.take_outbox().is_empty());
        session.transport_connecting();
        assert!(session.take_outbox().is_empty());
        session.transport_connected();
        assert_eq!(session.take_outbox().len(), 1);
    }

    #[test]
    fn join_is_sent_once_per_connection() {
        let mut session = RoomSession::new("r1", DEBOUNCE);
        session.set_name("Ada");
        session.transport_connected();
        session.set_name("Ada");
        session.set_name("Ada again");
        let joins = session
            .take_outbox()
            .into_iter()
            .filter(|m| matches!(m, ReceivedMessage::Join(_)))
            .count();
        assert_eq!(joins, 1);
    }

    #[test]
    fn snapshot_joins_and_adopts_server_name() {
        let mut session = RoomSession::new("r1", DEBOUNCE);
        session.set_name("Ada");
        session.transport_connected();
        let events = session.handle(snapshot("Ada L", "print(1)"));
        assert_eq!(session.state(), ConnectionState::Joined);
        assert_eq!(session.name(), Some("Ada L"));
        assert_eq!(session.document(), "print(1)");
        assert_eq!(events[0], SessionEvent::Renamed("Ada L".into()));
    }

    #[test]
    fn updates_are_gated_until_fresh_snapshot_after_reconnect() {
        let mut session = joined("Ada");
        session.transport_disconnected();
        session.transport_connecting();
        session.transport_connected();
        assert!(matches!(session.take_outbox().as_slice(), [ReceivedMessage::Join(_)]));

        assert!(matches!(session.send_chat("hello"), Err(ClientError::NotJoined)));
        assert!(matches!(session.select_language(Language::Java), Err(ClientError::NotJoined)));
        let t0 = Instant::now();
        session.edit_document("offline edit", t0);
        session.poll(t0 + DEBOUNCE);
        assert!(session.take_outbox().is_empty());

        session.handle(snapshot("Ada", "server text"));
        assert_eq!(session.document(), "server text");
        session.send_chat("hello").unwrap();
        assert_eq!(session.take_outbox().len(), 1);
    }

    #[test]
    fn remote_document_is_never_echoed() {
        let mut session = joined("Ada");
        let t0 = Instant::now();
        let events = session.handle(SendMessage::CodeApply(CodeMessage { room: "r1".into(), text: "T".into() }));
        assert_eq!(events, vec![SessionEvent::Document("T".into())]);

        // The editor fires a change event for the programmatic set.
        session.edit_document("T", t0);
        session.poll(t0 + Duration::from_secs(1));
        assert!(session.take_outbox().is_empty());
    }

    #[test]
    fn debounced_edit_is_sent_once() {
        let mut session = joined("Ada");
        let t0 = Instant::now();
        session.edit_document("a", t0);
        session.edit_document("ab", t0 + Duration::from_millis(60));
        session.poll(t0 + Duration::from_millis(120));
        assert!(session.take_outbox().is_empty());
        session.poll(t0 + Duration::from_millis(180));
        assert_eq!(
            session.take_outbox(),
            vec![ReceivedMessage::CodeUpdate(CodeMessage { room: "r1".into(), text: "ab".into() })]
        );
    }

    #[test]
    fn rename_is_not_applied_optimistically() {
        let mut session = joined("Ada");
        assert!(session.request_rename("Bob").unwrap());
        assert_eq!(session.name(), Some("Ada"));
        assert_eq!(
            session.take_outbox(),
            vec![ReceivedMessage::NameUpdate(NameMessage { name: "Bob".into() })]
        );

        let events = session.handle(SendMessage::Renamed(NameMessage { name: "Bob".into() }));
        assert_eq!(events, vec![SessionEvent::Renamed("Bob".into())]);
        assert_eq!(session.name(), Some("Bob"));
        assert!(!session.request_rename(" Bob ").unwrap());
    }

    #[test]
    fn own_chat_is_deduplicated_against_server_echo() {
        let mut session = joined("Ada");
        session.send_chat("hi").unwrap();
        assert_eq!(session.pending_chat().count(), 1);
        assert!(session.chat().is_empty());

        session.handle(SendMessage::ChatRecv(entry("Bob", "hi")));
        assert_eq!(session.pending_chat().count(), 1);
        session.handle(SendMessage::ChatRecv(entry("Ada", "hi")));
        assert_eq!(session.pending_chat().count(), 0);

        let order: Vec<&str> = session.chat().iter().map(|e| e.sender_name.as_str()).collect();
        assert_eq!(order, vec!["Bob", "Ada"]);
    }

    #[test]
    fn language_is_optimistic_then_authoritative() {
        let mut session = joined("Ada");
        session.select_language(Language::Java).unwrap();
        assert_eq!(session.language(), Language::Java);

        session.handle(SendMessage::LanguageApply(LanguageApplyMessage {
            room: "r1".into(),
            language: Language::JavaScript,
        }));
        assert_eq!(session.language(), Language::JavaScript);

        session.handle(SendMessage::LanguageApply(LanguageApplyMessage {
            room: "other".into(),
            language: Language::Cpp,
        }));
        assert_eq!(session.language(), Language::JavaScript);
    }

    #[test]
    fn presence_overwrites_member_list() {
        let mut session = joined("Ada");
        session.handle(SendMessage::Presence(PresenceMessage { members: vec!["Ada".into(), "Bob".into()] }));
        assert_eq!(session.members().to_vec(), vec!["Ada".to_string(), "Bob".to_string()]);
    }

    #[test]
    fn snapshot_before_join_is_ignored() {
        let mut session = RoomSession::new("r1", DEBOUNCE);
        session.transport_connected();
        assert!(session.handle(snapshot("Ada", "x")).is_empty());
        assert_eq!(session.state(), ConnectionState::ConnectedUnjoined);
    }
}
