use moka::sync::Cache;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{ChatEntry, Language};
use super::room::{Member, Room, RoomContent};

#[derive(Debug, Clone)]
pub struct RegistrySettings {
    pub chat_history_limit: usize,
    pub retention: Duration,
    pub retention_capacity: u64,
}

impl From<&Config> for RegistrySettings {
    fn from(config: &Config) -> Self {
        Self {
            chat_history_limit: config.chat_history_limit,
            retention: config.room_retention(),
            retention_capacity: config.room_retention_capacity,
        }
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        RegistrySettings::from(&Config::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub n_rooms: usize,
    pub n_members: usize,
    pub n_retained: u64,
}

/// Sole owner of room state.
///
/// Room creation and removal happen under the map's write lock. Every other
/// mutation holds the map's read lock plus the room's own mutex, so a room
/// cannot be removed while it is being written and each room's mutations are
/// serialized. Nothing here awaits, so a cancelled connection task can never
/// leave a room half-updated.
///
/// A room whose last member leaves is parked in a time-bounded cache. A join
/// within the retention window restores its document, chat and language.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
    retained: Cache<String, RoomContent>,
    chat_history_limit: usize,
}

fn lock(room: &Mutex<Room>) -> MutexGuard<'_, Room> {
    room.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RoomRegistry {
    pub fn new(settings: RegistrySettings) -> Self {
        let retained = Cache::builder()
            .max_capacity(settings.retention_capacity)
            .time_to_live(settings.retention)
            .build();
        Self {
            rooms: RwLock::new(HashMap::new()),
            retained,
            chat_history_limit: settings.chat_history_limit,
        }
    }

    /// Admits `member` into `room_key`, creating (or restoring) the room first.
    pub fn join(&self, room_key: &str, member: Member) {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        let handle = rooms
            .entry(room_key.to_string())
            .or_insert_with(|| {
                let content = match self.retained.get(room_key) {
                    Some(content) => {
                        self.retained.invalidate(room_key);
                        info!("Restored retained room {}", room_key);
                        content
                    }
                    None => {
                        info!("Created room {}", room_key);
                        RoomContent::default()
                    }
                };
                Arc::new(Mutex::new(Room::new(room_key.to_string(), content, self.chat_history_limit)))
            })
            .clone();
        lock(&handle).admit(member);
    }

    /// Removes a connection from a room. The room is parked for retention once empty.
    pub fn leave(&self, room_key: &str, conn_id: &str) -> Option<Member> {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        let handle = rooms.get(room_key)?.clone();
        let mut room = lock(&handle);
        let member = room.remove(conn_id);
        if room.is_empty() {
            self.retained.insert(room_key.to_string(), room.content().clone());
            drop(room);
            rooms.remove(room_key);
            info!("Room {} is empty, retained for reuse", room_key);
        }
        member
    }

    fn with_room<R>(&self, room_key: &str, f: impl FnOnce(&mut Room) -> R) -> Option<R> {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        let handle = rooms.get(room_key)?;
        let mut room = lock(handle);
        Some(f(&mut room))
    }

    pub fn rename(&self, room_key: &str, conn_id: &str, name: &str) -> bool {
        self.with_room(room_key, |room| room.rename(conn_id, name))
            .unwrap_or(false)
    }

    pub fn append_chat(&self, room_key: &str, conn_id: &str, text: String) -> Option<ChatEntry> {
        self.with_room(room_key, |room| room.append_chat(conn_id, text))
            .flatten()
    }

    /// Returns whether the stored document changed.
    pub fn write_document(&self, room_key: &str, conn_id: &str, text: String) -> bool {
        self.with_room(room_key, |room| room.write_document(conn_id, text))
            .unwrap_or(false)
    }

    pub fn set_language(&self, room_key: &str, language: Language) -> bool {
        self.with_room(room_key, |room| room.set_language(language))
            .is_some()
    }

    pub fn members(&self, room_key: &str) -> Option<Vec<String>> {
        self.with_room(room_key, |room| room.member_names())
    }

    pub fn document(&self, room_key: &str) -> Option<String> {
        self.with_room(room_key, |room| room.document().to_string())
    }

    pub fn language(&self, room_key: &str) -> Option<Language> {
        self.with_room(room_key, |room| room.language())
    }

    pub fn is_retained(&self, room_key: &str) -> bool {
        self.retained.contains_key(room_key)
    }

    pub fn stats(&self) -> RegistryStats {
        self.retained.run_pending_tasks();
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        let n_members = rooms.values().map(|room| lock(room).member_count()).sum();
        let stats = RegistryStats {
            n_rooms: rooms.len(),
            n_members,
            n_retained: self.retained.entry_count(),
        };
        debug!("Registry stats: {:?}", stats);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SendMessage;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn member(id: &str, name: &str) -> (Member, UnboundedReceiver<SendMessage>) {
        let (tx, rx) = unbounded_channel();
        (Member::new(id.to_string(), name.to_string(), tx), rx)
    }

    fn settings(retention: Duration) -> RegistrySettings {
        RegistrySettings {
            chat_history_limit: 100,
            retention,
            retention_capacity: 100,
        }
    }

    #[test]
    fn join_creates_room_and_leave_parks_it() {
        let registry = RoomRegistry::new(settings(Duration::from_secs(60)));
        let (ada, _rx) = member("c1", "Ada");
        registry.join("r1", ada);
        assert_eq!(registry.members("r1"), Some(vec!["Ada".to_string()]));
        assert!(registry.write_document("r1", "c1", "x = 1".into()));

        assert!(registry.leave("r1", "c1").is_some());
        assert_eq!(registry.members("r1"), None);
        assert!(registry.is_retained("r1"));
        assert_eq!(registry.stats().n_rooms, 0);
    }

    #[test]
    fn rejoin_within_retention_restores_content() {
        let registry = RoomRegistry::new(settings(Duration::from_secs(60)));
        let (ada, _ada_rx) = member("c1", "Ada");
        registry.join("r1", ada);
        registry.write_document("r1", "c1", "fn main() {}".into());
        registry.set_language("r1", Language::Cpp);
        registry.append_chat("r1", "c1", "hello".into());
        registry.leave("r1", "c1");

        let (bob, mut bob_rx) = member("c2", "Bob");
        registry.join("r1", bob);
        assert!(!registry.is_retained("r1"));
        match bob_rx.try_recv().unwrap() {
            SendMessage::RoomState(state) => {
                assert_eq!(state.document, "fn main() {}");
                assert_eq!(state.language, Language::Cpp);
                assert_eq!(state.chat.len(), 1);
                assert_eq!(state.members, vec!["Bob".to_string()]);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn expired_room_starts_fresh() {
        let registry = RoomRegistry::new(settings(Duration::from_millis(20)));
        let (ada, _ada_rx) = member("c1", "Ada");
        registry.join("r1", ada);
        registry.write_document("r1", "c1", "old".into());
        registry.leave("r1", "c1");

        std::thread::sleep(Duration::from_millis(80));
        let (bob, _bob_rx) = member("c2", "Bob");
        registry.join("r1", bob);
        assert_eq!(registry.document("r1"), Some(String::new()));
    }

    #[test]
    fn operations_on_unknown_room_are_noops() {
        let registry = RoomRegistry::new(RegistrySettings::default());
        assert!(!registry.write_document("nope", "c1", "x".into()));
        assert!(!registry.set_language("nope", Language::Java));
        assert!(registry.append_chat("nope", "c1", "hi".into()).is_none());
        assert!(registry.leave("nope", "c1").is_none());
    }

    #[test]
    fn stats_count_members_across_rooms() {
        let registry = RoomRegistry::new(RegistrySettings::default());
        let (a, _a) = member("c1", "Ada");
        let (b, _b) = member("c2", "Bob");
        let (c, _c) = member("c3", "Cy");
        registry.join("r1", a);
        registry.join("r1", b);
        registry.join("r2", c);
        let stats = registry.stats();
        assert_eq!(stats.n_rooms, 2);
        assert_eq!(stats.n_members, 3);
        assert_eq!(stats.n_retained, 0);
    }
}
