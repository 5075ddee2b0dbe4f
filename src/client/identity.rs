//! Display-name resolution for a client before it may join a room.
//!
//! Candidates are tried in order: an explicit name (the `?name=` equivalent),
//! the persisted name, an interactive prompt, then a generated `User-xxxx`
//! placeholder. Whatever the server later applies overrides the local copy.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use rand::Rng;

use super::ClientError;

/// Key under which the accepted display name is persisted.
pub const NAME_KEY: &str = "mu_name";

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Small key-value store shared by every session of the same user.
pub trait NameStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ClientError>;
}

/// Asks the user for a name. `None` means no answer.
pub trait NamePrompt {
    fn prompt(&mut self, message: &str) -> Option<String>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryNameStore {
    values: HashMap<String, String>,
}

impl NameStore for MemoryNameStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ClientError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk, re-read on every access so concurrent clients see each other's writes.
#[derive(Debug, Clone)]
pub struct FileNameStore {
    path: PathBuf,
}

impl FileNameStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> HashMap<String, String> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring unreadable name store {}: {}", self.path.display(), e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        }
    }
}

impl NameStore for FileNameStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_all().remove(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut values = self.read_all();
        values.insert(key.to_string(), value.to_string());
        let raw = serde_json::to_string_pretty(&values)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// Never answers; resolution falls through to the placeholder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl NamePrompt for NoPrompt {
    fn prompt(&mut self, _message: &str) -> Option<String> {
        None
    }
}

/// Reads one line from standard input.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompt;

impl NamePrompt for StdinPrompt {
    fn prompt(&mut self, message: &str) -> Option<String> {
        print!("{message} ");
        io::stdout().flush().ok()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).ok()?;
        Some(line)
    }
}

/// `User-` followed by four random base36 characters.
pub fn placeholder_name() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..4)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("User-{suffix}")
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

pub struct IdentityResolver<S: NameStore> {
    store: S,
}

impl<S: NameStore> IdentityResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Picks the candidate name and persists it for later sessions.
    pub fn resolve(&mut self, explicit: Option<&str>, prompt: &mut dyn NamePrompt) -> String {
        let name = if let Some(name) = non_blank(explicit) {
            debug!("Using explicit name {}", name);
            name
        } else if let Some(name) = non_blank(self.store.get(NAME_KEY).as_deref()) {
            debug!("Using persisted name {}", name);
            name
        } else if let Some(name) = non_blank(prompt.prompt("Enter a display name:").as_deref()) {
            name
        } else {
            let name = placeholder_name();
            info!("No name given, using placeholder {}", name);
            name
        };
        self.persist(&name);
        name
    }

    /// Adopts the name the server applied.
    pub fn confirm(&mut self, name: &str) {
        if self.store.get(NAME_KEY).as_deref() != Some(name) {
            info!("Server confirmed display name {}", name);
            self.persist(name);
        }
    }

    fn persist(&mut self, name: &str) {
        if let Err(e) = self.store.set(NAME_KEY, name) {
            warn!("Failed to persist display name: {}", e);
        }
    }
}
