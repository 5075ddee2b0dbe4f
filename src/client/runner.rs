use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::models::Language;
use super::connection::Connection;
use super::document::DEBOUNCE;
use super::identity::{IdentityResolver, NameStore};
use super::session::{RoomSession, SessionEvent};
use super::ClientError;

/// Something the user did.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Chat(String),
    Rename(String),
    Language(Language),
    Edit(String),
    Ping,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub room: String,
    pub debounce: Duration,
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            room: room.into(),
            debounce: DEBOUNCE,
            reconnect_initial: Duration::from_millis(250),
            reconnect_max: Duration::from_secs(10),
        }
    }
}

enum Step {
    Continue,
    Reconnect,
    Stop,
}

/// Drives one client's participation in a room until `Command::Shutdown`
/// or the command channel closes.
///
/// Transport frames, commands and the debounce deadline are handled one at a
/// time on this task. A lost connection is reopened with capped exponential
/// backoff and goes through the full join handshake again. On exit the
/// pending debounce is dropped and the socket is closed.
pub async fn run_session<S: NameStore>(
    config: ClientConfig,
    mut identity: IdentityResolver<S>,
    name: String,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<SessionEvent>,
) -> Result<(), ClientError> {
    let mut session = RoomSession::new(config.room.clone(), config.debounce);
    session.set_name(name);
    let mut backoff = config.reconnect_initial;

    loop {
        session.transport_connecting();
        let mut conn = match Connection::open(&config.url).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Connection to {} failed: {}; retrying in {:?}", config.url, e, backoff);
                let retry_at = Instant::now() + backoff;
                backoff = (backoff * 2).min(config.reconnect_max);
                loop {
                    tokio::select! {
                        _ = sleep_until(retry_at) => break,
                        cmd = commands.recv() => {
                            if let Step::Stop = apply_command(&mut session, cmd, &events).await {
                                return Ok(());
                            }
                        }
                    }
                }
                continue;
            }
        };
        backoff = config.reconnect_initial;
        session.transport_connected();
        emit(&events, SessionEvent::Connected).await;

        let step = drive_connection(&mut session, &mut conn, &mut identity, &mut commands, &events).await;
        session.transport_disconnected();
        conn.close().await;
        emit(&events, SessionEvent::Disconnected).await;

        match step {
            Step::Stop => {
                info!("Session for room {} closed", config.room);
                return Ok(());
            }
            _ => {
                info!("Connection lost, reconnecting to room {}", config.room);
                sleep(config.reconnect_initial).await;
            }
        }
    }
}

async fn drive_connection<S: NameStore>(
    session: &mut RoomSession,
    conn: &mut Connection,
    identity: &mut IdentityResolver<S>,
    commands: &mut mpsc::Receiver<Command>,
    events: &mpsc::Sender<SessionEvent>,
) -> Step {
    loop {
        for msg in session.take_outbox() {
            if let Err(e) = conn.send(&msg).await {
                warn!("Send failed: {}", e);
                return Step::Reconnect;
            }
        }

        let deadline = session.next_deadline();
        let debounce = sleep_until(deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600)));

        tokio::select! {
            frame = conn.recv() => match frame {
                Some(Ok(msg)) => {
                    for event in session.handle(msg) {
                        if let SessionEvent::Renamed(name) = &event {
                            identity.confirm(name);
                        }
                        emit(events, event).await;
                    }
                }
                Some(Err(ClientError::Decode(e))) => warn!("Ignoring undecodable frame: {}", e),
                Some(Err(e)) => {
                    warn!("Transport error: {}", e);
                    return Step::Reconnect;
                }
                None => return Step::Reconnect,
            },
            cmd = commands.recv() => {
                if let Step::Stop = apply_command(session, cmd, events).await {
                    return Step::Stop;
                }
            }
            _ = debounce, if deadline.is_some() => session.poll(Instant::now()),
        }
    }
}

async fn apply_command(
    session: &mut RoomSession,
    cmd: Option<Command>,
    events: &mpsc::Sender<SessionEvent>,
) -> Step {
    let result = match cmd {
        None | Some(Command::Shutdown) => return Step::Stop,
        Some(Command::Chat(text)) => session.send_chat(&text),
        Some(Command::Rename(name)) => session.request_rename(&name).map(|_| ()),
        Some(Command::Language(language)) => session.select_language(language),
        Some(Command::Edit(text)) => {
            session.edit_document(text, Instant::now());
            Ok(())
        }
        Some(Command::Ping) => {
            session.ping();
            Ok(())
        }
    };
    if let Err(e) = result {
        debug!("Command rejected: {}", e);
        emit(events, SessionEvent::Rejected(e.to_string())).await;
    }
    Step::Continue
}

async fn emit(events: &mpsc::Sender<SessionEvent>, event: SessionEvent) {
    if events.send(event).await.is_err() {
        debug!("Event receiver dropped");
    }
}
