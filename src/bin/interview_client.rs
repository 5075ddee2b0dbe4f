//! Line-oriented terminal client for an interview room.
//!
//! Plain lines are chat. `/name NEW`, `/lang LANG`, `/code TEXT` (use `\n`
//! for newlines), `/show`, `/run`, `/ping` and `/quit` are commands.

use clap::Parser;
use interview_room::client::identity::{NoPrompt, StdinPrompt};
use interview_room::client::{
    run_session, ClientConfig, Command, FileNameStore, IdentityResolver, NamePrompt, SessionEvent,
};
use interview_room::models::{Language, RunRequest, RunResponse};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "interview-client", about = "Join a shared coding interview room")]
struct Args {
    /// WebSocket endpoint of the relay
    #[arg(long, env = "INTERVIEW_URL", default_value = "ws://127.0.0.1:5050/ws")]
    url: String,

    /// HTTP base of the relay, used for /run
    #[arg(long, env = "INTERVIEW_API", default_value = "http://127.0.0.1:5050")]
    api: String,

    /// Room to join
    #[arg(long, default_value = "default")]
    room: String,

    /// Display name; overrides the persisted one
    #[arg(long)]
    name: Option<String>,

    /// Where the accepted display name is remembered
    #[arg(long, default_value = ".interview-name.json")]
    name_store: String,

    /// Never ask for a name interactively
    #[arg(long)]
    no_prompt: bool,
}

#[derive(Default)]
struct Mirror {
    document: String,
    language: Language,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "interview_room=info,warn".into()))
        .init();

    let args = Args::parse();

    let mut identity = IdentityResolver::new(FileNameStore::new(&args.name_store));
    let mut prompt: Box<dyn NamePrompt> = if args.no_prompt {
        Box::new(NoPrompt)
    } else {
        Box::new(StdinPrompt)
    };
    let name = identity.resolve(args.name.as_deref(), prompt.as_mut());
    println!("Joining room '{}' as {}", args.room, name);

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(64);
    let (event_tx, mut event_rx) = mpsc::channel::<SessionEvent>(256);
    let mirror = Arc::new(Mutex::new(Mirror::default()));

    let config = ClientConfig::new(args.url.clone(), args.room.clone());
    let session = tokio::spawn(run_session(config, identity, name, cmd_rx, event_tx));

    let printer_mirror = mirror.clone();
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event, &printer_mirror);
        }
    });

    let http = reqwest::Client::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        };
        let command = match parse_line(&line) {
            Some(Input::Send(command)) => command,
            Some(Input::Show) => {
                let mirror = mirror.lock().unwrap_or_else(PoisonError::into_inner);
                println!("--- {} ---\n{}\n---", mirror.language, mirror.document);
                continue;
            }
            Some(Input::Run) => {
                let request = {
                    let mirror = mirror.lock().unwrap_or_else(PoisonError::into_inner);
                    RunRequest { language: mirror.language, code: mirror.document.clone() }
                };
                run_remote(&http, &args.api, &request).await;
                continue;
            }
            Some(Input::Quit) => break,
            None => continue,
        };
        if let Command::Edit(text) = &command {
            mirror.lock().unwrap_or_else(PoisonError::into_inner).document = text.clone();
        }
        if let Command::Language(language) = &command {
            mirror.lock().unwrap_or_else(PoisonError::into_inner).language = *language;
        }
        if cmd_tx.send(command).await.is_err() {
            break;
        }
    }

    cmd_tx.send(Command::Shutdown).await.ok();
    match session.await {
        Ok(Err(e)) => error!("Session ended with error: {}", e),
        Err(e) => error!("Session task failed: {}", e),
        Ok(Ok(())) => {}
    }
    printer.await.ok();
}

enum Input {
    Send(Command),
    Show,
    Run,
    Quit,
}

fn parse_line(line: &str) -> Option<Input> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (head, rest) = match line.split_once(' ') {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    match head {
        "/name" => Some(Input::Send(Command::Rename(rest.to_string()))),
        "/lang" => match rest.parse::<Language>() {
            Ok(language) => Some(Input::Send(Command::Language(language))),
            Err(e) => {
                println!("{e}");
                None
            }
        },
        "/code" => Some(Input::Send(Command::Edit(rest.replace("\\n", "\n")))),
        "/show" => Some(Input::Show),
        "/run" => Some(Input::Run),
        "/ping" => Some(Input::Send(Command::Ping)),
        "/quit" => Some(Input::Quit),
        _ if line.trim().is_empty() => None,
        _ => Some(Input::Send(Command::Chat(line.to_string()))),
    }
}

fn print_event(event: &SessionEvent, mirror: &Mutex<Mirror>) {
    match event {
        SessionEvent::Connected => println!("* connected"),
        SessionEvent::Disconnected => println!("* offline"),
        SessionEvent::Joined { you } => println!("* joined as {you}"),
        SessionEvent::Members(members) => println!("* in room: {}", members.join(", ")),
        SessionEvent::Chat(entry) => println!("{}: {}", entry.sender_name, entry.text),
        SessionEvent::Document(text) => {
            mirror.lock().unwrap_or_else(PoisonError::into_inner).document = text.clone();
            println!("* document updated ({} bytes)", text.len());
        }
        SessionEvent::Language(language) => {
            mirror.lock().unwrap_or_else(PoisonError::into_inner).language = *language;
            println!("* language: {language}");
        }
        SessionEvent::Renamed(name) => println!("* you are now {name}"),
        SessionEvent::Rejected(reason) => println!("! {reason}"),
    }
}

async fn run_remote(http: &reqwest::Client, api: &str, request: &RunRequest) {
    let url = format!("{}/api/v1/run", api.trim_end_matches('/'));
    let response = match http.post(&url).json(request).send().await {
        Ok(response) => response,
        Err(e) => {
            println!("! run failed: {e}");
            return;
        }
    };
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        println!("! run failed ({status}): {body}");
        return;
    }
    match response.json::<RunResponse>().await {
        Ok(output) => {
            if !output.stdout.is_empty() {
                print!("{}", output.stdout);
            }
            if !output.stderr.is_empty() {
                eprint!("{}", output.stderr);
            }
        }
        Err(e) => println!("! unreadable run output: {e}"),
    }
}
