//! Interactive command line client.

use std::sync::Arc;

use noteboard_server::domain::{
    Note, Position, Size, bring_to_front, next_note_id, next_z_index, place,
    placement::{DEFAULT_NOTE_HEIGHT, DEFAULT_NOTE_WIDTH},
};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::{broadcast::error::RecvError, mpsc};

use crate::{
    config::{ClientArgs, IngressConfig, SyncConfig},
    error::ClientError,
    ingress::BroadcastClient,
    store::{BroadcastingNoteStore, InMemoryNoteStore},
    sync::{SyncEvent, SyncHandle},
};

const WELCOME_NOTE: &str = "# Welcome\nType `add <text>` to place a note.";

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Add(String),
    List,
    Front(i64),
    Save,
    Help,
    Quit,
}

impl CliCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        match head {
            "add" if !rest.is_empty() => Ok(Self::Add(rest.to_string())),
            "add" => Err("usage: add <text>".to_string()),
            "list" | "ls" => Ok(Self::List),
            "front" => rest
                .parse()
                .map(Self::Front)
                .map_err(|_| "usage: front <note id>".to_string()),
            "save" => Ok(Self::Save),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "" => Err(String::new()),
            other => Err(format!("unknown command '{other}', try 'help'")),
        }
    }
}

/// Add a note with the given text at the next free spot near the center.
pub fn add_note(notes: &mut Vec<Note>, content: String) -> Note {
    let position = place(notes, DEFAULT_NOTE_WIDTH, DEFAULT_NOTE_HEIGHT);
    let note = Note::new(
        next_note_id(notes),
        content,
        position,
        Size::new(DEFAULT_NOTE_WIDTH, DEFAULT_NOTE_HEIGHT),
        next_z_index(notes),
    );
    notes.push(note.clone());
    note
}

fn print_notes(notes: &[Note]) {
    if notes.is_empty() {
        println!("(no notes)");
        return;
    }
    let mut sorted: Vec<&Note> = notes.iter().collect();
    sorted.sort_by_key(|n| n.id);
    for note in sorted {
        let first_line = note.content.lines().next().unwrap_or("");
        println!(
            "#{:<3} ({:>3},{:>3}) {}x{} z={:<3} {}",
            note.id,
            note.position.x,
            note.position.y,
            note.size.width,
            note.size.height,
            note.z_index,
            first_line
        );
    }
}

fn print_help() {
    println!("Commands:");
    println!("  add <text>   place a new note");
    println!("  list         show all notes");
    println!("  front <id>   bring a note to the front");
    println!("  save         save pending edits now");
    println!("  quit         leave the canvas");
}

fn print_event(event: &SyncEvent) {
    let now = chrono::Local::now().format("%H:%M:%S");
    match event {
        SyncEvent::StateChanged(state) => println!("[{now}] connection: {state:?}"),
        SyncEvent::ClientIdAssigned(id) => println!("[{now}] session id: {id}"),
        SyncEvent::RemoteApplied(notes) => {
            println!("[{now}] remote update: {} notes", notes.len())
        }
        SyncEvent::RemoteDropped => println!("[{now}] remote update ignored (unsaved edits)"),
        SyncEvent::Reconciled(notes) => {
            println!("[{now}] reloaded {} notes from the store", notes.len())
        }
        SyncEvent::Saved(notes) => println!("[{now}] saved {} notes", notes.len()),
        SyncEvent::SaveSkipped => {}
        SyncEvent::SaveFailed(reason) => {
            println!("[{now}] save failed: {reason} (edits kept, `save` retries)")
        }
        SyncEvent::ReconnectScheduled { attempt, delay } => {
            println!("[{now}] reconnecting in {delay:?} (attempt {attempt})")
        }
        SyncEvent::ReconnectExhausted => println!("[{now}] gave up reconnecting"),
    }
}

/// Read lines on a blocking thread and forward them. Stops after `quit`.
fn spawn_reader(tx: mpsc::Sender<String>) -> tokio::task::JoinHandle<Result<(), ClientError>> {
    tokio::task::spawn_blocking(move || {
        let mut editor = DefaultEditor::new()?;
        loop {
            match editor.readline("> ") {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    let quit = CliCommand::parse(&line) == Ok(CliCommand::Quit);
                    if tx.blocking_send(line).is_err() || quit {
                        return Ok(());
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    })
}

/// Run the interactive client until `quit` or end of input.
pub async fn run_client(args: ClientArgs) -> Result<(), ClientError> {
    let ingress = IngressConfig::from(&args);
    let sync_config = SyncConfig::from(&args);

    // Local stand-in for the canvas database, seeded like a freshly created canvas
    let local = InMemoryNoteStore::new();
    local
        .create_canvas(
            &args.canvas,
            vec![Note::new(
                1,
                WELCOME_NOTE,
                Position::new(65, 65),
                Size::new(DEFAULT_NOTE_WIDTH, DEFAULT_NOTE_HEIGHT),
                1,
            )],
        )
        .await;
    let store = BroadcastingNoteStore::new(local, BroadcastClient::new(&ingress));

    let handle = SyncHandle::spawn(
        ingress.ws_url(),
        args.canvas.clone(),
        Arc::new(store),
        sync_config,
    )
    .await;
    println!("Joining canvas '{}' at {}", args.canvas, ingress.ws_url());
    print_help();

    let mut events = handle.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let (tx, mut lines) = mpsc::channel(16);
    let reader = spawn_reader(tx);

    while let Some(line) = lines.recv().await {
        let command = match CliCommand::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                if !message.is_empty() {
                    println!("{message}");
                }
                continue;
            }
        };

        match command {
            CliCommand::Add(text) => {
                let mut notes = handle.notes();
                let note = add_note(&mut notes, text);
                println!(
                    "added #{} at ({}, {})",
                    note.id, note.position.x, note.position.y
                );
                handle.edit(notes)?;
            }
            CliCommand::List => print_notes(&handle.notes()),
            CliCommand::Front(id) => {
                let mut notes = handle.notes();
                match bring_to_front(&mut notes, id) {
                    Ok(z_index) => {
                        println!("#{id} is now at z={z_index}");
                        handle.edit(notes)?;
                    }
                    Err(e) => println!("{e}"),
                }
            }
            CliCommand::Save => handle.flush()?,
            CliCommand::Help => print_help(),
            CliCommand::Quit => break,
        }
    }

    handle.shutdown().await;
    printer.abort();

    // The reader has returned: it stops on `quit` and at end of input
    match reader.await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("Input reader failed: {}", e);
            Ok(())
        }
    }
}
