//! Async driver of the [`SyncMachine`].
//!
//! One task per controller owns the transport, the connect, debounce and
//! reconcile timers, the in-flight connect, the in-flight save and the
//! in-flight reload. Each wakeup is turned into an [`Input`] and the resulting
//! [`Effect`]s are executed in order.

use std::{future::pending, pin::Pin, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use noteboard_server::{domain::Note, infrastructure::dto::websocket::WsMessage};
use noteboard_shared::time::now_millis;
use tokio::{
    net::TcpStream,
    sync::{broadcast, mpsc, watch},
    task::{JoinError, JoinHandle},
    time::{self, Instant, Interval, MissedTickBehavior, Sleep},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        self, Message,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};

use super::machine::{ConnectionState, Effect, Input, Outgoing, SyncEvent, SyncMachine};
use crate::{
    config::SyncConfig,
    error::SyncError,
    store::{NoteStore, StoreError},
};

const EVENT_CAPACITY: usize = 64;

type Transport = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ConnectResult = Result<Transport, tungstenite::Error>;
type SaveResult = Result<Vec<Note>, StoreError>;
type LoadResult = (u64, Result<Vec<Note>, StoreError>);

enum Command {
    Edit(Vec<Note>),
    BeginEditing,
    EndEditing,
    Flush,
    Shutdown,
}

/// Handle to a running sync controller.
///
/// Dropping the handle stops the controller the same way [`SyncHandle::shutdown`]
/// does, without waiting for it.
pub struct SyncHandle {
    canvas_id: String,
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<SyncEvent>,
    state: watch::Receiver<ConnectionState>,
    notes: watch::Receiver<Vec<Note>>,
    client_id: watch::Receiver<Option<String>>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Load the canvas from `store` and start syncing it with the server at `url`.
    ///
    /// A failed load is logged and the controller starts from an empty list.
    pub async fn spawn(
        url: impl Into<String>,
        canvas_id: impl Into<String>,
        store: Arc<dyn NoteStore>,
        config: SyncConfig,
    ) -> Self {
        let url = url.into();
        let canvas_id = canvas_id.into();

        let initial = match store.load_notes(&canvas_id).await {
            Ok(notes) => notes,
            Err(e) => {
                tracing::warn!("Failed to load canvas '{}': {}", canvas_id, e);
                Vec::new()
            }
        };

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (notes_tx, notes_rx) = watch::channel(initial.clone());
        let (client_id_tx, client_id_rx) = watch::channel(None);

        let reconcile = (!config.reconcile_interval.is_zero()).then(|| {
            let period = config.reconcile_interval;
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        let driver = Driver {
            machine: SyncMachine::new(canvas_id.clone(), &config, initial),
            config,
            url,
            store,
            commands: commands_rx,
            events: events_tx.clone(),
            state: state_tx,
            notes: notes_tx,
            client_id: client_id_tx,
            transport: None,
            connect_task: None,
            connect_timer: None,
            debounce_timer: None,
            reconcile,
            save_task: None,
            load_task: None,
        };
        let task = tokio::spawn(driver.run());

        Self {
            canvas_id,
            commands: commands_tx,
            events: events_tx,
            state: state_rx,
            notes: notes_rx,
            client_id: client_id_rx,
            task,
        }
    }

    pub fn canvas_id(&self) -> &str {
        &self.canvas_id
    }

    /// Replace the local note list. Saved after the debounce window.
    pub fn edit(&self, notes: Vec<Note>) -> Result<(), SyncError> {
        self.command(Command::Edit(notes))
    }

    /// The user started editing a note. Remote updates are dropped until [`Self::end_editing`].
    pub fn begin_editing(&self) -> Result<(), SyncError> {
        self.command(Command::BeginEditing)
    }

    pub fn end_editing(&self) -> Result<(), SyncError> {
        self.command(Command::EndEditing)
    }

    /// Save pending edits without waiting for the debounce window.
    pub fn flush(&self) -> Result<(), SyncError> {
        self.command(Command::Flush)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Wait until the connection reaches `state`.
    pub async fn wait_for_state(&self, state: ConnectionState) -> Result<(), SyncError> {
        let mut rx = self.state.clone();
        rx.wait_for(|current| *current == state)
            .await
            .map(|_| ())
            .map_err(|_| SyncError::Stopped)
    }

    /// Current local view of the canvas
    pub fn notes(&self) -> Vec<Note> {
        self.notes.borrow().clone()
    }

    /// Session id assigned by the server on the current connection
    pub fn client_id(&self) -> Option<String> {
        self.client_id.borrow().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Save pending edits, leave the canvas, close the connection and wait
    /// for the controller to finish.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            tracing::warn!("Sync controller for '{}' ended abnormally: {}", self.canvas_id, e);
        }
    }

    fn command(&self, command: Command) -> Result<(), SyncError> {
        self.commands.send(command).map_err(|_| SyncError::Stopped)
    }
}

struct Driver {
    machine: SyncMachine,
    config: SyncConfig,
    url: String,
    store: Arc<dyn NoteStore>,
    commands: mpsc::UnboundedReceiver<Command>,
    events: broadcast::Sender<SyncEvent>,
    state: watch::Sender<ConnectionState>,
    notes: watch::Sender<Vec<Note>>,
    client_id: watch::Sender<Option<String>>,
    transport: Option<Transport>,
    connect_task: Option<JoinHandle<ConnectResult>>,
    connect_timer: Option<Pin<Box<Sleep>>>,
    debounce_timer: Option<Pin<Box<Sleep>>>,
    reconcile: Option<Interval>,
    save_task: Option<JoinHandle<SaveResult>>,
    load_task: Option<JoinHandle<LoadResult>>,
}

impl Driver {
    async fn run(mut self) {
        self.apply(Input::Start).await;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Edit(notes)) => self.apply(Input::LocalEdit(notes)).await,
                    Some(Command::BeginEditing) => self.apply(Input::EditingStarted).await,
                    Some(Command::EndEditing) => self.apply(Input::EditingEnded).await,
                    Some(Command::Flush) => self.apply(Input::Flush).await,
                    Some(Command::Shutdown) | None => break,
                },
                _ = wait_timer(&mut self.connect_timer) => {
                    self.connect_timer = None;
                    self.apply(Input::ConnectTimerElapsed).await;
                }
                _ = wait_timer(&mut self.debounce_timer) => {
                    self.debounce_timer = None;
                    self.apply(Input::DebounceElapsed).await;
                }
                result = join_task(&mut self.connect_task) => {
                    self.connect_task = None;
                    self.on_connect_result(result).await;
                }
                frame = next_frame(&mut self.transport) => self.on_frame(frame).await,
                result = join_task(&mut self.save_task) => {
                    self.save_task = None;
                    self.on_save_result(result).await;
                }
                _ = tick(&mut self.reconcile) => self.apply(Input::ReconcileTick).await,
                result = join_task(&mut self.load_task) => {
                    self.load_task = None;
                    self.on_load_result(result).await;
                }
            }
        }

        self.stop().await;
    }

    /// Save what is pending, then leave and close.
    ///
    /// A save that still fails after its retries ends the loop.
    async fn stop(mut self) {
        self.apply(Input::Flush).await;
        while let Some(task) = self.save_task.take() {
            let result = task.await;
            let saved = matches!(result, Ok(Ok(_)));
            self.on_save_result(result).await;
            if !saved {
                break;
            }
            self.apply(Input::Flush).await;
        }

        if let Some(task) = self.connect_task.take() {
            task.abort();
        }
        if let Some(task) = self.load_task.take() {
            task.abort();
        }
        self.reconcile = None;
        self.apply(Input::Shutdown).await;
        self.connect_timer = None;
        tracing::debug!("Sync controller for '{}' stopped", self.machine.canvas_id());
    }

    async fn apply(&mut self, input: Input) {
        let effects = self.machine.handle(input);
        for effect in effects {
            self.execute(effect).await;
        }
    }

    async fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::ScheduleConnect(delay) => {
                self.connect_timer = Some(Box::pin(time::sleep(delay)));
            }
            Effect::ScheduleReconnect { attempt, delay } => {
                tracing::info!("Reconnecting in {:?} (attempt {})", delay, attempt);
                self.connect_timer = Some(Box::pin(time::sleep(delay)));
            }
            Effect::Connect => {
                if let Some(task) = self.connect_task.take() {
                    task.abort();
                }
                if let Some(mut transport) = self.transport.take() {
                    let _ = transport.close(None).await;
                }
                let url = self.url.clone();
                tracing::debug!("Connecting to {}", url);
                self.connect_task = Some(tokio::spawn(async move {
                    connect_async(url).await.map(|(stream, _)| stream)
                }));
            }
            Effect::Send(outgoing) => self.send(outgoing).await,
            Effect::ArmDebounce(delay) => {
                self.debounce_timer = Some(Box::pin(time::sleep(delay)));
            }
            Effect::CancelDebounce => self.debounce_timer = None,
            Effect::Save {
                notes,
                exclude_client_id,
            } => {
                self.save_task = Some(tokio::spawn(save_with_retry(
                    self.store.clone(),
                    self.machine.canvas_id().to_string(),
                    notes,
                    exclude_client_id,
                    self.config.save_retries,
                    self.config.save_retry_delay,
                )));
            }
            Effect::Load { epoch } => {
                // The in-flight reload reports soon enough
                if self.load_task.is_some() {
                    return;
                }
                let store = self.store.clone();
                let canvas_id = self.machine.canvas_id().to_string();
                self.load_task = Some(tokio::spawn(async move {
                    (epoch, store.load_notes(&canvas_id).await)
                }));
            }
            Effect::Apply(notes) => {
                self.notes.send_replace(notes);
            }
            Effect::Close => {
                if let Some(mut transport) = self.transport.take() {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "client shutdown".into(),
                    };
                    if let Err(e) = transport.close(Some(frame)).await {
                        tracing::debug!("Close handshake failed: {}", e);
                    }
                }
            }
            Effect::Emit(event) => {
                match &event {
                    SyncEvent::StateChanged(state) => {
                        self.state.send_replace(*state);
                    }
                    SyncEvent::ClientIdAssigned(id) => {
                        self.client_id.send_replace(Some(id.clone()));
                    }
                    SyncEvent::ReconnectExhausted => {
                        tracing::warn!("Giving up reconnecting to {}", self.url);
                    }
                    _ => {}
                }
                // No subscribers is fine
                let _ = self.events.send(event);
            }
        }
    }

    async fn send(&mut self, outgoing: Outgoing) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        let msg = outgoing.into_message(self.machine.canvas_id(), now_millis());
        let kind = msg.kind();
        let text = match msg.to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to encode '{}': {}", kind, e);
                return;
            }
        };
        // A broken transport is noticed by the read side
        if let Err(e) = transport.send(Message::text(text)).await {
            tracing::warn!("Failed to send '{}': {}", kind, e);
        }
    }

    async fn on_connect_result(&mut self, result: Result<ConnectResult, JoinError>) {
        match result {
            Ok(Ok(transport)) => {
                tracing::info!("Connected to {}", self.url);
                self.transport = Some(transport);
                self.apply(Input::Opened).await;
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to connect to {}: {}", self.url, e);
                self.apply(Input::ConnectFailed).await;
            }
            Err(e) => {
                tracing::warn!("Connect task failed: {}", e);
                self.apply(Input::ConnectFailed).await;
            }
        }
    }

    async fn on_frame(&mut self, frame: Option<Result<Message, tungstenite::Error>>) {
        match frame {
            Some(Ok(Message::Text(text))) => match WsMessage::from_json(text.as_str()) {
                Ok(msg) => self.apply(Input::Received(msg)).await,
                Err(e) => tracing::warn!("Dropping malformed frame: {}", e),
            },
            Some(Ok(Message::Close(frame))) => {
                let code = frame.map(|f| u16::from(f.code));
                tracing::info!("Server closed the connection (code {:?})", code);
                self.transport = None;
                self.apply(Input::Closed { code }).await;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::warn!("Connection error: {}", e);
                self.transport = None;
                self.apply(Input::Closed { code: None }).await;
            }
            None => {
                self.transport = None;
                self.apply(Input::Closed { code: None }).await;
            }
        }
    }

    async fn on_save_result(&mut self, result: Result<SaveResult, JoinError>) {
        match result {
            Ok(Ok(saved)) => self.apply(Input::SaveSucceeded(saved)).await,
            Ok(Err(e)) => {
                tracing::warn!("Failed to save canvas '{}': {}", self.machine.canvas_id(), e);
                self.apply(Input::SaveFailed(e.to_string())).await;
            }
            Err(e) => self.apply(Input::SaveFailed(e.to_string())).await,
        }
    }

    async fn on_load_result(&mut self, result: Result<LoadResult, JoinError>) {
        match result {
            Ok((epoch, Ok(notes))) => self.apply(Input::Loaded { epoch, notes }).await,
            Ok((_, Err(e))) => {
                tracing::warn!("Failed to reload canvas '{}': {}", self.machine.canvas_id(), e);
            }
            Err(e) => tracing::warn!("Reload task failed: {}", e),
        }
    }
}

/// Save with a fixed number of attempts.
async fn save_with_retry(
    store: Arc<dyn NoteStore>,
    canvas_id: String,
    notes: Vec<Note>,
    exclude_client_id: Option<String>,
    attempts: u32,
    delay: Duration,
) -> SaveResult {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match store
            .save_notes(&canvas_id, notes.clone(), exclude_client_id.clone())
            .await
        {
            Ok(saved) => return Ok(saved),
            Err(e) if attempt < attempts => {
                tracing::debug!("Save attempt {}/{} failed: {}", attempt, attempts, e);
                attempt += 1;
                time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn wait_timer(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

async fn join_task<T>(task: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => pending().await,
    }
}

async fn next_frame(transport: &mut Option<Transport>) -> Option<Result<Message, tungstenite::Error>> {
    match transport {
        Some(stream) => stream.next().await,
        None => pending().await,
    }
}
