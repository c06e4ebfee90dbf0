//! Pure connection and save state machine.
//!
//! [`SyncMachine::handle`] takes one [`Input`] and returns the [`Effect`]s the
//! driver must carry out. It never touches the network, the clock or the store,
//! so every transition can be checked synchronously.
//!
//! The persisted list is authoritative. It is reloaded after every join and
//! on a poll timer, and applied under the same guard as a remote update.

use std::time::Duration;

use noteboard_server::{domain::Note, infrastructure::dto::websocket::WsMessage};

use super::backoff::Backoff;
use crate::config::SyncConfig;

/// WebSocket close code of a deliberate shutdown
pub const NORMAL_CLOSE: u16 = 1000;

/// Connection state as shown to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Something that happened to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Controller started
    Start,
    /// The settle or reconnect timer fired
    ConnectTimerElapsed,
    /// Transport handshake completed
    Opened,
    /// Transport closed. `None` means no close code was received.
    Closed { code: Option<u16> },
    /// Transport could not be established
    ConnectFailed,
    Received(WsMessage),
    /// The user changed the note list
    LocalEdit(Vec<Note>),
    EditingStarted,
    EditingEnded,
    DebounceElapsed,
    /// Save pending edits now instead of waiting for the debounce window
    Flush,
    SaveSucceeded(Vec<Note>),
    SaveFailed(String),
    /// The reconcile poll timer fired
    ReconcileTick,
    /// A reload requested by [`Effect::Load`] finished
    Loaded { epoch: u64, notes: Vec<Note> },
    Shutdown,
}

/// Frame to put on the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    JoinCanvas,
    LeaveCanvas,
    Pong,
    NotesUpdate(Vec<Note>),
}

impl Outgoing {
    pub fn into_message(self, canvas_id: &str, timestamp: i64) -> WsMessage {
        match self {
            Self::JoinCanvas => WsMessage::join_canvas(canvas_id, timestamp),
            Self::LeaveCanvas => WsMessage::leave_canvas(canvas_id, timestamp),
            Self::Pong => WsMessage::pong(timestamp),
            Self::NotesUpdate(notes) => WsMessage::notes_update(canvas_id, notes, timestamp),
        }
    }
}

/// Notification for observers of the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    StateChanged(ConnectionState),
    /// The server told us our session id
    ClientIdAssigned(String),
    RemoteApplied(Vec<Note>),
    /// A remote update arrived while local edits were unsaved
    RemoteDropped,
    /// The persisted list differed from the local view and replaced it
    Reconciled(Vec<Note>),
    Saved(Vec<Note>),
    /// Pending list equals the last saved one
    SaveSkipped,
    SaveFailed(String),
    ReconnectScheduled { attempt: u32, delay: Duration },
    ReconnectExhausted,
}

/// Work for the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Arm the connect timer for the first connect
    ScheduleConnect(Duration),
    /// Arm the connect timer after an abnormal close
    ScheduleReconnect { attempt: u32, delay: Duration },
    /// Open a new transport, tearing down any previous one
    Connect,
    Send(Outgoing),
    /// (Re)start the debounce window
    ArmDebounce(Duration),
    CancelDebounce,
    Save {
        notes: Vec<Note>,
        exclude_client_id: Option<String>,
    },
    /// Reload the persisted list. The result comes back as [`Input::Loaded`]
    /// with the same epoch.
    Load { epoch: u64 },
    /// Replace the displayed note list
    Apply(Vec<Note>),
    /// Close the transport with a normal close code
    Close,
    Emit(SyncEvent),
}

#[derive(Debug, Clone)]
pub struct SyncMachine {
    canvas_id: String,
    backoff: Backoff,
    settle_delay: Duration,
    debounce: Duration,
    state: ConnectionState,
    client_id: Option<String>,
    attempts: u32,
    /// A connect timer is armed
    reconnect_scheduled: bool,
    /// A transport is being opened or is open
    transport_active: bool,
    editing: bool,
    saving: bool,
    /// List of the save in flight, put back into `pending` if it fails
    in_flight: Option<Vec<Note>>,
    pending: Option<Vec<Note>>,
    last_saved: Vec<Note>,
    /// Bumped whenever the local view changes, so a reload that started
    /// earlier is discarded
    load_epoch: u64,
    notes: Vec<Note>,
    stopped: bool,
}

impl SyncMachine {
    /// `initial` is the persisted list the controller starts from.
    pub fn new(canvas_id: impl Into<String>, config: &SyncConfig, initial: Vec<Note>) -> Self {
        Self {
            canvas_id: canvas_id.into(),
            backoff: Backoff::new(
                config.base_reconnect_delay,
                config.max_reconnect_delay,
                config.max_reconnect_attempts,
            ),
            settle_delay: config.settle_delay,
            debounce: config.debounce,
            state: ConnectionState::Disconnected,
            client_id: None,
            attempts: 0,
            reconnect_scheduled: false,
            transport_active: false,
            editing: false,
            saving: false,
            in_flight: None,
            pending: None,
            last_saved: initial.clone(),
            load_epoch: 0,
            notes: initial,
            stopped: false,
        }
    }

    pub fn canvas_id(&self) -> &str {
        &self.canvas_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn last_saved(&self) -> &[Note] {
        &self.last_saved
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reconnect_scheduled(&self) -> bool {
        self.reconnect_scheduled
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.stopped {
            return effects;
        }

        match input {
            Input::Start => {
                if !self.reconnect_scheduled && !self.transport_active {
                    self.reconnect_scheduled = true;
                    effects.push(Effect::ScheduleConnect(self.settle_delay));
                }
            }
            Input::ConnectTimerElapsed => {
                if self.reconnect_scheduled {
                    self.reconnect_scheduled = false;
                    self.transport_active = true;
                    self.set_state(ConnectionState::Connecting, &mut effects);
                    effects.push(Effect::Connect);
                }
            }
            Input::Opened => {
                if self.transport_active {
                    self.attempts = 0;
                    self.set_state(ConnectionState::Connected, &mut effects);
                    effects.push(Effect::Send(Outgoing::JoinCanvas));
                    // Catch up on anything saved while we were away
                    effects.push(Effect::Load {
                        epoch: self.load_epoch,
                    });
                }
            }
            Input::Closed { code } => self.on_closed(code, &mut effects),
            Input::ConnectFailed => self.on_closed(None, &mut effects),
            Input::Received(msg) => self.on_message(msg, &mut effects),
            Input::LocalEdit(notes) => {
                self.load_epoch += 1;
                self.notes = notes.clone();
                self.pending = Some(notes.clone());
                effects.push(Effect::Apply(notes));
                effects.push(Effect::ArmDebounce(self.debounce));
            }
            Input::EditingStarted => self.editing = true,
            Input::EditingEnded => self.editing = false,
            Input::DebounceElapsed => self.begin_save(&mut effects),
            Input::Flush => {
                effects.push(Effect::CancelDebounce);
                self.begin_save(&mut effects);
            }
            Input::SaveSucceeded(saved) => {
                self.saving = false;
                self.in_flight = None;
                self.load_epoch += 1;
                self.last_saved = saved.clone();
                if self.state == ConnectionState::Connected {
                    effects.push(Effect::Send(Outgoing::NotesUpdate(saved.clone())));
                }
                effects.push(Effect::Emit(SyncEvent::Saved(saved)));
                if self.pending.is_some() {
                    effects.push(Effect::ArmDebounce(self.debounce));
                }
            }
            Input::SaveFailed(reason) => {
                self.saving = false;
                // Only a newer edit re-arms the debounce. The failed list waits
                // for the next edit or an explicit flush.
                let newer_edit = self.pending.is_some();
                if let Some(failed) = self.in_flight.take() {
                    self.pending.get_or_insert(failed);
                }
                effects.push(Effect::Emit(SyncEvent::SaveFailed(reason)));
                if newer_edit {
                    effects.push(Effect::ArmDebounce(self.debounce));
                }
            }
            Input::ReconcileTick => effects.push(Effect::Load {
                epoch: self.load_epoch,
            }),
            Input::Loaded { epoch, notes } => self.on_loaded(epoch, notes, &mut effects),
            Input::Shutdown => {
                self.stopped = true;
                self.reconnect_scheduled = false;
                if self.pending.take().is_some() {
                    tracing::warn!("Discarding unsaved edits of canvas '{}'", self.canvas_id);
                }
                effects.push(Effect::CancelDebounce);
                if self.transport_active {
                    if self.state == ConnectionState::Connected {
                        effects.push(Effect::Send(Outgoing::LeaveCanvas));
                    }
                    effects.push(Effect::Close);
                    self.transport_active = false;
                }
                self.set_state(ConnectionState::Disconnected, &mut effects);
            }
        }
        effects
    }

    fn set_state(&mut self, state: ConnectionState, effects: &mut Vec<Effect>) {
        if self.state != state {
            self.state = state;
            effects.push(Effect::Emit(SyncEvent::StateChanged(state)));
        }
    }

    fn on_closed(&mut self, code: Option<u16>, effects: &mut Vec<Effect>) {
        // Close of a transport that was already replaced or torn down
        if !self.transport_active {
            return;
        }
        self.transport_active = false;

        if code == Some(NORMAL_CLOSE) {
            self.set_state(ConnectionState::Disconnected, effects);
            return;
        }

        self.set_state(ConnectionState::Error, effects);
        let attempt = self.attempts + 1;
        match self.backoff.delay(attempt) {
            Some(delay) => {
                self.attempts = attempt;
                self.reconnect_scheduled = true;
                effects.push(Effect::ScheduleReconnect { attempt, delay });
                effects.push(Effect::Emit(SyncEvent::ReconnectScheduled { attempt, delay }));
            }
            None => effects.push(Effect::Emit(SyncEvent::ReconnectExhausted)),
        }
    }

    fn on_message(&mut self, msg: WsMessage, effects: &mut Vec<Effect>) {
        match msg {
            WsMessage::Ping { client_id, .. } => {
                if let Some(id) = client_id
                    && self.client_id.as_deref() != Some(id.as_str())
                {
                    self.client_id = Some(id.clone());
                    effects.push(Effect::Emit(SyncEvent::ClientIdAssigned(id)));
                }
                effects.push(Effect::Send(Outgoing::Pong));
            }
            WsMessage::NotesUpdate {
                canvas_id, notes, ..
            } => {
                if canvas_id.as_deref() != Some(self.canvas_id.as_str()) {
                    return;
                }
                if self.editing || self.saving || self.pending.is_some() {
                    effects.push(Effect::Emit(SyncEvent::RemoteDropped));
                    return;
                }
                self.load_epoch += 1;
                self.notes = notes.clone();
                self.last_saved = notes.clone();
                effects.push(Effect::Apply(notes.clone()));
                effects.push(Effect::Emit(SyncEvent::RemoteApplied(notes)));
            }
            _ => {}
        }
    }

    fn on_loaded(&mut self, epoch: u64, notes: Vec<Note>, effects: &mut Vec<Effect>) {
        // The local view changed after the load started
        if epoch != self.load_epoch {
            return;
        }
        if self.editing || self.saving || self.pending.is_some() {
            return;
        }
        if notes == self.last_saved {
            return;
        }
        self.load_epoch += 1;
        self.notes = notes.clone();
        self.last_saved = notes.clone();
        effects.push(Effect::Apply(notes.clone()));
        effects.push(Effect::Emit(SyncEvent::Reconciled(notes)));
    }

    fn begin_save(&mut self, effects: &mut Vec<Effect>) {
        // Pending edits wait for the in-flight save and are re-armed after it
        if self.saving {
            return;
        }
        let Some(notes) = self.pending.take() else {
            return;
        };
        if notes == self.last_saved {
            effects.push(Effect::Emit(SyncEvent::SaveSkipped));
            return;
        }
        self.saving = true;
        self.in_flight = Some(notes.clone());
        effects.push(Effect::Save {
            notes,
            exclude_client_id: self.client_id.clone(),
        });
    }
}
