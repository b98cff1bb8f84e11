//! Transport service: the control task
//!
//! **Responsibilities:**
//! - Own the `TransportController` on a single task
//! - Serialize user commands (from `TransportHandle`s) and engine events
//! - Persist the session snapshot on suspend and restore it on activate
//! - Publish transport notifications on the `EventBus`
//!
//! **Ordering:** commands and engine events are handled one at a time. Engine
//! events already queued are applied before the next command, so a command
//! always sees every callback the engine sent before it.

use crate::config::TransportSettings;
use crate::db::SnapshotStore;
use crate::engine::{EngineEventReceiver, Generation, MediaEngine};
use crate::error::{Error, Result};
use crate::playback::{
    EventBusObserver, MediaItem, PlaybackSnapshot, PlaybackState, PlaylistProvider, SeekUnit,
    SessionPhase, TransportController,
};
use cadence_common::events::{EventBus, LoopMode, TransportEvent};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Engine events applied ahead of one command at most
const MAX_QUEUED_EVENTS: usize = 256;

/// A user-level transport command
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Play(Option<MediaItem>),
    Pause,
    Resume,
    TogglePause,
    Stop,
    SeekTo(u64),
    SeekFraction(f64),
    SeekForward(SeekUnit),
    SeekBackward(SeekUnit),
    SetRate(f64),
    SetVolume(f64),
    VolumeUp,
    VolumeDown,
    SetBalance(f64),
    BalanceLeft,
    BalanceRight,
    ToggleMute,
    SetLoopMode(LoopMode),
    Suspend,
    Activate,
    Status,
    /// Suspend, persist and end the control task
    Shutdown,
}

/// Point-in-time view of the transport
#[derive(Debug, Clone)]
pub struct TransportStatus {
    pub state: PlaybackState,
    pub phase: SessionPhase,
    pub item: Option<MediaItem>,
    pub generation: Generation,
}

/// Reply to a `TransportCommand`
#[derive(Debug, Clone)]
pub enum Response {
    Done,
    Snapshot(PlaybackSnapshot),
    Status(TransportStatus),
}

#[derive(Debug)]
struct Request {
    command: TransportCommand,
    reply: oneshot::Sender<Result<Response>>,
}

/// Control task owning the controller
pub struct TransportService<E, P, S> {
    controller: TransportController<E, P>,
    store: S,
    commands: mpsc::Receiver<Request>,
    engine_events: EngineEventReceiver,
}

impl<E, P, S> TransportService<E, P, S>
where
    E: MediaEngine + 'static,
    P: PlaylistProvider + 'static,
    S: SnapshotStore,
{
    /// Wire the service; notifications go to the returned handle's EventBus
    pub fn new(
        mut controller: TransportController<E, P>,
        store: S,
        engine_events: EngineEventReceiver,
        settings: &TransportSettings,
    ) -> (Self, TransportHandle) {
        let bus = EventBus::new(settings.event_capacity);
        controller.register_observer(Box::new(EventBusObserver::new(bus.clone())));

        let (tx, rx) = mpsc::channel(settings.command_capacity.max(1));
        let service = Self {
            controller,
            store,
            commands: rx,
            engine_events,
        };
        (service, TransportHandle { commands: tx, bus })
    }

    pub fn controller(&self) -> &TransportController<E, P> {
        &self.controller
    }

    /// Run the control task on the current runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process commands and engine events until shutdown
    ///
    /// When every handle is dropped the session is suspended and persisted
    /// before the task ends.
    pub async fn run(mut self) {
        info!("Transport service started");

        loop {
            tokio::select! {
                // Commands first so a busy engine cannot starve them; queued
                // events are still applied ahead of each command.
                biased;

                request = self.commands.recv() => {
                    self.drain_engine_events();
                    let Some(Request { command, reply }) = request else {
                        info!("All transport handles dropped, suspending");
                        if let Err(e) = self.suspend_and_persist().await {
                            error!("Failed to persist session on exit: {}", e);
                        }
                        break;
                    };

                    let shutdown = command == TransportCommand::Shutdown;
                    let result = self.execute(command).await;
                    if let Err(e) = &result {
                        debug!("Command failed: {}", e);
                    }
                    if reply.send(result).is_err() {
                        debug!("Caller went away before the reply");
                    }
                    if shutdown {
                        break;
                    }
                }

                Some(event) = self.engine_events.recv() => {
                    self.controller.handle_engine_event(event);
                }
            }
        }

        info!("Transport service stopped");
    }

    /// Apply the engine events already queued, up to `MAX_QUEUED_EVENTS`
    fn drain_engine_events(&mut self) {
        for _ in 0..MAX_QUEUED_EVENTS {
            match self.engine_events.try_recv() {
                Ok(event) => self.controller.handle_engine_event(event),
                Err(_) => break,
            }
        }
    }

    async fn execute(&mut self, command: TransportCommand) -> Result<Response> {
        debug!("Executing {:?}", command);
        match command {
            TransportCommand::Play(item) => self.controller.play(item)?,
            TransportCommand::Pause => self.controller.pause()?,
            TransportCommand::Resume => self.controller.resume()?,
            TransportCommand::TogglePause => self.controller.toggle_pause()?,
            TransportCommand::Stop => self.controller.stop()?,
            TransportCommand::SeekTo(position_ms) => self.controller.seek_to(position_ms)?,
            TransportCommand::SeekFraction(fraction) => self.controller.seek_fraction(fraction)?,
            TransportCommand::SeekForward(unit) => self.controller.seek_forward(unit)?,
            TransportCommand::SeekBackward(unit) => self.controller.seek_backward(unit)?,
            TransportCommand::SetRate(rate) => self.controller.set_rate(rate)?,
            TransportCommand::SetVolume(volume) => self.controller.set_volume(volume)?,
            TransportCommand::VolumeUp => self.controller.volume_up()?,
            TransportCommand::VolumeDown => self.controller.volume_down()?,
            TransportCommand::SetBalance(balance) => self.controller.set_balance(balance)?,
            TransportCommand::BalanceLeft => self.controller.balance_left()?,
            TransportCommand::BalanceRight => self.controller.balance_right()?,
            TransportCommand::ToggleMute => self.controller.toggle_mute()?,
            TransportCommand::SetLoopMode(mode) => self.controller.set_loop_mode(mode)?,
            TransportCommand::Suspend | TransportCommand::Shutdown => {
                return self.suspend_and_persist().await.map(Response::Snapshot);
            }
            TransportCommand::Activate => self.activate_from_store().await?,
            TransportCommand::Status => return Ok(Response::Status(self.status())),
        }
        Ok(Response::Done)
    }

    fn status(&self) -> TransportStatus {
        TransportStatus {
            state: self.controller.state().clone(),
            phase: self.controller.phase(),
            item: self.controller.current_item().cloned(),
            generation: self.controller.generation(),
        }
    }

    /// Suspend the controller, then write the snapshot
    ///
    /// A failed write leaves the session suspended; retrying re-saves the
    /// same snapshot.
    async fn suspend_and_persist(&mut self) -> Result<PlaybackSnapshot> {
        let snapshot = self.controller.suspend()?;
        self.store.save(&snapshot).await?;
        info!("Session persisted ({} at {} ms)", snapshot.status, snapshot.current_time_ms);
        Ok(snapshot)
    }

    async fn activate_from_store(&mut self) -> Result<()> {
        let stored = match self.store.load_latest().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Could not read persisted session: {}", e);
                self.controller.abort_activation()?;
                return Err(e);
            }
        };
        self.controller.activate(stored.as_ref())
    }
}

/// Cloneable sender side of the transport service
#[derive(Debug, Clone)]
pub struct TransportHandle {
    commands: mpsc::Sender<Request>,
    bus: EventBus,
}

impl TransportHandle {
    /// Send a command and wait for its reply
    pub async fn send(&self, command: TransportCommand) -> Result<Response> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Request { command, reply })
            .await
            .map_err(|_| Error::ServiceStopped)?;
        rx.await.map_err(|_| Error::ServiceStopped)?
    }

    async fn run(&self, command: TransportCommand) -> Result<()> {
        self.send(command).await.map(|_| ())
    }

    pub async fn play(&self, item: Option<MediaItem>) -> Result<()> {
        self.run(TransportCommand::Play(item)).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.run(TransportCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.run(TransportCommand::Resume).await
    }

    pub async fn toggle_pause(&self) -> Result<()> {
        self.run(TransportCommand::TogglePause).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.run(TransportCommand::Stop).await
    }

    pub async fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.run(TransportCommand::SeekTo(position_ms)).await
    }

    pub async fn seek_fraction(&self, fraction: f64) -> Result<()> {
        self.run(TransportCommand::SeekFraction(fraction)).await
    }

    pub async fn seek_forward(&self, unit: SeekUnit) -> Result<()> {
        self.run(TransportCommand::SeekForward(unit)).await
    }

    pub async fn seek_backward(&self, unit: SeekUnit) -> Result<()> {
        self.run(TransportCommand::SeekBackward(unit)).await
    }

    pub async fn set_rate(&self, rate: f64) -> Result<()> {
        self.run(TransportCommand::SetRate(rate)).await
    }

    pub async fn set_volume(&self, volume: f64) -> Result<()> {
        self.run(TransportCommand::SetVolume(volume)).await
    }

    pub async fn volume_up(&self) -> Result<()> {
        self.run(TransportCommand::VolumeUp).await
    }

    pub async fn volume_down(&self) -> Result<()> {
        self.run(TransportCommand::VolumeDown).await
    }

    pub async fn set_balance(&self, balance: f64) -> Result<()> {
        self.run(TransportCommand::SetBalance(balance)).await
    }

    pub async fn balance_left(&self) -> Result<()> {
        self.run(TransportCommand::BalanceLeft).await
    }

    pub async fn balance_right(&self) -> Result<()> {
        self.run(TransportCommand::BalanceRight).await
    }

    pub async fn toggle_mute(&self) -> Result<()> {
        self.run(TransportCommand::ToggleMute).await
    }

    pub async fn set_loop_mode(&self, mode: LoopMode) -> Result<()> {
        self.run(TransportCommand::SetLoopMode(mode)).await
    }

    pub async fn suspend(&self) -> Result<PlaybackSnapshot> {
        match self.send(TransportCommand::Suspend).await? {
            Response::Snapshot(snapshot) => Ok(snapshot),
            other => Err(unexpected(other)),
        }
    }

    pub async fn activate(&self) -> Result<()> {
        self.run(TransportCommand::Activate).await
    }

    pub async fn status(&self) -> Result<TransportStatus> {
        match self.send(TransportCommand::Status).await? {
            Response::Status(status) => Ok(status),
            other => Err(unexpected(other)),
        }
    }

    /// Copy of the current playback state
    pub async fn state(&self) -> Result<PlaybackState> {
        self.status().await.map(|status| status.state)
    }

    /// Suspend, persist and stop the service; returns the persisted snapshot
    pub async fn shutdown(&self) -> Result<PlaybackSnapshot> {
        match self.send(TransportCommand::Shutdown).await? {
            Response::Snapshot(snapshot) => Ok(snapshot),
            other => Err(unexpected(other)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.bus.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }
}

fn unexpected(response: Response) -> Error {
    Error::InvalidState(format!("unexpected transport response: {:?}", response))
}
