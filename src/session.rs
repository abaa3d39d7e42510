//! The owning match context.
//!
//! A [`MatchSession`] replaces the pile of module-level globals a typical
//! netplay client grows (network client here, engine there, input manager
//! somewhere else) with one value that owns the relay transport, the lobby
//! bookkeeping and — once a match starts — the scheduler and its simulator.
//! It is created when the player goes online and dropped when they leave;
//! a `rematch` tears the scheduler down and returns to the lobby without
//! touching the transport.

use std::collections::VecDeque;

use crate::net::messages::{ClientMessage, GameDescriptor, PlayerId, RoomId, ServerMessage};
use crate::pacer::{Clock, FramePacer, SystemClock};
use crate::scheduler::{EngineConfig, Host, RollbackScheduler, TickOutcome};
use crate::simulator::Simulator;
use crate::stats::RollbackStats;
use crate::telemetry::{ObserverHandle, ViolationKind, ViolationSeverity};
use crate::{report_violation, Config, Frame, PlayerSlot, RewindError, RewindResult};

/// The session's side of the relay channel.
///
/// The channel is reliable, ordered and bidirectional; the session never
/// retries or reorders. Both operations surface
/// [`RewindError::TransportClosed`] once the channel is gone.
pub trait RelayTransport<T>
where
    T: Config,
{
    /// Sends one record to the relay.
    ///
    /// # Errors
    /// Returns [`RewindError::TransportClosed`] if the channel closed.
    fn send(&mut self, record: &ClientMessage<T::Input>) -> RewindResult<()>;

    /// Returns all records received since the last call, in arrival order.
    ///
    /// # Errors
    /// Returns [`RewindError::TransportClosed`] if the channel closed.
    fn drain(&mut self) -> RewindResult<Vec<ServerMessage<T::Input>>>;
}

/// Everything a simulator factory needs to construct a match's simulator.
#[derive(Debug, Clone)]
pub struct MatchStart {
    /// Final ordered roster; slot `i` belongs to `players[i]`.
    pub players: Vec<PlayerId>,
    /// The local participant's controller slot.
    pub local_slot: PlayerSlot,
    /// Shared random seed, identical on every participant. Simulators that
    /// need entropy must derive all of it from this value (see
    /// [`Pcg32`](crate::rng::Pcg32)); the engine itself never uses it.
    pub seed: u32,
    /// What to run.
    pub game: GameDescriptor,
}

/// Constructs the simulator when the relay announces `game-started`.
pub type SimulatorFactory<S> = Box<dyn FnMut(&MatchStart) -> S + Send>;

/// Where the session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Connected to the relay but not in a room.
    Idle,
    /// In a room, waiting for the host to start a match.
    Lobby,
    /// A match is running.
    InMatch,
    /// The relay channel closed. A running simulator is retained but no
    /// longer stepped.
    Disconnected,
}

/// Lifecycle notifications drained by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionEvent {
    /// The relay created a room with this participant as host.
    RoomCreated {
        /// The new room.
        room_id: RoomId,
    },
    /// This participant joined an existing room.
    RoomJoined {
        /// The joined room.
        room_id: RoomId,
    },
    /// Another participant joined the lobby.
    PlayerJoined {
        /// Who joined.
        player_id: PlayerId,
    },
    /// A participant left the lobby.
    PlayerLeft {
        /// Who left.
        player_id: PlayerId,
    },
    /// The host changed.
    HostChanged {
        /// The new host.
        host_id: PlayerId,
    },
    /// A match started; the scheduler is running.
    MatchStarted,
    /// The match ended via rematch; the session is back in the lobby.
    MatchEnded,
}

struct RoomState {
    room_id: RoomId,
    local_id: PlayerId,
    host_id: PlayerId,
    players: Vec<PlayerId>,
}

struct MatchState<T, S>
where
    T: Config,
    S: Simulator<T>,
{
    scheduler: RollbackScheduler<T, S>,
    roster: Vec<PlayerId>,
}

enum Phase<T, S>
where
    T: Config,
    S: Simulator<T>,
{
    Idle,
    Lobby(RoomState),
    InMatch(RoomState, MatchState<T, S>),
}

/// The owning match context: relay transport + lobby + scheduler.
///
/// Drive it by calling [`pump`](Self::pump) once per outer loop iteration
/// (e.g. per animation frame). Each pump drains the relay, runs as many
/// simulation ticks as the frame pacer owes, and renders exactly once.
///
/// Under a session, the engine transmits local inputs itself: the
/// application's [`Host::send_local_input`] is still invoked (so it can
/// observe traffic) before the session relays the input.
pub struct MatchSession<T, S, R, C = SystemClock>
where
    T: Config,
    S: Simulator<T>,
    R: RelayTransport<T>,
    C: Clock,
{
    config: EngineConfig,
    transport: R,
    factory: SimulatorFactory<S>,
    pacer: FramePacer<C>,
    phase: Phase<T, S>,
    connected: bool,
    events: VecDeque<SessionEvent>,
    observer: ObserverHandle,
}

impl<T, S, R> MatchSession<T, S, R, SystemClock>
where
    T: Config,
    S: Simulator<T>,
    R: RelayTransport<T>,
{
    /// Creates a session paced by the system clock.
    #[must_use]
    pub fn new(config: EngineConfig, transport: R, factory: SimulatorFactory<S>) -> Self {
        Self::with_clock(config, transport, factory, SystemClock::new())
    }
}

impl<T, S, R, C> MatchSession<T, S, R, C>
where
    T: Config,
    S: Simulator<T>,
    R: RelayTransport<T>,
    C: Clock,
{
    /// Creates a session paced by the given clock. Tests inject a manual
    /// clock here to replay pacing deterministically.
    #[must_use]
    pub fn with_clock(
        config: EngineConfig,
        transport: R,
        factory: SimulatorFactory<S>,
        clock: C,
    ) -> Self {
        Self {
            pacer: FramePacer::new(config.frame_period(), clock),
            config,
            transport,
            factory,
            phase: Phase::Idle,
            connected: true,
            events: VecDeque::new(),
            observer: crate::telemetry::default_observer(),
        }
    }

    /// Replaces the default tracing-backed violation observer. Applies to
    /// the session and to schedulers it constructs afterwards.
    #[must_use]
    pub fn with_observer(mut self, observer: ObserverHandle) -> Self {
        self.observer = observer;
        self
    }

    /// The current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if !self.connected {
            return SessionPhase::Disconnected;
        }
        match self.phase {
            Phase::Idle => SessionPhase::Idle,
            Phase::Lobby(_) => SessionPhase::Lobby,
            Phase::InMatch(_, _) => SessionPhase::InMatch,
        }
    }

    /// The identifier the relay assigned to this participant, once known.
    #[must_use]
    pub fn local_id(&self) -> Option<&PlayerId> {
        self.room().map(|room| &room.local_id)
    }

    /// The current room, once in one.
    #[must_use]
    pub fn room_id(&self) -> Option<&RoomId> {
        self.room().map(|room| &room.room_id)
    }

    /// The current room roster, once in a room.
    #[must_use]
    pub fn players(&self) -> Option<&[PlayerId]> {
        self.room().map(|room| room.players.as_slice())
    }

    /// Whether this participant currently hosts the room.
    #[must_use]
    pub fn is_host(&self) -> bool {
        self.room()
            .is_some_and(|room| room.local_id == room.host_id)
    }

    /// The running scheduler, once a match started.
    #[must_use]
    pub fn scheduler(&self) -> Option<&RollbackScheduler<T, S>> {
        match &self.phase {
            Phase::InMatch(_, m) => Some(&m.scheduler),
            _ => None,
        }
    }

    /// Drains pending lifecycle events, oldest first.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    /// Asks the relay for a new room.
    ///
    /// # Errors
    /// Fails when already in a room or disconnected.
    pub fn create_room(&mut self, player_name: &str) -> RewindResult<()> {
        self.require_idle()?;
        self.transport.send(&ClientMessage::CreateRoom {
            player_name: player_name.to_owned(),
        })
    }

    /// Asks the relay to join an existing room.
    ///
    /// # Errors
    /// Fails when already in a room or disconnected.
    pub fn join_room(&mut self, room_id: RoomId, player_name: &str) -> RewindResult<()> {
        self.require_idle()?;
        self.transport.send(&ClientMessage::JoinRoom {
            room_id,
            player_name: player_name.to_owned(),
        })
    }

    /// Host-only: starts the match for everyone in the room.
    ///
    /// # Errors
    /// Returns [`RewindError::NotHost`] for guests and
    /// [`RewindError::InvalidRequest`] outside the lobby.
    pub fn start_game(&mut self, game: GameDescriptor) -> RewindResult<()> {
        match &self.phase {
            Phase::Lobby(_) => {},
            _ => {
                return Err(RewindError::InvalidRequest {
                    info: "start_game is only valid in the lobby",
                })
            },
        }
        if !self.is_host() {
            return Err(RewindError::NotHost);
        }
        self.transport.send(&ClientMessage::StartGame { game })
    }

    /// Host-only: ends the current match and returns the room to the
    /// lobby.
    ///
    /// # Errors
    /// Returns [`RewindError::NotHost`] for guests and
    /// [`RewindError::InvalidRequest`] outside a match.
    pub fn request_rematch(&mut self) -> RewindResult<()> {
        match &self.phase {
            Phase::InMatch(_, _) => {},
            _ => {
                return Err(RewindError::InvalidRequest {
                    info: "rematch is only valid during a match",
                })
            },
        }
        if !self.is_host() {
            return Err(RewindError::NotHost);
        }
        self.transport.send(&ClientMessage::Rematch)
    }

    /// Runs one outer loop iteration: drain the relay, tick as many frames
    /// as the pacer owes, render once.
    ///
    /// # Errors
    /// Returns [`RewindError::TransportClosed`] when the relay channel is
    /// gone (the scheduler is stopped and retained), and in strict mode
    /// propagates [`RewindError::ConflictingInput`] from peer ingest.
    pub fn pump<H>(&mut self, host: &mut H) -> RewindResult<()>
    where
        H: Host<T>,
    {
        if !self.connected {
            return Err(RewindError::TransportClosed);
        }
        let records = match self.transport.drain() {
            Ok(records) => records,
            Err(err) => {
                self.disconnect();
                return Err(err);
            },
        };
        for record in records {
            self.handle_record(record)?;
        }

        let owed = self.pacer.owed_ticks();
        let mut channel_broken = false;
        if let Phase::InMatch(room, m) = &mut self.phase {
            let mut relay = RelayHost {
                inner: host,
                transport: &mut self.transport,
                local_id: room.local_id.clone(),
                send_error: None,
            };
            for _ in 0..owed {
                if m.scheduler.tick(&mut relay)? != TickOutcome::Stepped {
                    break;
                }
            }
            channel_broken = relay.send_error.is_some();
            m.scheduler.render();
        }
        if channel_broken {
            self.disconnect();
            return Err(RewindError::TransportClosed);
        }
        Ok(())
    }

    // --- internals ---

    fn room(&self) -> Option<&RoomState> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Lobby(room) | Phase::InMatch(room, _) => Some(room),
        }
    }

    fn require_idle(&self) -> RewindResult<()> {
        match self.phase {
            Phase::Idle => Ok(()),
            _ => Err(RewindError::InvalidRequest {
                info: "already in a room",
            }),
        }
    }

    fn disconnect(&mut self) {
        self.connected = false;
        if let Phase::InMatch(_, m) = &mut self.phase {
            // Stop at the tick boundary but keep the simulator for a
            // potential resume.
            m.scheduler.stop();
        }
    }

    fn handle_record(&mut self, record: ServerMessage<T::Input>) -> RewindResult<()> {
        match record {
            ServerMessage::RoomCreated {
                room_id,
                player_id,
                host_id,
                players,
            } => {
                self.phase = Phase::Lobby(RoomState {
                    room_id: room_id.clone(),
                    local_id: player_id,
                    host_id,
                    players,
                });
                self.events.push_back(SessionEvent::RoomCreated { room_id });
            },
            ServerMessage::RoomJoined {
                room_id,
                player_id,
                host_id,
                players,
            } => {
                self.phase = Phase::Lobby(RoomState {
                    room_id: room_id.clone(),
                    local_id: player_id,
                    host_id,
                    players,
                });
                self.events.push_back(SessionEvent::RoomJoined { room_id });
            },
            ServerMessage::PlayerJoined { player_id, players } => {
                if let Phase::Lobby(room) = &mut self.phase {
                    room.players = players;
                    self.events
                        .push_back(SessionEvent::PlayerJoined { player_id });
                }
            },
            ServerMessage::PlayerLeft { player_id, players } => {
                if let Phase::Lobby(room) = &mut self.phase {
                    room.players = players;
                    self.events.push_back(SessionEvent::PlayerLeft { player_id });
                }
            },
            ServerMessage::HostChanged { host_id } => {
                // Roster update only; a running simulation is unaffected.
                if let Phase::Lobby(room) | Phase::InMatch(room, _) = &mut self.phase {
                    room.host_id = host_id.clone();
                    self.events.push_back(SessionEvent::HostChanged { host_id });
                }
            },
            ServerMessage::GameStarted {
                players,
                seed,
                game,
            } => self.handle_game_started(players, seed, game),
            ServerMessage::Input {
                frame,
                player_id,
                bits,
            } => self.handle_input(frame, &player_id, bits)?,
            ServerMessage::Rematch => {
                if let Phase::InMatch(_, _) = &self.phase {
                    let phase = std::mem::replace(&mut self.phase, Phase::Idle);
                    if let Phase::InMatch(room, _) = phase {
                        self.phase = Phase::Lobby(room);
                    }
                    self.events.push_back(SessionEvent::MatchEnded);
                }
            },
        }
        Ok(())
    }

    fn handle_game_started(&mut self, players: Vec<PlayerId>, seed: u32, game: GameDescriptor) {
        let room = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Lobby(room) => room,
            other => {
                report_violation!(
                    self.observer,
                    ViolationSeverity::Error,
                    ViolationKind::Relay,
                    "game-started outside the lobby; ignored"
                );
                self.phase = other;
                return;
            },
        };
        let Some(local_slot) = players.iter().position(|p| *p == room.local_id) else {
            report_violation!(
                self.observer,
                ViolationSeverity::Error,
                ViolationKind::Relay,
                "game-started roster does not contain the local player {}; ignored",
                room.local_id
            );
            self.phase = Phase::Lobby(room);
            return;
        };
        let local_slot = PlayerSlot::new(local_slot);
        let start = MatchStart {
            players: players.clone(),
            local_slot,
            seed,
            game,
        };
        let simulator = (self.factory)(&start);
        match RollbackScheduler::new(self.config, local_slot, players.len(), simulator) {
            Ok(scheduler) => {
                let mut scheduler = scheduler.with_observer(self.observer.clone());
                scheduler.start();
                self.pacer.reset();
                self.phase = Phase::InMatch(
                    room,
                    MatchState {
                        scheduler,
                        roster: players,
                    },
                );
                self.events.push_back(SessionEvent::MatchStarted);
            },
            Err(err) => {
                report_violation!(
                    self.observer,
                    ViolationSeverity::Critical,
                    ViolationKind::Internal,
                    "failed to construct scheduler for game-started: {}",
                    err
                );
                self.phase = Phase::Lobby(room);
            },
        }
    }

    fn handle_input(
        &mut self,
        frame: Frame,
        player_id: &PlayerId,
        bits: T::Input,
    ) -> RewindResult<()> {
        let Phase::InMatch(_, m) = &mut self.phase else {
            tracing::debug!(%frame, %player_id, "input before game start; dropped");
            return Ok(());
        };
        let Some(slot) = m.roster.iter().position(|p| p == player_id) else {
            tracing::debug!(%frame, %player_id, "input from unknown player id; dropped");
            return Ok(());
        };
        m.scheduler
            .receive_remote_input(frame, PlayerSlot::new(slot), bits)
    }
}

/// Bridges the scheduler's [`Host`] seam onto the relay: local inputs are
/// forwarded to the application host first, then transmitted.
struct RelayHost<'a, H, R> {
    inner: &'a mut H,
    transport: &'a mut R,
    local_id: PlayerId,
    send_error: Option<RewindError>,
}

impl<T, H, R> Host<T> for RelayHost<'_, H, R>
where
    T: Config,
    H: Host<T>,
    R: RelayTransport<T>,
{
    fn read_local_input(&mut self) -> T::Input {
        self.inner.read_local_input()
    }

    fn send_local_input(&mut self, frame: Frame, input: T::Input) {
        self.inner.send_local_input(frame, input);
        let record = ClientMessage::Input {
            frame,
            player_id: self.local_id.clone(),
            bits: input,
        };
        if let Err(err) = self.transport.send(&record) {
            // Host::send_local_input cannot fail; remember the error and
            // let the session surface it after the tick completes.
            self.send_error = Some(err);
        }
    }

    fn on_stats(&mut self, stats: &RollbackStats) {
        self.inner.on_stats(stats);
    }
}
