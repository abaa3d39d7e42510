//! Key-tagged message records exchanged with the signaling/relay server.
//!
//! The relay speaks a small JSON protocol over a reliable, ordered,
//! bidirectional channel (in the browser deployment, a websocket). Every
//! record is tagged with a `type` key in kebab-case; unknown or malformed
//! records are discarded by the receiver.
//!
//! Two ordering guarantees are required of the relay and assumed here:
//! `game-started` precedes any `input` of the same match, and `input`
//! records from a given sender arrive in sender-frame order. Both hold
//! trivially over TCP-like transports.

use serde::{Deserialize, Serialize};

use crate::Frame;

/// Opaque stable identifier the relay assigns to a participant.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Wraps a relay-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Identifier of a match room on the relay.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps a relay-assigned room identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// What to run and where to fetch it: the shared seed inputs of a match.
///
/// The engine never interprets these; they are handed to the simulator
/// factory when the match starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDescriptor {
    /// Which simulator to construct (e.g. `"demo"`, `"nes"`).
    pub game_type: String,
    /// ROM image to load, for emulator-backed simulators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rom_url: Option<String>,
    /// Emulation core to load, for emulator-backed simulators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_url: Option<String>,
}

impl GameDescriptor {
    /// A descriptor with only a game type, for built-in simulators.
    pub fn new(game_type: impl Into<String>) -> Self {
        Self {
            game_type: game_type.into(),
            rom_url: None,
            core_url: None,
        }
    }
}

/// Records a participant sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
#[serde(bound(
    serialize = "I: Serialize",
    deserialize = "I: serde::de::DeserializeOwned"
))]
pub enum ClientMessage<I> {
    /// Request a new match room.
    CreateRoom {
        /// Display name of the requesting player.
        player_name: String,
    },
    /// Join an existing match room.
    JoinRoom {
        /// The room to join.
        room_id: RoomId,
        /// Display name of the joining player.
        player_name: String,
    },
    /// Host-only: start the match for everyone in the room.
    StartGame {
        /// What to run.
        game: GameDescriptor,
    },
    /// One frame of local input, relayed verbatim to all other
    /// participants.
    Input {
        /// The simulation frame this input takes effect on.
        frame: Frame,
        /// The sender's identifier.
        player_id: PlayerId,
        /// The bit-packed controller state.
        bits: I,
    },
    /// Host-only: terminate the current match and return the room to the
    /// lobby.
    Rematch,
}

/// Records the relay sends to a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
#[serde(bound(
    serialize = "I: Serialize",
    deserialize = "I: serde::de::DeserializeOwned"
))]
pub enum ServerMessage<I> {
    /// A room was created for this participant; they are its host.
    RoomCreated {
        /// The new room.
        room_id: RoomId,
        /// The identifier assigned to this participant.
        player_id: PlayerId,
        /// The current host (the creator).
        host_id: PlayerId,
        /// Everyone currently in the room.
        players: Vec<PlayerId>,
    },
    /// This participant joined an existing room.
    RoomJoined {
        /// The joined room.
        room_id: RoomId,
        /// The identifier assigned to this participant.
        player_id: PlayerId,
        /// The current host.
        host_id: PlayerId,
        /// Everyone currently in the room.
        players: Vec<PlayerId>,
    },
    /// Another participant joined the lobby (pre-start only).
    PlayerJoined {
        /// Who joined.
        player_id: PlayerId,
        /// Updated roster.
        players: Vec<PlayerId>,
    },
    /// A participant left the lobby (pre-start only).
    PlayerLeft {
        /// Who left.
        player_id: PlayerId,
        /// Updated roster.
        players: Vec<PlayerId>,
    },
    /// The host changed (host migration). Roster update only; a running
    /// simulation is unaffected.
    HostChanged {
        /// The new host.
        host_id: PlayerId,
    },
    /// The match begins. The ordered roster pins controller slots: slot `i`
    /// belongs to `players[i]`.
    GameStarted {
        /// Final ordered roster.
        players: Vec<PlayerId>,
        /// Shared random seed (31-bit minimum), identical for all
        /// participants.
        seed: u32,
        /// What to run.
        game: GameDescriptor,
    },
    /// One frame of a remote participant's input.
    Input {
        /// The simulation frame this input takes effect on.
        frame: Frame,
        /// The sender's identifier.
        player_id: PlayerId,
        /// The bit-packed controller state.
        bits: I,
    },
    /// The host ended the match; the room returned to the lobby.
    Rematch,
}

// #########
// # TESTS #
// #########
