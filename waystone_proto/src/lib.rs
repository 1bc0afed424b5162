//! Shared data contracts for the waystone list protocol.
//!
//! Both the client view and the authoritative server depend on these types:
//! waystone references, session handshakes, list snapshots and the four
//! fixed-layout command messages.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod frame;
pub mod wire;

pub use frame::{read_frame, write_frame, FrameError, MAX_FRAME_LEN};
pub use wire::{WireDecodeError, WireMessage};

/// Identifier for a player connected to the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable identifier of a waystone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaystoneId(pub Uuid);

impl WaystoneId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for WaystoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &BlockPos) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        let dz = f64::from(self.z) - f64::from(other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// A waystone as it appears in a player's list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaystoneRef {
    pub id: WaystoneId,
    pub name: String,
    pub global: bool,
    pub sort_index: u32,
    /// `None` for global waystones and waystones nobody claimed.
    #[serde(default)]
    pub owner: Option<PlayerId>,
    #[serde(default = "default_dimension")]
    pub dimension: String,
    #[serde(default)]
    pub position: BlockPos,
}

fn default_dimension() -> String {
    OVERWORLD.to_string()
}

pub const OVERWORLD: &str = "minecraft:overworld";

impl WaystoneRef {
    pub fn new(id: WaystoneId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            global: false,
            sort_index: 0,
            owner: None,
            dimension: default_dimension(),
            position: BlockPos::default(),
        }
    }

    pub fn owned_by(mut self, owner: PlayerId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    pub fn at(mut self, dimension: impl Into<String>, position: BlockPos) -> Self {
        self.dimension = dimension.into();
        self.position = position;
        self
    }
}

/// Mechanism used for a teleport selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarpMode {
    #[default]
    Free,
    WarpStone,
    InventoryItem,
}

/// First frame a client sends after connecting.
///
/// The player id is taken as claimed. This transport does not authenticate
/// players, so anyone who can reach the listener can act as any player,
/// operators included. Run it only behind something that does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHello {
    pub player: PlayerId,
    pub warp_mode: WarpMode,
    pub origin: Option<WaystoneId>,
}

/// Copy of a player's authoritative list handed to the client on screen open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListSnapshot {
    pub player: Option<PlayerId>,
    pub waystones: Vec<WaystoneRef>,
    /// The waystone the selection originates from, when the server knows it.
    #[serde(default)]
    pub origin: Option<WaystoneRef>,
    /// Whether the server grants this player the override capability.
    #[serde(default)]
    pub override_capability: bool,
}

pub fn encode_hello(hello: &SessionHello) -> bincode::Result<Vec<u8>> {
    bincode::serialize(hello)
}

pub fn decode_hello(data: &[u8]) -> bincode::Result<SessionHello> {
    bincode::deserialize(data)
}

pub fn encode_snapshot(snapshot: &ListSnapshot) -> bincode::Result<Vec<u8>> {
    bincode::serialize(snapshot)
}

pub fn decode_snapshot(data: &[u8]) -> bincode::Result<ListSnapshot> {
    bincode::deserialize(data)
}

pub fn encode_snapshot_json(snapshot: &ListSnapshot) -> serde_json::Result<String> {
    serde_json::to_string(snapshot)
}

pub fn decode_snapshot_json(data: &str) -> serde_json::Result<ListSnapshot> {
    serde_json::from_str(data)
}
