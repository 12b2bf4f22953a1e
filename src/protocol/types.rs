use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Connection identity; one per WebSocket, doubles as the player id once the
/// connection joins a room.
pub type PlayerId = Uuid;

/// World-space bounds for accepted player state.
pub const WORLD_XZ_BOUND: f64 = 512.0;
pub const WORLD_Y_MIN: f64 = 0.0;
pub const WORLD_Y_MAX: f64 = 128.0;
pub const YAW_BOUND: f64 = std::f64::consts::PI;
pub const PITCH_BOUND: f64 = 1.55;

/// Wire quantization factors: positions are rounded to 0.01 units, rotations
/// to 0.001 rad, and transmitted as signed integers.
pub const POS_QUANT: f64 = 100.0;
pub const ROT_QUANT: f64 = 1000.0;

#[inline]
pub fn quantize_pos(v: f64) -> i32 {
    (v * POS_QUANT).round() as i32
}

#[inline]
pub fn quantize_rot(v: f64) -> i32 {
    (v * ROT_QUANT).round() as i32
}

#[inline]
pub fn dequantize_pos(v: i32) -> f64 {
    f64::from(v) / POS_QUANT
}

#[inline]
pub fn dequantize_rot(v: i32) -> f64 {
    f64::from(v) / ROT_QUANT
}

/// Authoritative player pose. All fields are finite and inside world bounds
/// once accepted by the movement validator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerPose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub pitch: f64,
}

impl PlayerPose {
    pub const fn spawn() -> Self {
        Self {
            x: 0.0,
            y: 1.75,
            z: 0.0,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    pub fn horizontal_distance_sq(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }
}

impl Default for PlayerPose {
    fn default() -> Self {
        Self::spawn()
    }
}

/// A quiz answer zone choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    O,
    X,
}

impl Answer {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::O => "O",
            Self::X => "X",
        }
    }
}

/// Why a player's position resolved to no answer at lock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChoiceReason {
    CenterLine,
    OutOfLane,
    OffZone,
    InvalidPosition,
}

impl ChoiceReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CenterLine => "center-line",
            Self::OutOfLane => "out-of-lane",
            Self::OffZone => "off-zone",
            Self::InvalidPosition => "invalid-position",
        }
    }
}

/// Quiz state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuizPhase {
    #[default]
    Idle,
    Start,
    Question,
    Lock,
    Result,
    WaitingNext,
    Ended,
}

impl QuizPhase {
    /// Phases in which the quiz counts as running for invariants and joins.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Idle | Self::Ended)
    }
}

/// Billboard media channel selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardTarget {
    Board1,
    Board2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualType {
    #[default]
    None,
    Video,
    Image,
}

/// One billboard channel: an optional visual plus an optional audio track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillboardChannel {
    pub visual_type: VisualType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

/// Both billboard channels of a room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillboardMedia {
    pub board1: BillboardChannel,
    pub board2: BillboardChannel,
}

impl BillboardMedia {
    pub fn channel_mut(&mut self, target: BoardTarget) -> &mut BillboardChannel {
        match target {
            BoardTarget::Board1 => &mut self.board1,
            BoardTarget::Board2 => &mut self.board2,
        }
    }
}

/// A chat entry as broadcast and as retained in the history ring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub from: PlayerId,
    pub name: String,
    pub text: String,
    pub at: i64,
}

/// Room summary row for `room:list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub code: String,
    pub players: usize,
    pub capacity: usize,
    pub persistent: bool,
    pub quiz_active: bool,
    pub phase: QuizPhase,
}

/// Public view of a player inside `room:update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPublic {
    pub id: PlayerId,
    pub name: String,
    pub host: bool,
    pub alive: bool,
    pub score: u32,
    pub admitted: bool,
    pub spectator: bool,
    pub queued_for_admission: bool,
    pub chat_muted: bool,
}

/// Public view of the quiz inside `room:update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPublic {
    pub active: bool,
    pub phase: QuizPhase,
    pub auto_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_starts_at: Option<i64>,
    pub question_index: i32,
    pub total_questions: usize,
    pub lock_seconds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_at: Option<i64>,
}

/// Public view of the entry gate inside `room:update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatePublic {
    pub portal_open: bool,
    pub admission_in_progress: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admission_starts_at: Option<i64>,
    pub participant_limit: usize,
    pub room_capacity: usize,
    pub waiting_players: usize,
    pub admitted_players: usize,
    pub spectator_players: usize,
    pub priority_players: usize,
}

/// Full serialized room sent on join and on `room:update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_id: Option<PlayerId>,
    pub persistent: bool,
    pub created_at: i64,
    pub tick: u64,
    pub players: Vec<PlayerPublic>,
    pub quiz: QuizPublic,
    pub entry_gate: GatePublic,
    pub billboard_media: BillboardMedia,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portal_target_url: Option<String>,
}

/// Gateway redirect instruction embedded in quick-join acks and
/// `route:assign` events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectInfo {
    pub endpoint: String,
    pub token: String,
    pub room_code: String,
}
