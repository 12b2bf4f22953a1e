use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::FrameError;
use super::types::{
    Answer, BillboardChannel, BoardTarget, ChatEntry, ChoiceReason, PlayerId, QuizPhase,
    RedirectInfo, RoomSnapshot, RoomSummary,
};

/// Inbound frame envelope: `{type, data?, ack?}`. Per-event validation turns
/// the loose `data` value into the strict [`ClientMessage`] variant before a
/// room ever sees it.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    #[serde(rename = "type")]
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub ack: Option<u64>,
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let frame: Self = serde_json::from_str(text)?;
        if frame.event.is_empty() {
            return Err(FrameError::MissingType);
        }
        Ok(frame)
    }
}

/// Ingress operations after per-event payload validation.
#[derive(Debug, Clone)]
pub enum ClientMessage {
    QuickJoin(QuickJoinPayload),
    CreateRoom(CreateRoomPayload),
    JoinRoom(JoinRoomPayload),
    LeaveRoom,
    ListRooms,
    PlayerSync(PlayerSyncPayload),
    ChatSend(ChatSendPayload),
    QuizStart,
    QuizStop,
    QuizNext,
    QuizPrev,
    QuizForceLock,
    QuizStateRequest,
    QuizConfigGet,
    QuizConfigSet(QuizConfigSetPayload),
    PortalLobbyOpen,
    PortalLobbyStart,
    PortalSetTarget(PortalSetTargetPayload),
    ClaimHost(ClaimHostPayload),
    KickPlayer(KickPlayerPayload),
    SetChatMuted(SetChatMutedPayload),
    BillboardMediaSet(BillboardMediaSetPayload),
}

fn payload<T: serde::de::DeserializeOwned>(
    event: &'static str,
    data: &Value,
) -> Result<T, FrameError> {
    // Absent payloads decode like `{}` so optional-field payloads stay
    // optional on the wire.
    let value = if data.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        data.clone()
    };
    serde_json::from_value(value).map_err(|source| FrameError::BadPayload { event, source })
}

impl ClientMessage {
    pub fn from_frame(frame: &ClientFrame) -> Result<Self, FrameError> {
        match frame.event.as_str() {
            "room:quick-join" => Ok(Self::QuickJoin(payload("room:quick-join", &frame.data)?)),
            "room:create" => Ok(Self::CreateRoom(payload("room:create", &frame.data)?)),
            "room:join" => Ok(Self::JoinRoom(payload("room:join", &frame.data)?)),
            "room:leave" => Ok(Self::LeaveRoom),
            "room:list" => Ok(Self::ListRooms),
            "player:sync" => Ok(Self::PlayerSync(payload("player:sync", &frame.data)?)),
            "chat:send" => Ok(Self::ChatSend(payload("chat:send", &frame.data)?)),
            "quiz:start" => Ok(Self::QuizStart),
            "quiz:stop" => Ok(Self::QuizStop),
            "quiz:next" => Ok(Self::QuizNext),
            "quiz:prev" => Ok(Self::QuizPrev),
            "quiz:force-lock" => Ok(Self::QuizForceLock),
            "quiz:state" => Ok(Self::QuizStateRequest),
            "quiz:config:get" => Ok(Self::QuizConfigGet),
            "quiz:config:set" => Ok(Self::QuizConfigSet(payload("quiz:config:set", &frame.data)?)),
            "portal:lobby-open" => Ok(Self::PortalLobbyOpen),
            "portal:lobby-start" => Ok(Self::PortalLobbyStart),
            "portal:set-target" => Ok(Self::PortalSetTarget(payload(
                "portal:set-target",
                &frame.data,
            )?)),
            "host:claim-host" => Ok(Self::ClaimHost(payload("host:claim-host", &frame.data)?)),
            "host:kick-player" => Ok(Self::KickPlayer(payload("host:kick-player", &frame.data)?)),
            "host:set-chat-muted" => Ok(Self::SetChatMuted(payload(
                "host:set-chat-muted",
                &frame.data,
            )?)),
            "billboard:media:set" => Ok(Self::BillboardMediaSet(payload(
                "billboard:media:set",
                &frame.data,
            )?)),
            other => Err(FrameError::UnknownEvent(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickJoinPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub room_code: Option<String>,
    #[serde(default)]
    pub owner_key: Option<String>,
    /// One-time routing token issued by a gateway redirect.
    #[serde(default)]
    pub route_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomPayload {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub persistent: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomPayload {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PlayerSyncPayload {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub pitch: f64,
    /// Client sprint flag; observed but not trusted.
    #[serde(default)]
    pub s: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSendPayload {
    #[serde(default)]
    pub name: Option<String>,
    pub text: String,
}

/// Raw question as submitted by a host before sanitization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuestion {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizConfigSetPayload {
    #[serde(default)]
    pub questions: Vec<RawQuestion>,
    #[serde(default)]
    pub lock_seconds: Option<f64>,
    #[serde(default)]
    pub auto_mode: Option<bool>,
    #[serde(default)]
    pub auto_finish: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSetTargetPayload {
    pub target_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimHostPayload {
    #[serde(default)]
    pub owner_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KickPlayerPayload {
    #[serde(default)]
    pub target_id: Option<PlayerId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetChatMutedPayload {
    #[serde(default)]
    pub target_id: Option<PlayerId>,
    pub muted: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillboardMediaSetPayload {
    /// Board selector, validated by the handler so unknown boards get a
    /// proper ack error instead of a dropped frame.
    pub target: String,
    pub media: BillboardChannel,
}

// ---------------------------------------------------------------------------
// Egress
// ---------------------------------------------------------------------------

/// Acknowledgement reply correlated to an inbound frame by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckPayload {
    pub id: u64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl AckPayload {
    pub fn ok(id: u64, extra: serde_json::Map<String, Value>) -> Self {
        Self {
            id,
            ok: true,
            error: None,
            extra,
        }
    }

    pub fn err(id: u64, error: &super::errors::AckError) -> Self {
        Self {
            id,
            ok: false,
            error: Some(error.as_str().to_string()),
            extra: serde_json::Map::new(),
        }
    }
}

/// One AOI delta row. Only fields that changed since the receiver's cached
/// snapshot are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaUpdate {
    pub id: PlayerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<[i32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<[i32; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerDeltaPayload {
    pub room: String,
    pub tick: u64,
    pub updates: Vec<DeltaUpdate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removes: Vec<PlayerId>,
}

/// Authoritative correction after a clamped `player:sync`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlayerCorrectPayload {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub pitch: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAutoCountdownPayload {
    pub starts_at: i64,
    pub delay_ms: u64,
    pub players: usize,
    pub min_players: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStartPayload {
    pub total_questions: usize,
    pub started_at: i64,
    pub lock_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestionPayload {
    /// 1-based question number as shown to players.
    pub index: usize,
    pub total: usize,
    pub id: String,
    pub text: String,
    pub lock_seconds: u32,
    pub lock_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EliminatedEntry {
    pub id: PlayerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice: Option<Answer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ChoiceReason>,
    pub x: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResultPayload {
    pub answer: Answer,
    /// 1-based question number this result belongs to.
    pub index: usize,
    pub survivor_count: usize,
    pub correct_player_ids: Vec<PlayerId>,
    pub eliminated_player_ids: Vec<PlayerId>,
    pub eliminated_players: Vec<EliminatedEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    pub alive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizScorePayload {
    pub active: bool,
    pub phase: QuizPhase,
    pub survivors: usize,
    pub question_index: i32,
    pub total_questions: usize,
    pub leaderboard: Vec<ScoreEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizEndPayload {
    pub reason: String,
    pub survivor_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<PlayerId>,
}

/// Question bank echo for host configuration UIs. Answers stay included:
/// only hosts receive this payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizConfigPayload {
    pub questions: Vec<QuestionConfigEntry>,
    pub lock_seconds: u32,
    pub auto_mode: bool,
    pub auto_finish: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionConfigEntry {
    pub id: String,
    pub text: String,
    pub answer: Answer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalLobbyAdmittedPayload {
    pub admitted_count: usize,
    pub spectator_count: usize,
    pub priority_players: usize,
    pub participant_limit: usize,
    pub countdown_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRolePayload {
    pub role: String,
    pub participant_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillboardUpdatePayload {
    pub target: BoardTarget,
    pub media: BillboardChannel,
}

/// Server → client events. The wire form is `{"type": <event>, "data": …}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "ack")]
    Ack(AckPayload),
    #[serde(rename = "room:update")]
    RoomUpdate(Box<RoomSnapshot>),
    #[serde(rename = "room:list")]
    RoomList { rooms: Vec<RoomSummary> },
    #[serde(rename = "player:delta")]
    PlayerDelta(PlayerDeltaPayload),
    #[serde(rename = "player:correct")]
    PlayerCorrect(PlayerCorrectPayload),
    #[serde(rename = "chat:message")]
    ChatMessage(ChatEntry),
    #[serde(rename = "chat:history")]
    ChatHistory { messages: Vec<ChatEntry> },
    #[serde(rename = "chat:blocked")]
    ChatBlocked { reason: String },
    #[serde(rename = "quiz:auto-countdown")]
    QuizAutoCountdown(QuizAutoCountdownPayload),
    #[serde(rename = "quiz:start")]
    QuizStart(QuizStartPayload),
    #[serde(rename = "quiz:question")]
    QuizQuestion(QuizQuestionPayload),
    #[serde(rename = "quiz:lock")]
    QuizLock { index: usize },
    #[serde(rename = "quiz:result")]
    QuizResult(Box<QuizResultPayload>),
    #[serde(rename = "quiz:score")]
    QuizScore(Box<QuizScorePayload>),
    #[serde(rename = "quiz:end")]
    QuizEnd(QuizEndPayload),
    #[serde(rename = "quiz:config")]
    QuizConfig(Box<QuizConfigPayload>),
    #[serde(rename = "portal:target:update")]
    PortalTargetUpdate {
        #[serde(rename = "targetUrl")]
        target_url: Option<String>,
    },
    #[serde(rename = "portal:lobby-admitted")]
    PortalLobbyAdmitted(PortalLobbyAdmittedPayload),
    #[serde(rename = "host:kicked")]
    HostKicked { reason: String },
    #[serde(rename = "host:chat-muted")]
    HostChatMuted { muted: bool },
    #[serde(rename = "auth:error")]
    AuthError { message: String },
    #[serde(rename = "server:role")]
    ServerRole(ServerRolePayload),
    #[serde(rename = "route:assign")]
    RouteAssign(RedirectInfo),
    #[serde(rename = "billboard:media:update")]
    BillboardMediaUpdate(BillboardUpdatePayload),
}

impl ServerMessage {
    /// Deltas may be shed under backpressure; everything else is
    /// state-changing and must not be silently dropped.
    pub fn is_droppable(&self) -> bool {
        matches!(self, Self::PlayerDelta(_))
    }

    /// Event name as it appears in the `type` field.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Ack(_) => "ack",
            Self::RoomUpdate(_) => "room:update",
            Self::RoomList { .. } => "room:list",
            Self::PlayerDelta(_) => "player:delta",
            Self::PlayerCorrect(_) => "player:correct",
            Self::ChatMessage(_) => "chat:message",
            Self::ChatHistory { .. } => "chat:history",
            Self::ChatBlocked { .. } => "chat:blocked",
            Self::QuizAutoCountdown(_) => "quiz:auto-countdown",
            Self::QuizStart(_) => "quiz:start",
            Self::QuizQuestion(_) => "quiz:question",
            Self::QuizLock { .. } => "quiz:lock",
            Self::QuizResult(_) => "quiz:result",
            Self::QuizScore(_) => "quiz:score",
            Self::QuizEnd(_) => "quiz:end",
            Self::QuizConfig(_) => "quiz:config",
            Self::PortalTargetUpdate { .. } => "portal:target:update",
            Self::PortalLobbyAdmitted(_) => "portal:lobby-admitted",
            Self::HostKicked { .. } => "host:kicked",
            Self::HostChatMuted { .. } => "host:chat-muted",
            Self::AuthError { .. } => "auth:error",
            Self::ServerRole(_) => "server:role",
            Self::RouteAssign(_) => "route:assign",
            Self::BillboardMediaUpdate(_) => "billboard:media:update",
        }
    }
}
