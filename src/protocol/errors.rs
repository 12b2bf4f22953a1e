use serde::Serialize;

/// Errors surfaced to clients on acknowledgement replies.
///
/// The `Display` form of each variant is the exact wire string clients map to
/// user-facing text, so variants must never change their message without a
/// protocol version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AckError {
    // Connectivity / auth
    #[error("auth failed")]
    AuthFailed,
    #[error("gateway draining")]
    GatewayDraining,
    #[error("redirect build failed")]
    RedirectBuildFailed,
    #[error("no room capacity available")]
    NoRoomCapacity,

    // Routing
    #[error("room not found")]
    RoomNotFound,
    #[error("room code required")]
    RoomCodeRequired,
    #[error("room already exists")]
    RoomAlreadyExists,
    #[error("room limit reached")]
    RoomLimitReached,
    #[error("room is full")]
    RoomFull,
    #[error("not in a room")]
    NotInRoom,

    // Quiz
    #[error("quiz is not active")]
    QuizNotActive,
    #[error("quiz already active")]
    QuizAlreadyActive,
    #[error("question is not open")]
    QuestionNotOpen,
    #[error("question is already open")]
    QuestionAlreadyOpen,
    #[error("no previous question")]
    NoPreviousQuestion,
    #[error("no more questions")]
    NoMoreQuestions,
    #[error("no playable players")]
    NoPlayablePlayers,
    #[error("players waiting admission")]
    PlayersWaitingAdmission,
    #[error("invalid question config")]
    InvalidQuestionConfig,

    // Entry gate
    #[error("lobby already open")]
    LobbyAlreadyOpen,
    #[error("lobby not open")]
    LobbyNotOpen,
    #[error("admission already in progress")]
    AdmissionInProgress,
    #[error("no waiting players")]
    NoWaitingPlayers,

    // Moderation
    #[error("host only")]
    HostOnly,
    #[error("unauthorized")]
    Unauthorized,
    #[error("player not found")]
    PlayerNotFound,
    #[error("target required")]
    TargetRequired,
    #[error("cannot target self")]
    CannotTargetSelf,
    #[error("chat muted")]
    ChatMuted,
    #[error("empty message")]
    EmptyMessage,

    // Validation
    #[error("invalid portal target")]
    InvalidPortalTarget,
    #[error("invalid billboard target")]
    InvalidBillboardTarget,
    #[error("invalid billboard media")]
    InvalidBillboardMedia,
}

impl AckError {
    /// The wire string carried in the ack `error` field.
    pub fn as_str(self) -> &'static str {
        // thiserror renders the same strings; keeping a const-capable
        // accessor avoids allocating through `to_string` on the hot path.
        match self {
            Self::AuthFailed => "auth failed",
            Self::GatewayDraining => "gateway draining",
            Self::RedirectBuildFailed => "redirect build failed",
            Self::NoRoomCapacity => "no room capacity available",
            Self::RoomNotFound => "room not found",
            Self::RoomCodeRequired => "room code required",
            Self::RoomAlreadyExists => "room already exists",
            Self::RoomLimitReached => "room limit reached",
            Self::RoomFull => "room is full",
            Self::NotInRoom => "not in a room",
            Self::QuizNotActive => "quiz is not active",
            Self::QuizAlreadyActive => "quiz already active",
            Self::QuestionNotOpen => "question is not open",
            Self::QuestionAlreadyOpen => "question is already open",
            Self::NoPreviousQuestion => "no previous question",
            Self::NoMoreQuestions => "no more questions",
            Self::NoPlayablePlayers => "no playable players",
            Self::PlayersWaitingAdmission => "players waiting admission",
            Self::InvalidQuestionConfig => "invalid question config",
            Self::LobbyAlreadyOpen => "lobby already open",
            Self::LobbyNotOpen => "lobby not open",
            Self::AdmissionInProgress => "admission already in progress",
            Self::NoWaitingPlayers => "no waiting players",
            Self::HostOnly => "host only",
            Self::Unauthorized => "unauthorized",
            Self::PlayerNotFound => "player not found",
            Self::TargetRequired => "target required",
            Self::CannotTargetSelf => "cannot target self",
            Self::ChatMuted => "chat muted",
            Self::EmptyMessage => "empty message",
            Self::InvalidPortalTarget => "invalid portal target",
            Self::InvalidBillboardTarget => "invalid billboard target",
            Self::InvalidBillboardMedia => "invalid billboard media",
        }
    }
}

impl Serialize for AckError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Errors produced while decoding an inbound frame. These are logged and the
/// offending frame is dropped; they never tear down the room.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    BadJson(#[from] serde_json::Error),
    #[error("frame has no event type")]
    MissingType,
    #[error("unknown event type: {0}")]
    UnknownEvent(String),
    #[error("invalid payload for {event}: {source}")]
    BadPayload {
        event: &'static str,
        source: serde_json::Error,
    },
}

impl FrameError {
    pub fn event_name(&self) -> Option<&str> {
        match self {
            Self::UnknownEvent(name) => Some(name),
            Self::BadPayload { event, .. } => Some(event),
            _ => None,
        }
    }
}

/// Routing-token validation failures on the worker side of a gateway redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RouteTokenError {
    #[error("routing token is malformed")]
    Malformed,
    #[error("routing token signature mismatch")]
    BadSignature,
    #[error("routing token expired")]
    Expired,
    #[error("routing token already used")]
    Replayed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_error_strings_match_display() {
        let all = [
            AckError::AuthFailed,
            AckError::GatewayDraining,
            AckError::RedirectBuildFailed,
            AckError::NoRoomCapacity,
            AckError::RoomNotFound,
            AckError::RoomCodeRequired,
            AckError::RoomAlreadyExists,
            AckError::RoomLimitReached,
            AckError::RoomFull,
            AckError::NotInRoom,
            AckError::QuizNotActive,
            AckError::QuizAlreadyActive,
            AckError::QuestionNotOpen,
            AckError::QuestionAlreadyOpen,
            AckError::NoPreviousQuestion,
            AckError::NoMoreQuestions,
            AckError::NoPlayablePlayers,
            AckError::PlayersWaitingAdmission,
            AckError::InvalidQuestionConfig,
            AckError::LobbyAlreadyOpen,
            AckError::LobbyNotOpen,
            AckError::AdmissionInProgress,
            AckError::NoWaitingPlayers,
            AckError::HostOnly,
            AckError::Unauthorized,
            AckError::PlayerNotFound,
            AckError::TargetRequired,
            AckError::CannotTargetSelf,
            AckError::ChatMuted,
            AckError::EmptyMessage,
            AckError::InvalidPortalTarget,
            AckError::InvalidBillboardTarget,
            AckError::InvalidBillboardMedia,
        ];
        for err in all {
            assert_eq!(err.as_str(), err.to_string());
            assert!(!err.as_str().is_empty());
        }
    }

    #[test]
    fn ack_error_serializes_as_wire_string() {
        let json = serde_json::to_string(&AckError::RoomFull).unwrap();
        assert_eq!(json, "\"room is full\"");
    }
}
