// Protocol module: frame envelope, message types, validation, room codes.

pub mod errors;
pub mod messages;
pub mod room_codes;
pub mod types;
pub mod validation;

pub use errors::{AckError, FrameError, RouteTokenError};

pub use messages::{
    AckPayload, BillboardMediaSetPayload, BillboardUpdatePayload, ChatSendPayload, ClaimHostPayload,
    ClientFrame, ClientMessage, CreateRoomPayload, DeltaUpdate, EliminatedEntry, JoinRoomPayload,
    KickPlayerPayload, PlayerCorrectPayload, PlayerDeltaPayload, PlayerSyncPayload,
    PortalLobbyAdmittedPayload, PortalSetTargetPayload, QuestionConfigEntry, QuickJoinPayload,
    QuizAutoCountdownPayload, QuizConfigPayload, QuizConfigSetPayload, QuizEndPayload,
    QuizQuestionPayload, QuizResultPayload, QuizScorePayload, QuizStartPayload, RawQuestion,
    ScoreEntry, ServerMessage, ServerRolePayload, SetChatMutedPayload,
};

pub use types::{
    Answer, BillboardChannel, BillboardMedia, BoardTarget, ChatEntry, ChoiceReason, GatePublic,
    PlayerId, PlayerPose, PlayerPublic, QuizPhase, QuizPublic, RedirectInfo, RoomSnapshot,
    RoomSummary, VisualType,
};
