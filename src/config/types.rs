//! Root configuration struct.

use super::defaults::{default_cors_origin, default_port};
use super::gateway::GatewayConfig;
use super::logging::LoggingConfig;
use super::movement::MovementConfig;
use super::quiz::{GateTuning, QuizTuning};
use super::server::{AoiConfig, ServerTuning};
use serde::{Deserialize, Serialize};

/// Service name advertised on `/health`; the port-in-use probe compares
/// against this to recognize an already-running compatible instance.
pub const SERVICE_NAME: &str = "ox-arena-server";

/// Complete server configuration, assembled by the loader from defaults and
/// environment variables.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// HTTP + WebSocket listener port (`PORT`)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Comma-separated CORS allowlist; `*` or empty allows all (`CORS_ORIGIN`)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Shared secret for owner-token validation (`OWNER_KEY`)
    #[serde(default, skip_serializing)]
    pub owner_key: Option<String>,
    #[serde(default)]
    pub server: ServerTuning,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub quiz: QuizTuning,
    #[serde(default)]
    pub gate: GateTuning,
    #[serde(default)]
    pub aoi: AoiConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            cors_origin: default_cors_origin(),
            owner_key: None,
            server: ServerTuning::default(),
            movement: MovementConfig::default(),
            quiz: QuizTuning::default(),
            gate: GateTuning::default(),
            aoi: AoiConfig::default(),
            gateway: GatewayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
