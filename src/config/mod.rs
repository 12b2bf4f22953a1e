//! Configuration module.
//!
//! Per-concern tuning types with serde defaults, an environment-driven
//! loader, and a validation pass run at startup.

pub mod defaults;
pub mod gateway;
pub mod loader;
pub mod logging;
pub mod movement;
pub mod quiz;
pub mod server;
pub mod types;
pub mod validation;

pub use gateway::GatewayConfig;
pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use movement::MovementConfig;
pub use quiz::{GateTuning, QuizTuning};
pub use server::{AoiConfig, ServerTuning};
pub use types::{Config, SERVICE_NAME};
pub use validation::validate_config;
