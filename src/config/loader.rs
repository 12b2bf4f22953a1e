//! Configuration loading from environment variables.

use super::logging::{LogFormat, LogLevel};
use super::Config;
use std::env;

/// Load configuration: compiled defaults overridden by environment
/// variables. Unparseable values are reported to stderr and ignored so a
/// typo never silently changes behavior to something surprising.
///
/// Recognized variables: `PORT`, `CORS_ORIGIN`, `OWNER_KEY`,
/// `WORKER_PORT_BASE`, `WORKER_PORT_MAX`, plus `OX_`-prefixed tuning
/// overrides (`OX_PARTICIPANT_LIMIT`, `OX_ROOM_CAPACITY`,
/// `OX_MAX_ACTIVE_ROOMS`, `OX_TICK_RATE`, `OX_LOG_LEVEL`, `OX_LOG_FORMAT`,
/// `OX_LOG_DIR`, `OX_FILE_LOGGING`).
#[must_use]
pub fn load() -> Config {
    load_from(|key| env::var(key).ok())
}

/// Testable variant taking an environment lookup function.
pub fn load_from<F>(var: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = Config::default();

    if let Some(port) = parse_var(&var, "PORT") {
        config.port = port;
    }
    if let Some(origins) = var("CORS_ORIGIN") {
        config.cors_origin = origins;
    }
    if let Some(key) = var("OWNER_KEY") {
        let key = key.trim().to_string();
        if !key.is_empty() {
            config.owner_key = Some(key);
        }
    }
    config.gateway.worker_port_base = parse_var(&var, "WORKER_PORT_BASE");
    config.gateway.worker_port_max = parse_var(&var, "WORKER_PORT_MAX");

    if let Some(limit) = parse_var(&var, "OX_PARTICIPANT_LIMIT") {
        config.server.participant_limit = limit;
    }
    if let Some(capacity) = parse_var(&var, "OX_ROOM_CAPACITY") {
        config.server.room_capacity = capacity;
    }
    if let Some(rooms) = parse_var(&var, "OX_MAX_ACTIVE_ROOMS") {
        config.server.max_active_rooms = rooms;
    }
    if let Some(rate) = parse_var(&var, "OX_TICK_RATE") {
        config.server.tick_rate_hz = rate;
    }
    if let Some(level) = var("OX_LOG_LEVEL") {
        match LogLevel::parse(&level) {
            Some(parsed) => config.logging.level = Some(parsed),
            None => eprintln!("Invalid OX_LOG_LEVEL '{level}', using default"),
        }
    }
    if let Some(format) = var("OX_LOG_FORMAT") {
        match format.trim().to_lowercase().as_str() {
            "json" => config.logging.format = LogFormat::Json,
            "text" => config.logging.format = LogFormat::Text,
            other => eprintln!("Invalid OX_LOG_FORMAT '{other}', using default"),
        }
    }
    if let Some(dir) = var("OX_LOG_DIR") {
        config.logging.dir = dir;
    }
    if let Some(enabled) = var("OX_FILE_LOGGING") {
        config.logging.enable_file_logging =
            matches!(enabled.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
    }

    config
}

fn parse_var<F, T>(var: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var(key)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(value) => Some(value),
        Err(err) => {
            eprintln!("Invalid {key}='{trimmed}': {err}; using default");
            None
        }
    }
}
