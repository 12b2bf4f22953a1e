//! Default value functions referenced by serde attributes and `Default` impls.

use super::logging::LogFormat;

// Network
pub fn default_port() -> u16 {
    3001
}
pub fn default_cors_origin() -> String {
    "*".to_string()
}

// Rooms
pub fn default_participant_limit() -> usize {
    50
}
pub fn default_room_capacity() -> usize {
    120
}
pub fn default_max_active_rooms() -> usize {
    128
}
pub fn default_room_code_prefix() -> String {
    "OX-".to_string()
}
pub fn default_chat_history_len() -> usize {
    32
}
pub fn default_outbound_queue_len() -> usize {
    256
}

// Tick
pub fn default_tick_rate_hz() -> u32 {
    20
}

// Movement validator
pub fn default_move_v_max() -> f64 {
    17.5
}
pub fn default_move_v_y_max() -> f64 {
    24.0
}
pub fn default_move_a_max() -> f64 {
    46.0
}
pub fn default_move_margin() -> f64 {
    0.4
}
pub fn default_move_teleport_cap() -> f64 {
    18.0
}
pub fn default_move_min_dt() -> f64 {
    1.0 / 120.0
}
pub fn default_move_max_dt() -> f64 {
    0.25
}
pub fn default_move_accel_smoothing() -> f64 {
    1.8
}
pub fn default_correction_min_dist() -> f64 {
    0.08
}
pub fn default_correction_cooldown_ms() -> u64 {
    90
}

// AOI
pub fn default_aoi_near() -> f64 {
    42.0
}
pub fn default_aoi_mid() -> f64 {
    82.0
}
pub fn default_aoi_far() -> f64 {
    128.0
}
pub fn default_heartbeat_ticks() -> u64 {
    20
}

// Quiz
pub fn default_lock_seconds() -> u32 {
    15
}
pub fn default_min_lock_seconds() -> u32 {
    3
}
pub fn default_max_lock_seconds() -> u32 {
    60
}
pub fn default_prepare_delay_ms() -> u64 {
    3200
}
pub fn default_next_delay_ms() -> u64 {
    3200
}
pub fn default_min_next_delay_ms() -> u64 {
    1200
}
pub fn default_auto_start_delay_ms() -> u64 {
    2000
}
pub fn default_auto_restart_delay_ms() -> u64 {
    9000
}
pub fn default_quiz_min_players() -> usize {
    1
}
pub fn default_max_questions() -> usize {
    50
}

// Entry gate
pub fn default_admission_countdown_ms() -> u64 {
    5000
}

// Gateway
pub fn default_route_token_ttl_ms() -> u64 {
    10_000
}

// Logging
pub fn default_log_dir() -> String {
    "logs".to_string()
}
pub fn default_log_filename() -> String {
    "server.log".to_string()
}
pub fn default_rotation() -> String {
    "daily".to_string()
}
pub fn default_enable_file_logging() -> bool {
    false
}
pub fn default_log_format() -> LogFormat {
    LogFormat::Text
}
