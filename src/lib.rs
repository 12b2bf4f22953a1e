#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # OX Arena Server
//!
//! Authoritative realtime WebSocket server for a multiplayer OX-quiz arena:
//! bounded rooms, clamped movement, distance-tiered delta broadcasts, a
//! host-driven quiz where your zone is your answer, and an admission gate
//! in front of the participant pool.

/// Area-of-interest delta encoding and per-receiver caches
pub mod aoi;

/// Server configuration and environment variables
pub mod config;

/// Gateway→worker routing and one-time tokens
pub mod gateway;

/// Structured logging configuration
pub mod logging;

/// Authoritative movement validation
pub mod movement;

/// Wire protocol: frames, messages, validation, room codes
pub mod protocol;

/// Quiz engine: questions, zones, state machine
pub mod quiz;

/// Room and player state, entry gate
pub mod room;

/// Main server orchestration
pub mod server;

/// WebSocket connection handling
pub mod websocket;
