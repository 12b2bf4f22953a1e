// WebSocket transport: axum router, upgrade handler, socket loop.

pub mod connection;
pub mod handler;
pub mod routes;

pub use routes::create_router;
