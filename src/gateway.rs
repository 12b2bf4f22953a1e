//! Gateway→worker routing.
//!
//! The optional gateway tier accepts initial connections and redirects each
//! `room:quick-join` to a room-owning worker process: the room code hashes
//! consistently onto a port in `[WORKER_PORT_BASE, WORKER_PORT_MAX]`, the
//! worker is spawned on demand, and the client reconnects there with a
//! one-time HMAC-signed routing token that the worker validates before
//! admitting.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use dashmap::DashMap;
use getrandom::fill as fill_random;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::config::Config;
use crate::protocol::errors::{AckError, RouteTokenError};
use crate::protocol::types::RedirectInfo;

type HmacSha256 = Hmac<Sha256>;

/// Environment variable carrying the shared routing secret to spawned
/// workers.
pub const ROUTE_SECRET_ENV: &str = "OX_ROUTE_SECRET";

/// Environment variable telling a worker to demand routing tokens.
pub const REQUIRE_ROUTE_TOKEN_ENV: &str = "OX_REQUIRE_ROUTE_TOKEN";

/// Derive the routing secret: explicit `OX_ROUTE_SECRET`, else a derivation
/// of `OWNER_KEY`, else process-local randomness (single-process setups).
fn routing_secret(config: &Config) -> Vec<u8> {
    if let Ok(raw) = std::env::var(ROUTE_SECRET_ENV) {
        if let Ok(bytes) = URL_SAFE_NO_PAD.decode(raw.trim()) {
            if !bytes.is_empty() {
                return bytes;
            }
        }
        tracing::warn!("ignoring malformed {ROUTE_SECRET_ENV}");
    }
    if let Some(owner_key) = config.owner_key.as_deref() {
        let mut hasher = Sha256::new();
        hasher.update(b"ox-arena-route:");
        hasher.update(owner_key.as_bytes());
        return hasher.finalize().to_vec();
    }
    // Process-local secret: tokens only validate inside this process, which
    // is the single-process setup where no worker spawning happens anyway.
    let mut seed = [0u8; 32];
    if fill_random(&mut seed).is_err() {
        tracing::warn!("no entropy source; deriving routing secret from process identity");
        let mut hasher = Sha256::new();
        hasher.update(std::process::id().to_le_bytes());
        hasher.update(
            Utc::now()
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_le_bytes(),
        );
        return hasher.finalize().to_vec();
    }
    seed.to_vec()
}

fn sign(secret: &[u8], payload: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    Some(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Build a one-time routing token for a room code.
fn build_token(secret: &[u8], room_code: &str) -> Option<String> {
    let mut nonce = [0u8; 16];
    fill_random(&mut nonce).ok()?;
    let payload = format!(
        "{room_code}|{}|{}",
        Utc::now().timestamp_millis(),
        URL_SAFE_NO_PAD.encode(nonce)
    );
    let mac = sign(secret, &payload)?;
    Some(format!("{}.{mac}", URL_SAFE_NO_PAD.encode(&payload)))
}

/// Worker-side routing token validation: MAC, TTL, and single use.
pub struct RouteTokenValidator {
    secret: Vec<u8>,
    ttl_ms: i64,
    seen_nonces: DashMap<String, i64>,
}

impl RouteTokenValidator {
    pub fn new(config: &Config) -> Self {
        Self {
            secret: routing_secret(config),
            ttl_ms: i64::try_from(config.gateway.route_token_ttl_ms).unwrap_or(10_000),
            seen_nonces: DashMap::new(),
        }
    }

    /// Validate a token and return the room code it was issued for.
    pub fn validate(&self, token: &str) -> Result<String, RouteTokenError> {
        let (payload_b64, mac_b64) = token.split_once('.').ok_or(RouteTokenError::Malformed)?;
        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| RouteTokenError::Malformed)?;
        let payload = String::from_utf8(payload_bytes).map_err(|_| RouteTokenError::Malformed)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| RouteTokenError::BadSignature)?;
        mac.update(payload.as_bytes());
        let mac_bytes = URL_SAFE_NO_PAD
            .decode(mac_b64)
            .map_err(|_| RouteTokenError::Malformed)?;
        mac.verify_slice(&mac_bytes)
            .map_err(|_| RouteTokenError::BadSignature)?;

        let mut parts = payload.splitn(3, '|');
        let room_code = parts.next().ok_or(RouteTokenError::Malformed)?.to_string();
        let issued_ms: i64 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or(RouteTokenError::Malformed)?;
        let nonce = parts.next().ok_or(RouteTokenError::Malformed)?.to_string();

        let now = Utc::now().timestamp_millis();
        if now.saturating_sub(issued_ms) > self.ttl_ms || issued_ms > now + self.ttl_ms {
            return Err(RouteTokenError::Expired);
        }

        self.prune(now);
        if self.seen_nonces.insert(nonce, now).is_some() {
            return Err(RouteTokenError::Replayed);
        }
        Ok(room_code)
    }

    fn prune(&self, now: i64) {
        let horizon = self.ttl_ms.saturating_mul(2);
        self.seen_nonces
            .retain(|_, issued| now.saturating_sub(*issued) <= horizon);
    }
}

/// Gateway-side worker pool and token issuance.
pub struct GatewayState {
    secret: Vec<u8>,
    ttl_ms: u64,
    port_pool: Option<std::ops::RangeInclusive<u16>>,
    public_host: String,
    workers: DashMap<u16, WorkerHandle>,
    draining: AtomicBool,
    /// When false (tests), ports are assigned but no process is spawned.
    spawn_processes: bool,
}

struct WorkerHandle {
    child: Mutex<Option<tokio::process::Child>>,
}

impl GatewayState {
    pub fn new(config: &Config) -> Self {
        Self {
            secret: routing_secret(config),
            ttl_ms: config.gateway.route_token_ttl_ms,
            port_pool: config.gateway.port_pool(),
            public_host: std::env::var("OX_PUBLIC_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            workers: DashMap::new(),
            draining: AtomicBool::new(false),
            spawn_processes: true,
        }
    }

    #[cfg(test)]
    pub(crate) fn new_without_spawning(config: &Config) -> Self {
        let mut state = Self::new(config);
        state.spawn_processes = false;
        state
    }

    pub fn set_draining(&self, draining: bool) {
        self.draining.store(draining, Ordering::Relaxed);
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Relaxed)
    }

    /// Consistent room-code → worker-port mapping, stable across restarts.
    pub fn select_port(&self, room_code: &str) -> Option<u16> {
        let pool = self.port_pool.clone()?;
        let span = u64::from(*pool.end() - *pool.start()) + 1;
        let digest = Sha256::digest(room_code.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let hash = u64::from_be_bytes(prefix);
        Some(pool.start() + u16::try_from(hash % span).unwrap_or(0))
    }

    /// Resolve a quick-join to a redirect: pick the worker port, spawn the
    /// worker if it is not running yet, and issue a one-time token.
    pub fn issue_redirect(&self, room_code: &str) -> Result<RedirectInfo, AckError> {
        if self.is_draining() {
            return Err(AckError::GatewayDraining);
        }
        let port = self.select_port(room_code).ok_or(AckError::NoRoomCapacity)?;
        self.ensure_worker(port)?;
        let token = build_token(&self.secret, room_code).ok_or(AckError::RedirectBuildFailed)?;
        Ok(RedirectInfo {
            endpoint: format!("ws://{}:{port}/ws", self.public_host),
            token,
            room_code: room_code.to_string(),
        })
    }

    fn ensure_worker(&self, port: u16) -> Result<(), AckError> {
        if self.workers.contains_key(&port) {
            return Ok(());
        }
        if !self.spawn_processes {
            self.workers.insert(
                port,
                WorkerHandle {
                    child: Mutex::new(None),
                },
            );
            return Ok(());
        }

        let exe = std::env::current_exe().map_err(|err| {
            tracing::error!(error = %err, "cannot locate own binary for worker spawn");
            AckError::RedirectBuildFailed
        })?;
        let child = tokio::process::Command::new(exe)
            .arg("--port")
            .arg(port.to_string())
            .env(REQUIRE_ROUTE_TOKEN_ENV, "1")
            .env(ROUTE_SECRET_ENV, URL_SAFE_NO_PAD.encode(&self.secret))
            .spawn()
            .map_err(|err| {
                tracing::error!(%port, error = %err, "failed to spawn worker");
                AckError::RedirectBuildFailed
            })?;
        tracing::info!(%port, pid = child.id(), "spawned room worker");
        self.workers.insert(
            port,
            WorkerHandle {
                child: Mutex::new(Some(child)),
            },
        );
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// TTL the gateway stamps into issued tokens, for status reporting.
    pub fn token_ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// Kill every spawned worker; used on gateway shutdown.
    pub async fn shutdown_workers(&self) {
        let mut children = Vec::new();
        for entry in self.workers.iter() {
            if let Ok(mut slot) = entry.child.lock() {
                if let Some(child) = slot.take() {
                    children.push((*entry.key(), child));
                }
            }
        }
        for (port, mut child) in children {
            if let Err(err) = child.kill().await {
                tracing::warn!(%port, error = %err, "failed to stop worker");
            }
        }
    }
}
