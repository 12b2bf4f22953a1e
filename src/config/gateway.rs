//! Gateway worker pool configuration.

use super::defaults::default_route_token_ttl_ms;
use serde::{Deserialize, Serialize};

/// Worker pool bounds and routing-token policy for the optional gateway tier.
/// The gateway is enabled by the `--gateway` flag; these settings only shape
/// its behavior once enabled.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GatewayConfig {
    /// Lowest worker port (inclusive); from `WORKER_PORT_BASE`
    #[serde(default)]
    pub worker_port_base: Option<u16>,
    /// Highest worker port (inclusive); from `WORKER_PORT_MAX`
    #[serde(default)]
    pub worker_port_max: Option<u16>,
    /// Routing token time-to-live
    #[serde(default = "default_route_token_ttl_ms")]
    pub route_token_ttl_ms: u64,
}

impl GatewayConfig {
    /// Worker port pool, when both bounds are configured and sane.
    pub fn port_pool(&self) -> Option<std::ops::RangeInclusive<u16>> {
        match (self.worker_port_base, self.worker_port_max) {
            (Some(base), Some(max)) if base <= max => Some(base..=max),
            _ => None,
        }
    }
}
