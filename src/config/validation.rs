//! Configuration validation.

use super::Config;

/// Validate a loaded configuration before the server starts. Returns a
/// multi-line description of every violation found.
pub fn validate_config(config: &Config) -> Result<(), String> {
    let mut problems = Vec::new();

    if config.server.participant_limit == 0 {
        problems.push("server.participant_limit must be at least 1".to_string());
    }
    if config.server.participant_limit > config.server.room_capacity {
        problems.push(format!(
            "server.participant_limit ({}) exceeds server.room_capacity ({})",
            config.server.participant_limit, config.server.room_capacity
        ));
    }
    if config.server.max_active_rooms == 0 {
        problems.push("server.max_active_rooms must be at least 1".to_string());
    }
    if config.server.tick_rate_hz == 0 || config.server.tick_rate_hz > 33 {
        problems.push(format!(
            "server.tick_rate_hz ({}) must be in 1..=33 to keep the tick interval >= 30 ms",
            config.server.tick_rate_hz
        ));
    }
    if config.quiz.min_lock_seconds > config.quiz.max_lock_seconds {
        problems.push("quiz.min_lock_seconds exceeds quiz.max_lock_seconds".to_string());
    }
    if config.quiz.lock_seconds < config.quiz.min_lock_seconds
        || config.quiz.lock_seconds > config.quiz.max_lock_seconds
    {
        problems.push(format!(
            "quiz.lock_seconds ({}) outside {}..={}",
            config.quiz.lock_seconds, config.quiz.min_lock_seconds, config.quiz.max_lock_seconds
        ));
    }
    if let (Some(base), Some(max)) = (
        config.gateway.worker_port_base,
        config.gateway.worker_port_max,
    ) {
        if base > max {
            problems.push(format!(
                "WORKER_PORT_BASE ({base}) exceeds WORKER_PORT_MAX ({max})"
            ));
        }
    }
    if config.movement.min_dt <= 0.0 || config.movement.min_dt >= config.movement.max_dt {
        problems.push("movement dt clamp must satisfy 0 < min_dt < max_dt".to_string());
    }
    if !(config.aoi.near < config.aoi.mid && config.aoi.mid < config.aoi.far) {
        problems.push("aoi distance tiers must be strictly increasing".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn participant_limit_must_fit_capacity() {
        let mut config = Config::default();
        config.server.participant_limit = 200;
        let err = validate_config(&config).unwrap_err();
        assert!(err.contains("participant_limit"));
    }

    #[test]
    fn tick_rate_bounds_enforced() {
        let mut config = Config::default();
        config.server.tick_rate_hz = 60;
        assert!(validate_config(&config).is_err());
        config.server.tick_rate_hz = 33;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn inverted_worker_pool_rejected() {
        let mut config = Config::default();
        config.gateway.worker_port_base = Some(5000);
        config.gateway.worker_port_max = Some(4000);
        assert!(validate_config(&config).is_err());
    }
}
