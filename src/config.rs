use crate::game::constants::{broadcast, capture, tick};
use crate::game::systems::hill::CaptureRates;

/// Invalid KOTH configuration
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be a positive, finite rate")]
    InvalidRate(&'static str),
    #[error("ms_per_point must be at least 1")]
    ZeroPointInterval,
    #[error("max_frame_dt_ms must be 1-{max}, got {value}")]
    FrameDeltaOutOfRange { value: u32, max: u32 },
}

/// KOTH rules and replication settings
#[derive(Debug, Clone, PartialEq)]
pub struct KothConfig {
    /// Capture progress gained per second while one team pushes (percent)
    pub grow_rate: f32,
    /// Progress lost per second while the owner alone defends (percent)
    pub drain_defended_rate: f32,
    /// Progress lost per second on an empty hill (percent)
    pub drain_empty_rate: f32,
    /// Uncontested holding time per team point
    pub ms_per_point: u32,
    /// Personal points for each player on the hill when it flips
    pub capture_bonus: u32,
    /// Full resync interval, 0 disables the heartbeat
    pub heartbeat_interval_ms: u32,
    /// Round ends once a team reaches this score, 0 for no limit
    pub score_limit: u32,
    /// Upper bound on a single frame delta
    pub max_frame_dt_ms: u32,
    /// Level definition file, built-in demo level when unset
    pub level_path: Option<String>,
}

impl Default for KothConfig {
    fn default() -> Self {
        Self {
            grow_rate: capture::DEFAULT_GROW_RATE,
            drain_defended_rate: capture::DEFAULT_DRAIN_DEFENDED_RATE,
            drain_empty_rate: capture::DEFAULT_DRAIN_EMPTY_RATE,
            ms_per_point: capture::DEFAULT_MS_PER_POINT,
            capture_bonus: capture::DEFAULT_CAPTURE_BONUS,
            heartbeat_interval_ms: broadcast::DEFAULT_HEARTBEAT_INTERVAL_MS,
            score_limit: 0,
            max_frame_dt_ms: tick::MAX_DT_MS,
            level_path: None,
        }
    }
}

fn parse_rate(var: &str) -> Option<f32> {
    let value = std::env::var(var).ok()?;
    match value.parse::<f32>() {
        Ok(parsed) if parsed.is_finite() && parsed > 0.0 => Some(parsed),
        _ => {
            tracing::warn!("Invalid {} '{}', using default", var, value);
            None
        }
    }
}

fn parse_u32(var: &str) -> Option<u32> {
    let value = std::env::var(var).ok()?;
    match value.parse::<u32>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", var, value);
            None
        }
    }
}

impl KothConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Some(rate) = parse_rate("KOTH_GROW_RATE") {
            config.grow_rate = rate;
        }
        if let Some(rate) = parse_rate("KOTH_DRAIN_DEFENDED_RATE") {
            config.drain_defended_rate = rate;
        }
        if let Some(rate) = parse_rate("KOTH_DRAIN_EMPTY_RATE") {
            config.drain_empty_rate = rate;
        }

        if let Some(ms) = parse_u32("KOTH_MS_PER_POINT") {
            if ms > 0 {
                config.ms_per_point = ms;
            } else {
                tracing::warn!("KOTH_MS_PER_POINT must be > 0, using default");
            }
        }

        if let Some(bonus) = parse_u32("KOTH_CAPTURE_BONUS") {
            config.capture_bonus = bonus;
        }
        if let Some(ms) = parse_u32("KOTH_HEARTBEAT_MS") {
            config.heartbeat_interval_ms = ms;
        }
        if let Some(limit) = parse_u32("KOTH_SCORE_LIMIT") {
            config.score_limit = limit;
        }

        if let Some(ms) = parse_u32("KOTH_MAX_FRAME_DT_MS") {
            if ms > 0 && ms <= tick::MAX_DT_MS {
                config.max_frame_dt_ms = ms;
            } else {
                tracing::warn!("KOTH_MAX_FRAME_DT_MS must be 1-{}, using default", tick::MAX_DT_MS);
            }
        }

        if let Ok(path) = std::env::var("KOTH_LEVEL_PATH") {
            config.level_path = Some(path);
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rates = [
            ("grow_rate", self.grow_rate),
            ("drain_defended_rate", self.drain_defended_rate),
            ("drain_empty_rate", self.drain_empty_rate),
        ];
        for (name, rate) in rates {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(ConfigError::InvalidRate(name));
            }
        }
        if self.ms_per_point == 0 {
            return Err(ConfigError::ZeroPointInterval);
        }
        if self.max_frame_dt_ms == 0 || self.max_frame_dt_ms > tick::MAX_DT_MS {
            return Err(ConfigError::FrameDeltaOutOfRange {
                value: self.max_frame_dt_ms,
                max: tick::MAX_DT_MS,
            });
        }
        Ok(())
    }

    /// Fixed-point rates for the hill state machine
    pub fn rates(&self) -> CaptureRates {
        CaptureRates::from_percent(
            self.grow_rate,
            self.drain_defended_rate,
            self.drain_empty_rate,
            self.ms_per_point,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KothConfig::default();
        assert_eq!(config.grow_rate, 10.0);
        assert_eq!(config.ms_per_point, 5_000);
        assert_eq!(config.heartbeat_interval_ms, 10_000);
        assert_eq!(config.score_limit, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = KothConfig::load_or_default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = KothConfig {
            drain_empty_rate: f32::NAN,
            ..KothConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidRate("drain_empty_rate")));

        let config = KothConfig {
            ms_per_point: 0,
            ..KothConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroPointInterval));

        let config = KothConfig {
            max_frame_dt_ms: 1_000,
            ..KothConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FrameDeltaOutOfRange { value: 1_000, .. })
        ));
    }

    #[test]
    fn test_rates_in_milli_percent() {
        let rates = KothConfig::default().rates();
        assert_eq!(rates.grow, 10_000);
        assert_eq!(rates.drain_defended, 15_000);
        assert_eq!(rates.drain_empty, 5_000);
        assert_eq!(rates.ms_per_point, 5_000);
    }
}
