use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tuning knobs for Buddy's movement. Units are arena units and seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuddyConfig {
    /// Downward acceleration while falling.
    pub gravity: f32,
    /// Horizontal speed while walking toward a wander target.
    pub wander_speed: f32,
    /// Distance below which a wander target counts as reached.
    pub target_reached_threshold: f32,
    pub min_wait_seconds: f32,
    pub max_wait_seconds: f32,
    /// Initial wander toggle; the host can flip it at runtime.
    pub can_wander: bool,
    /// Scale on the dominant movement axis at the start of a move.
    pub squish_stretch: f32,
    /// Scale on the other axis at the start of a move.
    pub squish_compress: f32,
    pub squish_recovery_seconds: f32,
    /// Band that absorbs float drift when checking whether Buddy rests on a surface.
    pub support_tolerance: f32,
}

impl Default for BuddyConfig {
    fn default() -> Self {
        Self {
            gravity: 400.0,
            wander_speed: 100.0,
            target_reached_threshold: 5.0,
            min_wait_seconds: 1.0,
            max_wait_seconds: 4.0,
            can_wander: true,
            squish_stretch: 1.15,
            squish_compress: 0.85,
            squish_recovery_seconds: 0.25,
            support_tolerance: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f32 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("min_wait_seconds ({min}) must not exceed max_wait_seconds ({max})")]
    WaitRangeInverted { min: f32, max: f32 },
}

impl BuddyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("gravity", self.gravity)?;
        non_negative("wander_speed", self.wander_speed)?;
        non_negative("target_reached_threshold", self.target_reached_threshold)?;
        non_negative("min_wait_seconds", self.min_wait_seconds)?;
        non_negative("max_wait_seconds", self.max_wait_seconds)?;
        positive("squish_stretch", self.squish_stretch)?;
        positive("squish_compress", self.squish_compress)?;
        non_negative("squish_recovery_seconds", self.squish_recovery_seconds)?;
        non_negative("support_tolerance", self.support_tolerance)?;
        if self.min_wait_seconds > self.max_wait_seconds {
            return Err(ConfigError::WaitRangeInverted {
                min: self.min_wait_seconds,
                max: self.max_wait_seconds,
            });
        }
        Ok(())
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value <= 0.0 {
        return Err(ConfigError::NotPositive { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(BuddyConfig::default().validate(), Ok(()));
    }

    #[test]
    fn inverted_wait_range_is_rejected() {
        let config = BuddyConfig {
            min_wait_seconds: 5.0,
            max_wait_seconds: 2.0,
            ..BuddyConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::WaitRangeInverted { min: 5.0, max: 2.0 })
        );
    }

    #[test]
    fn non_finite_gravity_is_rejected() {
        let config = BuddyConfig {
            gravity: f32::INFINITY,
            ..BuddyConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonFinite {
                field: "gravity",
                ..
            })
        ));
    }

    #[test]
    fn zero_squish_factor_is_rejected() {
        let config = BuddyConfig {
            squish_compress: 0.0,
            ..BuddyConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "squish_compress",
                ..
            })
        ));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: BuddyConfig =
            serde_json::from_str(r#"{ "gravity": 900.0, "can_wander": false }"#)
                .expect("partial config");
        assert_eq!(config.gravity, 900.0);
        assert!(!config.can_wander);
        assert_eq!(config.wander_speed, 100.0);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_str::<BuddyConfig>(r#"{ "gravty": 900.0 }"#);
        assert!(result.is_err());
    }
}
