use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_controller_dt() -> f64 {
    0.01
}
const fn default_rf_z_max() -> f64 {
    400.0
}
const fn default_initial_rf_z_max() -> f64 {
    1e-3
}
const fn default_w_com() -> f64 {
    10.0
}
const fn default_w_base_ori() -> f64 {
    20.0
}
const fn default_w_contact_foot() -> f64 {
    60.0
}
const fn default_w_swing_foot() -> f64 {
    40.0
}
const fn default_body_gains() -> TaskGains {
    TaskGains::uniform(100.0, 10.0)
}
const fn default_foot_gains() -> TaskGains {
    TaskGains::uniform(400.0, 40.0)
}
const fn default_lambda_q_ddot() -> f64 {
    1e-8
}
const fn default_lambda_rf() -> f64 {
    1e-7
}
const fn default_rf_z_max_time() -> f64 {
    0.2
}
const fn default_swing_height() -> f64 {
    0.05
}
const fn default_friction_coeff() -> f64 {
    0.5
}
const fn default_foot_half_length() -> f64 {
    0.1
}
const fn default_foot_half_width() -> f64 {
    0.04
}

// ---------------------------------------------------------------------------
// TaskGains
// ---------------------------------------------------------------------------

/// Per-axis proportional and derivative gains of a 3-D task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskGains {
    pub kp: [f64; 3],
    pub kd: [f64; 3],
}

impl TaskGains {
    /// Same gain on every axis.
    pub const fn uniform(kp: f64, kd: f64) -> Self {
        Self {
            kp: [kp; 3],
            kd: [kd; 3],
        }
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if self.kp.iter().chain(&self.kd).all(|g| g.is_finite() && *g >= 0.0) {
            Ok(())
        } else {
            Err(ConfigError::invalid(field, "gains must be finite and >= 0"))
        }
    }
}

// ---------------------------------------------------------------------------
// WbcConfig
// ---------------------------------------------------------------------------

/// Gains, hierarchy weights and contact parameters of one robot.
///
/// Built once and passed by reference into every task, contact and
/// container constructor. The defaults are the quadruped preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WbcConfig {
    /// Control period in seconds (default: 0.01 = 100 Hz).
    #[serde(default = "default_controller_dt")]
    pub controller_dt: f64,

    /// Max normal force per contact in stance [N].
    #[serde(default = "default_rf_z_max")]
    pub rf_z_max: f64,

    /// Normal force limit a contact starts from before it is ramped in.
    #[serde(default = "default_initial_rf_z_max")]
    pub initial_rf_z_max: f64,

    #[serde(default = "default_w_com")]
    pub w_com: f64,
    #[serde(default = "default_w_base_ori")]
    pub w_base_ori: f64,
    #[serde(default = "default_w_contact_foot")]
    pub w_contact_foot: f64,
    #[serde(default = "default_w_swing_foot")]
    pub w_swing_foot: f64,

    /// Joint acceleration regularization, forwarded to the solver.
    #[serde(default = "default_lambda_q_ddot")]
    pub lambda_q_ddot: f64,

    /// Reaction force regularization, forwarded to the solver.
    #[serde(default = "default_lambda_rf")]
    pub lambda_rf: f64,

    /// Time to ramp a contact's normal force limit in or out [s].
    #[serde(default = "default_rf_z_max_time")]
    pub rf_z_max_time: f64,

    /// Swing apex height above the higher of lift-off and landing [m].
    #[serde(default = "default_swing_height")]
    pub swing_height: f64,

    #[serde(default = "default_friction_coeff")]
    pub friction_coeff: f64,

    /// Half length of a surface contact along the sole x axis [m].
    #[serde(default = "default_foot_half_length")]
    pub foot_half_length: f64,

    /// Half width of a surface contact along the sole y axis [m].
    #[serde(default = "default_foot_half_width")]
    pub foot_half_width: f64,

    // Tables last so the struct serializes to valid TOML.
    #[serde(default = "default_body_gains")]
    pub com: TaskGains,
    #[serde(default = "default_body_gains")]
    pub base_ori: TaskGains,
    #[serde(default = "default_foot_gains")]
    pub foot_pos: TaskGains,
    #[serde(default = "default_foot_gains")]
    pub foot_ori: TaskGains,
}

impl Default for WbcConfig {
    fn default() -> Self {
        Self::quadruped()
    }
}

impl WbcConfig {
    /// Quadruped with point feet.
    pub const fn quadruped() -> Self {
        Self {
            controller_dt: default_controller_dt(),
            rf_z_max: default_rf_z_max(),
            initial_rf_z_max: default_initial_rf_z_max(),
            w_com: default_w_com(),
            w_base_ori: default_w_base_ori(),
            w_contact_foot: default_w_contact_foot(),
            w_swing_foot: default_w_swing_foot(),
            com: default_body_gains(),
            base_ori: default_body_gains(),
            foot_pos: default_foot_gains(),
            foot_ori: default_foot_gains(),
            lambda_q_ddot: default_lambda_q_ddot(),
            lambda_rf: default_lambda_rf(),
            rf_z_max_time: default_rf_z_max_time(),
            swing_height: default_swing_height(),
            friction_coeff: default_friction_coeff(),
            foot_half_length: default_foot_half_length(),
            foot_half_width: default_foot_half_width(),
        }
    }

    /// Full-size biped with flat feet.
    pub const fn biped() -> Self {
        Self {
            rf_z_max: 2000.0,
            w_contact_foot: 40.0,
            w_swing_foot: 20.0,
            lambda_rf: 1e-8,
            rf_z_max_time: 0.1,
            friction_coeff: 0.3,
            ..Self::quadruped()
        }
    }

    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("controller_dt", self.controller_dt),
            ("rf_z_max", self.rf_z_max),
            ("rf_z_max_time", self.rf_z_max_time),
            ("friction_coeff", self.friction_coeff),
            ("foot_half_length", self.foot_half_length),
            ("foot_half_width", self.foot_half_width),
        ];
        for (field, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::invalid(field, format!("{value} (must be > 0)")));
            }
        }

        let non_negative = [
            ("initial_rf_z_max", self.initial_rf_z_max),
            ("w_com", self.w_com),
            ("w_base_ori", self.w_base_ori),
            ("w_contact_foot", self.w_contact_foot),
            ("w_swing_foot", self.w_swing_foot),
            ("lambda_q_ddot", self.lambda_q_ddot),
            ("lambda_rf", self.lambda_rf),
            ("swing_height", self.swing_height),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::invalid(field, format!("{value} (must be >= 0)")));
            }
        }

        if self.initial_rf_z_max > self.rf_z_max {
            return Err(ConfigError::invalid(
                "initial_rf_z_max",
                "must not exceed rf_z_max",
            ));
        }

        self.com.validate("com")?;
        self.base_ori.validate("base_ori")?;
        self.foot_pos.validate("foot_pos")?;
        self.foot_ori.validate("foot_ori")?;
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), rf_z_max = config.rf_z_max, "loaded wbc config");
        Ok(config)
    }

    /// Control rate in Hz.
    pub fn controller_hz(&self) -> f64 {
        1.0 / self.controller_dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_quadruped() {
        let cfg = WbcConfig::default();
        assert_eq!(cfg, WbcConfig::quadruped());
        assert_eq!(cfg.rf_z_max, 400.0);
        assert_eq!(cfg.com.kp, [100.0; 3]);
        assert_eq!(cfg.foot_pos.kd, [40.0; 3]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn biped_preset_overrides() {
        let cfg = WbcConfig::biped();
        assert_eq!(cfg.rf_z_max, 2000.0);
        assert_eq!(cfg.w_swing_foot, 20.0);
        assert_eq!(cfg.w_com, 10.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = WbcConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, WbcConfig::default());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let cfg = WbcConfig::from_toml_str(
            r"
            rf_z_max = 250.0
            w_com = 5.0

            [foot_pos]
            kp = [300.0, 300.0, 500.0]
            kd = [30.0, 30.0, 50.0]
            ",
        )
        .unwrap();
        assert_eq!(cfg.rf_z_max, 250.0);
        assert_eq!(cfg.w_com, 5.0);
        assert_eq!(cfg.foot_pos.kp[2], 500.0);
        assert_eq!(cfg.base_ori, TaskGains::uniform(100.0, 10.0));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cfg = WbcConfig {
            controller_dt: 0.0,
            ..WbcConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "controller_dt"
        ));

        let cfg = WbcConfig {
            w_swing_foot: -1.0,
            ..WbcConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = WbcConfig {
            initial_rf_z_max: 500.0,
            ..WbcConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = WbcConfig {
            com: TaskGains::uniform(f64::NAN, 1.0),
            ..WbcConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn toml_errors_surface() {
        assert!(matches!(
            WbcConfig::from_toml_str("rf_z_max = \"heavy\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            WbcConfig::from_toml_str("rf_z_max = -3.0"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn from_file_missing_is_io_error() {
        assert!(matches!(
            WbcConfig::from_file("/nonexistent/wbc.toml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn serialize_round_trip() {
        let cfg = WbcConfig::biped();
        let text = toml::to_string(&cfg).unwrap();
        assert_eq!(WbcConfig::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn controller_rate() {
        assert!((WbcConfig::default().controller_hz() - 100.0).abs() < 1e-9);
    }
}
