use clankers_curves::CurveError;
use thiserror::Error;

/// Top-level error type for clankers-wbc.
#[derive(Debug, Error)]
pub enum WbcError {
    #[error("Invalid duration: {0} (must be > 0)")]
    InvalidDuration(f64),

    #[error("Dimension mismatch for {field}: expected {expected}, got {got}")]
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Curve error: {0}")]
    Curve(#[from] CurveError),

    #[error("Trajectory manager updated before initialize")]
    NotInitialized,

    #[error("Jacobian of {0} not refreshed")]
    JacobianNotRefreshed(String),

    #[error("Command of {0} not updated since the last setpoint or Jacobian write")]
    CommandNotUpdated(String),

    #[error("Unsupported configuration: {0}")]
    Unsupported(String),

    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl WbcError {
    /// Malformed input from the caller (bad duration, wrong length, bad knots).
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidDuration(_)
                | Self::DimensionMismatch { .. }
                | Self::InvalidArgument(_)
                | Self::Curve(_)
        )
    }

    /// An operation was called out of its required order.
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized | Self::JacobianNotRefreshed(_) | Self::CommandNotUpdated(_)
        )
    }

    pub(crate) fn check_len(field: &'static str, expected: usize, got: usize) -> Result<(), Self> {
        if expected == got {
            Ok(())
        } else {
            Err(Self::DimensionMismatch {
                field,
                expected,
                got,
            })
        }
    }

    pub(crate) fn check_duration(duration: f64) -> Result<(), Self> {
        if duration > 0.0 {
            Ok(())
        } else {
            Err(Self::InvalidDuration(duration))
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
