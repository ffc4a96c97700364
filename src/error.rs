// src/error.rs

use thiserror::Error;

/// Broad classification of an [`EngineError`].
///
/// None of these are retried by the engine. The caller driving the run loop
/// decides whether to abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad setup: mesh set twice, invalid dimensions, region out of range, bad settings.
    Configuration,
    /// A material parameter a kernel needs is physically invalid (e.g. Msat = 0).
    Physical,
    /// The adaptive integrator could not meet its error tolerance.
    Integration,
    /// Something was used before it was initialised.
    Uninitialized,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("mesh already set")]
    MeshAlreadySet,

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("region index {region} out of range for {param} (max {max})")]
    RegionOutOfRange {
        param: &'static str,
        region: usize,
        max: usize,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unknown quantity: {0}")]
    UnknownQuantity(String),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{name} should be nonzero")]
    ZeroParameter { name: &'static str },

    #[error(
        "time step underflow: dt={dt:.3e} s reached dt_min={dt_min:.3e} s with error {err:.3e} > max_err {max_err:.3e}"
    )]
    StepUnderflow {
        dt: f64,
        dt_min: f64,
        err: f64,
        max_err: f64,
    },

    #[error("non-finite torque at t={t:.6e} s (error estimate {err})")]
    NonFiniteTorque { t: f64, err: f64 },

    #[error("need to set mesh first")]
    MeshNotSet,

    #[error("need to initialize magnetization first")]
    MagnetizationNotSet,

    #[error("table column {0} has no value for this tick")]
    StaleColumn(&'static str),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::MeshAlreadySet
            | EngineError::InvalidMesh(_)
            | EngineError::RegionOutOfRange { .. }
            | EngineError::InvalidConfig(_)
            | EngineError::UnknownQuantity(_)
            | EngineError::Json(_)
            | EngineError::Io(_) => ErrorKind::Configuration,
            EngineError::ZeroParameter { .. } => ErrorKind::Physical,
            EngineError::StepUnderflow { .. } | EngineError::NonFiniteTorque { .. } => {
                ErrorKind::Integration
            }
            EngineError::MeshNotSet
            | EngineError::MagnetizationNotSet
            | EngineError::StaleColumn(_) => ErrorKind::Uninitialized,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
