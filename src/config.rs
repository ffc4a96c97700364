// src/config.rs
//
// Serializable run description. `Engine::from_config` turns one of these into
// a ready-to-step engine (mesh, material, excitation, solver settings).

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::params::GAMMA_E_RAD_PER_S_T;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub geometry: GeometryConfig,
    pub material: MaterialConfig,
    #[serde(default)]
    pub fields: FieldConfig,
    #[serde(default)]
    pub solver: SolverConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

/// Uniform material parameters (region 0 and every other region).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialConfig {
    pub ms: f64,
    pub aex: f64,
    #[serde(default)]
    pub alpha: f64,
    #[serde(default)]
    pub ku1: f64,
    #[serde(default = "default_easy_axis")]
    pub easy_axis: [f64; 3],
    #[serde(default)]
    pub dmi: f64,
    #[serde(default)]
    pub xi: f64,
    #[serde(default = "default_spin_pol")]
    pub spin_pol: f64,
}

fn default_easy_axis() -> [f64; 3] {
    [0.0, 0.0, 1.0]
}

fn default_spin_pol() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Uniform applied induction (Tesla).
    pub b_ext: [f64; 3],
    /// Current density (A/m^2).
    pub j: [f64; 3],
    pub demag: bool,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            b_ext: [0.0; 3],
            j: [0.0; 3],
            demag: true,
        }
    }
}

/// Adaptive Heun settings (MuMax-like).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Initial timestep (s). Adapted during the run.
    pub dt: f64,
    /// Maximum per-step error estimate (dimensionless, |dm|).
    pub max_err: f64,
    /// Safety factor applied to the optimal step estimate, in (0, 1].
    pub headroom: f64,
    pub dt_min: f64,
    pub dt_max: f64,
    /// Gyromagnetic ratio (rad/(s·T)).
    pub gamma: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let dt = 1e-13;
        Self {
            dt,
            max_err: 1e-5,
            headroom: 0.8,
            dt_min: dt * 1e-6,
            dt_max: dt * 100.0,
            gamma: GAMMA_E_RAD_PER_S_T,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(EngineError::InvalidConfig(msg));
        if !(self.max_err > 0.0) {
            return bad(format!("max_err must be > 0, got {}", self.max_err));
        }
        if !(self.headroom > 0.0 && self.headroom <= 1.0) {
            return bad(format!("headroom must be in (0, 1], got {}", self.headroom));
        }
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return bad(format!("dt must be > 0, got {}", self.dt));
        }
        if !(self.dt_min > 0.0) || self.dt_min > self.dt_max {
            return bad(format!(
                "need 0 < dt_min <= dt_max, got dt_min={} dt_max={}",
                self.dt_min, self.dt_max
            ));
        }
        if !(self.gamma > 0.0) {
            return bad(format!("gamma must be > 0, got {}", self.gamma));
        }
        Ok(())
    }
}

impl RunConfig {
    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: RunConfig = serde_json::from_str(s)?;
        cfg.solver.validate()?;
        Ok(cfg)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
