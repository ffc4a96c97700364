// src/llg.rs
//
// Adaptive Heun (predictor/corrector) integrator for dm/dt = gamma * torque(m, t).
//
//   k1 = torque(m, t)                          (save-worthy evaluation)
//   m* = m + dt*gamma*k1
//   k2 = torque(m*, t + dt)                    (never saved)
//   err = max_i |k2_i - k1_i| * dt * gamma
//
// err < max_err: m <- m + dt*gamma*(k1 + k2)/2, renormalise, t <- t + dt.
// Otherwise m is restored and dt shrinks. dt adapts MuMax-style:
//   dt <- dt * headroom * sqrt(max_err / err), clamped to [dt_min, dt_max].

use rayon::prelude::*;

use crate::config::SolverConfig;
use crate::error::{EngineError, Result};
use crate::mesh::Mesh;
use crate::vec3::add_scaled;
use crate::vector_field::VectorField;

/// Limits on the per-step change of dt.
const MAX_GROWTH: f64 = 2.0;
const MIN_SHRINK: f64 = 0.1;

/// The system being integrated.
pub trait Dynamics {
    fn magnetization(&mut self) -> &mut VectorField;

    /// Write the torque (Tesla) at the current magnetisation and `time` into `dst`.
    fn torque(&mut self, dst: &mut VectorField, time: f64, cansave: bool) -> Result<()>;

    /// Called once after every accepted step, with the new time.
    fn post_step(&mut self, _time: f64) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepperState {
    Idle,
    Evaluating,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    Accepted { dt: f64, err: f64 },
    Rejected { dt: f64, err: f64 },
}

struct HeunScratch {
    m0: VectorField,
    k1: VectorField,
    k2: VectorField,
}

impl HeunScratch {
    fn new(mesh: Mesh) -> Self {
        Self {
            m0: VectorField::new(mesh),
            k1: VectorField::new(mesh),
            k2: VectorField::new(mesh),
        }
    }
}

pub struct Stepper {
    settings: SolverConfig,
    time: f64,
    dt: f64,
    state: StepperState,
    accepted: u64,
    rejected: u64,
    last_err: f64,
    scratch: Option<HeunScratch>,
}

impl Default for Stepper {
    fn default() -> Self {
        let settings = SolverConfig::default();
        Self {
            settings,
            time: 0.0,
            dt: settings.dt,
            state: StepperState::Idle,
            accepted: 0,
            rejected: 0,
            last_err: 0.0,
            scratch: None,
        }
    }
}

impl Stepper {
    pub fn new(settings: SolverConfig) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            dt: settings.dt,
            ..Self::default()
        })
    }

    pub fn settings(&self) -> &SolverConfig {
        &self.settings
    }

    /// Replace the solver settings; dt restarts from `settings.dt`.
    pub fn configure(&mut self, settings: SolverConfig) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        self.dt = settings.dt;
        Ok(())
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Override the next step size (not clamped).
    pub fn set_dt(&mut self, dt: f64) -> Result<()> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(EngineError::InvalidConfig(format!("dt must be > 0, got {dt}")));
        }
        self.dt = dt;
        Ok(())
    }

    pub fn state(&self) -> StepperState {
        self.state
    }

    pub fn accepted_steps(&self) -> u64 {
        self.accepted
    }

    pub fn rejected_steps(&self) -> u64 {
        self.rejected
    }

    /// Error estimate of the most recent attempt.
    pub fn last_err(&self) -> f64 {
        self.last_err
    }

    /// One Heun attempt, accepted or rejected.
    pub fn step<D: Dynamics>(&mut self, sys: &mut D) -> Result<StepOutcome> {
        self.attempt(sys, false)
    }

    /// Retry until one step is accepted.
    ///
    /// After a rejection m and t are unchanged, so the stage-1 torque is reused.
    pub fn advance<D: Dynamics>(&mut self, sys: &mut D) -> Result<StepOutcome> {
        let mut reuse_k1 = false;
        loop {
            match self.attempt(sys, reuse_k1)? {
                StepOutcome::Rejected { .. } => reuse_k1 = true,
                accepted => return Ok(accepted),
            }
        }
    }

    fn attempt<D: Dynamics>(&mut self, sys: &mut D, reuse_k1: bool) -> Result<StepOutcome> {
        self.state = StepperState::Evaluating;
        let mesh = sys.magnetization().mesh;
        let (mut s, reuse_k1) = match self.scratch.take() {
            Some(s) if s.m0.mesh == mesh => (s, reuse_k1),
            _ => (HeunScratch::new(mesh), false),
        };
        let res = self.heun(sys, &mut s, reuse_k1);
        self.scratch = Some(s);
        if res.is_err() {
            self.state = StepperState::Idle;
        }
        res
    }

    fn heun<D: Dynamics>(
        &mut self,
        sys: &mut D,
        s: &mut HeunScratch,
        reuse_k1: bool,
    ) -> Result<StepOutcome> {
        let t = self.time;
        let dt = self.dt;
        let h = dt * self.settings.gamma;

        if !reuse_k1 {
            sys.torque(&mut s.k1, t, true)?;
        }

        {
            let m = sys.magnetization();
            s.m0.copy_from(m);
            m.data
                .par_iter_mut()
                .zip(s.k1.data.par_iter())
                .for_each(|(mi, k)| *mi = add_scaled(*mi, h, *k));
        }

        if let Err(e) = sys.torque(&mut s.k2, t + dt, false) {
            sys.magnetization().copy_from(&s.m0);
            return Err(e);
        }

        let err = s.k1.max_diff(&s.k2) * h;
        self.last_err = err;

        if !err.is_finite() {
            sys.magnetization().copy_from(&s.m0);
            log::warn!("non-finite torque at t={t:.6e}: err={err}");
            return Err(EngineError::NonFiniteTorque { t, err });
        }

        if err < self.settings.max_err {
            let m = sys.magnetization();
            m.data
                .par_iter_mut()
                .zip(s.m0.data.par_iter())
                .zip(s.k1.data.par_iter().zip(s.k2.data.par_iter()))
                .for_each(|((mi, m0), (a, b))| {
                    for c in 0..3 {
                        mi[c] = m0[c] + 0.5 * h * (a[c] + b[c]);
                    }
                });
            m.normalize();

            self.time = t + dt;
            self.accepted += 1;
            self.adapt(err);
            self.state = StepperState::Accepted;
            sys.post_step(self.time);
            return Ok(StepOutcome::Accepted { dt, err });
        }

        sys.magnetization().copy_from(&s.m0);

        if dt <= self.settings.dt_min {
            log::warn!(
                "step underflow at t={t:.6e}: dt={dt:.3e} err={err:.3e} max_err={:.3e}",
                self.settings.max_err
            );
            return Err(EngineError::StepUnderflow {
                dt,
                dt_min: self.settings.dt_min,
                err,
                max_err: self.settings.max_err,
            });
        }

        self.rejected += 1;
        self.adapt(err);
        self.state = StepperState::Rejected;
        log::debug!(
            "rejected step at t={t:.6e}: dt={dt:.3e} err={err:.3e}, retry with dt={:.3e}",
            self.dt
        );
        Ok(StepOutcome::Rejected { dt, err })
    }

    fn adapt(&mut self, err: f64) {
        let s = &self.settings;
        let corr = if err == 0.0 {
            MAX_GROWTH
        } else {
            (s.headroom * (s.max_err / err).sqrt()).clamp(MIN_SHRINK, MAX_GROWTH)
        };
        self.dt = (self.dt * corr).clamp(s.dt_min, s.dt_max);
    }
}
