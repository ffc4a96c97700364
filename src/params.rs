// src/params.rs
//
// Physical constants and region-indexed material parameter tables.
//
// A parameter is a dense table of MAX_REGIONS values, one per region id.
// Kernels look values up through the per-cell region table; when every
// region holds the same value (`is_uniform`) they may hoist the lookup.

use std::f64::consts::PI;

use crate::error::{EngineError, Result};

/// Vacuum permeability (T·m/A).
pub const MU0: f64 = 4.0e-7 * PI;
/// Electron gyromagnetic ratio (rad/(s·T)).
pub const GAMMA_E_RAD_PER_S_T: f64 = 1.760_859_630_23e11;
/// Bohr magneton (J/T).
pub const MU_B: f64 = 9.274_010_078_3e-24;
/// Elementary charge (C).
pub const Q_E: f64 = 1.602_176_634e-19;

/// Number of distinct region ids (region ids are `u8`).
pub const MAX_REGIONS: usize = 256;

fn check_region(param: &'static str, region: usize) -> Result<()> {
    if region >= MAX_REGIONS {
        return Err(EngineError::RegionOutOfRange {
            param,
            region,
            max: MAX_REGIONS - 1,
        });
    }
    Ok(())
}

/// Region-indexed scalar material parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarParam {
    name: &'static str,
    unit: &'static str,
    values: Vec<f64>,
}

impl ScalarParam {
    pub fn new(name: &'static str, unit: &'static str, value: f64) -> Self {
        Self {
            name,
            unit,
            values: vec![value; MAX_REGIONS],
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn unit(&self) -> &'static str {
        self.unit
    }

    pub fn get(&self, region: usize) -> Result<f64> {
        check_region(self.name, region)?;
        Ok(self.values[region])
    }

    pub fn set_region(&mut self, region: usize, value: f64) -> Result<()> {
        check_region(self.name, region)?;
        self.values[region] = value;
        Ok(())
    }

    pub fn set_all(&mut self, value: f64) {
        self.values.fill(value);
    }

    /// Refresh one region of a derived parameter from its sources.
    pub fn recompute_region<F>(&mut self, region: usize, f: F) -> Result<()>
    where
        F: FnOnce(usize) -> f64,
    {
        check_region(self.name, region)?;
        self.values[region] = f(region);
        Ok(())
    }

    /// Refresh every region of a derived parameter.
    pub fn recompute_all<F>(&mut self, f: F)
    where
        F: Fn(usize) -> f64,
    {
        for (region, v) in self.values.iter_mut().enumerate() {
            *v = f(region);
        }
    }

    /// True iff every region holds the same value.
    pub fn is_uniform(&self) -> bool {
        let v0 = self.values[0];
        self.values.iter().all(|&v| v == v0)
    }

    pub fn uniform_value(&self) -> Option<f64> {
        self.is_uniform().then_some(self.values[0])
    }

    /// True iff every region is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }

    /// Value for a region id read from the region table.
    #[inline]
    pub fn at(&self, region: u8) -> f64 {
        self.values[region as usize]
    }
}

/// Region-indexed 3-vector material parameter, components in [x, y, z] order.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorParam {
    name: &'static str,
    unit: &'static str,
    values: Vec<[f64; 3]>,
}

impl VectorParam {
    pub fn new(name: &'static str, unit: &'static str, value: [f64; 3]) -> Self {
        Self {
            name,
            unit,
            values: vec![value; MAX_REGIONS],
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn unit(&self) -> &'static str {
        self.unit
    }

    pub fn get(&self, region: usize) -> Result<[f64; 3]> {
        check_region(self.name, region)?;
        Ok(self.values[region])
    }

    pub fn set_region(&mut self, region: usize, value: [f64; 3]) -> Result<()> {
        check_region(self.name, region)?;
        self.values[region] = value;
        Ok(())
    }

    pub fn set_all(&mut self, value: [f64; 3]) {
        self.values.fill(value);
    }

    pub fn is_uniform(&self) -> bool {
        let v0 = self.values[0];
        self.values.iter().all(|&v| v == v0)
    }

    pub fn uniform_value(&self) -> Option<[f64; 3]> {
        self.is_uniform().then_some(self.values[0])
    }

    #[inline]
    pub fn at(&self, region: u8) -> [f64; 3] {
        self.values[region as usize]
    }
}
