// src/material.rs
//
// Material parameter set.
//
// Most parameters are independent and exposed through `*_mut` accessors.
// Msat and Ku1 have a dependent: the reduced anisotropy ku1_red = Ku1 / Msat (T)
// used by the anisotropy kernel. They can only be written through the setters
// below, which refresh ku1_red for every region they touch.

use crate::error::{EngineError, Result};
use crate::params::{ScalarParam, VectorParam};
use crate::regions::Regions;
use crate::vec3::normalize;

#[derive(Debug, Clone)]
pub struct Material {
    msat: ScalarParam,
    aex: ScalarParam,
    alpha: ScalarParam,
    ku1: ScalarParam,
    ku1_red: ScalarParam,
    anis_u: VectorParam,
    dmi: ScalarParam,
    xi: ScalarParam,
    spin_pol: ScalarParam,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            msat: ScalarParam::new("Msat", "A/m", 0.0),
            aex: ScalarParam::new("Aex", "J/m", 0.0),
            alpha: ScalarParam::new("alpha", "", 0.0),
            ku1: ScalarParam::new("Ku1", "J/m3", 0.0),
            ku1_red: ScalarParam::new("ku1_red", "T", 0.0),
            anis_u: VectorParam::new("anisU", "", [0.0; 3]),
            dmi: ScalarParam::new("DMI", "J/m2", 0.0),
            xi: ScalarParam::new("xi", "", 0.0),
            spin_pol: ScalarParam::new("SpinPol", "", 1.0),
        }
    }
}

impl Material {
    /// Saturation magnetisation (A/m).
    pub fn msat(&self) -> &ScalarParam {
        &self.msat
    }

    /// Exchange stiffness (J/m).
    pub fn aex(&self) -> &ScalarParam {
        &self.aex
    }

    /// Gilbert damping.
    pub fn alpha(&self) -> &ScalarParam {
        &self.alpha
    }

    /// Uniaxial anisotropy strength (J/m³).
    pub fn ku1(&self) -> &ScalarParam {
        &self.ku1
    }

    /// Ku1 / Msat (T), kept in sync by `set_ku1*` and `set_msat*`.
    pub fn ku1_red(&self) -> &ScalarParam {
        &self.ku1_red
    }

    /// Unit uniaxial anisotropy axis.
    pub fn anis_u(&self) -> &VectorParam {
        &self.anis_u
    }

    /// Interfacial DMI strength (J/m²).
    pub fn dmi(&self) -> &ScalarParam {
        &self.dmi
    }

    /// Spin-transfer-torque non-adiabaticity.
    pub fn xi(&self) -> &ScalarParam {
        &self.xi
    }

    /// Current spin polarisation.
    pub fn spin_pol(&self) -> &ScalarParam {
        &self.spin_pol
    }

    pub fn aex_mut(&mut self) -> &mut ScalarParam {
        &mut self.aex
    }

    pub fn alpha_mut(&mut self) -> &mut ScalarParam {
        &mut self.alpha
    }

    pub fn dmi_mut(&mut self) -> &mut ScalarParam {
        &mut self.dmi
    }

    pub fn xi_mut(&mut self) -> &mut ScalarParam {
        &mut self.xi
    }

    pub fn spin_pol_mut(&mut self) -> &mut ScalarParam {
        &mut self.spin_pol
    }

    pub fn set_msat(&mut self, region: usize, value: f64) -> Result<()> {
        self.msat.set_region(region, value)?;
        self.refresh_ku1_red(region)
    }

    pub fn set_msat_all(&mut self, value: f64) {
        self.msat.set_all(value);
        self.refresh_ku1_red_all();
    }

    pub fn set_ku1(&mut self, region: usize, value: f64) -> Result<()> {
        self.ku1.set_region(region, value)?;
        self.refresh_ku1_red(region)
    }

    pub fn set_ku1_all(&mut self, value: f64) {
        self.ku1.set_all(value);
        self.refresh_ku1_red_all();
    }

    /// Set the anisotropy axis of one region; the axis is normalised.
    pub fn set_anis_u(&mut self, region: usize, axis: [f64; 3]) -> Result<()> {
        self.anis_u.set_region(region, normalize(axis))
    }

    pub fn set_anis_u_all(&mut self, axis: [f64; 3]) {
        self.anis_u.set_all(normalize(axis));
    }

    fn refresh_ku1_red(&mut self, region: usize) -> Result<()> {
        let ku1 = &self.ku1;
        let msat = &self.msat;
        self.ku1_red
            .recompute_region(region, |r| reduced(ku1.at(r as u8), msat.at(r as u8)))
    }

    fn refresh_ku1_red_all(&mut self) {
        let ku1 = &self.ku1;
        let msat = &self.msat;
        self.ku1_red
            .recompute_all(|r| reduced(ku1.at(r as u8), msat.at(r as u8)));
    }

    /// Fails if Msat is zero in any region that occupies at least one cell.
    pub fn check_msat(&self, regions: &Regions) -> Result<()> {
        let zero = match self.msat.uniform_value() {
            Some(v) => v == 0.0,
            None => regions.used().iter().any(|&r| self.msat.at(r) == 0.0),
        };
        if zero {
            return Err(EngineError::ZeroParameter {
                name: self.msat.name(),
            });
        }
        Ok(())
    }
}

/// Ku1 / Msat; zero where Msat is zero (those regions fail `check_msat` before use).
fn reduced(ku1: f64, msat: f64) -> f64 {
    if msat == 0.0 {
        0.0
    } else {
        ku1 / msat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mesh::Mesh;

    #[test]
    fn ku1_red_follows_ku1_per_region() {
        let mut mat = Material::default();
        mat.set_msat(0, 8e5).unwrap();
        mat.set_msat(1, 8e5).unwrap();
        mat.set_ku1(0, 1e3).unwrap();
        mat.set_ku1(1, 2e3).unwrap();

        assert!((mat.ku1_red().get(0).unwrap() - 1.25e-3).abs() < 1e-18);
        assert!((mat.ku1_red().get(1).unwrap() - 2.5e-3).abs() < 1e-18);
    }

    #[test]
    fn ku1_red_follows_msat_changes() {
        let mut mat = Material::default();
        mat.set_ku1_all(1e3);
        assert_eq!(mat.ku1_red().get(4).unwrap(), 0.0);

        mat.set_msat_all(8e5);
        assert!((mat.ku1_red().get(4).unwrap() - 1.25e-3).abs() < 1e-18);

        mat.set_msat(4, 4e5).unwrap();
        assert!((mat.ku1_red().get(4).unwrap() - 2.5e-3).abs() < 1e-18);
        assert!((mat.ku1_red().get(3).unwrap() - 1.25e-3).abs() < 1e-18);
    }

    #[test]
    fn anisotropy_axis_is_normalised() {
        let mut mat = Material::default();
        mat.set_anis_u(0, [0.0, 0.0, 2.0]).unwrap();
        assert_eq!(mat.anis_u().get(0).unwrap(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn zero_msat_in_a_used_region_fails_sanity_check() {
        let mesh = Mesh::new(4, 1, 1, 1e-9, 1e-9, 1e-9).unwrap();
        let mut regions = Regions::new(mesh);
        let mut mat = Material::default();

        let err = mat.check_msat(&regions).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Physical);
        assert!(err.to_string().contains("Msat"));

        mat.set_msat(0, 8e5).unwrap();
        // Region 1 is zero but unused.
        mat.check_msat(&regions).unwrap();

        regions.set_cell(2, 0, 0, 1).unwrap();
        assert!(mat.check_msat(&regions).is_err());
    }
}
