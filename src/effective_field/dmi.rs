// src/effective_field/dmi.rs
//
// Interfacial (Néel-type) Dzyaloshinskii–Moriya interaction (DMI)
// for thin films.
//
// Energy density:
//   E_DMI = D [ m_z (∇·m) - (m · ∇) m_z ]
//
// Effective field:
//   B_DMI = (2D / M_s) * ( ∂x m_z, ∂y m_z, -(∂x m_x + ∂y m_y) )

use rayon::prelude::*;

use crate::effective_field::derivative;
use crate::material::Material;
use crate::regions::Regions;
use crate::vector_field::VectorField;

// Internal mesh axes.
const AXIS_X: usize = 2;
const AXIS_Y: usize = 1;

pub fn add_dmi_field(m: &VectorField, regions: &Regions, material: &Material, dst: &mut VectorField) {
    let dmi = material.dmi();
    let msat = material.msat();

    dst.data.par_iter_mut().enumerate().for_each(|(i, b)| {
        let r = regions.get(i);
        let d = dmi.at(r);
        if d == 0.0 {
            return;
        }
        let prefactor = 2.0 * d / msat.at(r);

        let dm_dx = derivative(m, i, AXIS_X);
        let dm_dy = derivative(m, i, AXIS_Y);

        b[0] += prefactor * dm_dx[2];
        b[1] += prefactor * dm_dy[2];
        b[2] += -prefactor * (dm_dx[0] + dm_dy[1]);
    });
}
