// src/effective_field/anisotropy.rs

use rayon::prelude::*;

use crate::material::Material;
use crate::regions::Regions;
use crate::vec3::dot;
use crate::vector_field::VectorField;

/// Add uniaxial anisotropy contribution to B_eff (Tesla).
///
/// For w_ani = K_u [1 - (m·u)^2], we get:
///   B_ani = (2 K_u / M_s) (m·u) u = 2 ku1_red (m·u) u
///
/// Uses the reduced strength ku1_red = Ku1 / Msat kept by `Material`.
pub fn add_uniaxial_anisotropy_field(
    m: &VectorField,
    regions: &Regions,
    material: &Material,
    dst: &mut VectorField,
) {
    let ku1_red = material.ku1_red();
    let anis_u = material.anis_u();

    // Uniform parameters: skip the per-cell table lookups.
    if let (Some(k), Some(u)) = (ku1_red.uniform_value(), anis_u.uniform_value()) {
        if k == 0.0 || u == [0.0; 3] {
            return;
        }
        let coeff = 2.0 * k;
        dst.data
            .par_iter_mut()
            .zip(m.data.par_iter())
            .for_each(|(b, mi)| add_cell(b, *mi, coeff, u));
        return;
    }

    dst.data
        .par_iter_mut()
        .zip(m.data.par_iter())
        .enumerate()
        .for_each(|(i, (b, mi))| {
            let r = regions.get(i);
            add_cell(b, *mi, 2.0 * ku1_red.at(r), anis_u.at(r));
        });
}

#[inline]
fn add_cell(b: &mut [f64; 3], m: [f64; 3], coeff: f64, u: [f64; 3]) {
    let s = coeff * dot(m, u);
    b[0] += s * u[0];
    b[1] += s * u[1];
    b[2] += s * u[2];
}
