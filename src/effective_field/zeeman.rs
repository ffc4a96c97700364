// src/effective_field/zeeman.rs

use std::fmt;

use rayon::prelude::*;

use crate::error::Result;
use crate::mesh::Mesh;
use crate::vector_field::VectorField;

/// Time-dependent scalar applied to an external-field mask.
pub type Multiplier = Box<dyn Fn(f64) -> f64 + Send + Sync>;

/// Spatially varying applied field: `mask(r) * multiplier(t)` (Tesla).
pub struct ExtField {
    pub mask: VectorField,
    pub multiplier: Multiplier,
}

impl fmt::Debug for ExtField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtField").field("mesh", &self.mask.mesh).finish()
    }
}

/// Applied field and current density driving the system.
#[derive(Debug, Default)]
pub struct Excitation {
    /// Uniform applied induction (Tesla), [x, y, z].
    pub b_ext: [f64; 3],
    /// Electrical current density (A/m^2), [x, y, z].
    pub j: [f64; 3],
    pub ext_fields: Vec<ExtField>,
}

impl Excitation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_ext_field(
        &mut self,
        mesh: &Mesh,
        mask: VectorField,
        multiplier: Multiplier,
    ) -> Result<()> {
        mask.check_mesh(mesh, "external field mask")?;
        self.ext_fields.push(ExtField { mask, multiplier });
        Ok(())
    }

    /// No applied field at all: uniform part zero and no masks.
    pub fn field_is_zero(&self) -> bool {
        self.b_ext == [0.0; 3] && self.ext_fields.is_empty()
    }

    pub fn current_is_zero(&self) -> bool {
        self.j == [0.0; 3]
    }
}

/// Add the applied induction at time `t` to every cell.
///
/// Each cell receives its total (uniform part plus all masks) in one `+=`.
pub fn add_zeeman_field(excitation: &Excitation, t: f64, dst: &mut VectorField) {
    let b0 = excitation.b_ext;
    let muls: Vec<f64> = excitation
        .ext_fields
        .iter()
        .map(|e| (e.multiplier)(t))
        .collect();
    let fields = &excitation.ext_fields;

    dst.data.par_iter_mut().enumerate().for_each(|(i, b)| {
        let mut total = b0;
        for (e, &mul) in fields.iter().zip(&muls) {
            let mk = e.mask.data[i];
            total[0] += mk[0] * mul;
            total[1] += mk[1] * mul;
            total[2] += mk[2] * mul;
        }
        b[0] += total[0];
        b[1] += total[1];
        b[2] += total[2];
    });
}
