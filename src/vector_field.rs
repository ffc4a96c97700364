// src/vector_field.rs

use rayon::prelude::*;

use crate::error::{EngineError, Result};
use crate::mesh::Mesh;
use crate::vec3::{norm, normalize};

/// Three-component field defined on a mesh, one [x, y, z] vector per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField {
    pub mesh: Mesh,
    pub data: Vec<[f64; 3]>,
}

impl VectorField {
    /// Zero field on the given mesh.
    pub fn new(mesh: Mesh) -> Self {
        Self {
            mesh,
            data: vec![[0.0; 3]; mesh.n_cells()],
        }
    }

    /// Set all cells to the same vector.
    pub fn set_uniform(&mut self, v: [f64; 3]) {
        for cell in &mut self.data {
            *cell = v;
        }
    }

    pub fn zero(&mut self) {
        self.set_uniform([0.0; 3]);
    }

    pub fn copy_from(&mut self, other: &VectorField) {
        debug_assert_eq!(self.mesh, other.mesh);
        self.data.copy_from_slice(&other.data);
    }

    /// Element-wise `self += other`.
    pub fn add_assign(&mut self, other: &VectorField) {
        debug_assert_eq!(self.mesh, other.mesh);
        self.data
            .par_iter_mut()
            .zip(other.data.par_iter())
            .for_each(|(a, b)| {
                a[0] += b[0];
                a[1] += b[1];
                a[2] += b[2];
            });
    }

    /// Normalise every cell to unit length; zero cells stay zero.
    pub fn normalize(&mut self) {
        self.data.par_iter_mut().for_each(|v| *v = normalize(*v));
    }

    /// Spatial average over all cells.
    pub fn average(&self) -> [f64; 3] {
        let mut s = [0.0; 3];
        for v in &self.data {
            s[0] += v[0];
            s[1] += v[1];
            s[2] += v[2];
        }
        let n = self.data.len() as f64;
        [s[0] / n, s[1] / n, s[2] / n]
    }

    /// max_i |v_i|, NaN if any cell is NaN.
    pub fn max_norm(&self) -> f64 {
        self.data.iter().fold(0.0, |acc, v| nan_max(acc, norm(*v)))
    }

    /// max_i |a_i - b_i|, NaN if any cell is NaN.
    pub fn max_diff(&self, other: &VectorField) -> f64 {
        debug_assert_eq!(self.mesh, other.mesh);
        self.data
            .iter()
            .zip(other.data.iter())
            .fold(0.0, |acc, (a, b)| {
                nan_max(acc, norm([a[0] - b[0], a[1] - b[1], a[2] - b[2]]))
            })
    }

    pub(crate) fn check_mesh(&self, mesh: &Mesh, what: &str) -> Result<()> {
        if self.mesh != *mesh {
            return Err(EngineError::InvalidConfig(format!(
                "{what} is defined on {}, expected {}",
                self.mesh.user_string(),
                mesh.user_string()
            )));
        }
        Ok(())
    }
}

// f64::max drops NaN operands.
fn nan_max(acc: f64, x: f64) -> f64 {
    if acc.is_nan() || x.is_nan() {
        f64::NAN
    } else {
        acc.max(x)
    }
}

/// One-component field, one value per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    pub mesh: Mesh,
    pub data: Vec<f64>,
}

impl ScalarField {
    pub fn new(mesh: Mesh) -> Self {
        Self {
            mesh,
            data: vec![0.0; mesh.n_cells()],
        }
    }

    pub fn average(&self) -> f64 {
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }
}

/// Data returned when a quantity is fetched by name.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Scalar(ScalarField),
    Vector(VectorField),
}

impl FieldData {
    pub fn ncomp(&self) -> usize {
        match self {
            FieldData::Scalar(_) => 1,
            FieldData::Vector(_) => 3,
        }
    }

    pub fn into_vector(self) -> Option<VectorField> {
        match self {
            FieldData::Vector(v) => Some(v),
            FieldData::Scalar(_) => None,
        }
    }

    pub fn into_scalar(self) -> Option<ScalarField> {
        match self {
            FieldData::Scalar(s) => Some(s),
            FieldData::Vector(_) => None,
        }
    }
}
