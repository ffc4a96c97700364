// src/regions.rs
//
// Per-cell region table. Each cell carries a small integer that selects which
// entry of every region-indexed material parameter applies to it.
//
// Writing the table does not trigger any recomputation by itself; kernels read
// it on their next evaluation.

use crate::error::{EngineError, Result};
use crate::mesh::Mesh;
use crate::params::MAX_REGIONS;
use crate::vector_field::ScalarField;

#[derive(Debug, Clone, PartialEq)]
pub struct Regions {
    mesh: Mesh,
    data: Vec<u8>,
}

fn region_id(region: usize) -> Result<u8> {
    if region >= MAX_REGIONS {
        return Err(EngineError::RegionOutOfRange {
            param: "regions",
            region,
            max: MAX_REGIONS - 1,
        });
    }
    Ok(region as u8)
}

impl Regions {
    /// All cells in region 0.
    pub fn new(mesh: Mesh) -> Self {
        Self {
            mesh,
            data: vec![0; mesh.n_cells()],
        }
    }

    #[inline]
    pub fn get(&self, idx: usize) -> u8 {
        self.data[idx]
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Assign cell (ix, iy, iz) to `region`.
    pub fn set_cell(&mut self, ix: usize, iy: usize, iz: usize, region: usize) -> Result<()> {
        let r = region_id(region)?;
        let [nx, ny, nz] = self.mesh.grid_size();
        if ix >= nx || iy >= ny || iz >= nz {
            return Err(EngineError::InvalidConfig(format!(
                "cell ({ix}, {iy}, {iz}) outside {}",
                self.mesh.user_string()
            )));
        }
        let idx = self.mesh.idx(ix, iy, iz);
        self.data[idx] = r;
        Ok(())
    }

    pub fn set_all(&mut self, region: usize) -> Result<()> {
        let r = region_id(region)?;
        self.data.fill(r);
        Ok(())
    }

    /// Assign every cell whose centre satisfies `f(x, y, z)` to `region`.
    ///
    /// Coordinates are cell centres in metres, centred on the middle of the mesh.
    /// Returns the number of cells assigned.
    pub fn define_fn<F>(&mut self, region: usize, f: F) -> Result<usize>
    where
        F: Fn(f64, f64, f64) -> bool,
    {
        let r = region_id(region)?;
        let mut count = 0;
        for idx in 0..self.data.len() {
            let [x, y, z] = self.mesh.cell_center(idx);
            if f(x, y, z) {
                self.data[idx] = r;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Region ids present in at least one cell, ascending.
    pub fn used(&self) -> Vec<u8> {
        let mut seen = [false; MAX_REGIONS];
        for &r in &self.data {
            seen[r as usize] = true;
        }
        (0..MAX_REGIONS)
            .filter(|&r| seen[r])
            .map(|r| r as u8)
            .collect()
    }

    pub fn to_scalar_field(&self) -> ScalarField {
        ScalarField {
            mesh: self.mesh,
            data: self.data.iter().map(|&r| r as f64).collect(),
        }
    }
}
