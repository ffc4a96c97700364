// src/mesh.rs
//
// Regular finite-difference mesh of Nx × Ny × Nz cells.
//
// Storage is [Z, Y, X]-major: X is the fastest-varying index and sizes are
// kept internally in [z, y, x] order. The public `grid_size`, `cell_size`
// and `world_size` accessors report [x, y, z].

use crate::error::{EngineError, Result};

/// Reverse the order of a 3-tuple ([x, y, z] <-> [z, y, x]).
#[inline]
pub fn reverse<T: Copy>(v: [T; 3]) -> [T; 3] {
    [v[2], v[1], v[0]]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mesh {
    /// Cell counts, [nz, ny, nx].
    size: [usize; 3],
    /// Cell size in metres, [cz, cy, cx].
    cell: [f64; 3],
}

impl Mesh {
    /// Mesh of nx × ny × nz cells of size cx × cy × cz (metres).
    pub fn new(nx: usize, ny: usize, nz: usize, cx: f64, cy: f64, cz: f64) -> Result<Self> {
        if nx <= 1 {
            return Err(EngineError::InvalidMesh(format!(
                "mesh size X should be > 1, have: {nx}"
            )));
        }
        if ny == 0 || nz == 0 {
            return Err(EngineError::InvalidMesh(format!(
                "mesh size should be positive, have: {nx} x {ny} x {nz}"
            )));
        }
        for (axis, c) in [("x", cx), ("y", cy), ("z", cz)] {
            if !(c.is_finite() && c > 0.0) {
                return Err(EngineError::InvalidMesh(format!(
                    "cell size {axis} should be positive and finite, have: {c}"
                )));
            }
        }
        Ok(Self {
            size: [nz, ny, nx],
            cell: [cz, cy, cx],
        })
    }

    /// Internal cell counts, [nz, ny, nx].
    #[inline]
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Internal cell size, [cz, cy, cx].
    #[inline]
    pub fn cell(&self) -> [f64; 3] {
        self.cell
    }

    #[inline]
    pub fn n_cells(&self) -> usize {
        self.size[0] * self.size[1] * self.size[2]
    }

    /// Cell counts as [nx, ny, nz].
    pub fn grid_size(&self) -> [usize; 3] {
        reverse(self.size)
    }

    /// Cell size as [cx, cy, cz] in metres.
    pub fn cell_size(&self) -> [f64; 3] {
        reverse(self.cell)
    }

    /// Total extent as [wx, wy, wz] in metres.
    pub fn world_size(&self) -> [f64; 3] {
        let w = [
            self.size[0] as f64 * self.cell[0],
            self.size[1] as f64 * self.cell[1],
            self.size[2] as f64 * self.cell[2],
        ];
        reverse(w)
    }

    pub fn nx(&self) -> usize {
        self.size[2]
    }

    pub fn ny(&self) -> usize {
        self.size[1]
    }

    pub fn nz(&self) -> usize {
        self.size[0]
    }

    /// Flat index of cell (ix, iy, iz).
    #[inline]
    pub fn idx(&self, ix: usize, iy: usize, iz: usize) -> usize {
        debug_assert!(ix < self.nx() && iy < self.ny() && iz < self.nz());
        (iz * self.size[1] + iy) * self.size[2] + ix
    }

    /// Internal coordinates [iz, iy, ix] of a flat index.
    #[inline]
    pub fn coords(&self, idx: usize) -> [usize; 3] {
        let nx = self.size[2];
        let ny = self.size[1];
        [idx / (nx * ny), (idx / nx) % ny, idx % nx]
    }

    /// Flat-index stride along internal axis `axis` (0 = z, 1 = y, 2 = x).
    #[inline]
    pub fn stride(&self, axis: usize) -> usize {
        match axis {
            0 => self.size[1] * self.size[2],
            1 => self.size[2],
            _ => 1,
        }
    }

    /// Cell-centre position [x, y, z] in metres, centred on the middle of the box.
    pub fn cell_center(&self, idx: usize) -> [f64; 3] {
        let c = self.coords(idx);
        let mut r = [0.0; 3];
        for axis in 0..3 {
            let n = self.size[axis] as f64;
            r[axis] = (c[axis] as f64 + 0.5 - 0.5 * n) * self.cell[axis];
        }
        reverse(r)
    }

    pub fn user_string(&self) -> String {
        let [nx, ny, nz] = self.grid_size();
        let [cx, cy, cz] = self.cell_size();
        format!("{nx} x {ny} x {nz} cells of {cx:e} x {cy:e} x {cz:e} m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_report_user_axis_order() {
        let mesh = Mesh::new(8, 4, 2, 1e-9, 2e-9, 3e-9).unwrap();
        assert_eq!(mesh.grid_size(), [8, 4, 2]);
        assert_eq!(mesh.cell_size(), [1e-9, 2e-9, 3e-9]);
        assert_eq!(mesh.size(), [2, 4, 8]);
        assert_eq!(mesh.cell(), [3e-9, 2e-9, 1e-9]);

        let w = mesh.world_size();
        let n = mesh.grid_size();
        let c = mesh.cell_size();
        for axis in 0..3 {
            assert_eq!(w[axis], n[axis] as f64 * c[axis]);
        }
    }

    #[test]
    fn indexing_is_x_fastest() {
        let mesh = Mesh::new(4, 3, 2, 1.0, 1.0, 1.0).unwrap();
        assert_eq!(mesh.idx(0, 0, 0), 0);
        assert_eq!(mesh.idx(1, 0, 0), 1);
        assert_eq!(mesh.idx(0, 1, 0), 4);
        assert_eq!(mesh.idx(0, 0, 1), 12);
        assert_eq!(mesh.idx(3, 2, 1), 23);
        assert_eq!(mesh.n_cells(), 24);
        assert_eq!(mesh.coords(23), [1, 2, 3]);
        assert_eq!(mesh.stride(0), 12);
        assert_eq!(mesh.stride(1), 4);
        assert_eq!(mesh.stride(2), 1);
    }

    #[test]
    fn cell_centres_are_symmetric_about_origin() {
        let mesh = Mesh::new(4, 1, 1, 1.0, 1.0, 1.0).unwrap();
        assert_eq!(mesh.cell_center(0), [-1.5, 0.0, 0.0]);
        assert_eq!(mesh.cell_center(3), [1.5, 0.0, 0.0]);
    }

    #[test]
    fn rejects_invalid_dimensions() {
        assert!(matches!(
            Mesh::new(1, 4, 1, 1e-9, 1e-9, 1e-9),
            Err(EngineError::InvalidMesh(_))
        ));
        assert!(Mesh::new(4, 0, 1, 1e-9, 1e-9, 1e-9).is_err());
        assert!(Mesh::new(4, 4, 1, 0.0, 1e-9, 1e-9).is_err());
        assert!(Mesh::new(4, 4, 1, 1e-9, f64::NAN, 1e-9).is_err());
    }
}
