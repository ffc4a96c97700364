// src/fft.rs
//
// In-place 3D complex FFT on a [Z, Y, X]-major box, built from 1D rustfft
// plans applied along x rows, then y columns, then z pillars. Axes of length 1
// are skipped.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::mesh::Mesh;
use crate::vector_field::VectorField;

pub struct Fft3 {
    /// Box dimensions, [nz, ny, nx].
    dims: [usize; 3],
    fwd: [Arc<dyn Fft<f64>>; 3],
    inv: [Arc<dyn Fft<f64>>; 3],
    line_buf: Vec<Complex<f64>>,
}

impl Fft3 {
    pub fn new(dims: [usize; 3]) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let fwd = [
            planner.plan_fft_forward(dims[0]),
            planner.plan_fft_forward(dims[1]),
            planner.plan_fft_forward(dims[2]),
        ];
        let inv = [
            planner.plan_fft_inverse(dims[0]),
            planner.plan_fft_inverse(dims[1]),
            planner.plan_fft_inverse(dims[2]),
        ];
        let longest = dims.iter().copied().max().unwrap_or(1);
        Self {
            dims,
            fwd,
            inv,
            line_buf: vec![Complex::new(0.0, 0.0); longest],
        }
    }

    pub fn len(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn forward(&mut self, data: &mut [Complex<f64>]) {
        debug_assert_eq!(data.len(), self.len());
        for axis in (0..3).rev() {
            if self.dims[axis] > 1 {
                let plan = Arc::clone(&self.fwd[axis]);
                self.transform_axis(data, axis, plan.as_ref());
            }
        }
    }

    /// Inverse transform, with the 1/N scaling applied (rustfft is unnormalised).
    pub fn inverse(&mut self, data: &mut [Complex<f64>]) {
        debug_assert_eq!(data.len(), self.len());
        for axis in (0..3).rev() {
            if self.dims[axis] > 1 {
                let plan = Arc::clone(&self.inv[axis]);
                self.transform_axis(data, axis, plan.as_ref());
            }
        }
        let scale = 1.0 / self.len() as f64;
        for v in data.iter_mut() {
            v.re *= scale;
            v.im *= scale;
        }
    }

    fn transform_axis(&mut self, data: &mut [Complex<f64>], axis: usize, plan: &dyn Fft<f64>) {
        let [nz, ny, nx] = self.dims;

        // Rows are contiguous.
        if axis == 2 {
            for row in data.chunks_exact_mut(nx) {
                plan.process(row);
            }
            return;
        }

        let (n, stride) = if axis == 1 { (ny, nx) } else { (nz, nx * ny) };
        let buf = &mut self.line_buf[..n];

        // Gather each line into the scratch buffer, transform, scatter back.
        let starts: Box<dyn Iterator<Item = usize>> = if axis == 1 {
            Box::new((0..nz).flat_map(move |z| (0..nx).map(move |x| z * ny * nx + x)))
        } else {
            Box::new(0..nx * ny)
        };
        for start in starts {
            for (k, b) in buf.iter_mut().enumerate() {
                *b = data[start + k * stride];
            }
            plan.process(buf);
            for (k, b) in buf.iter().enumerate() {
                data[start + k * stride] = *b;
            }
        }
    }
}

/// Per-component magnitude of the (unpadded) Fourier transform of `m`.
pub fn fft_magnitude(m: &VectorField) -> VectorField {
    let mesh: Mesh = m.mesh;
    let mut fft = Fft3::new(mesh.size());
    let mut out = VectorField::new(mesh);
    let mut buf = vec![Complex::new(0.0, 0.0); mesh.n_cells()];
    for c in 0..3 {
        for (b, v) in buf.iter_mut().zip(m.data.iter()) {
            *b = Complex::new(v[c], 0.0);
        }
        fft.forward(&mut buf);
        for (o, b) in out.data.iter_mut().zip(buf.iter()) {
            o[c] = b.norm();
        }
    }
    out
}
