// src/effective_field/demag.rs
//
// Magnetostatic (demagnetising) field via FFT-accelerated convolution.
//
// We compute (discrete convolution):
//   B_demag_i = K_ij * M_j
// where M = Ms * m is magnetisation in A/m and B_demag is in Tesla.
//
// - Zero-padding to 2N along every axis with N > 1 (open boundaries).
// - A volume-averaged rectangular-prism kernel K_ij computed numerically by
//   integrating face charges over the source cell and averaging over the
//   destination cell (the MuMax3 approach).
// - For a single cubic cell the self-demag factor is exactly 1/3:
//     B = -mu0/3 * M (component-wise), off-diagonals 0.
// - Thin films (Nz = 1) drop the XZ/YZ couplings, which vanish by symmetry.
//
// The kernel is built lazily on first use and kept for the lifetime of the engine.

use std::f64::consts::PI;

use rayon::prelude::*;
use rustfft::num_complex::Complex;

use crate::fft::Fft3;
use crate::mesh::Mesh;
use crate::params::{ScalarParam, MU0};
use crate::regions::Regions;
use crate::vector_field::VectorField;

// Kernel tensor component slots.
const XX: usize = 0;
const XY: usize = 1;
const XZ: usize = 2;
const YY: usize = 3;
const YZ: usize = 4;
const ZZ: usize = 5;

// Demag kernel accuracy parameter (MuMax default is 6.0).
// Larger => more integration points near-field => more accurate, slower init.
const DEMAG_ACCURACY: f64 = 6.0;

/// Demag field switch plus the lazily built convolution kernel.
pub struct Demag {
    enabled: bool,
    kernel: Option<DemagKernel>,
}

impl Demag {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            kernel: None,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the convolution kernel has been built (i.e. the kernel ran at least once).
    pub fn kernel_built(&self) -> bool {
        self.kernel.is_some()
    }

    /// Overwrite `dst` with B_demag (Tesla) for magnetisation `m`.
    pub fn set_field(
        &mut self,
        m: &VectorField,
        regions: &Regions,
        msat: &ScalarParam,
        dst: &mut VectorField,
    ) {
        let mesh = m.mesh;
        let rebuild = match self.kernel.as_ref() {
            Some(k) => k.mesh != mesh,
            None => true,
        };
        if rebuild {
            log::info!("building demag kernel for {}", mesh.user_string());
            self.kernel = Some(DemagKernel::new(mesh));
        }
        if let Some(k) = self.kernel.as_mut() {
            k.exec(m, regions, msat, dst);
        }
    }
}

struct DemagKernel {
    mesh: Mesh,
    /// Padded box, [pz, py, px].
    pad: [usize; 3],
    /// Kernel in Fourier domain (Tesla per (A/m)), slots XX..ZZ.
    k: [Vec<Complex<f64>>; 6],
    /// Scratch for M (in) and B (out), one buffer per component.
    mbuf: [Vec<Complex<f64>>; 3],
    bbuf: [Vec<Complex<f64>>; 3],
    fft: Fft3,
}

#[inline]
fn wrap_index(d: isize, n: usize) -> usize {
    d.rem_euclid(n as isize) as usize
}

#[inline]
fn padded(n: usize) -> usize {
    if n > 1 {
        2 * n
    } else {
        1
    }
}

impl DemagKernel {
    fn new(mesh: Mesh) -> Self {
        let [nx, ny, nz] = mesh.grid_size();
        let cell = mesh.cell_size();
        let (px, py, pz) = (padded(nx), padded(ny), padded(nz));
        let n_pad = px * py * pz;
        let zero = Complex::new(0.0, 0.0);

        // Fill only the linear-convolution range: displacements in [-(N-1), +(N-1)].
        let (rx, ry, rz) = (nx as isize - 1, ny as isize - 1, nz as isize - 1);
        let mut disps = Vec::new();
        for sz in -rz..=rz {
            for sy in -ry..=ry {
                for sx in -rx..=rx {
                    disps.push([sx, sy, sz]);
                }
            }
        }
        let tensors: Vec<[f64; 6]> = disps
            .par_iter()
            .map(|&d| prism_kernel_tensor(cell, d))
            .collect();

        let mut k: [Vec<Complex<f64>>; 6] = std::array::from_fn(|_| vec![zero; n_pad]);
        for (d, t) in disps.iter().zip(tensors.iter()) {
            let idx = (wrap_index(d[2], pz) * py + wrap_index(d[1], py)) * px + wrap_index(d[0], px);
            for (slot, kc) in k.iter_mut().enumerate() {
                kc[idx].re = t[slot];
            }
        }
        if nz == 1 {
            k[XZ].fill(zero);
            k[YZ].fill(zero);
        }

        let mut fft = Fft3::new([pz, py, px]);
        for kc in k.iter_mut() {
            fft.forward(kc);
        }

        Self {
            mesh,
            pad: [pz, py, px],
            k,
            mbuf: std::array::from_fn(|_| vec![zero; n_pad]),
            bbuf: std::array::from_fn(|_| vec![zero; n_pad]),
            fft,
        }
    }

    #[inline]
    fn padded_index(&self, cell: [usize; 3]) -> usize {
        (cell[0] * self.pad[1] + cell[1]) * self.pad[2] + cell[2]
    }

    fn exec(&mut self, m: &VectorField, regions: &Regions, msat: &ScalarParam, dst: &mut VectorField) {
        debug_assert_eq!(m.mesh, self.mesh);
        let zero = Complex::new(0.0, 0.0);
        for b in self.mbuf.iter_mut() {
            b.fill(zero);
        }

        // Pack M = Ms*m into the low corner of the padded box.
        for (idx, v) in m.data.iter().enumerate() {
            let p = self.padded_index(self.mesh.coords(idx));
            let ms = msat.at(regions.get(idx));
            for c in 0..3 {
                self.mbuf[c][p].re = ms * v[c];
            }
        }

        for b in self.mbuf.iter_mut() {
            self.fft.forward(b);
        }

        // Multiply in k-space: B = K * M (K symmetric).
        let k = &self.k;
        let [mx, my, mz] = &self.mbuf;
        let [bx, by, bz] = &mut self.bbuf;
        bx.par_iter_mut()
            .zip(by.par_iter_mut())
            .zip(bz.par_iter_mut())
            .enumerate()
            .for_each(|(i, ((bx, by), bz))| {
                let (mx, my, mz) = (mx[i], my[i], mz[i]);
                *bx = k[XX][i] * mx + k[XY][i] * my + k[XZ][i] * mz;
                *by = k[XY][i] * mx + k[YY][i] * my + k[YZ][i] * mz;
                *bz = k[XZ][i] * mx + k[YZ][i] * my + k[ZZ][i] * mz;
            });

        for b in self.bbuf.iter_mut() {
            self.fft.inverse(b);
        }

        for (idx, out) in dst.data.iter_mut().enumerate() {
            let p = self.padded_index(self.mesh.coords(idx));
            *out = [self.bbuf[0][p].re, self.bbuf[1][p].re, self.bbuf[2][p].re];
        }
    }
}

/// Demag kernel element via face-charge integration + volume averaging.
///
/// `cell` and `disp` are in [x, y, z] order. Returns (Kxx, Kxy, Kxz, Kyy, Kyz, Kzz)
/// in Tesla per (A/m), so that B = K * M.
pub(crate) fn prism_kernel_tensor(cell: [f64; 3], disp: [isize; 3]) -> [f64; 6] {
    let [dx, dy, dz] = cell;

    // Exact cube self-term.
    if disp == [0, 0, 0] {
        let cube = (dx - dy).abs() < 1e-15 * dx && (dy - dz).abs() < 1e-15 * dx;
        if cube {
            let k = -MU0 / 3.0;
            return [k, 0.0, 0.0, k, 0.0, k];
        }
    }

    // Destination cell centre relative to source cell centre.
    let r_center = [
        disp[0] as f64 * dx,
        disp[1] as f64 * dy,
        disp[2] as f64 * dz,
    ];

    // K_{i,j} = B_i due to unit magnetisation along j.
    let mut k = [[0.0_f64; 3]; 3];
    for source_axis in 0..3 {
        let h = h_from_unit_m(source_axis, r_center, cell, disp, DEMAG_ACCURACY);
        // B = μ0 H
        for dest_axis in 0..3 {
            k[dest_axis][source_axis] = MU0 * h[dest_axis];
        }
    }

    // Enforce reciprocity numerically: Kxy = Kyx, etc.
    [
        k[0][0],
        0.5 * (k[0][1] + k[1][0]),
        0.5 * (k[0][2] + k[2][0]),
        k[1][1],
        0.5 * (k[1][2] + k[2][1]),
        k[2][2],
    ]
}

/// Field H at displacement `r_center` due to a unit magnetisation along
/// `source_axis` (0=x, 1=y, 2=z), averaged over the destination cell.
fn h_from_unit_m(
    source_axis: usize,
    r_center: [f64; 3],
    cell: [f64; 3],
    disp: [isize; 3],
    accuracy: f64,
) -> [f64; 3] {
    // u = source axis, v,w perpendicular axes
    let u = source_axis;
    let v = (u + 1) % 3;
    let w = (u + 2) % 3;

    let lmin = cell[0].min(cell[1]).min(cell[2]);

    // Closest distance between the two cells (not centres).
    let gap = [
        delta_cell(disp[0]) * cell[0],
        delta_cell(disp[1]) * cell[1],
        delta_cell(disp[2]) * cell[2],
    ];
    let mut d = (gap[0] * gap[0] + gap[1] * gap[1] + gap[2] * gap[2]).sqrt();
    if d == 0.0 {
        d = lmin;
    }

    // Maximum acceptable integration element size.
    let max_size = d / accuracy;
    let count = |len: f64| (len / max_size).ceil().max(1.0) as usize;

    // Integration counts over the destination volume.
    let (nx, ny, nz) = (count(cell[0]), count(cell[1]), count(cell[2]));
    // Staggered face sampling.
    let nv = 2 * count(cell[v]);
    let nw = 2 * count(cell[w]);

    let scale = 1.0 / ((nv * nw * nx * ny * nz) as f64);
    let charge = cell[v] * cell[w] * scale;

    let pu1 = 0.5 * cell[u];
    let pu2 = -0.5 * cell[u];

    let sample = |centre: f64, len: f64, n: usize, i: usize| {
        centre - 0.5 * len + len / (2.0 * n as f64) + (i as f64) * (len / n as f64)
    };

    let mut pole = [0.0_f64; 3];
    let mut h = [0.0_f64; 3];

    for i in 0..nv {
        pole[v] = sample(0.0, cell[v], nv, i);
        for j in 0..nw {
            pole[w] = sample(0.0, cell[w], nw, j);

            for ax in 0..nx {
                let rx = sample(r_center[0], cell[0], nx, ax);
                for ay in 0..ny {
                    let ry = sample(r_center[1], cell[1], ny, ay);
                    for az in 0..nz {
                        let rz = sample(r_center[2], cell[2], nz, az);

                        // + pole
                        pole[u] = pu1;
                        let r1 = [rx - pole[0], ry - pole[1], rz - pole[2]];
                        let n1 = (r1[0] * r1[0] + r1[1] * r1[1] + r1[2] * r1[2]).sqrt();
                        let q1 = charge / (4.0 * PI * n1 * n1 * n1);

                        // - pole
                        pole[u] = pu2;
                        let r2 = [rx - pole[0], ry - pole[1], rz - pole[2]];
                        let n2 = (r2[0] * r2[0] + r2[1] * r2[1] + r2[2] * r2[2]).sqrt();
                        let q2 = -charge / (4.0 * PI * n2 * n2 * n2);

                        h[0] += r1[0] * q1 + r2[0] * q2;
                        h[1] += r1[1] * q1 + r2[1] * q2;
                        h[2] += r1[2] * q1 + r2[2] * q2;
                    }
                }
            }
        }
    }

    h
}

/// Closest distance between cells, in cells, given the integer centre distance.
/// Touching cells (even at a corner) give 0: |d|=0 => 0; |d|=1 => 0; |d|=2 => 1.
#[inline]
fn delta_cell(d: isize) -> f64 {
    (d.unsigned_abs().saturating_sub(1)) as f64
}
