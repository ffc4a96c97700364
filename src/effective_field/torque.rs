// src/effective_field/torque.rs
//
// Torques in induction units (Tesla); dm/dt = gamma * torque.
//
// Landau-Lifshitz:
//   tau_LL = -1/(1+alpha^2) [ m x B + alpha m x (m x B) ]
//
// Zhang-Li spin-transfer torque for an in-plane current density j:
//   u      = j P mu_B / (e Ms (1 + xi^2))        (m/s)
//   hspin  = (u · ∇) m
//   tau_ZL = -1/((1+alpha^2) gamma) [ (1 + xi alpha) m x (m x hspin)
//                                     + (xi - alpha) m x hspin ]

use rayon::prelude::*;

use crate::effective_field::derivative;
use crate::material::Material;
use crate::mesh::reverse;
use crate::params::{MU_B, Q_E};
use crate::regions::Regions;
use crate::vec3::cross;
use crate::vector_field::VectorField;

/// Transform `b` (holding B_eff) in place into the Landau-Lifshitz torque.
pub fn ll_torque(m: &VectorField, regions: &Regions, material: &Material, b: &mut VectorField) {
    let alpha = material.alpha();
    b.data
        .par_iter_mut()
        .zip(m.data.par_iter())
        .enumerate()
        .for_each(|(i, (bi, mi))| {
            let a = alpha.at(regions.get(i));
            let mxb = cross(*mi, *bi);
            let mxmxb = cross(*mi, mxb);
            let pre = -1.0 / (1.0 + a * a);
            for k in 0..3 {
                bi[k] = pre * (mxb[k] + a * mxmxb[k]);
            }
        });
}

/// Add the Zhang-Li spin-transfer torque for current density `j` ([x, y, z], A/m^2).
pub fn add_zhang_li_torque(
    m: &VectorField,
    regions: &Regions,
    material: &Material,
    j: [f64; 3],
    gamma: f64,
    dst: &mut VectorField,
) {
    // Pair each current component with the derivative along the same mesh axis.
    let j_mesh = reverse(j);
    let msat = material.msat();
    let alpha = material.alpha();
    let xi = material.xi();
    let pol = material.spin_pol();

    dst.data.par_iter_mut().enumerate().for_each(|(i, t)| {
        let r = regions.get(i);
        let ms = msat.at(r);
        if ms == 0.0 {
            return;
        }
        let a = alpha.at(r);
        let x = xi.at(r);
        let b = pol.at(r) * MU_B / (Q_E * ms * (1.0 + x * x));

        let mut hspin = [0.0; 3];
        for axis in 0..3 {
            let u = j_mesh[axis] * b;
            if u == 0.0 {
                continue;
            }
            let dm = derivative(m, i, axis);
            for k in 0..3 {
                hspin[k] += u * dm[k];
            }
        }

        let mi = m.data[i];
        let mxh = cross(mi, hspin);
        let mxmxh = cross(mi, mxh);
        let pre = -1.0 / ((1.0 + a * a) * gamma);
        let c1 = 1.0 + x * a;
        let c2 = x - a;

        t[0] += pre * (c1 * mxmxh[0] + c2 * mxh[0]);
        t[1] += pre * (c1 * mxmxh[1] + c2 * mxh[1]);
        t[2] += pre * (c1 * mxmxh[2] + c2 * mxh[2]);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::params::GAMMA_E_RAD_PER_S_T;
    use crate::vec3::dot;

    fn material(alpha: f64) -> Material {
        let mut mat = Material::default();
        mat.set_msat_all(8e5);
        mat.alpha_mut().set_all(alpha);
        mat
    }

    #[test]
    fn undamped_torque_is_precession() {
        let mesh = Mesh::new(2, 1, 1, 1e-9, 1e-9, 1e-9).unwrap();
        let mut m = VectorField::new(mesh);
        m.set_uniform([1.0, 0.0, 0.0]);
        let mut b = VectorField::new(mesh);
        b.set_uniform([0.0, 0.0, 1.0]);
        ll_torque(&m, &Regions::new(mesh), &material(0.0), &mut b);
        // -(x × z) = +y
        assert!(b.data.iter().all(|v| *v == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn ll_torque_is_perpendicular_to_m() {
        let mesh = Mesh::new(2, 1, 1, 1e-9, 1e-9, 1e-9).unwrap();
        let mut m = VectorField::new(mesh);
        m.set_uniform([0.6, 0.0, 0.8]);
        let mut b = VectorField::new(mesh);
        b.set_uniform([0.1, -0.3, 0.5]);
        ll_torque(&m, &Regions::new(mesh), &material(0.1), &mut b);
        for (t, mi) in b.data.iter().zip(&m.data) {
            assert!(dot(*t, *mi).abs() < 1e-15);
        }
    }

    #[test]
    fn uniform_state_has_no_spin_torque() {
        let mesh = Mesh::new(4, 4, 1, 1e-9, 1e-9, 1e-9).unwrap();
        let mut m = VectorField::new(mesh);
        m.set_uniform([0.0, 0.0, 1.0]);
        let mut t = VectorField::new(mesh);
        add_zhang_li_torque(
            &m,
            &Regions::new(mesh),
            &material(0.1),
            [1e12, 0.0, 0.0],
            GAMMA_E_RAD_PER_S_T,
            &mut t,
        );
        assert_eq!(t.max_norm(), 0.0);
    }

    #[test]
    fn current_along_x_only_sees_x_gradient() {
        // m varies along y only; a current along x must see no gradient.
        let mesh = Mesh::new(2, 3, 1, 1e-9, 1e-9, 1e-9).unwrap();
        let mut m = VectorField::new(mesh);
        for iy in 0..3 {
            let th = 0.3 * iy as f64;
            for ix in 0..2 {
                m.data[mesh.idx(ix, iy, 0)] = [th.sin(), 0.0, th.cos()];
            }
        }
        let regions = Regions::new(mesh);
        let mat = material(0.1);

        let mut tx = VectorField::new(mesh);
        add_zhang_li_torque(&m, &regions, &mat, [1e12, 0.0, 0.0], GAMMA_E_RAD_PER_S_T, &mut tx);
        assert_eq!(tx.max_norm(), 0.0);

        let mut ty = VectorField::new(mesh);
        add_zhang_li_torque(&m, &regions, &mat, [0.0, 1e12, 0.0], GAMMA_E_RAD_PER_S_T, &mut ty);
        assert!(ty.max_norm() > 0.0);
    }
}
