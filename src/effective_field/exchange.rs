// src/effective_field/exchange.rs

use rayon::prelude::*;

use crate::material::Material;
use crate::regions::Regions;
use crate::vector_field::VectorField;

/// Add the exchange induction B_exch = (2 A / Ms) ∇²m (Tesla) to `dst`.
///
/// Six-point stencil with free (Neumann) boundaries. The link from a cell to
/// its +axis neighbour is scaled by `mask` (per-cell, [x, y, z] components),
/// so a zero mask entry decouples the two cells.
pub fn add_exchange_field(
    m: &VectorField,
    mask: &VectorField,
    regions: &Regions,
    material: &Material,
    dst: &mut VectorField,
) {
    let mesh = m.mesh;
    let size = mesh.size();
    let cell = mesh.cell();
    let aex = material.aex();
    let msat = material.msat();

    dst.data.par_iter_mut().enumerate().for_each(|(i, b)| {
        let r = regions.get(i);
        let coeff = 2.0 * aex.at(r) / msat.at(r);
        if coeff == 0.0 {
            return;
        }
        let mi = m.data[i];
        let c = mesh.coords(i);
        let mut lap = [0.0; 3];

        for axis in 0..3 {
            if size[axis] == 1 {
                continue;
            }
            let stride = mesh.stride(axis);
            // internal axis 0 = z -> user component 2
            let comp = 2 - axis;
            let inv_d2 = 1.0 / (cell[axis] * cell[axis]);

            if c[axis] + 1 < size[axis] {
                let j = i + stride;
                let w = mask.data[i][comp] * inv_d2;
                for k in 0..3 {
                    lap[k] += w * (m.data[j][k] - mi[k]);
                }
            }
            if c[axis] > 0 {
                let j = i - stride;
                let w = mask.data[j][comp] * inv_d2;
                for k in 0..3 {
                    lap[k] += w * (m.data[j][k] - mi[k]);
                }
            }
        }

        b[0] += coeff * lap[0];
        b[1] += coeff * lap[1];
        b[2] += coeff * lap[2];
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;

    fn setup(nx: usize) -> (Mesh, Material, Regions, VectorField) {
        let mesh = Mesh::new(nx, 1, 1, 2e-9, 2e-9, 2e-9).unwrap();
        let mut mat = Material::default();
        mat.set_msat_all(8e5);
        mat.aex_mut().set_all(13e-12);
        let mut mask = VectorField::new(mesh);
        mask.set_uniform([1.0; 3]);
        (mesh, mat, Regions::new(mesh), mask)
    }

    #[test]
    fn uniform_magnetisation_has_no_exchange_field() {
        let (mesh, mat, regions, mask) = setup(5);
        let mut m = VectorField::new(mesh);
        m.set_uniform([0.0, 0.6, 0.8]);
        let mut b = VectorField::new(mesh);
        add_exchange_field(&m, &mask, &regions, &mat, &mut b);
        assert!(b.max_norm() == 0.0);
    }

    #[test]
    fn middle_cell_sees_discrete_laplacian() {
        let (mesh, mat, regions, mask) = setup(3);
        let mut m = VectorField::new(mesh);
        m.data[0] = [1.0, 0.0, 0.0];
        m.data[1] = [0.0, 0.0, 1.0];
        m.data[2] = [0.0, 1.0, 0.0];
        let mut b = VectorField::new(mesh);
        add_exchange_field(&m, &mask, &regions, &mat, &mut b);

        let coeff = 2.0 * 13e-12 / 8e5 / (2e-9 * 2e-9);
        let expected = [coeff, coeff, -2.0 * coeff];
        for k in 0..3 {
            assert!((b.data[1][k] - expected[k]).abs() < 1e-12 * coeff);
        }
        // Edge cell only couples to its single neighbour.
        assert!((b.data[0][0] + coeff).abs() < 1e-12 * coeff);
        assert!((b.data[0][2] - coeff).abs() < 1e-12 * coeff);
    }

    #[test]
    fn zero_mask_decouples_cells() {
        let (mesh, mat, regions, mut mask) = setup(2);
        mask.data[0] = [0.0, 1.0, 1.0];
        let mut m = VectorField::new(mesh);
        m.data[0] = [1.0, 0.0, 0.0];
        m.data[1] = [0.0, 0.0, 1.0];
        let mut b = VectorField::new(mesh);
        add_exchange_field(&m, &mask, &regions, &mat, &mut b);
        assert_eq!(b.max_norm(), 0.0);
    }

    #[test]
    fn accumulates_into_existing_contents() {
        let (mesh, mat, regions, mask) = setup(3);
        let mut m = VectorField::new(mesh);
        m.set_uniform([0.0, 0.0, 1.0]);
        let mut b = VectorField::new(mesh);
        b.set_uniform([0.1, 0.2, 0.3]);
        add_exchange_field(&m, &mask, &regions, &mat, &mut b);
        assert!(b.data.iter().all(|v| *v == [0.1, 0.2, 0.3]));
    }
}
