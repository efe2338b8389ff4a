use faer::prelude::*;
use itertools::izip;
use serde::Deserialize;
use std::sync::Arc;

use crate::centerline::{self, Topology};
use crate::geometry::{Frame, Vector3, EPS};
use crate::section::SectionProperties;
use crate::util::{add_col3, col3, set_col3};

/// Degrees of freedom tracked per vertex. The variant decides which
/// mechanical channels are active; inactive channels report zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DofModel {
    /// 3 translations, axial response only
    Cable,
    /// 3 translations, axial + bending + shear, no material twist
    Bending3,
    /// 3 translations + twist about the tangent
    #[default]
    Rod4,
}

impl DofModel {
    pub fn has_bending(self) -> bool {
        !matches!(self, DofModel::Cable)
    }

    pub fn has_shear(self) -> bool {
        self.has_bending()
    }

    pub fn has_twist(self) -> bool {
        matches!(self, DofModel::Rod4)
    }
}

#[inline]
/// Calculate edge vectors and lengths from vertex positions
pub fn calc_edges(e: &mut Mat<f64>, l: ColMut<f64>, frames: &[Frame], topology: Topology) {
    let nv = frames.len();
    izip!(0..topology.edge_count(nv), l.iter_mut()).for_each(|(j, l)| {
        let (a, b) = topology.edge_vertices(j, nv);
        let v = frames[b].origin - frames[a].origin;
        set_col3(e, j, v);
        *l = v.norm();
    });
}

#[inline]
/// Calculate axial strain ε = l / l0 - 1
pub fn calc_strain(mut strain: ColMut<f64>, l: ColRef<f64>, l0: ColRef<f64>) {
    zip!(&mut strain, &l, &l0).for_each(|unzip!(s, l, l0)| *s = *l / *l0 - 1.);
}

#[inline]
/// Calculate axial force from the section law, including thermal strain
pub fn calc_axial_force(
    n: ColMut<f64>,
    strain: ColRef<f64>,
    sections: &[Arc<SectionProperties>],
    delta_t: f64,
) {
    izip!(n.iter_mut(), strain.iter(), sections.iter())
        .for_each(|(n, &strain, s)| *n = s.axial_force(strain, delta_t));
}

#[inline]
/// Calculate curvature binormal at each vertex from the edge vectors
pub fn calc_curvature(kb: &mut Mat<f64>, e: &Mat<f64>, topology: Topology) {
    let nv = kb.ncols();
    (0..nv).for_each(|i| {
        let k = match topology.adjacent_edges(i, nv) {
            (Some(a), Some(b)) => centerline::curvature_binormal(col3(e, a), col3(e, b)),
            _ => Vector3::ZERO,
        };
        set_col3(kb, i, k);
    });
}

#[inline]
/// Project curvature binormal onto the material axes, `[2][n_vertices]`
pub fn calc_material_curvature(kappa: &mut Mat<f64>, kb: &Mat<f64>, frames: &[Frame]) {
    frames.iter().enumerate().for_each(|(i, f)| {
        let k = col3(kb, i);
        kappa[(0, i)] = k.dot(f.xaxis);
        kappa[(1, i)] = k.dot(f.yaxis);
    });
}

#[inline]
/// Calculate bending moments M1 = EI1 (κ1 - κ̄1), M2 = EI2 (κ2 - κ̄2).
/// Local components go into rows 0/1 of `mr`, the global moment into `m`.
pub fn calc_bending_moment(
    m: &mut Mat<f64>,
    mr: &mut Mat<f64>,
    kappa: &Mat<f64>,
    kappa0: &Mat<f64>,
    ei: &Mat<f64>,
    frames: &[Frame],
) {
    frames.iter().enumerate().for_each(|(i, f)| {
        let m1 = ei[(0, i)] * (kappa[(0, i)] - kappa0[(0, i)]);
        let m2 = ei[(1, i)] * (kappa[(1, i)] - kappa0[(1, i)]);
        mr[(0, i)] = m1;
        mr[(1, i)] = m2;
        set_col3(m, i, f.xaxis * m1 + f.yaxis * m2);
    });
}

#[inline]
/// Calculate twist rate on each edge
pub fn calc_twist(tau: ColMut<f64>, frames: &[Frame], topology: Topology) {
    izip!(tau.iter_mut(), centerline::twists(frames, topology)).for_each(|(tau, t)| *tau = t);
}

#[inline]
/// Calculate twisting moment Q = GJ (τ - τ̄)
pub fn calc_twisting_moment(
    q: ColMut<f64>,
    tau: ColRef<f64>,
    tau0: ColRef<f64>,
    sections: &[Arc<SectionProperties>],
) {
    izip!(q.iter_mut(), tau.iter(), tau0.iter(), sections.iter())
        .for_each(|(q, &tau, &tau0, s)| *q = s.gj * (tau - tau0));
}

#[inline]
/// Twist residual at each vertex:
/// `Q_next - Q_prev + ℓ (M2 κ1 - M1 κ2) + mext · t`.
/// The curvature coupling is only evaluated where both edges exist.
pub fn calc_twist_residual(
    mr: &mut Mat<f64>,
    q: ColRef<f64>,
    kappa: &Mat<f64>,
    l: ColRef<f64>,
    mext: &Mat<f64>,
    frames: &[Frame],
    topology: Topology,
) {
    let nv = frames.len();
    (0..nv).for_each(|i| {
        let mut r = col3(mext, i).dot(frames[i].zaxis);
        let (prev, next) = topology.adjacent_edges(i, nv);
        if let Some(b) = next {
            r += q[b];
        }
        if let Some(a) = prev {
            r -= q[a];
        }
        if let (Some(a), Some(b)) = (prev, next) {
            let ell = (l[a] + l[b]) / 2.;
            r += ell * (mr[(1, i)] * kappa[(0, i)] - mr[(0, i)] * kappa[(1, i)]);
        }
        mr[(2, i)] = r;
    });
}

/// Share of a vertex's external moment taken by the edge before it and by
/// the edge after it.
#[inline]
fn moment_split(prev: Option<usize>, next: Option<usize>) -> (f64, f64) {
    match (prev, next) {
        (Some(_), Some(_)) => (0.5, 0.5),
        (None, _) => (0., 1.),
        (_, None) => (1., 0.),
    }
}

#[inline]
/// Calculate shear force on each edge from the moment jump across it,
/// `V = u × (M_b - M_a + Q (t_b - t_a)) / l`, with external moments normal
/// to the tangent added to the vertex moments.
pub fn calc_shear(
    v: &mut Mat<f64>,
    m: &Mat<f64>,
    q: ColRef<f64>,
    mext: &Mat<f64>,
    e: &Mat<f64>,
    l: ColRef<f64>,
    frames: &[Frame],
    topology: Topology,
) {
    let nv = frames.len();
    (0..topology.edge_count(nv)).for_each(|j| {
        let (a, b) = topology.edge_vertices(j, nv);
        if l[j] < EPS {
            set_col3(v, j, Vector3::ZERO);
            return;
        }
        let (ta, tb) = (frames[a].zaxis, frames[b].zaxis);

        // Moment on the right of vertex a and on the left of vertex b
        let (pa, na) = topology.adjacent_edges(a, nv);
        let (pb, nb) = topology.adjacent_edges(b, nv);
        let (_, wr) = moment_split(pa, na);
        let (wl, _) = moment_split(pb, nb);
        let right_a = col3(m, a) - col3(mext, a).reject(ta) * wr;
        let left_b = col3(m, b) + col3(mext, b).reject(tb) * wl;

        let dm = left_b - right_a + (tb - ta) * q[j];
        let u = col3(e, j) / l[j];
        set_col3(v, j, u.cross(dm) / l[j]);
    });
}

#[inline]
/// Assemble the force residual: external forces plus `N u + V` on the first
/// vertex of each edge and minus it on the second.
pub fn calc_force_residual(
    fr: &mut Mat<f64>,
    fext: &Mat<f64>,
    n: ColRef<f64>,
    v: &Mat<f64>,
    e: &Mat<f64>,
    l: ColRef<f64>,
    topology: Topology,
) {
    let nv = fr.ncols();
    fr.copy_from(fext);
    (0..topology.edge_count(nv)).for_each(|j| {
        let (a, b) = topology.edge_vertices(j, nv);
        let u = if l[j] < EPS {
            Vector3::ZERO
        } else {
            col3(e, j) / l[j]
        };
        let f = u * n[j] + col3(v, j);
        add_col3(fr, a, f);
        add_col3(fr, b, -f);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::section::CrossSection;
    use itertools::Itertools;

    fn section() -> Arc<SectionProperties> {
        Arc::new(
            SectionProperties::new(
                CrossSection::Custom {
                    area: 1.,
                    i1: 1.,
                    i2: 1.,
                    j: 1.,
                },
                Arc::new(Material::linear(1., 100., 0., 0.)),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_dof_model_channels() {
        assert!(!DofModel::Cable.has_bending());
        assert!(!DofModel::Bending3.has_twist());
        assert!(DofModel::Rod4.has_twist() && DofModel::Rod4.has_shear());
    }

    #[test]
    fn test_stretched_cable_forces_balance() {
        let frames = (0..3)
            .map(|i| Frame::new(Vector3::new(1.1 * i as f64, 0., 0.), Vector3::X, Vector3::Y))
            .collect_vec();
        let mut e = Mat::zeros(3, 2);
        let mut l = Col::zeros(2);
        calc_edges(&mut e, l.as_mut(), &frames, Topology::Open);
        let l0 = Col::from_fn(2, |_| 1.);
        let mut strain = Col::zeros(2);
        calc_strain(strain.as_mut(), l.as_ref(), l0.as_ref());
        assert!((strain[0] - 0.1).abs() < 1e-12);

        let sections = vec![section(); 2];
        let mut n = Col::zeros(2);
        calc_axial_force(n.as_mut(), strain.as_ref(), &sections, 0.);
        assert!((n[1] - 10.).abs() < 1e-9);

        let mut fr = Mat::zeros(3, 3);
        calc_force_residual(
            &mut fr,
            &Mat::zeros(3, 3),
            n.as_ref(),
            &Mat::zeros(3, 2),
            &e,
            l.as_ref(),
            Topology::Open,
        );
        // Ends are pulled inward, the middle vertex is balanced
        assert!((fr[(0, 0)] - 10.).abs() < 1e-9);
        assert!(fr[(0, 1)].abs() < 1e-9);
        assert!((fr[(0, 2)] + 10.).abs() < 1e-9);
    }

    #[test]
    fn test_shear_from_end_moment() {
        // Single edge, pure tip moment about d1: the moment is carried by the
        // edge, no shear is needed for a straight rod
        let frames = (0..2)
            .map(|i| Frame::new(Vector3::new(i as f64, 0., 0.), Vector3::X, Vector3::Y))
            .collect_vec();
        let mut e = Mat::zeros(3, 1);
        let mut l = Col::zeros(1);
        calc_edges(&mut e, l.as_mut(), &frames, Topology::Open);
        let mut mext = Mat::zeros(3, 2);
        set_col3(&mut mext, 1, Vector3::Y);
        let mut v = Mat::zeros(3, 1);
        calc_shear(
            &mut v,
            &Mat::zeros(3, 2),
            Col::<f64>::zeros(1).as_ref(),
            &mext,
            &e,
            l.as_ref(),
            &frames,
            Topology::Open,
        );
        // u × M / l = X × Y = Z: the moment is equilibrated by a force couple
        assert!((col3(&v, 0) - Vector3::Z).norm() < 1e-14);
    }
}
