use faer::prelude::*;
use itertools::izip;

use crate::elements::beams::Beam;
use crate::geometry::Vector3;
use crate::util::{col3, set_col3};

/// Fictitious dynamics of one beam during relaxation.
#[derive(Debug, Clone)]
pub struct BeamState {
    pub v: Mat<f64>, // [3][n_vertices] Translational velocity
    pub w: Col<f64>, // [n_vertices]    Twist rate about the tangent
    pub m: Col<f64>, // [n_vertices]    Lumped translational mass
    pub j: Col<f64>, // [n_vertices]    Lumped twist inertia
}

impl BeamState {
    pub fn new(n_vertices: usize) -> Self {
        Self {
            v: Mat::zeros(3, n_vertices),
            w: Col::zeros(n_vertices),
            m: Col::zeros(n_vertices),
            j: Col::zeros(n_vertices),
        }
    }

    pub fn n_vertices(&self) -> usize {
        self.m.nrows()
    }

    /// Recomputes the lumped masses from the current beam stiffness.
    pub fn update_masses(&mut self, beam: &Beam, dt: f64, factor: f64) {
        beam.lumped_masses(dt, factor, self.m.as_mut(), self.j.as_mut());
    }

    /// Adds a stiffness contribution `k` to the mass of vertex `i`.
    pub fn add_mass_stiffness(&mut self, i: usize, k: f64, dt: f64, factor: f64) {
        self.m[i] += factor * dt * dt * k;
    }

    /// Velocity update `v += fac R / m` on free degrees of freedom; held
    /// degrees of freedom keep a zero velocity.
    pub fn accelerate(&mut self, beam: &Beam, fac: f64) {
        let fr = beam.residual_force();
        let mr = beam.residual_moment();
        izip!(0..self.n_vertices(), self.m.as_ref().iter(), self.j.as_ref().iter(), self.w.as_mut().iter_mut()).for_each(
            |(i, &m, &j, w)| {
                if beam.is_translation_fixed(i) {
                    set_col3(&mut self.v, i, Vector3::ZERO);
                } else {
                    let v = col3(&self.v, i) + col3(fr, i) * (fac / m);
                    set_col3(&mut self.v, i, v);
                }
                *w = if beam.is_twist_fixed(i) {
                    0.
                } else {
                    *w + fac * mr[(2, i)] / inertia(j)
                };
            },
        );
    }

    /// Kinetic energy `½ Σ m v² + ½ Σ J ω²`.
    pub fn kinetic_energy(&self) -> f64 {
        let translation = izip!(self.v.col_iter(), self.m.as_ref().iter())
            .map(|(v, &m)| m * v.iter().map(|v| v * v).sum::<f64>())
            .sum::<f64>();
        let twist = izip!(self.w.as_ref().iter(), self.j.as_ref().iter())
            .map(|(&w, &j)| j * w * w)
            .sum::<f64>();
        (translation + twist) / 2.
    }

    /// Moves the beam by one time step at the current velocities.
    pub fn displace(&self, beam: &mut Beam, dt: f64) {
        (0..self.n_vertices()).for_each(|i| {
            let v = col3(&self.v, i);
            if v != Vector3::ZERO {
                beam.translate_vertex(i, v * dt);
            }
            beam.rotate_vertex(i, self.w[i] * dt);
        });
    }

    /// Moves free degrees of freedom back to the estimated kinetic energy
    /// peak, `x += -1.5 dt v + dt²/2 R / m`.
    pub fn rollback(&self, beam: &mut Beam, dt: f64) {
        let (fr, mr) = (beam.residual_force().clone(), beam.residual_moment().clone());
        (0..self.n_vertices()).for_each(|i| {
            if !beam.is_translation_fixed(i) {
                let dx =
                    col3(&self.v, i) * (-1.5 * dt) + col3(&fr, i) * (dt * dt / 2. / self.m[i]);
                beam.translate_vertex(i, dx);
            }
            if !beam.is_twist_fixed(i) {
                let angle = -1.5 * dt * self.w[i] + dt * dt / 2. * mr[(2, i)] / inertia(self.j[i]);
                beam.rotate_vertex(i, angle);
            }
        });
    }

    /// Zeroes every velocity.
    pub fn stop(&mut self) {
        self.v.fill(0.);
        self.w.fill(0.);
    }
}

#[inline]
fn inertia(j: f64) -> f64 {
    j + 1e-30
}
