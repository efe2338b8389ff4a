//! Support conditions at the two ends of an open rod.
//!
//! The hooks are called by the beam in a fixed order every iteration:
//! [`BoundaryCondition::enforce_mr`] once bending moments are known,
//! [`BoundaryCondition::enforce_qr`] once the twist residual is known, and
//! [`BoundaryCondition::enforce_fr`] once the force residual is assembled.

use faer::prelude::*;
use serde::Deserialize;

use crate::centerline::Topology;
use crate::error::{KdrError, Result};
use crate::geometry::{Frame, Vector3, EPS};
use crate::section::SectionProperties;
use crate::util::{add_col3, col3, set_col3};

/// Support kind, fixed for the lifetime of a beam.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundaryKind {
    #[default]
    Free,
    /// Position held, rotations free
    Pinned,
    /// Position, tangent and twist held
    Clamped,
    /// Translational spring toward the reference position and rotational
    /// spring toward the reference tangent
    Elastic { translational: f64, rotational: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPosition {
    Start,
    End,
}

impl BoundaryPosition {
    /// Start or End from a vertex index; any other vertex is rejected.
    pub fn from_vertex(index: usize, n_vertices: usize) -> Result<Self> {
        match index {
            0 => Ok(BoundaryPosition::Start),
            i if i + 1 == n_vertices => Ok(BoundaryPosition::End),
            i => Err(KdrError::InvalidBoundary(format!(
                "vertex {i} is not an end of a rod with {n_vertices} vertices"
            ))),
        }
    }

    pub fn vertex(self, n_vertices: usize) -> usize {
        match self {
            BoundaryPosition::Start => 0,
            BoundaryPosition::End => n_vertices - 1,
        }
    }

    /// Vertex next to the boundary vertex.
    pub fn neighbor(self, n_vertices: usize) -> usize {
        match self {
            BoundaryPosition::Start => 1,
            BoundaryPosition::End => n_vertices - 2,
        }
    }

    /// Edge attached to the boundary vertex.
    pub fn edge(self, n_vertices: usize) -> usize {
        match self {
            BoundaryPosition::Start => 0,
            BoundaryPosition::End => n_vertices - 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryCondition {
    pub kind: BoundaryKind,
    pub position: BoundaryPosition,
    vertex: usize,
    edge: usize,
    imposed: Option<Frame>,
    reference: Option<Frame>,
}

impl BoundaryCondition {
    pub fn new(
        kind: BoundaryKind,
        position: BoundaryPosition,
        n_vertices: usize,
        topology: Topology,
    ) -> Result<Self> {
        if topology == Topology::Closed && kind != BoundaryKind::Free {
            return Err(KdrError::InvalidBoundary(
                "closed rods have no ends to support".to_string(),
            ));
        }
        if let BoundaryKind::Elastic {
            translational,
            rotational,
        } = kind
        {
            if translational < 0. || rotational < 0. {
                return Err(KdrError::InvalidBoundary(format!(
                    "elastic stiffnesses must be non-negative ({translational}, {rotational})"
                )));
            }
        }
        Ok(Self {
            kind,
            position,
            vertex: position.vertex(n_vertices),
            edge: position.edge(n_vertices),
            imposed: None,
            reference: None,
        })
    }

    /// Replaces the support frame captured at init, e.g. to model a
    /// support displacement or rotation.
    pub fn imposed(mut self, frame: Frame) -> Self {
        self.imposed = Some(frame);
        self
    }

    pub fn vertex(&self) -> usize {
        self.vertex
    }

    pub fn reference(&self) -> Option<&Frame> {
        self.reference.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.reference.is_some()
    }

    pub fn locks_translation(&self) -> bool {
        matches!(self.kind, BoundaryKind::Pinned | BoundaryKind::Clamped)
    }

    pub fn locks_twist(&self) -> bool {
        matches!(self.kind, BoundaryKind::Clamped)
    }

    /// Captures the support frame. An imposed frame moves the boundary
    /// vertex onto its origin.
    ///
    /// # Panics
    /// Panics when called twice.
    pub fn init(&mut self, frames: &mut [Frame]) {
        if self.is_initialized() {
            panic!("boundary at {:?} is already initialized", self.position);
        }
        let frame = match self.imposed {
            Some(f) => {
                frames[self.vertex].origin = f.origin;
                f
            }
            None => frames[self.vertex],
        };
        self.reference = Some(frame);
    }

    fn fixed_frame(&self) -> &Frame {
        match &self.reference {
            Some(f) => f,
            None => panic!("boundary at {:?} used before init", self.position),
        }
    }

    /// Ghost curvature from holding the boundary tangent at its reference
    /// orientation: `2/l² (t × e)` at Start, `2/l² (e × t)` at End.
    fn ghost_curvature(&self, e: Vector3) -> Vector3 {
        let l2 = e.norm_squared();
        if l2 < EPS * EPS {
            return Vector3::ZERO;
        }
        let t = self.fixed_frame().zaxis;
        match self.position {
            BoundaryPosition::Start => t.cross(e) * (2. / l2),
            BoundaryPosition::End => e.cross(t) * (2. / l2),
        }
    }

    /// Boundary bending moment. Writes the ghost curvature and the moment
    /// components on (d1, d2) into `kb`, the global `moment` and the X/Y rows
    /// of `mr`.
    pub fn enforce_mr(
        &self,
        frames: &[Frame],
        edges: &Mat<f64>,
        section: &SectionProperties,
        kb: &mut Mat<f64>,
        moment: &mut Mat<f64>,
        mr: &mut Mat<f64>,
    ) {
        let i = self.vertex;
        let f = &frames[i];
        let e = col3(edges, self.edge);
        let (m1, m2) = match self.kind {
            BoundaryKind::Clamped => {
                let k = self.ghost_curvature(e);
                set_col3(kb, i, k);
                (section.ei1 * k.dot(f.xaxis), section.ei2 * k.dot(f.yaxis))
            }
            BoundaryKind::Elastic { rotational, .. } => {
                let t = self.fixed_frame().zaxis;
                let u = e.unit();
                let m = match self.position {
                    BoundaryPosition::Start => t.cross(u),
                    BoundaryPosition::End => u.cross(t),
                } * rotational;
                (m.dot(f.xaxis), m.dot(f.yaxis))
            }
            BoundaryKind::Free | BoundaryKind::Pinned => return,
        };
        mr[(0, i)] = m1;
        mr[(1, i)] = m2;
        set_col3(moment, i, f.xaxis * m1 + f.yaxis * m2);
    }

    /// Clamped supports hold the twist: the residual left in `mr.z` is the
    /// support torque.
    pub fn enforce_qr(&self, fixed_twist: &mut [bool]) {
        if self.locks_twist() {
            fixed_twist[self.vertex] = true;
        }
    }

    /// Pinned and clamped supports hold the position: the residual left in
    /// `fr` (internal reaction plus applied force) is the support reaction.
    /// Elastic supports add their spring force and stay free.
    pub fn enforce_fr(&self, frames: &[Frame], fr: &mut Mat<f64>, fixed_translation: &mut [bool]) {
        let i = self.vertex;
        if self.locks_translation() {
            fixed_translation[i] = true;
        } else if let BoundaryKind::Elastic { translational, .. } = self.kind {
            let dx = frames[i].origin - self.fixed_frame().origin;
            add_col3(fr, i, dx * -translational);
        }
    }

    /// Stiffness added to the lumped mass of the boundary vertex and of its
    /// neighbor, for an attached edge of length `l`.
    pub fn lumped_stiffness(&self, l: f64) -> (f64, f64) {
        match self.kind {
            BoundaryKind::Elastic {
                translational,
                rotational,
            } => {
                let r = if l > EPS { 4. * rotational / (l * l) } else { 0. };
                (2. * translational + r, r)
            }
            _ => (0., 0.),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::section::CrossSection;
    use crate::util::mat_from_vectors;
    use std::sync::Arc;

    fn section() -> SectionProperties {
        SectionProperties::new(
            CrossSection::Custom {
                area: 1.,
                i1: 1.,
                i2: 2.,
                j: 1.,
            },
            Arc::new(Material::linear(1., 1., 0., 0.)),
        )
        .unwrap()
    }

    fn straight(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::new(Vector3::new(i as f64, 0., 0.), Vector3::X, Vector3::Y))
            .collect()
    }

    #[test]
    fn test_from_vertex() {
        assert_eq!(
            BoundaryPosition::from_vertex(0, 5).unwrap(),
            BoundaryPosition::Start
        );
        assert_eq!(
            BoundaryPosition::from_vertex(4, 5).unwrap(),
            BoundaryPosition::End
        );
        assert!(matches!(
            BoundaryPosition::from_vertex(2, 5),
            Err(KdrError::InvalidBoundary(_))
        ));
    }

    #[test]
    fn test_closed_rods_reject_supports() {
        let bc = BoundaryCondition::new(
            BoundaryKind::Pinned,
            BoundaryPosition::Start,
            6,
            Topology::Closed,
        );
        assert!(bc.is_err());
    }

    #[test]
    #[should_panic(expected = "already initialized")]
    fn test_init_twice_panics() {
        let mut frames = straight(3);
        let mut bc = BoundaryCondition::new(
            BoundaryKind::Clamped,
            BoundaryPosition::Start,
            3,
            Topology::Open,
        )
        .unwrap();
        bc.init(&mut frames);
        bc.init(&mut frames);
    }

    #[test]
    fn test_clamped_ghost_moment() {
        let mut frames = straight(3);
        let mut start = BoundaryCondition::new(
            BoundaryKind::Clamped,
            BoundaryPosition::Start,
            3,
            Topology::Open,
        )
        .unwrap();
        start.init(&mut frames);

        // Rotate the first edge upward: e0 = (1, 0, 0.1)
        frames[1].origin.z = 0.1;
        let edges = mat_from_vectors(&[
            frames[1].origin - frames[0].origin,
            frames[2].origin - frames[1].origin,
        ]);
        let mut kb = Mat::zeros(3, 3);
        let mut moment = Mat::zeros(3, 3);
        let mut mr = Mat::zeros(3, 3);
        start.enforce_mr(&frames, &edges, &section(), &mut kb, &mut moment, &mut mr);

        // t × e = X × (1, 0, 0.1) = (0, -0.1, 0), scaled by 2 / l²
        let l2 = 1.01;
        assert!((col3(&kb, 0) - Vector3::new(0., -0.2 / l2, 0.)).norm() < 1e-14);
        // d1 = Y with bending stiffness 1
        assert!((mr[(0, 0)] + 0.2 / l2).abs() < 1e-14);
        assert_eq!(mr[(1, 0)], 0.);
        assert!((col3(&moment, 0) - Vector3::new(0., -0.2 / l2, 0.)).norm() < 1e-14);
    }

    #[test]
    fn test_end_ghost_moment_mirrors_start() {
        let mut frames = straight(3);
        let mut end =
            BoundaryCondition::new(BoundaryKind::Clamped, BoundaryPosition::End, 3, Topology::Open)
                .unwrap();
        end.init(&mut frames);
        // Lift the middle vertex: the last edge points down
        frames[1].origin.z = 0.1;
        let edges = mat_from_vectors(&[
            frames[1].origin - frames[0].origin,
            frames[2].origin - frames[1].origin,
        ]);
        let mut kb = Mat::zeros(3, 3);
        let mut moment = Mat::zeros(3, 3);
        let mut mr = Mat::zeros(3, 3);
        end.enforce_mr(&frames, &edges, &section(), &mut kb, &mut moment, &mut mr);
        // e × t = (1, 0, -0.1) × X = (0, -0.1, 0), as if the held tangent
        // were one more edge
        assert!(col3(&kb, 2).y < 0.);
    }

    #[test]
    fn test_elastic_rotational_moment() {
        let mut frames = straight(3);
        let mut start = BoundaryCondition::new(
            BoundaryKind::Elastic {
                translational: 10.,
                rotational: 2.,
            },
            BoundaryPosition::Start,
            3,
            Topology::Open,
        )
        .unwrap();
        start.init(&mut frames);

        frames[1].origin.z = 0.1;
        let edges = mat_from_vectors(&[
            frames[1].origin - frames[0].origin,
            frames[2].origin - frames[1].origin,
        ]);
        let mut kb = Mat::zeros(3, 3);
        let mut moment = Mat::zeros(3, 3);
        let mut mr = Mat::zeros(3, 3);
        start.enforce_mr(&frames, &edges, &section(), &mut kb, &mut moment, &mut mr);

        // k_r (t × u) with u = (1, 0, 0.1) / √1.01
        let m = -0.2 / 1.01_f64.sqrt();
        assert!((mr[(0, 0)] - m).abs() < 1e-14);
        assert_eq!(mr[(1, 0)], 0.);
        assert!((col3(&moment, 0) - Vector3::new(0., m, 0.)).norm() < 1e-14);
        // No ghost curvature for a spring support
        assert_eq!(col3(&kb, 0), Vector3::ZERO);

        let (k0, k1) = start.lumped_stiffness(0.5);
        assert!((k0 - 52.).abs() < 1e-12);
        assert!((k1 - 32.).abs() < 1e-12);
    }

    #[test]
    fn test_force_hooks() {
        let mut frames = straight(3);
        let mut pinned =
            BoundaryCondition::new(BoundaryKind::Pinned, BoundaryPosition::End, 3, Topology::Open)
                .unwrap();
        let mut elastic = BoundaryCondition::new(
            BoundaryKind::Elastic {
                translational: 10.,
                rotational: 0.,
            },
            BoundaryPosition::Start,
            3,
            Topology::Open,
        )
        .unwrap();
        assert!(pinned.locks_translation() && !elastic.locks_translation());
        pinned.init(&mut frames);
        elastic.init(&mut frames);
        frames[0].origin.z = -0.1;

        let mut fr = Mat::zeros(3, 3);
        let mut fixed = vec![false; 3];
        pinned.enforce_fr(&frames, &mut fr, &mut fixed);
        elastic.enforce_fr(&frames, &mut fr, &mut fixed);
        assert_eq!(fixed, vec![false, false, true]);
        assert!((col3(&fr, 0) - Vector3::new(0., 0., 1.)).norm() < 1e-14);

        let mut twist = vec![false; 3];
        pinned.enforce_qr(&mut twist);
        assert_eq!(twist, vec![false; 3]);
    }

    #[test]
    fn test_imposed_frame_moves_vertex() {
        let mut frames = straight(3);
        let target = Frame::new(Vector3::new(0., 0., 0.5), Vector3::Z, Vector3::Y);
        let mut bc = BoundaryCondition::new(
            BoundaryKind::Clamped,
            BoundaryPosition::Start,
            3,
            Topology::Open,
        )
        .unwrap()
        .imposed(target);
        assert!(!bc.is_initialized());
        bc.init(&mut frames);
        assert!(bc.is_initialized());
        assert_eq!(frames[0].origin, target.origin);
        assert_eq!(bc.reference().unwrap().zaxis, Vector3::Z);
    }
}
