use faer::prelude::*;
use itertools::{izip, Itertools};

use crate::boundary::BoundaryPosition;
use crate::elements::beams::Beam;
use crate::error::{KdrError, Result};
use crate::util::{col3, set_col3};

/// Link element definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkElement {
    pub id: usize,
    /// Beam index of each side
    pub beams: [usize; 2],
    /// Linked end of each beam
    pub ends: [BoundaryPosition; 2],
    pub stiffness: f64,
}

/// Zero-length springs tying beam ends together. The force on the first
/// side is `k (x_b - x_a)`, the second side receives the opposite.
#[derive(Debug, Clone)]
pub struct Links {
    /// Number of link elements
    pub n_elem: usize,
    pub elements: Vec<LinkElement>,
    /// Vertex index on each side `[n_elem]`
    vertex_ids: Vec<[usize; 2]>,
    /// Current difference in vertex locations `[3][n_elem]`
    pub r: Mat<f64>,
    /// Force on the first side `[3][n_elem]`
    pub f: Mat<f64>,
}

impl Default for Links {
    fn default() -> Self {
        Self {
            n_elem: 0,
            elements: vec![],
            vertex_ids: vec![],
            r: Mat::zeros(3, 0),
            f: Mat::zeros(3, 0),
        }
    }
}

impl Links {
    /// Resolves the linked vertices, checking beam indices and stiffness.
    pub fn new(elements: &[LinkElement], beams: &[Beam]) -> Result<Self> {
        let n_elem = elements.len();
        let vertex_ids = elements
            .iter()
            .map(|e| {
                if !(e.stiffness >= 0.) {
                    return Err(KdrError::Config(format!(
                        "link {} has negative stiffness {}",
                        e.id, e.stiffness
                    )));
                }
                let mut ids = [0; 2];
                for (id, &b, &end) in izip!(ids.iter_mut(), e.beams.iter(), e.ends.iter()) {
                    let beam = beams.get(b).ok_or(KdrError::BeamOutOfRange {
                        index: b,
                        n_beams: beams.len(),
                    })?;
                    *id = end.vertex(beam.n_vertices());
                }
                Ok(ids)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            n_elem,
            elements: elements.to_vec(),
            vertex_ids,
            r: Mat::zeros(3, n_elem),
            f: Mat::zeros(3, n_elem),
        })
    }

    /// Calculates the link forces and adds them to the beam force residuals.
    pub fn apply(&mut self, beams: &mut [Beam]) {
        for (j, (e, ids)) in izip!(self.elements.iter(), self.vertex_ids.iter()).enumerate() {
            let xa = beams[e.beams[0]].frames()[ids[0]].origin;
            let xb = beams[e.beams[1]].frames()[ids[1]].origin;
            let r = xb - xa;
            let force = r * e.stiffness;
            set_col3(&mut self.r, j, r);
            set_col3(&mut self.f, j, force);
            beams[e.beams[0]].add_residual_force(ids[0], force);
            beams[e.beams[1]].add_residual_force(ids[1], -force);
        }
    }

    /// Lumped stiffness `2 k` of every linked vertex, as
    /// `(beam, vertex, stiffness)`.
    pub fn lumped_stiffness(&self) -> Vec<(usize, usize, f64)> {
        izip!(self.elements.iter(), self.vertex_ids.iter())
            .flat_map(|(e, ids)| {
                [
                    (e.beams[0], ids[0], 2. * e.stiffness),
                    (e.beams[1], ids[1], 2. * e.stiffness),
                ]
            })
            .collect_vec()
    }

    /// Elastic energy `½ k |x_b - x_a|²` stored in the links.
    pub fn energy(&self) -> f64 {
        self.elements
            .iter()
            .enumerate()
            .map(|(j, e)| 0.5 * e.stiffness * col3(&self.r, j).norm_squared())
            .sum()
    }

    /// Force on the first side of every link.
    pub fn forces(&self) -> &Mat<f64> {
        &self.f
    }
}
