//! Discrete differential geometry of rod centerlines.
//!
//! Curvature lives on vertices (osculating circle through the two adjacent
//! edges), twist lives on edges (angle between consecutive material frames
//! once the bending part has been removed by parallel transport).

use itertools::Itertools;

use crate::geometry::{Frame, Vector3, EPS};
use crate::quaternion::Quaternion;

/// Connectivity of a vertex sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    /// Ne = Nv - 1
    #[default]
    Open,
    /// Ne = Nv, the last vertex connects back to the first
    Closed,
}

impl Topology {
    pub fn edge_count(self, n_vertices: usize) -> usize {
        match self {
            Topology::Open => n_vertices.saturating_sub(1),
            Topology::Closed => n_vertices,
        }
    }

    pub fn min_vertices(self) -> usize {
        match self {
            Topology::Open => 2,
            Topology::Closed => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Topology::Open => "open",
            Topology::Closed => "closed",
        }
    }

    /// Indices of the edges before and after vertex `i`.
    pub fn adjacent_edges(self, i: usize, n_vertices: usize) -> (Option<usize>, Option<usize>) {
        match self {
            Topology::Open => (
                (i > 0).then(|| i - 1),
                (i + 1 < n_vertices).then_some(i),
            ),
            Topology::Closed => (Some((i + n_vertices - 1) % n_vertices), Some(i)),
        }
    }

    /// Indices of the two vertices of edge `i`.
    pub fn edge_vertices(self, i: usize, n_vertices: usize) -> (usize, usize) {
        (i, (i + 1) % n_vertices)
    }
}

/// Edge vectors `x[i+1] - x[i]`.
pub fn edge_vectors(points: &[Vector3], topology: Topology) -> Vec<Vector3> {
    let nv = points.len();
    (0..topology.edge_count(nv))
        .map(|i| points[(i + 1) % nv] - points[i])
        .collect_vec()
}

/// Curvature binormal of the circle through the two edges `e0` and `e1`:
/// `2 (e0 × e1) / (|e0| |e1| |e0 + e1|)`.
///
/// Degenerate edges (and a fully folded-back pair) give the zero vector.
pub fn curvature_binormal(e0: Vector3, e1: Vector3) -> Vector3 {
    let den = e0.norm() * e1.norm() * (e0 + e1).norm();
    if den < EPS {
        return Vector3::ZERO;
    }
    e0.cross(e1) * (2. / den)
}

/// Curvature binormal at every vertex. Open ends carry no curvature.
pub fn curvatures(points: &[Vector3], topology: Topology) -> Vec<Vector3> {
    let nv = points.len();
    let e = edge_vectors(points, topology);
    (0..nv)
        .map(|i| match topology.adjacent_edges(i, nv) {
            (Some(a), Some(b)) => curvature_binormal(e[a], e[b]),
            _ => Vector3::ZERO,
        })
        .collect_vec()
}

/// Tangent of the osculating circle at a vertex, `unit(u0 l1 + u1 l0)`.
pub fn vertex_tangent(e_prev: Option<Vector3>, e_next: Option<Vector3>) -> Vector3 {
    match (e_prev, e_next) {
        (Some(a), Some(b)) => {
            let (la, lb) = (a.norm(), b.norm());
            if la < EPS {
                return b.unit();
            }
            if lb < EPS {
                return a.unit();
            }
            let t = (a * (lb / la) + b * (la / lb)).unit();
            if t == Vector3::ZERO {
                b.unit()
            } else {
                t
            }
        }
        (Some(a), None) => a.unit(),
        (None, Some(b)) => b.unit(),
        (None, None) => Vector3::ZERO,
    }
}

/// Tangent at every vertex; open ends take their edge direction.
pub fn vertex_tangents(points: &[Vector3], topology: Topology) -> Vec<Vector3> {
    let nv = points.len();
    let e = edge_vectors(points, topology);
    (0..nv)
        .map(|i| {
            let (a, b) = topology.adjacent_edges(i, nv);
            vertex_tangent(a.map(|a| e[a]), b.map(|b| e[b]))
        })
        .collect_vec()
}

/// Voronoi length of every vertex: half the sum of the adjacent edge lengths.
pub fn voronoi_lengths(lengths: &[f64], topology: Topology, n_vertices: usize) -> Vec<f64> {
    (0..n_vertices)
        .map(|i| {
            let (a, b) = topology.adjacent_edges(i, n_vertices);
            (a.map_or(0., |a| lengths[a]) + b.map_or(0., |b| lengths[b])) / 2.
        })
        .collect_vec()
}

/// Transports `v` along the minimal rotation taking `t_from` onto `t_to`.
pub fn parallel_transport(v: Vector3, t_from: Vector3, t_to: Vector3) -> Vector3 {
    Quaternion::between(t_from, t_to).rotate_vector(v)
}

/// Signed angle about `b.zaxis` from the transported `a.xaxis` to `b.xaxis`.
pub fn twist_angle(a: &Frame, b: &Frame) -> f64 {
    let p = parallel_transport(a.xaxis, a.zaxis, b.zaxis);
    let s = p.cross(b.xaxis).dot(b.zaxis);
    let c = p.dot(b.xaxis);
    s.atan2(c)
}

/// Rate of twist on every edge, `angle / length`.
pub fn twists(frames: &[Frame], topology: Topology) -> Vec<f64> {
    let nv = frames.len();
    (0..topology.edge_count(nv))
        .map(|i| {
            let (a, b) = topology.edge_vertices(i, nv);
            let l = (frames[b].origin - frames[a].origin).norm();
            if l < EPS {
                0.
            } else {
                twist_angle(&frames[a], &frames[b]) / l
            }
        })
        .collect_vec()
}

/// Material curvatures `(κb · d1, κb · d2)` at every vertex.
pub fn material_curvatures(frames: &[Frame], kb: &[Vector3]) -> Vec<(f64, f64)> {
    frames
        .iter()
        .zip(kb)
        .map(|(f, k)| (k.dot(f.xaxis), k.dot(f.yaxis)))
        .collect_vec()
}

/// Re-aligns every frame with the tangent implied by the current vertex
/// positions. Each frame is parallel transported from its previous tangent,
/// so the twist already carried by the frames is kept.
pub fn align_frames(frames: &mut [Frame], topology: Topology) {
    let points = frames.iter().map(|f| f.origin).collect_vec();
    let tangents = vertex_tangents(&points, topology);
    frames.iter_mut().zip(tangents).for_each(|(f, t)| {
        *f = f.transported_to(f.origin, t);
    });
}

/// Refines the frame sequence by inserting one frame at the middle of every
/// edge. The midpoint is lifted onto the local osculating arc and the frame
/// carries half of the edge twist. Output order is
/// `f0, m0, f1, m1, ..., f_{n-1}` (closed sequences end with `m_{n-1}`).
pub fn interpolate(frames: &[Frame], topology: Topology) -> Vec<Frame> {
    let nv = frames.len();
    let points = frames.iter().map(|f| f.origin).collect_vec();
    let kb = curvatures(&points, topology);
    let mut out = Vec::with_capacity(2 * nv);
    for i in 0..nv {
        out.push(frames[i]);
        if i >= topology.edge_count(nv) {
            continue;
        }
        let (a, b) = topology.edge_vertices(i, nv);
        let (fa, fb) = (&frames[a], &frames[b]);
        let e = fb.origin - fa.origin;
        let l = e.norm();

        // Sagitta of the arc with the mean end curvature
        let k = (kb[a] + kb[b]) / 2.;
        let mid = (fa.origin + fb.origin) / 2. + e.cross(k) * (l / 8.);

        let tangent = (fa.zaxis + fb.zaxis).unit();
        let tangent = if tangent == Vector3::ZERO {
            e.unit()
        } else {
            tangent
        };
        let mut m = fa.transported_to(mid, tangent);
        m.rotate_about_tangent(twist_angle(fa, fb) / 2.);
        out.push(m);
    }
    out
}
