use std::sync::Arc;

use faer::prelude::*;
use itertools::{izip, Itertools};

use crate::boundary::{BoundaryCondition, BoundaryKind, BoundaryPosition};
use crate::centerline::{self, Topology};
use crate::elements::kernels::*;
use crate::error::{KdrError, Result};
use crate::geometry::{Frame, Vector3, EPS};
use crate::loads::{Coordinates, Load, LoadKey, LoadManager, Location, Placement, Quantity};
use crate::section::SectionProperties;
use crate::util::{add_col3, col3, vectors_from_mat};

/// Elastic energies of a beam.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Energies {
    pub axial: f64,
    pub bending: f64,
    pub twisting: f64,
}

impl Energies {
    pub fn total(&self) -> f64 {
        self.axial + self.bending + self.twisting
    }
}

/// Discrete elastic rod.
///
/// Vertex quantities are stored `[·][n_vertices]`, edge quantities
/// `[·][n_edges]`. Buffers are allocated once at construction.
#[derive(Debug, Clone)]
pub struct Beam {
    pub id: usize,
    pub model: DofModel,
    pub topology: Topology,
    /// Rest configuration
    rest: Vec<Frame>,
    /// Actual configuration
    frames: Vec<Frame>,
    /// Section of each edge
    sections: Vec<Arc<SectionProperties>>,
    pub loads: LoadManager,
    start: BoundaryCondition,
    end: BoundaryCondition,
    /// Uniform temperature change
    delta_t: f64,
    initialized: bool,

    //--------------------------------------------------------------------------
    // Rest state
    //--------------------------------------------------------------------------
    /// Rest edge lengths `[n_edges]`
    l0: Col<f64>,
    /// Rest Voronoi lengths `[n_vertices]`
    voronoi0: Col<f64>,
    /// Rest material curvatures `[2][n_vertices]`
    kappa0: Mat<f64>,
    /// Rest twist rate `[n_edges]`
    tau0: Col<f64>,
    /// Vertex bending stiffness (EI1, EI2) `[2][n_vertices]`
    ei: Mat<f64>,

    //--------------------------------------------------------------------------
    // Kinematics
    //--------------------------------------------------------------------------
    /// Edge vectors `[3][n_edges]`
    e: Mat<f64>,
    /// Edge lengths `[n_edges]`
    l: Col<f64>,
    /// Axial strain `[n_edges]`
    strain: Col<f64>,
    /// Curvature binormal `[3][n_vertices]`
    kb: Mat<f64>,
    /// Material curvatures `[2][n_vertices]`
    kappa: Mat<f64>,
    /// Twist rate `[n_edges]`
    tau: Col<f64>,

    //--------------------------------------------------------------------------
    // Internal forces
    //--------------------------------------------------------------------------
    /// Axial force `[n_edges]`
    n: Col<f64>,
    /// Global bending moment `[3][n_vertices]`
    m: Mat<f64>,
    /// Twisting moment `[n_edges]`
    q: Col<f64>,
    /// Shear force `[3][n_edges]`
    v: Mat<f64>,

    //--------------------------------------------------------------------------
    // External loads lumped on vertices, global coordinates
    //--------------------------------------------------------------------------
    fext: Mat<f64>,
    mext: Mat<f64>,

    //--------------------------------------------------------------------------
    // Residuals
    //--------------------------------------------------------------------------
    /// Resultant force `[3][n_vertices]`
    fr: Mat<f64>,
    /// Resultant moment: bending moment (M1, M2) and twist residual `[3][n_vertices]`
    mr: Mat<f64>,
    fixed_translation: Vec<bool>,
    fixed_twist: Vec<bool>,
}

impl Beam {
    fn new(
        frames: Vec<Frame>,
        rest: Vec<Frame>,
        topology: Topology,
        model: DofModel,
        sections: Vec<Arc<SectionProperties>>,
        start: BoundaryCondition,
        end: BoundaryCondition,
        delta_t: f64,
    ) -> Self {
        let nv = frames.len();
        let ne = topology.edge_count(nv);

        // Rest quantities
        let points = rest.iter().map(|f| f.origin).collect_vec();
        let e0 = centerline::edge_vectors(&points, topology);
        let l0 = Col::from_fn(ne, |j| e0[j].norm());
        let lengths = l0.as_ref().iter().copied().collect_vec();
        let voronoi = centerline::voronoi_lengths(&lengths, topology, nv);
        let kb0 = centerline::curvatures(&points, topology);
        let k0 = centerline::material_curvatures(&rest, &kb0);
        let tau0 = centerline::twists(&rest, topology);

        // Vertex bending stiffness is the mean of the adjacent edges
        let ei = Mat::from_fn(2, nv, |r, i| {
            let (a, b) = topology.adjacent_edges(i, nv);
            let adj = [a, b].into_iter().flatten().collect_vec();
            adj.iter()
                .map(|&j| match r {
                    0 => sections[j].ei1,
                    _ => sections[j].ei2,
                })
                .sum::<f64>()
                / adj.len() as f64
        });

        Self {
            id: 0,
            model,
            topology,
            loads: LoadManager::new(nv, ne),
            start,
            end,
            delta_t,
            initialized: false,
            l0,
            voronoi0: Col::from_fn(nv, |i| voronoi[i]),
            kappa0: Mat::from_fn(2, nv, |r, i| if r == 0 { k0[i].0 } else { k0[i].1 }),
            tau0: Col::from_fn(ne, |j| tau0[j]),
            ei,
            e: Mat::zeros(3, ne),
            l: Col::zeros(ne),
            strain: Col::zeros(ne),
            kb: Mat::zeros(3, nv),
            kappa: Mat::zeros(2, nv),
            tau: Col::zeros(ne),
            n: Col::zeros(ne),
            m: Mat::zeros(3, nv),
            q: Col::zeros(ne),
            v: Mat::zeros(3, ne),
            fext: Mat::zeros(3, nv),
            mext: Mat::zeros(3, nv),
            fr: Mat::zeros(3, nv),
            mr: Mat::zeros(3, nv),
            fixed_translation: vec![false; nv],
            fixed_twist: vec![false; nv],
            rest,
            frames,
            sections,
        }
    }

    pub fn n_vertices(&self) -> usize {
        self.frames.len()
    }

    pub fn n_edges(&self) -> usize {
        self.l0.nrows()
    }

    /// Adds the weight of the beam as a distributed force on every edge.
    pub fn add_self_weight(&mut self, gravity: Vector3) {
        if gravity == Vector3::ZERO {
            return;
        }
        for j in 0..self.n_edges() {
            let w = gravity * self.sections[j].linear_mass;
            self.loads.add(Load::force(Location::Edge(j), w));
        }
    }

    /// Captures the boundary reference frames and assembles the static loads.
    /// Must be called exactly once, before the first relaxation step.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            panic!("beam {} is already initialized", self.id);
        }
        self.start.init(&mut self.frames);
        self.end.init(&mut self.frames);
        centerline::align_frames(&mut self.frames, self.topology);
        self.loads.fill(&self.frames)?;
        self.initialized = true;
        Ok(())
    }

    //--------------------------------------------------------------------------
    // Residual assembly
    //--------------------------------------------------------------------------

    /// Evaluates the current configuration: kinematics, internal forces,
    /// external loads and boundary enforcement, leaving the result in the
    /// force and moment residual buffers.
    pub fn assemble(&mut self) {
        self.calculate_kinematics();
        self.calculate_internal_forces();
        self.calculate_external_loads();

        let boundaries = [self.start, self.end];
        self.fixed_translation.fill(false);
        self.fixed_twist.fill(false);

        // Bending moment at the supports
        if self.model.has_bending() {
            for bc in &boundaries {
                let section = &self.sections[bc.position.edge(self.n_vertices())];
                bc.enforce_mr(
                    &self.frames,
                    &self.e,
                    section,
                    &mut self.kb,
                    &mut self.m,
                    &mut self.mr,
                );
            }
        }

        // Twist residual
        if self.model.has_twist() {
            calc_twist_residual(
                &mut self.mr,
                self.q.as_ref(),
                &self.kappa,
                self.l.as_ref(),
                &self.mext,
                &self.frames,
                self.topology,
            );
        } else {
            self.mr.row_mut(2).fill(0.);
        }
        boundaries
            .iter()
            .for_each(|bc| bc.enforce_qr(&mut self.fixed_twist));

        // Shear and force residual
        if self.model.has_shear() {
            calc_shear(
                &mut self.v,
                &self.m,
                self.q.as_ref(),
                &self.mext,
                &self.e,
                self.l.as_ref(),
                &self.frames,
                self.topology,
            );
        }
        calc_force_residual(
            &mut self.fr,
            &self.fext,
            self.n.as_ref(),
            &self.v,
            &self.e,
            self.l.as_ref(),
            self.topology,
        );
        boundaries
            .iter()
            .for_each(|bc| bc.enforce_fr(&self.frames, &mut self.fr, &mut self.fixed_translation));
    }

    fn calculate_kinematics(&mut self) {
        calc_edges(&mut self.e, self.l.as_mut(), &self.frames, self.topology);
        calc_strain(self.strain.as_mut(), self.l.as_ref(), self.l0.as_ref());
        if self.model.has_bending() {
            calc_curvature(&mut self.kb, &self.e, self.topology);
            calc_material_curvature(&mut self.kappa, &self.kb, &self.frames);
        }
        if self.model.has_twist() {
            calc_twist(self.tau.as_mut(), &self.frames, self.topology);
        }
    }

    fn calculate_internal_forces(&mut self) {
        calc_axial_force(
            self.n.as_mut(),
            self.strain.as_ref(),
            &self.sections,
            self.delta_t,
        );
        if self.model.has_bending() {
            calc_bending_moment(
                &mut self.m,
                &mut self.mr,
                &self.kappa,
                &self.kappa0,
                &self.ei,
                &self.frames,
            );
        }
        if self.model.has_twist() {
            calc_twisting_moment(
                self.q.as_mut(),
                self.tau.as_ref(),
                self.tau0.as_ref(),
                &self.sections,
            );
        }
    }

    /// Lumps the static and dynamic loads onto the vertices in global
    /// coordinates. Distributed loads act per unit rest length and are split
    /// evenly between the two vertices of their edge.
    fn calculate_external_loads(&mut self) {
        self.loads.update_dynamic(&self.frames);
        self.fext.fill(0.);
        self.mext.fill(0.);
        let nv = self.n_vertices();

        for key in LoadKey::ALL {
            let target = match key.quantity {
                Quantity::Force => &mut self.fext,
                Quantity::Moment => &mut self.mext,
            };
            match key.placement {
                Placement::Vertex => (0..nv).for_each(|i| {
                    let value = self.loads.value(key, i);
                    let value = match key.coordinates {
                        Coordinates::Global => value,
                        Coordinates::Local => self.frames[i].to_global(value),
                    };
                    add_col3(target, i, value);
                }),
                Placement::Edge => (0..self.l0.nrows()).for_each(|j| {
                    let value = self.loads.value(key, j);
                    if value == Vector3::ZERO {
                        return;
                    }
                    let value = match key.coordinates {
                        Coordinates::Global => value,
                        Coordinates::Local => {
                            let (a, b) = self.topology.edge_vertices(j, nv);
                            let (fa, fb) = (&self.frames[a], &self.frames[b]);
                            fa.transported_to(fa.origin, fb.origin - fa.origin)
                                .to_global(value)
                        }
                    };
                    let (a, b) = self.topology.edge_vertices(j, nv);
                    let half = value * (self.l0[j] / 2.);
                    add_col3(target, a, half);
                    add_col3(target, b, half);
                }),
            }
        }
    }

    //--------------------------------------------------------------------------
    // Relaxation
    //--------------------------------------------------------------------------

    /// Fictitious lumped translational masses and twist inertias for a time
    /// step `dt`, scaled by `factor`.
    pub fn lumped_masses(&self, dt: f64, factor: f64, mut mass: ColMut<f64>, mut inertia: ColMut<f64>) {
        let nv = self.n_vertices();
        let scale = factor * dt * dt;
        mass.fill(0.);
        inertia.fill(0.);

        izip!(0..self.n_edges(), self.sections.iter()).for_each(|(j, s)| {
            let (a, b) = self.topology.edge_vertices(j, nv);
            let l = self.l[j].max(EPS);
            let mut k = 2. * s.ea / self.l0[j] + 2. * self.n[j].abs() / l;
            if self.model.has_bending() {
                k += 8. * s.ei_max() / l.powi(3);
            }
            mass[a] += scale * k;
            mass[b] += scale * k;
            if self.model.has_twist() {
                let kt = 2. * s.gj / l;
                inertia[a] += scale * kt;
                inertia[b] += scale * kt;
            }
        });

        // Elastic supports stiffen the boundary vertices
        if self.topology == Topology::Open {
            for bc in [&self.start, &self.end] {
                let l = self.l[bc.position.edge(nv)];
                let (ki, kn) = bc.lumped_stiffness(l);
                mass[bc.vertex()] += scale * ki;
                mass[bc.position.neighbor(nv)] += scale * kn;
            }
        }
    }

    pub fn is_translation_fixed(&self, i: usize) -> bool {
        self.fixed_translation[i]
    }

    pub fn is_twist_fixed(&self, i: usize) -> bool {
        !self.model.has_twist() || self.fixed_twist[i]
    }

    /// Moves vertex `i` by `dx`.
    pub fn translate_vertex(&mut self, i: usize, dx: Vector3) {
        self.frames[i].translate(dx);
    }

    /// Rotates the material axes of vertex `i` about its tangent.
    pub fn rotate_vertex(&mut self, i: usize, angle: f64) {
        self.frames[i].rotate_about_tangent(angle);
    }

    /// Re-aligns every frame with the tangent implied by the vertex positions.
    pub fn realign(&mut self) {
        centerline::align_frames(&mut self.frames, self.topology);
    }

    pub(crate) fn add_residual_force(&mut self, i: usize, f: Vector3) {
        add_col3(&mut self.fr, i, f);
    }

    //--------------------------------------------------------------------------
    // Accessors
    //--------------------------------------------------------------------------

    /// Actual configuration.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Rest configuration.
    pub fn rest_frames(&self) -> &[Frame] {
        &self.rest
    }

    pub fn points(&self) -> Vec<Vector3> {
        self.frames.iter().map(|f| f.origin).collect_vec()
    }

    pub fn sections(&self) -> &[Arc<SectionProperties>] {
        &self.sections
    }

    pub fn boundary(&self, position: BoundaryPosition) -> &BoundaryCondition {
        match position {
            BoundaryPosition::Start => &self.start,
            BoundaryPosition::End => &self.end,
        }
    }

    /// Curvature binormal at every vertex.
    pub fn curvature(&self) -> Vec<Vector3> {
        vectors_from_mat(&self.kb)
    }

    /// Rate of twist on every edge; zero unless the twist channel is active.
    pub fn twist(&self) -> &Col<f64> {
        &self.tau
    }

    /// Global bending moment at every vertex.
    pub fn bending_moment(&self) -> Vec<Vector3> {
        vectors_from_mat(&self.m)
    }

    pub fn twisting_moment(&self) -> &Col<f64> {
        &self.q
    }

    pub fn axial_force(&self) -> &Col<f64> {
        &self.n
    }

    pub fn shear_force(&self) -> Vec<Vector3> {
        vectors_from_mat(&self.v)
    }

    /// Force residual `[3][n_vertices]`.
    pub fn residual_force(&self) -> &Mat<f64> {
        &self.fr
    }

    /// Moment residual `[3][n_vertices]`: rows 0/1 hold the bending moment
    /// on (d1, d2), row 2 the twist residual.
    pub fn residual_moment(&self) -> &Mat<f64> {
        &self.mr
    }

    /// Support reaction force at vertex `i`, zero for free vertices.
    pub fn reaction_force(&self, i: usize) -> Vector3 {
        if self.fixed_translation[i] {
            -col3(&self.fr, i)
        } else {
            Vector3::ZERO
        }
    }

    /// Support torque about the tangent at vertex `i`, zero unless the twist
    /// is held.
    pub fn reaction_torque(&self, i: usize) -> f64 {
        if self.model.has_twist() && self.fixed_twist[i] {
            -self.mr[(2, i)]
        } else {
            0.
        }
    }

    /// Reaction forces on every vertex with a held position, as
    /// `(vertex, force)` pairs.
    pub fn reactions(&self) -> Vec<(usize, Vector3)> {
        (0..self.n_vertices())
            .filter(|&i| self.fixed_translation[i])
            .map(|i| (i, self.reaction_force(i)))
            .collect()
    }

    /// Elastic energies of the last assembled configuration.
    pub fn energies(&self) -> Energies {
        let nv = self.n_vertices();
        let axial = izip!(
            self.n.as_ref().iter(),
            self.strain.as_ref().iter(),
            self.l0.as_ref().iter()
        )
        .map(|(n, s, l0)| n * s * l0)
        .sum::<f64>()
            / 2.;
        let bending = if self.model.has_bending() {
            (0..nv)
                .filter(|&i| matches!(self.topology.adjacent_edges(i, nv), (Some(_), Some(_))))
                .map(|i| {
                    self.voronoi0[i]
                        * (self.mr[(0, i)] * (self.kappa[(0, i)] - self.kappa0[(0, i)])
                            + self.mr[(1, i)] * (self.kappa[(1, i)] - self.kappa0[(1, i)]))
                })
                .sum::<f64>()
                / 2.
        } else {
            0.
        };
        let twisting = if self.model.has_twist() {
            izip!(
                self.q.as_ref().iter(),
                self.tau.as_ref().iter(),
                self.tau0.as_ref().iter(),
                self.l0.as_ref().iter()
            )
            .map(|(q, tau, tau0, l0)| q * (tau - tau0) * l0)
            .sum::<f64>()
                / 2.
        } else {
            0.
        };
        Energies {
            axial,
            bending,
            twisting,
        }
    }

    /// Refined copy of the actual configuration with one frame inserted at
    /// the middle of every edge.
    pub fn interpolate(&self) -> Vec<Frame> {
        centerline::interpolate(&self.frames, self.topology)
    }
}

//------------------------------------------------------------------------------
// Builder
//------------------------------------------------------------------------------

/// Builder for [`Beam`].
#[derive(Debug, Clone)]
pub struct BeamBuilder {
    points: Vec<Vector3>,
    rest_points: Option<Vec<Vector3>>,
    topology: Topology,
    normal: Option<Vector3>,
    model: DofModel,
    sections: Vec<Arc<SectionProperties>>,
    start: BoundaryKind,
    end: BoundaryKind,
    start_frame: Option<Frame>,
    end_frame: Option<Frame>,
    loads: Vec<Load>,
    delta_t: f64,
}

impl BeamBuilder {
    /// Beam through a polyline of points.
    pub fn from_points(points: Vec<Vector3>) -> Self {
        Self {
            points,
            rest_points: None,
            topology: Topology::Open,
            normal: None,
            model: DofModel::default(),
            sections: vec![],
            start: BoundaryKind::Free,
            end: BoundaryKind::Free,
            start_frame: None,
            end_frame: None,
            loads: vec![],
            delta_t: 0.,
        }
    }

    /// Straight beam of `n_edges` equal edges from the origin of `start` to
    /// the origin of `end`; the first material axis follows `start.xaxis`.
    pub fn straight(start: &Frame, end: &Frame, n_edges: usize) -> Self {
        let points = (0..=n_edges)
            .map(|i| {
                let s = i as f64 / n_edges.max(1) as f64;
                start.origin + (end.origin - start.origin) * s
            })
            .collect_vec();
        Self::from_points(points).normal(start.xaxis)
    }

    /// Connects the last vertex back to the first.
    pub fn closed(mut self) -> Self {
        self.topology = Topology::Closed;
        self
    }

    /// Hint for the first material axis (d1) at the first vertex.
    pub fn normal(mut self, hint: Vector3) -> Self {
        self.normal = Some(hint);
        self
    }

    pub fn model(mut self, model: DofModel) -> Self {
        self.model = model;
        self
    }

    /// Same section on every edge.
    pub fn section(mut self, section: Arc<SectionProperties>) -> Self {
        self.sections = vec![section];
        self
    }

    /// One section per edge.
    pub fn sections(mut self, sections: Vec<Arc<SectionProperties>>) -> Self {
        self.sections = sections;
        self
    }

    /// Stress-free shape, when different from the initial geometry.
    pub fn rest_points(mut self, points: Vec<Vector3>) -> Self {
        self.rest_points = Some(points);
        self
    }

    pub fn start(mut self, kind: BoundaryKind) -> Self {
        self.start = kind;
        self
    }

    pub fn end(mut self, kind: BoundaryKind) -> Self {
        self.end = kind;
        self
    }

    /// Support frame at the start, replacing the initial first frame.
    pub fn impose_start(mut self, frame: Frame) -> Self {
        self.start_frame = Some(frame);
        self
    }

    /// Support frame at the end, replacing the initial last frame.
    pub fn impose_end(mut self, frame: Frame) -> Self {
        self.end_frame = Some(frame);
        self
    }

    pub fn load(mut self, load: Load) -> Self {
        self.loads.push(load);
        self
    }

    /// Uniform temperature change with respect to the rest state.
    pub fn temperature_change(mut self, delta_t: f64) -> Self {
        self.delta_t = delta_t;
        self
    }

    pub fn build(self) -> Result<Beam> {
        let points = drop_closing_duplicate(self.points, self.topology);
        let nv = points.len();
        if nv < self.topology.min_vertices() {
            return Err(KdrError::TooFewVertices {
                topology: self.topology.name(),
                min: self.topology.min_vertices(),
                actual: nv,
            });
        }
        let ne = self.topology.edge_count(nv);

        let rest_points = match self.rest_points {
            Some(p) => {
                let p = drop_closing_duplicate(p, self.topology);
                if p.len() != nv {
                    return Err(KdrError::LengthMismatch {
                        what: "rest points",
                        expected: nv,
                        actual: p.len(),
                    });
                }
                p
            }
            None => points.clone(),
        };
        for (j, e) in centerline::edge_vectors(&rest_points, self.topology)
            .iter()
            .enumerate()
        {
            if e.norm() < EPS {
                return Err(KdrError::DegenerateGeometry { edge: j });
            }
        }

        let sections = match self.sections.len() {
            0 => return Err(KdrError::Config("beam has no section".to_string())),
            1 => vec![self.sections[0].clone(); ne],
            n if n == ne => self.sections,
            n => {
                return Err(KdrError::LengthMismatch {
                    what: "sections",
                    expected: ne,
                    actual: n,
                })
            }
        };

        let mut start =
            BoundaryCondition::new(self.start, BoundaryPosition::Start, nv, self.topology)?;
        let mut end = BoundaryCondition::new(self.end, BoundaryPosition::End, nv, self.topology)?;
        if let Some(f) = self.start_frame {
            start = start.imposed(f);
        }
        if let Some(f) = self.end_frame {
            end = end.imposed(f);
        }

        let rest = frames_from_points(&rest_points, self.topology, self.normal);
        let frames = frames_from_points(&points, self.topology, self.normal);

        let mut beam = Beam::new(
            frames,
            rest,
            self.topology,
            self.model,
            sections,
            start,
            end,
            self.delta_t,
        );
        self.loads.into_iter().for_each(|l| beam.loads.add(l));
        Ok(beam)
    }
}

fn drop_closing_duplicate(mut points: Vec<Vector3>, topology: Topology) -> Vec<Vector3> {
    if topology == Topology::Closed && points.len() > 1 {
        let (first, last) = (points[0], points[points.len() - 1]);
        if (last - first).norm() < EPS {
            log::warn!("dropping the closing vertex that repeats the first one");
            points.pop();
        }
    }
    points
}

/// Twist-free frames along the points: the first frame takes the normal
/// hint, the others follow by parallel transport.
fn frames_from_points(points: &[Vector3], topology: Topology, normal: Option<Vector3>) -> Vec<Frame> {
    let tangents = centerline::vertex_tangents(points, topology);
    let hint = normal.unwrap_or_else(|| Vector3::Z.cross(tangents[0]));
    let mut frames: Vec<Frame> = Vec::with_capacity(points.len());
    izip!(points, &tangents).for_each(|(p, t)| {
        let f = match frames.last() {
            Some(prev) => prev.transported_to(*p, *t),
            None => Frame::new(*p, *t, hint),
        };
        frames.push(f);
    });
    frames
}
