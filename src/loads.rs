//! External loads and their per-beam accumulation buffers.
//!
//! Every load falls into one of eight categories:
//! (force | moment) × (vertex | edge) × (global | local). Each category has
//! its own `[3][n]` buffer, sized by the number of vertices or edges.

use std::{fmt, sync::Arc};

use faer::prelude::*;

use crate::error::{KdrError, Result};
use crate::geometry::{Frame, Vector3};
use crate::util::{add_col3, col3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Force,
    Moment,
}

/// Concentrated on a vertex or distributed (per unit rest length) over an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    Vertex,
    Edge,
}

/// Global axes or the material frame (d1, d2, t) of the loaded vertex/edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coordinates {
    Global,
    Local,
}

/// Key of one of the eight accumulation buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadKey {
    pub quantity: Quantity,
    pub placement: Placement,
    pub coordinates: Coordinates,
}

impl LoadKey {
    pub const COUNT: usize = 8;

    /// Every key, ordered by [`LoadKey::index`].
    pub const ALL: [LoadKey; 8] = [
        LoadKey::new(Quantity::Force, Placement::Vertex, Coordinates::Global),
        LoadKey::new(Quantity::Force, Placement::Vertex, Coordinates::Local),
        LoadKey::new(Quantity::Force, Placement::Edge, Coordinates::Global),
        LoadKey::new(Quantity::Force, Placement::Edge, Coordinates::Local),
        LoadKey::new(Quantity::Moment, Placement::Vertex, Coordinates::Global),
        LoadKey::new(Quantity::Moment, Placement::Vertex, Coordinates::Local),
        LoadKey::new(Quantity::Moment, Placement::Edge, Coordinates::Global),
        LoadKey::new(Quantity::Moment, Placement::Edge, Coordinates::Local),
    ];

    pub const fn new(quantity: Quantity, placement: Placement, coordinates: Coordinates) -> Self {
        Self {
            quantity,
            placement,
            coordinates,
        }
    }

    /// Bijection onto `0..8`.
    pub fn index(&self) -> usize {
        let q = match self.quantity {
            Quantity::Force => 0,
            Quantity::Moment => 4,
        };
        let p = match self.placement {
            Placement::Vertex => 0,
            Placement::Edge => 2,
        };
        let c = match self.coordinates {
            Coordinates::Global => 0,
            Coordinates::Local => 1,
        };
        q + p + c
    }
}

/// Where a load is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Vertex(usize),
    Edge(usize),
    /// First vertex
    Start,
    /// Last vertex
    End,
}

impl Location {
    pub fn placement(&self) -> Placement {
        match self {
            Location::Edge(_) => Placement::Edge,
            _ => Placement::Vertex,
        }
    }

    /// Resolves the location to a buffer column, checking the range.
    pub fn resolve(&self, n_vertices: usize, n_edges: usize) -> Result<usize> {
        match *self {
            Location::Start => Ok(0),
            Location::End => Ok(n_vertices - 1),
            Location::Vertex(index) if index < n_vertices => Ok(index),
            Location::Vertex(index) => Err(KdrError::VertexOutOfRange { index, n_vertices }),
            Location::Edge(index) if index < n_edges => Ok(index),
            Location::Edge(index) => Err(KdrError::EdgeOutOfRange { index, n_edges }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Temporal {
    /// Summed once into the buffers by [`LoadManager::fill`]
    #[default]
    Static,
    /// Re-evaluated every iteration by [`LoadManager::update_dynamic`]
    Dynamic,
}

/// Load value as a function of the current frames and the loaded index.
pub type FollowerFn = Arc<dyn Fn(&[Frame], usize) -> Vector3 + Send + Sync>;

#[derive(Clone)]
pub enum LoadValue {
    Constant(Vector3),
    Follower(FollowerFn),
}

impl fmt::Debug for LoadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadValue::Constant(v) => write!(f, "Constant({v:?})"),
            LoadValue::Follower(_) => write!(f, "Follower"),
        }
    }
}

/// Immaterial load declaration.
#[derive(Debug, Clone)]
pub struct Load {
    pub quantity: Quantity,
    pub location: Location,
    pub coordinates: Coordinates,
    pub temporal: Temporal,
    pub value: LoadValue,
    pub factor: f64,
}

impl Load {
    fn new(quantity: Quantity, location: Location, value: LoadValue) -> Self {
        Self {
            quantity,
            location,
            coordinates: Coordinates::Global,
            temporal: Temporal::Static,
            value,
            factor: 1.,
        }
    }

    /// Force on a vertex, or per unit length on an edge.
    pub fn force(location: Location, value: Vector3) -> Self {
        Self::new(Quantity::Force, location, LoadValue::Constant(value))
    }

    /// Moment on a vertex, or per unit length on an edge.
    pub fn moment(location: Location, value: Vector3) -> Self {
        Self::new(Quantity::Moment, location, LoadValue::Constant(value))
    }

    /// Geometry-dependent load; always dynamic.
    pub fn follower(
        quantity: Quantity,
        location: Location,
        f: impl Fn(&[Frame], usize) -> Vector3 + Send + Sync + 'static,
    ) -> Self {
        Self::new(quantity, location, LoadValue::Follower(Arc::new(f))).dynamic()
    }

    /// Expresses the value in the material frame of the loaded vertex/edge.
    pub fn local(mut self) -> Self {
        self.coordinates = Coordinates::Local;
        self
    }

    pub fn dynamic(mut self) -> Self {
        self.temporal = Temporal::Dynamic;
        self
    }

    /// Multiplies the load by `a`.
    pub fn scaled(mut self, a: f64) -> Self {
        self.factor *= a;
        self
    }

    pub fn key(&self) -> LoadKey {
        LoadKey::new(self.quantity, self.location.placement(), self.coordinates)
    }

    pub fn evaluate(&self, frames: &[Frame], index: usize) -> Vector3 {
        match &self.value {
            LoadValue::Constant(v) => *v * self.factor,
            LoadValue::Follower(f) => f(frames, index) * self.factor,
        }
    }
}

/// Per-beam load assembly.
#[derive(Debug, Clone)]
pub struct LoadManager {
    n_vertices: usize,
    n_edges: usize,
    loads: Vec<Load>,
    /// Indices of the dynamic loads in `loads`
    dynamic: Vec<usize>,
    /// Pre-summed static loads, indexed by [`LoadKey::index`]
    static_buffers: [Mat<f64>; 8],
    /// Dynamic loads of the current iteration
    dynamic_buffers: [Mat<f64>; 8],
}

impl LoadManager {
    pub fn new(n_vertices: usize, n_edges: usize) -> Self {
        let buffers = || {
            std::array::from_fn(|k| match LoadKey::ALL[k].placement {
                Placement::Vertex => Mat::zeros(3, n_vertices),
                Placement::Edge => Mat::zeros(3, n_edges),
            })
        };
        Self {
            n_vertices,
            n_edges,
            loads: vec![],
            dynamic: vec![],
            static_buffers: buffers(),
            dynamic_buffers: buffers(),
        }
    }

    pub fn add(&mut self, load: Load) {
        self.loads.push(load);
    }

    pub fn loads(&self) -> &[Load] {
        &self.loads
    }

    pub fn has_dynamic(&self) -> bool {
        !self.dynamic.is_empty()
    }

    /// Zeroes all eight static and dynamic buffers.
    pub fn clear(&mut self) {
        self.static_buffers
            .iter_mut()
            .chain(self.dynamic_buffers.iter_mut())
            .for_each(|b| b.fill(0.));
    }

    /// Clears the buffers, validates every declared load, and sums the static
    /// loads into their buffers. Dynamic loads are only recorded.
    pub fn fill(&mut self, frames: &[Frame]) -> Result<()> {
        self.clear();
        self.dynamic.clear();
        for (i, load) in self.loads.iter().enumerate() {
            let j = load.location.resolve(self.n_vertices, self.n_edges)?;
            match load.temporal {
                Temporal::Static => {
                    add_col3(
                        &mut self.static_buffers[load.key().index()],
                        j,
                        load.evaluate(frames, j),
                    );
                }
                Temporal::Dynamic => self.dynamic.push(i),
            }
        }
        Ok(())
    }

    /// Re-sums the dynamic loads for the current frames.
    pub fn update_dynamic(&mut self, frames: &[Frame]) {
        if !self.has_dynamic() {
            return;
        }
        self.dynamic_buffers.iter_mut().for_each(|b| b.fill(0.));
        for &i in &self.dynamic {
            let load = &self.loads[i];
            // Indices were validated by fill
            let j = match load.location.resolve(self.n_vertices, self.n_edges) {
                Ok(j) => j,
                Err(_) => continue,
            };
            add_col3(
                &mut self.dynamic_buffers[load.key().index()],
                j,
                load.evaluate(frames, j),
            );
        }
    }

    pub fn static_buffer(&self, key: LoadKey) -> &Mat<f64> {
        &self.static_buffers[key.index()]
    }

    pub fn dynamic_buffer(&self, key: LoadKey) -> &Mat<f64> {
        &self.dynamic_buffers[key.index()]
    }

    /// Total (static + dynamic) value of a buffer entry.
    pub fn value(&self, key: LoadKey, index: usize) -> Vector3 {
        col3(&self.static_buffers[key.index()], index)
            + col3(&self.dynamic_buffers[key.index()], index)
    }
}
