use std::sync::atomic::{AtomicUsize, Ordering};

use crate::boundary::BoundaryPosition;
use crate::config::SolverConfig;
use crate::elements::beams::Beam;
use crate::elements::links::LinkElement;
use crate::elements::Elements;
use crate::error::{KdrError, Result};
use crate::geometry::Vector3;
use crate::solver::KdrSolver;

static SOLVER_ID: AtomicUsize = AtomicUsize::new(0);

pub struct Model {
    gravity: [f64; 3],
    config: SolverConfig,
    pub beams: Vec<Beam>,
    pub links: Vec<LinkElement>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Creates an empty model with the default solver settings
    pub fn new() -> Model {
        Model {
            gravity: [0., 0., 0.],
            config: SolverConfig::default(),
            beams: vec![],
            links: vec![],
        }
    }

    /// Set the gravity acceleration in each direction; beams then carry
    /// their own weight
    pub fn set_gravity(&mut self, x: f64, y: f64, z: f64) {
        self.gravity[0] = x;
        self.gravity[1] = y;
        self.gravity[2] = z;
    }

    pub fn set_time_step(&mut self, dt: f64) {
        self.config.time_step = dt;
    }

    /// Set the force and moment convergence tolerances
    pub fn set_tolerances(&mut self, force: f64, moment: f64) {
        self.config.force_tolerance = force;
        self.config.moment_tolerance = moment;
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) {
        self.config.max_iterations = max_iterations;
    }

    pub fn set_mass_factor(&mut self, factor: f64) {
        self.config.mass_factor = factor;
    }

    pub fn set_solver_config(&mut self, config: SolverConfig) {
        self.config = config;
    }

    pub fn solver_config(&self) -> &SolverConfig {
        &self.config
    }

    /// Adds a beam and returns its index
    pub fn add_beam(&mut self, mut beam: Beam) -> usize {
        let id = self.beams.len();
        beam.id = id;
        self.beams.push(beam);
        id
    }

    /// Ties an end of one beam to an end of another with a spring of
    /// stiffness `k`, returning the link index
    pub fn add_link(
        &mut self,
        beam_a: usize,
        end_a: BoundaryPosition,
        beam_b: usize,
        end_b: BoundaryPosition,
        stiffness: f64,
    ) -> Result<usize> {
        for index in [beam_a, beam_b] {
            if index >= self.beams.len() {
                return Err(KdrError::BeamOutOfRange {
                    index,
                    n_beams: self.beams.len(),
                });
            }
        }
        let id = self.links.len();
        self.links.push(LinkElement {
            id,
            beams: [beam_a, beam_b],
            ends: [end_a, end_b],
            stiffness,
        });
        Ok(id)
    }

    /// Create initialized elements from a copy of the model beams
    pub fn create_elements(&self) -> Result<Elements> {
        let gravity = Vector3::from(self.gravity);
        let beams = self
            .beams
            .iter()
            .cloned()
            .map(|mut b| {
                b.add_self_weight(gravity);
                b
            })
            .collect();
        let mut elements = Elements::new(beams, &self.links)?;
        elements.init()?;
        Ok(elements)
    }

    /// Create solver. The model is left untouched and may create more
    /// solvers.
    pub fn create_solver(&self) -> Result<KdrSolver> {
        if !(self.config.time_step > 0.) {
            return Err(KdrError::Config(format!(
                "time step must be positive (received {})",
                self.config.time_step
            )));
        }
        if self.beams.is_empty() {
            return Err(KdrError::Config("model has no beams".to_string()));
        }
        let elements = self.create_elements()?;
        let id = SOLVER_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "solver {id}: {} beams, {} links",
            elements.beams.len(),
            elements.links.n_elem
        );
        Ok(KdrSolver::new(id, self.config.clone(), elements))
    }
}
