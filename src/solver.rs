use std::mem;

use itertools::{izip, Itertools};

use crate::config::SolverConfig;
use crate::elements::{beams::Beam, Elements};
use crate::state::BeamState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// Created, no iteration performed yet
    Initialized,
    /// Iterating, or paused between iterations
    Relaxing,
    Converged,
    /// Iteration cap reached
    NotConverged,
}

/// Outcome of one relaxation iteration.
#[derive(Debug, Clone, Copy)]
pub struct StepResult {
    pub iteration: usize,
    pub kinetic_energy: f64,
    /// A kinetic energy peak was detected and the velocities were reset
    pub energy_peak: bool,
    pub converged: bool,
    /// Largest free force residual component before the move
    pub max_force: f64,
    /// Largest free twist residual before the move
    pub max_moment: f64,
}

/// Outcome of a run.
#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    pub status: SolverStatus,
    pub iterations: usize,
    pub peaks: usize,
    pub max_force: f64,
    pub max_moment: f64,
}

pub type Listener = Box<dyn FnMut(&KdrSolver)>;

#[derive(Default)]
struct Listeners {
    energy_peak: Vec<Listener>,
    converged: Vec<Listener>,
    not_converged: Vec<Listener>,
}

#[derive(Clone, Copy)]
enum Event {
    EnergyPeak,
    Converged,
    NotConverged,
}

/// Kinetic Dynamic Relaxation solver.
///
/// Every iteration assembles the residuals of all elements, checks
/// convergence on the free degrees of freedom, then integrates the fictitious
/// dynamics with lumped masses derived from the current stiffness. When the
/// kinetic energy drops, the configuration is moved back to the estimated
/// energy peak and every velocity is reset.
pub struct KdrSolver {
    id: usize,
    pub config: SolverConfig,
    elements: Elements,
    states: Vec<BeamState>,
    status: SolverStatus,
    iteration: usize,
    kinetic_energy: f64,
    restart: bool,
    energy_trace: Vec<f64>,
    peak_count: usize,
    max_force: f64,
    max_moment: f64,
    listeners: Listeners,
}

impl KdrSolver {
    /// Takes ownership of initialized elements.
    pub fn new(id: usize, config: SolverConfig, elements: Elements) -> Self {
        let states = elements
            .beams
            .iter()
            .map(|b| BeamState::new(b.n_vertices()))
            .collect_vec();
        Self {
            id,
            config,
            elements,
            states,
            status: SolverStatus::Initialized,
            iteration: 0,
            kinetic_energy: 0.,
            restart: true,
            energy_trace: vec![],
            peak_count: 0,
            max_force: f64::INFINITY,
            max_moment: f64::INFINITY,
            listeners: Listeners::default(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn status(&self) -> SolverStatus {
        self.status
    }

    /// Number of completed iterations.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.kinetic_energy
    }

    /// Kinetic energy after every iteration; zero after a reset.
    pub fn energy_trace(&self) -> &[f64] {
        &self.energy_trace
    }

    pub fn peak_count(&self) -> usize {
        self.peak_count
    }

    /// Borrowed view of the current configuration.
    pub fn model(&self) -> &Elements {
        &self.elements
    }

    /// Deep copy of the current configuration, unaffected by further
    /// iterations.
    pub fn snapshot(&self) -> Elements {
        self.elements.clone()
    }

    pub fn beam(&self, i: usize) -> Option<&Beam> {
        self.elements.beams.get(i)
    }

    pub fn on_energy_peak(&mut self, f: impl FnMut(&KdrSolver) + 'static) {
        self.listeners.energy_peak.push(Box::new(f));
    }

    pub fn on_converged(&mut self, f: impl FnMut(&KdrSolver) + 'static) {
        self.listeners.converged.push(Box::new(f));
    }

    pub fn on_not_converged(&mut self, f: impl FnMut(&KdrSolver) + 'static) {
        self.listeners.not_converged.push(Box::new(f));
    }

    fn listeners(&mut self, event: Event) -> &mut Vec<Listener> {
        match event {
            Event::EnergyPeak => &mut self.listeners.energy_peak,
            Event::Converged => &mut self.listeners.converged,
            Event::NotConverged => &mut self.listeners.not_converged,
        }
    }

    fn notify(&mut self, event: Event) {
        let mut listeners = mem::take(self.listeners(event));
        let this: &KdrSolver = self;
        listeners.iter_mut().for_each(|f| f(this));
        *self.listeners(event) = listeners;
    }

    fn is_finished(&self) -> bool {
        matches!(
            self.status,
            SolverStatus::Converged | SolverStatus::NotConverged
        )
    }

    fn report(&self) -> RunReport {
        RunReport {
            status: self.status,
            iterations: self.iteration,
            peaks: self.peak_count,
            max_force: self.max_force,
            max_moment: self.max_moment,
        }
    }

    /// Largest force and twist residuals over the free degrees of freedom.
    fn residual_norms(&self) -> (f64, f64) {
        self.elements
            .beams
            .iter()
            .map(|beam| {
                let (fr, mr) = (beam.residual_force(), beam.residual_moment());
                (0..beam.n_vertices()).fold((0., 0.), |(f, m): (f64, f64), i| {
                    let f = if beam.is_translation_fixed(i) {
                        f
                    } else {
                        (0..3).fold(f, |f, k| f.max(fr[(k, i)].abs()))
                    };
                    let m = if beam.is_twist_fixed(i) {
                        m
                    } else {
                        m.max(mr[(2, i)].abs())
                    };
                    (f, m)
                })
            })
            .fold((0., 0.), |(f, m): (f64, f64), (bf, bm)| {
                (f.max(bf), m.max(bm))
            })
    }

    fn update_masses(&mut self) {
        let (dt, factor) = (self.config.time_step, self.config.mass_factor);
        izip!(self.states.iter_mut(), self.elements.beams.iter())
            .for_each(|(state, beam)| state.update_masses(beam, dt, factor));
        for (b, i, k) in self.elements.links.lumped_stiffness() {
            self.states[b].add_mass_stiffness(i, k, dt, factor);
        }
    }

    fn step_result(&self, energy_peak: bool) -> StepResult {
        StepResult {
            iteration: self.iteration,
            kinetic_energy: self.kinetic_energy,
            energy_peak,
            converged: self.status == SolverStatus::Converged,
            max_force: self.max_force,
            max_moment: self.max_moment,
        }
    }

    /// Assembles the residuals of the current configuration and switches to
    /// `Converged` when every free residual is within tolerance.
    fn check_convergence(&mut self) -> bool {
        self.elements.assemble();
        (self.max_force, self.max_moment) = self.residual_norms();
        if self.max_force >= self.config.force_tolerance
            || self.max_moment >= self.config.moment_tolerance
        {
            return false;
        }
        self.status = SolverStatus::Converged;
        log::info!(
            "solver {} converged after {} iterations ({} energy peaks)",
            self.id,
            self.iteration,
            self.peak_count
        );
        self.notify(Event::Converged);
        true
    }

    fn give_up(&mut self) {
        self.status = SolverStatus::NotConverged;
        log::warn!(
            "solver {} did not converge in {} iterations (max force {:.3e}, max moment {:.3e})",
            self.id,
            self.iteration,
            self.max_force,
            self.max_moment
        );
        self.notify(Event::NotConverged);
    }

    /// Performs one relaxation iteration. Reaching the iteration cap with
    /// residuals above tolerance ends the relaxation as `NotConverged`.
    pub fn step(&mut self) -> StepResult {
        if self.is_finished() || self.check_convergence() {
            return self.step_result(false);
        }
        if self.iteration >= self.config.max_iterations {
            self.give_up();
            return self.step_result(false);
        }
        self.status = SolverStatus::Relaxing;

        let dt = self.config.time_step;
        let fac = if self.restart { dt / 2. } else { dt };
        self.update_masses();

        // Integrate velocities and move
        let ke = izip!(self.states.iter_mut(), self.elements.beams.iter_mut())
            .map(|(state, beam)| {
                state.accelerate(beam, fac);
                let ke = state.kinetic_energy();
                state.displace(beam, dt);
                ke
            })
            .sum::<f64>();
        self.restart = false;

        // Kinetic energy peak: back to the estimated peak, from rest
        let energy_peak = ke < self.kinetic_energy;
        self.kinetic_energy = if energy_peak {
            izip!(self.states.iter_mut(), self.elements.beams.iter_mut()).for_each(
                |(state, beam)| {
                    state.rollback(beam, dt);
                    state.stop();
                },
            );
            self.restart = true;
            self.peak_count += 1;
            log::debug!(
                "solver {}: energy peak {} at iteration {} (max force {:.3e})",
                self.id,
                self.peak_count,
                self.iteration,
                self.max_force
            );
            0.
        } else {
            ke
        };

        self.elements.beams.iter_mut().for_each(|b| b.realign());
        self.energy_trace.push(self.kinetic_energy);
        self.iteration += 1;

        if energy_peak {
            self.notify(Event::EnergyPeak);
        }

        // The last allowed move may have reached equilibrium
        if self.iteration >= self.config.max_iterations && !self.check_convergence() {
            self.give_up();
        }
        self.step_result(energy_peak)
    }

    /// Iterates until convergence or until the iteration cap is reached.
    pub fn run(&mut self) -> RunReport {
        while !self.is_finished() {
            self.step();
        }
        self.report()
    }

    /// Performs at most `n` iterations, stopping early on convergence or at
    /// the iteration cap. The solver can be resumed afterwards.
    pub fn run_steps(&mut self, n: usize) -> RunReport {
        for _ in 0..n {
            if self.is_finished() {
                break;
            }
            self.step();
        }
        self.report()
    }
}
