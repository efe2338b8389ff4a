//! Kinetic Dynamic Relaxation of slender elastic rods.
//!
//! Rods are discretized as polylines carrying a material frame on every
//! vertex. The solver integrates a fictitious damped dynamics until the
//! force and moment residuals vanish, which yields the static equilibrium
//! under large displacements and rotations.

pub mod boundary;
pub mod centerline;
pub mod config;
pub mod elements;
pub mod error;
pub mod geometry;
pub mod loads;
pub mod material;
pub mod model;
pub mod quaternion;
pub mod section;
pub mod solver;
pub mod state;
pub mod util;

pub use error::{KdrError, Result};
