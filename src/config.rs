//! Solver settings and YAML model input.

use std::{collections::HashMap, path::Path, sync::Arc};

use serde::Deserialize;

use crate::boundary::{BoundaryKind, BoundaryPosition};
use crate::elements::beams::BeamBuilder;
use crate::elements::kernels::DofModel;
use crate::error::{KdrError, Result};
use crate::geometry::{Frame, Vector3};
use crate::loads::{Load, Location};
use crate::material::{Material, ShearLaw};
use crate::model::Model;
use crate::section::{CrossSection, SectionProperties};

/// Relaxation settings, immutable during a run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Fictitious time step
    pub time_step: f64,
    /// Convergence threshold on every free force residual component
    pub force_tolerance: f64,
    /// Convergence threshold on every free twist residual
    pub moment_tolerance: f64,
    pub max_iterations: usize,
    /// Scales the lumped masses; values above one slow down and stabilize
    /// the relaxation
    pub mass_factor: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_step: 1.0,
            force_tolerance: 1e-6,
            moment_tolerance: 1e-6,
            max_iterations: 100_000,
            mass_factor: 1.0,
        }
    }
}

//------------------------------------------------------------------------------
// Model input
//------------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelInput {
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub gravity: [f64; 3],
    pub materials: Vec<MaterialInput>,
    pub sections: Vec<SectionInput>,
    pub beams: Vec<BeamInput>,
    #[serde(default)]
    pub links: Vec<LinkInput>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialInput {
    pub name: String,
    pub density: f64,
    pub young: f64,
    pub poisson: f64,
    /// Overrides `E / (2 (1 + ν))`
    pub shear_modulus: Option<f64>,
    #[serde(default)]
    pub thermal_expansion: f64,
    #[serde(default)]
    pub reference_temperature: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionInput {
    pub name: String,
    pub material: String,
    pub shape: CrossSection,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum GeometryInput {
    Straight {
        start: [f64; 3],
        end: [f64; 3],
        edges: usize,
    },
    Polyline {
        points: Vec<[f64; 3]>,
        #[serde(default)]
        closed: bool,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BeamInput {
    pub geometry: GeometryInput,
    /// Hint for the first material axis
    pub normal: Option<[f64; 3]>,
    pub section: String,
    #[serde(default)]
    pub model: DofModel,
    #[serde(default)]
    pub start: BoundaryKind,
    #[serde(default)]
    pub end: BoundaryKind,
    #[serde(default)]
    pub loads: Vec<LoadInput>,
    #[serde(default)]
    pub temperature_change: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum LocationInput {
    Start,
    End,
    Vertex { index: usize },
    Edge { index: usize },
}

impl From<LocationInput> for Location {
    fn from(l: LocationInput) -> Self {
        match l {
            LocationInput::Start => Location::Start,
            LocationInput::End => Location::End,
            LocationInput::Vertex { index } => Location::Vertex(index),
            LocationInput::Edge { index } => Location::Edge(index),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum LoadInput {
    Force {
        location: LocationInput,
        value: [f64; 3],
        #[serde(default)]
        local: bool,
    },
    Moment {
        location: LocationInput,
        value: [f64; 3],
        #[serde(default)]
        local: bool,
    },
}

impl From<&LoadInput> for Load {
    fn from(l: &LoadInput) -> Self {
        let (load, local) = match *l {
            LoadInput::Force {
                location,
                value,
                local,
            } => (Load::force(location.into(), value.into()), local),
            LoadInput::Moment {
                location,
                value,
                local,
            } => (Load::moment(location.into(), value.into()), local),
        };
        if local {
            load.local()
        } else {
            load
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkInput {
    pub beams: [usize; 2],
    pub ends: [BoundaryPosition; 2],
    pub stiffness: f64,
}

impl ModelInput {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml_file = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml_file)
    }

    /// Resolves material and section names and assembles the model.
    pub fn build(&self) -> Result<Model> {
        let mut materials = HashMap::new();
        for m in &self.materials {
            let mut material = Material::linear(m.density, m.young, m.poisson, m.thermal_expansion)
                .with_reference_temperature(m.reference_temperature);
            if let Some(shear) = m.shear_modulus {
                material = material.with_shear(ShearLaw::Linear { shear });
            }
            if materials.insert(m.name.as_str(), Arc::new(material)).is_some() {
                return Err(KdrError::Config(format!("duplicate material '{}'", m.name)));
            }
        }

        let mut sections = HashMap::new();
        for s in &self.sections {
            let material = materials.get(s.material.as_str()).ok_or_else(|| {
                KdrError::Config(format!(
                    "section '{}' uses unknown material '{}'",
                    s.name, s.material
                ))
            })?;
            let section = SectionProperties::new(s.shape, material.clone())?;
            if sections.insert(s.name.as_str(), Arc::new(section)).is_some() {
                return Err(KdrError::Config(format!("duplicate section '{}'", s.name)));
            }
        }

        let mut model = Model::new();
        model.set_solver_config(self.solver.clone());
        model.set_gravity(self.gravity[0], self.gravity[1], self.gravity[2]);

        for (i, b) in self.beams.iter().enumerate() {
            let section = sections.get(b.section.as_str()).ok_or_else(|| {
                KdrError::Config(format!("beam {i} uses unknown section '{}'", b.section))
            })?;
            let normal = b.normal.map(Vector3::from);
            let mut builder = match &b.geometry {
                GeometryInput::Straight { start, end, edges } => {
                    if *edges == 0 {
                        return Err(KdrError::Config(format!("beam {i} has no edges")));
                    }
                    let (start, end) = (Vector3::from(*start), Vector3::from(*end));
                    let tangent = end - start;
                    let hint = normal.unwrap_or_else(|| Vector3::Z.cross(tangent));
                    BeamBuilder::straight(
                        &Frame::new(start, tangent, hint),
                        &Frame::new(end, tangent, hint),
                        *edges,
                    )
                }
                GeometryInput::Polyline { points, closed } => {
                    let builder =
                        BeamBuilder::from_points(points.iter().copied().map(Vector3::from).collect());
                    let builder = match normal {
                        Some(n) => builder.normal(n),
                        None => builder,
                    };
                    if *closed {
                        builder.closed()
                    } else {
                        builder
                    }
                }
            };
            builder = builder
                .section(section.clone())
                .model(b.model)
                .start(b.start)
                .end(b.end)
                .temperature_change(b.temperature_change);
            for load in &b.loads {
                builder = builder.load(load.into());
            }
            model.add_beam(builder.build()?);
        }

        for l in &self.links {
            model.add_link(l.beams[0], l.ends[0], l.beams[1], l.ends[1], l.stiffness)?;
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = r#"
solver:
  force_tolerance: 1.0e-9
  max_iterations: 5000
gravity: [0.0, 0.0, -9.81]
materials:
  - name: steel
    density: 7850.0
    young: 2.1e11
    poisson: 0.3
sections:
  - name: rod
    material: steel
    shape: { type: circular, diameter: 0.01 }
beams:
  - geometry: { type: straight, start: [0, 0, 0], end: [1, 0, 0], edges: 8 }
    section: rod
    start: { type: clamped }
    loads:
      - type: force
        location: { type: end }
        value: [0.0, 0.0, -1.0]
  - geometry:
      type: polyline
      points: [[0, 1, 0], [1, 1, 0], [2, 1, 0]]
    section: rod
    model: cable
    end: { type: elastic, translational: 10.0, rotational: 0.0 }
links:
  - beams: [0, 1]
    ends: [end, start]
    stiffness: 100.0
"#;

    #[test]
    fn test_solver_config_defaults() {
        let config: SolverConfig = serde_yaml::from_str("time_step: 0.5").unwrap();
        assert_eq!(config.time_step, 0.5);
        assert_eq!(config.force_tolerance, 1e-6);
        assert_eq!(config.max_iterations, 100_000);
        assert_eq!(config.mass_factor, 1.0);
    }

    #[test]
    fn test_parse_model() {
        let input = ModelInput::from_yaml_str(INPUT).unwrap();
        assert_eq!(input.solver.force_tolerance, 1e-9);
        assert_eq!(input.solver.moment_tolerance, 1e-6);
        assert_eq!(input.beams.len(), 2);
        assert_eq!(input.beams[0].start, BoundaryKind::Clamped);
        assert_eq!(input.beams[0].model, DofModel::Rod4);
        assert_eq!(input.beams[1].model, DofModel::Cable);
        assert!(matches!(
            input.beams[1].end,
            BoundaryKind::Elastic { translational, .. } if translational == 10.
        ));
        assert_eq!(input.links[0].ends, [BoundaryPosition::End, BoundaryPosition::Start]);

        let model = input.build().unwrap();
        assert_eq!(model.beams.len(), 2);
        assert_eq!(model.beams[0].n_vertices(), 9);
        assert_eq!(model.beams[1].id, 1);
        assert_eq!(model.solver_config().max_iterations, 5000);
        assert_eq!(model.links.len(), 1);
    }

    #[test]
    fn test_unknown_names() {
        let input = ModelInput::from_yaml_str(&INPUT.replace("material: steel", "material: wood"))
            .unwrap();
        assert!(matches!(input.build(), Err(KdrError::Config(_))));
    }

    #[test]
    fn test_bad_yaml() {
        assert!(matches!(
            ModelInput::from_yaml_str("beams: 3"),
            Err(KdrError::Yaml(_))
        ));
        assert!(matches!(
            ModelInput::from_file("/nonexistent/model.yaml"),
            Err(KdrError::Io(_))
        ));
    }
}
