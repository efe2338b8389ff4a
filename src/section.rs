//! Cross-section shapes and the section stiffnesses derived from them.

use std::{f64::consts::PI, sync::Arc};

use serde::Deserialize;

use crate::error::{KdrError, Result};
use crate::material::Material;

/// Cross-section shape.
///
/// `width` is measured along the first material axis (d1) and `height` along
/// the second (d2). `i1` is the second moment of area for bending about d1.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrossSection {
    Circular { diameter: f64 },
    Tube { diameter: f64, thickness: f64 },
    Rectangular { width: f64, height: f64 },
    Custom { area: f64, i1: f64, i2: f64, j: f64 },
}

impl CrossSection {
    pub fn area(&self) -> f64 {
        match *self {
            CrossSection::Circular { diameter } => PI * diameter.powi(2) / 4.,
            CrossSection::Tube {
                diameter,
                thickness,
            } => {
                let d = diameter - 2. * thickness;
                PI * (diameter.powi(2) - d.powi(2)) / 4.
            }
            CrossSection::Rectangular { width, height } => width * height,
            CrossSection::Custom { area, .. } => area,
        }
    }

    /// Second moment of area for bending about d1.
    pub fn i1(&self) -> f64 {
        match *self {
            CrossSection::Rectangular { width, height } => width * height.powi(3) / 12.,
            CrossSection::Custom { i1, .. } => i1,
            _ => self.polar() / 2.,
        }
    }

    /// Second moment of area for bending about d2.
    pub fn i2(&self) -> f64 {
        match *self {
            CrossSection::Rectangular { width, height } => height * width.powi(3) / 12.,
            CrossSection::Custom { i2, .. } => i2,
            _ => self.polar() / 2.,
        }
    }

    /// Saint-Venant torsion constant.
    pub fn torsion_constant(&self) -> f64 {
        match *self {
            CrossSection::Rectangular { width, height } => {
                let (a, b) = if width > height {
                    (width, height)
                } else {
                    (height, width)
                };
                a * b.powi(3) / 3. * (1. - 0.63 * b / a)
            }
            CrossSection::Custom { j, .. } => j,
            _ => self.polar(),
        }
    }

    // Polar moment of circular shapes
    fn polar(&self) -> f64 {
        match *self {
            CrossSection::Circular { diameter } => PI * diameter.powi(4) / 32.,
            CrossSection::Tube {
                diameter,
                thickness,
            } => {
                let d = diameter - 2. * thickness;
                PI * (diameter.powi(4) - d.powi(4)) / 32.
            }
            _ => 0.,
        }
    }
}

/// Section stiffnesses of one or more edges.
///
/// Bending and torsion use the tangent moduli at zero strain; the axial
/// channel evaluates the full stress-strain law.
#[derive(Debug, Clone)]
pub struct SectionProperties {
    pub shape: CrossSection,
    pub material: Arc<Material>,
    /// Cross-section area
    pub area: f64,
    /// Axial stiffness E A
    pub ea: f64,
    /// Bending stiffness about d1
    pub ei1: f64,
    /// Bending stiffness about d2
    pub ei2: f64,
    /// Torsional stiffness G J
    pub gj: f64,
    /// Mass per unit length
    pub linear_mass: f64,
}

impl SectionProperties {
    pub fn new(shape: CrossSection, material: Arc<Material>) -> Result<Self> {
        let elastic = material.try_elastic()?;
        let shear = material.try_shear()?;
        material.try_thermal()?;

        let area = shape.area();
        for (quantity, value) in [
            ("area", area),
            ("i1", shape.i1()),
            ("i2", shape.i2()),
            ("torsion constant", shape.torsion_constant()),
        ] {
            if !(value > 0.) {
                return Err(KdrError::InvalidSection { quantity, value });
            }
        }

        let e = elastic.modulus(0.);
        let g = shear.modulus(0.);
        Ok(Self {
            shape,
            area,
            ea: e * area,
            ei1: e * shape.i1(),
            ei2: e * shape.i2(),
            gj: g * shape.torsion_constant(),
            linear_mass: material.density * area,
            material,
        })
    }

    /// Axial force `N = A σ(ε - α ΔT)` for a uniform temperature change
    /// `ΔT` from the material's reference temperature.
    pub fn axial_force(&self, strain: f64, delta_t: f64) -> f64 {
        self.area * self.material.sigma(strain - self.material.thermal_strain(delta_t))
    }

    /// Largest bending stiffness.
    pub fn ei_max(&self) -> f64 {
        self.ei1.max(self.ei2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{ElasticLaw, ShearLaw, ThermalLaw};

    fn steel() -> Arc<Material> {
        Arc::new(Material::linear(7850., 200e9, 0.25, 1e-5))
    }

    #[test]
    fn test_circular_section() {
        let s = SectionProperties::new(CrossSection::Circular { diameter: 0.02 }, steel()).unwrap();
        let i = PI * 0.02_f64.powi(4) / 64.;
        assert!((s.ei1 - 200e9 * i).abs() < 1e-6);
        assert_eq!(s.ei1, s.ei2);
        assert!((s.gj - 80e9 * 2. * i).abs() < 1e-6);
        assert!((s.linear_mass - 7850. * PI * 1e-4).abs() < 1e-12);
    }

    #[test]
    fn test_rectangular_is_anisotropic() {
        let shape = CrossSection::Rectangular {
            width: 0.02,
            height: 0.01,
        };
        assert!((shape.i2() / shape.i1() - 4.).abs() < 1e-12);
        let s = SectionProperties::new(shape, steel()).unwrap();
        assert_eq!(s.ei_max(), s.ei2);
    }

    #[test]
    fn test_tube_is_lighter_than_full_disc() {
        let full = CrossSection::Circular { diameter: 0.1 };
        let tube = CrossSection::Tube {
            diameter: 0.1,
            thickness: 0.01,
        };
        assert!(tube.area() < full.area());
        assert!(tube.i1() < full.i1());
        assert!(tube.i1() > 0.5 * full.i1());
    }

    #[test]
    fn test_thermal_axial_force() {
        let s = SectionProperties::new(CrossSection::Circular { diameter: 0.02 }, steel()).unwrap();
        // Free thermal expansion carries no force
        assert!(s.axial_force(1e-3, 100.).abs() < 1e-6);
        assert!(s.axial_force(0., 100.) < 0.);
    }

    #[test]
    fn test_thermal_force_at_reference_temperature() {
        // α grows with the absolute temperature
        let material = Material::new(1., 0.25)
            .with_elastic(ElasticLaw::Linear { young: 1e6 })
            .with_shear(ShearLaw::Linear { shear: 4e5 })
            .with_thermal(ThermalLaw::Nonlinear {
                alpha: Arc::new(|t| 1e-5 * (1. + t / 100.)),
            });
        let shape = CrossSection::Custom {
            area: 1.,
            i1: 1.,
            i2: 1.,
            j: 1.,
        };
        let cold = SectionProperties::new(shape, Arc::new(material.clone())).unwrap();
        let warm = SectionProperties::new(
            shape,
            Arc::new(material.with_reference_temperature(100.)),
        )
        .unwrap();

        // Held length, ΔT = 10: α(10) = 1.1e-5 versus α(110) = 2.1e-5
        assert!((cold.axial_force(0., 10.) + 1e6 * 1.1e-4).abs() < 1e-9);
        assert!((warm.axial_force(0., 10.) + 1e6 * 2.1e-4).abs() < 1e-9);
        assert_eq!(warm.axial_force(1e-3, 0.), 1e3);
    }

    #[test]
    fn test_invalid_section() {
        let err = SectionProperties::new(
            CrossSection::Custom {
                area: 1.,
                i1: 0.,
                i2: 1.,
                j: 1.,
            },
            steel(),
        );
        assert!(matches!(err, Err(KdrError::InvalidSection { quantity: "i1", .. })));
        let err = SectionProperties::new(
            CrossSection::Circular { diameter: 1. },
            Arc::new(Material::new(1., 0.)),
        );
        assert!(matches!(err, Err(KdrError::UnsetLaw("elastic"))));
    }
}
