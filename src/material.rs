//! Constitutive laws.
//!
//! A [`Material`] bundles a density, a Poisson ratio and three law families:
//! axial (σ, E), shear (τ, G) and thermal (α). Laws are pure functions of
//! strain or temperature.

use std::{fmt, sync::Arc};

use crate::error::{KdrError, Result};

/// Scalar function of a scalar, shared between the materials that use it.
pub type ScalarFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Axial stress-strain law.
#[derive(Clone)]
pub enum ElasticLaw {
    Linear { young: f64 },
    Nonlinear { stress: ScalarFn, modulus: ScalarFn },
}

impl ElasticLaw {
    /// Stress σ(ε)
    pub fn sigma(&self, strain: f64) -> f64 {
        match self {
            ElasticLaw::Linear { young } => young * strain,
            ElasticLaw::Nonlinear { stress, .. } => stress(strain),
        }
    }

    /// Tangent modulus E(ε)
    pub fn modulus(&self, strain: f64) -> f64 {
        match self {
            ElasticLaw::Linear { young } => *young,
            ElasticLaw::Nonlinear { modulus, .. } => modulus(strain),
        }
    }

    /// Stress and tangent modulus in one evaluation.
    pub fn sigma_modulus(&self, strain: f64) -> (f64, f64) {
        (self.sigma(strain), self.modulus(strain))
    }
}

/// Shear stress-strain law.
#[derive(Clone)]
pub enum ShearLaw {
    Linear { shear: f64 },
    Nonlinear { stress: ScalarFn, modulus: ScalarFn },
}

impl ShearLaw {
    /// Shear stress τ(γ)
    pub fn tau(&self, strain: f64) -> f64 {
        match self {
            ShearLaw::Linear { shear } => shear * strain,
            ShearLaw::Nonlinear { stress, .. } => stress(strain),
        }
    }

    /// Tangent shear modulus G(γ)
    pub fn modulus(&self, strain: f64) -> f64 {
        match self {
            ShearLaw::Linear { shear } => *shear,
            ShearLaw::Nonlinear { modulus, .. } => modulus(strain),
        }
    }

    pub fn tau_modulus(&self, strain: f64) -> (f64, f64) {
        (self.tau(strain), self.modulus(strain))
    }
}

/// Thermal expansion law α(T).
#[derive(Clone)]
pub enum ThermalLaw {
    Linear { alpha: f64 },
    Nonlinear { alpha: ScalarFn },
}

impl ThermalLaw {
    pub fn alpha(&self, temperature: f64) -> f64 {
        match self {
            ThermalLaw::Linear { alpha } => *alpha,
            ThermalLaw::Nonlinear { alpha } => alpha(temperature),
        }
    }
}

impl fmt::Debug for ElasticLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElasticLaw::Linear { young } => write!(f, "ElasticLaw::Linear {{ young: {young} }}"),
            ElasticLaw::Nonlinear { .. } => write!(f, "ElasticLaw::Nonlinear"),
        }
    }
}

impl fmt::Debug for ShearLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShearLaw::Linear { shear } => write!(f, "ShearLaw::Linear {{ shear: {shear} }}"),
            ShearLaw::Nonlinear { .. } => write!(f, "ShearLaw::Nonlinear"),
        }
    }
}

impl fmt::Debug for ThermalLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThermalLaw::Linear { alpha } => write!(f, "ThermalLaw::Linear {{ alpha: {alpha} }}"),
            ThermalLaw::Nonlinear { .. } => write!(f, "ThermalLaw::Nonlinear"),
        }
    }
}

/// Immutable material description.
#[derive(Debug, Clone)]
pub struct Material {
    /// Mass density
    pub density: f64,
    /// Poisson ratio
    pub poisson: f64,
    /// Temperature of the rest state
    pub reference_temperature: f64,
    elastic: Option<ElasticLaw>,
    shear: Option<ShearLaw>,
    thermal: Option<ThermalLaw>,
}

impl Material {
    /// Material with no laws set.
    pub fn new(density: f64, poisson: f64) -> Self {
        Self {
            density,
            poisson,
            reference_temperature: 0.,
            elastic: None,
            shear: None,
            thermal: None,
        }
    }

    /// Linear elastic isotropic material, `G = E / (2 (1 + ν))`.
    pub fn linear(density: f64, young: f64, poisson: f64, alpha: f64) -> Self {
        Self::new(density, poisson)
            .with_elastic(ElasticLaw::Linear { young })
            .with_shear(ShearLaw::Linear {
                shear: young / (2. * (1. + poisson)),
            })
            .with_thermal(ThermalLaw::Linear { alpha })
    }

    pub fn with_elastic(mut self, law: ElasticLaw) -> Self {
        self.elastic = Some(law);
        self
    }

    pub fn with_shear(mut self, law: ShearLaw) -> Self {
        self.shear = Some(law);
        self
    }

    pub fn with_thermal(mut self, law: ThermalLaw) -> Self {
        self.thermal = Some(law);
        self
    }

    /// Sets the temperature at which rods built from this material are at rest.
    pub fn with_reference_temperature(mut self, temperature: f64) -> Self {
        self.reference_temperature = temperature;
        self
    }

    pub fn try_elastic(&self) -> Result<&ElasticLaw> {
        self.elastic.as_ref().ok_or(KdrError::UnsetLaw("elastic"))
    }

    pub fn try_shear(&self) -> Result<&ShearLaw> {
        self.shear.as_ref().ok_or(KdrError::UnsetLaw("shear"))
    }

    pub fn try_thermal(&self) -> Result<&ThermalLaw> {
        self.thermal.as_ref().ok_or(KdrError::UnsetLaw("thermal"))
    }

    //--------------------------------------------------------------------------
    // Capability set
    //
    // Evaluating a law that was never set is a programming error.
    //--------------------------------------------------------------------------

    fn elastic(&self) -> &ElasticLaw {
        match &self.elastic {
            Some(law) => law,
            None => panic!("material has no elastic law"),
        }
    }

    fn shear(&self) -> &ShearLaw {
        match &self.shear {
            Some(law) => law,
            None => panic!("material has no shear law"),
        }
    }

    fn thermal(&self) -> &ThermalLaw {
        match &self.thermal {
            Some(law) => law,
            None => panic!("material has no thermal law"),
        }
    }

    pub fn sigma(&self, strain: f64) -> f64 {
        self.elastic().sigma(strain)
    }

    pub fn young(&self, strain: f64) -> f64 {
        self.elastic().modulus(strain)
    }

    pub fn sigma_young(&self, strain: f64) -> (f64, f64) {
        self.elastic().sigma_modulus(strain)
    }

    pub fn tau(&self, strain: f64) -> f64 {
        self.shear().tau(strain)
    }

    pub fn shear_modulus(&self, strain: f64) -> f64 {
        self.shear().modulus(strain)
    }

    pub fn tau_shear(&self, strain: f64) -> (f64, f64) {
        self.shear().tau_modulus(strain)
    }

    pub fn alpha(&self, temperature: f64) -> f64 {
        self.thermal().alpha(temperature)
    }

    /// Thermal strain `α(T₀ + ΔT) ΔT` for a change `ΔT` from the reference
    /// temperature `T₀`.
    pub fn thermal_strain(&self, delta_t: f64) -> f64 {
        if delta_t == 0. {
            return 0.;
        }
        self.alpha(self.reference_temperature + delta_t) * delta_t
    }
}
