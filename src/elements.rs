pub mod beams;
pub mod kernels;
pub mod links;

use beams::Beam;
use links::{LinkElement, Links};

use crate::error::Result;

/// Every mechanical element of a model.
#[derive(Debug, Clone, Default)]
pub struct Elements {
    pub beams: Vec<Beam>,
    pub links: Links,
}

impl Elements {
    pub fn new(beams: Vec<Beam>, links: &[LinkElement]) -> Result<Self> {
        let links = Links::new(links, &beams)?;
        Ok(Self { beams, links })
    }

    /// Initializes every beam: boundary capture and static load assembly.
    pub fn init(&mut self) -> Result<()> {
        self.beams.iter_mut().try_for_each(|b| b.init())
    }

    /// Assembles the residuals of every beam, then adds the link forces
    /// once all beam residuals are complete.
    pub fn assemble(&mut self) {
        self.beams.iter_mut().for_each(|b| b.assemble());
        self.links.apply(&mut self.beams);
    }

    /// Total elastic energy of the beams and links.
    pub fn elastic_energy(&self) -> f64 {
        self.beams.iter().map(|b| b.energies().total()).sum::<f64>() + self.links.energy()
    }
}
