//! Adapters that hand a fragment to an external engine and bring back its energy.
#[cfg(feature = "neural")]
pub mod neural;
pub mod psi4;

#[cfg(feature = "neural")]
pub use neural::NeuralBackend;
pub use psi4::Psi4Backend;

use crate::{error::BackendError, fragment::Fragment};

/// An engine able to evaluate the energy of a fragment, in Hartree.
pub trait EnergyBackend {
    fn name(&self) -> &str;

    fn energy(&mut self, fragment: &Fragment) -> Result<f64, BackendError>;
}
