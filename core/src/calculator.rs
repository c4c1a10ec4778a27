use crate::{
    backend::{EnergyBackend, Psi4Backend},
    config::{Config, Model},
    error::CalcError,
    fragment::{parse_fragment, Fragment},
};

/// Computes the energy of a fragment with the model selected in the config.
///
/// The backend is built for this single call. Use [`EnergyCalculator`] to keep
/// it around between fragments.
pub fn calc_energy(fragment: &str, config: &Config) -> Result<f64, CalcError> {
    let fragment = parse_fragment(fragment)?;
    EnergyCalculator::from_config(config)?.energy(&fragment)
}

/// Owns the backend chosen by the config and routes every evaluation to it.
pub struct EnergyCalculator {
    backend: Box<dyn EnergyBackend + Send>,
}

impl EnergyCalculator {
    pub fn from_config(config: &Config) -> Result<Self, CalcError> {
        let model = config.model();
        log::info!("fragment energies computed with {}", model.name());

        let backend: Box<dyn EnergyBackend + Send> = match model {
            Model::Psi4 => Box::new(Psi4Backend::new(config.psi4()?.clone())),
            Model::Neural => neural_backend(config)?,
        };

        Ok(Self { backend })
    }

    pub fn with_backend(backend: Box<dyn EnergyBackend + Send>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn energy(&mut self, fragment: &Fragment) -> Result<f64, CalcError> {
        log::debug!(
            "evaluating fragment of {} atoms with {}",
            fragment.len(),
            self.backend.name()
        );

        self.backend
            .energy(fragment)
            .map_err(|source| CalcError::Backend {
                backend: self.backend.name().to_string(),
                source,
            })
    }

    /// Parses a `symbol x y z ...` string and evaluates it.
    pub fn energy_str(&mut self, fragment: &str) -> Result<f64, CalcError> {
        self.energy(&parse_fragment(fragment)?)
    }
}

#[cfg(feature = "neural")]
fn neural_backend(config: &Config) -> Result<Box<dyn EnergyBackend + Send>, CalcError> {
    let backend = crate::backend::NeuralBackend::new(config.neural()?.clone()).map_err(
        |source| CalcError::Backend {
            backend: Model::Neural.name().to_string(),
            source,
        },
    )?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "neural"))]
fn neural_backend(config: &Config) -> Result<Box<dyn EnergyBackend + Send>, CalcError> {
    config.neural()?;
    Err(CalcError::Backend {
        backend: Model::Neural.name().to_string(),
        source: crate::error::BackendError::Unavailable("neural"),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;
    use crate::error::BackendError;

    /// Energy is a per-element constant plus `pair_coupling / r` for every pair of atoms.
    pub(crate) struct PairwiseBackend {
        pub(crate) atomic: HashMap<&'static str, f64>,
        pub(crate) pair_coupling: f64,
    }

    impl PairwiseBackend {
        pub(crate) fn water() -> Self {
            Self {
                atomic: HashMap::from([("O", -75.0), ("H", -0.5)]),
                pair_coupling: 0.01,
            }
        }
    }

    impl EnergyBackend for PairwiseBackend {
        fn name(&self) -> &str {
            "pairwise"
        }

        fn energy(&mut self, fragment: &Fragment) -> Result<f64, BackendError> {
            let atoms = fragment.atoms();

            let mut energy = 0.0;
            for (a, atom) in atoms.iter().enumerate() {
                energy += self
                    .atomic
                    .get(atom.symbol())
                    .ok_or(BackendError::MissingEnergy)?;
                for other in &atoms[a + 1..] {
                    energy += self.pair_coupling / (atom.position() - other.position()).norm();
                }
            }
            Ok(energy)
        }
    }
}
