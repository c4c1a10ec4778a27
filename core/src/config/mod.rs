//! Calculation config, read from a TOML file:
//!
//! ```toml
//! [driver]
//! model = "psi4"
//!
//! [psi4]
//! memory = "500 MB"
//! threads = 4
//! method = "scf"
//! basis = "cc-pvdz"
//! ```
mod molecule;

use std::{
    fs,
    path::{Path, PathBuf},
};

pub use molecule::ConfigFragment;
use serde::Deserialize;

use crate::error::ConfigError;

/// Which engine evaluates fragment energies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Psi4,
    #[serde(alias = "TensorMol", alias = "tensormol")]
    Neural,
}

impl Model {
    pub fn name(self) -> &'static str {
        match self {
            Model::Psi4 => "psi4",
            Model::Neural => "neural",
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub driver: DriverConfig,
    pub psi4: Option<Psi4Config>,
    pub neural: Option<NeuralConfig>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    pub model: Model,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Psi4Config {
    /// passed to psi4 verbatim, e.g. "500 MB"
    pub memory: String,
    #[serde(default = "default_threads")]
    pub threads: usize,
    pub method: String,
    pub basis: String,
    #[serde(default = "default_psi4_executable")]
    pub executable: PathBuf,
    /// where psi4 keeps its scratch files. Defaults to the per-run temporary directory.
    pub scratch_dir: Option<PathBuf>,
}

impl Psi4Config {
    /// The `method/basis` string handed to `energy()`
    pub fn level_of_theory(&self) -> String {
        format!("{}/{}", self.method, self.basis)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Single,
    #[default]
    Double,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NeuralConfig {
    /// path to the exported ONNX network
    pub model: PathBuf,
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default)]
    pub precision: Precision,
    #[serde(default = "default_species_input")]
    pub species_input: String,
    #[serde(default = "default_coordinates_input")]
    pub coordinates_input: String,
    #[serde(default = "default_energy_output")]
    pub energy_output: String,
}

fn default_threads() -> usize {
    1
}

fn default_psi4_executable() -> PathBuf {
    PathBuf::from("psi4")
}

fn default_species_input() -> String {
    "species".to_string()
}

fn default_coordinates_input() -> String {
    "coordinates".to_string()
}

fn default_energy_output() -> String {
    "energy".to_string()
}

impl Config {
    /// Loads a config file. A relative network path is resolved against the
    /// directory the config file lives in.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_toml_str(&contents)?;

        if let (Some(neural), Some(base)) = (config.neural.as_mut(), path.parent()) {
            if neural.model.is_relative() {
                neural.model = base.join(&neural.model);
            }
        }

        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn model(&self) -> Model {
        self.driver.model
    }

    pub fn psi4(&self) -> Result<&Psi4Config, ConfigError> {
        self.psi4.as_ref().ok_or(ConfigError::MissingSection {
            model: Model::Psi4.name(),
            section: "psi4",
        })
    }

    pub fn neural(&self) -> Result<&NeuralConfig, ConfigError> {
        self.neural.as_ref().ok_or(ConfigError::MissingSection {
            model: Model::Neural.name(),
            section: "neural",
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.driver.model {
            Model::Psi4 => self.psi4().map(|_| ())?,
            Model::Neural => self.neural().map(|_| ())?,
        }

        if let Some(psi4) = &self.psi4 {
            for (key, value) in [
                ("memory", &psi4.memory),
                ("method", &psi4.method),
                ("basis", &psi4.basis),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        section: "psi4",
                        key,
                        reason: "must not be empty".to_string(),
                    });
                }
            }
            check_threads("psi4", psi4.threads)?;
        }

        if let Some(neural) = &self.neural {
            check_threads("neural", neural.threads)?;
        }

        Ok(())
    }
}

fn check_threads(section: &'static str, threads: usize) -> Result<(), ConfigError> {
    if threads == 0 {
        return Err(ConfigError::InvalidValue {
            section,
            key: "threads",
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}
