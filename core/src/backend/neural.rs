use ndarray::{Array2, Array3};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};

use crate::{
    config::{NeuralConfig, Precision},
    error::BackendError,
    fragment::Fragment,
};

use super::EnergyBackend;

/// A pretrained water network exported to ONNX. The session is built once and
/// reused for every fragment.
pub struct NeuralBackend {
    session: Session,
    config: NeuralConfig,
}

impl NeuralBackend {
    pub fn new(config: NeuralConfig) -> Result<Self, BackendError> {
        let session = Session::builder()
            .map_err(runtime)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(runtime)?
            .with_intra_threads(config.threads)
            .map_err(runtime)?
            .commit_from_file(&config.model)
            .map_err(runtime)?;

        log::info!(
            "loaded network {} ({} inputs, {} outputs)",
            config.model.display(),
            session.inputs.len(),
            session.outputs.len()
        );

        Ok(Self { session, config })
    }
}

fn runtime(error: impl std::error::Error + Send + Sync + 'static) -> BackendError {
    BackendError::Runtime(Box::new(error))
}

impl From<ort::Error> for BackendError {
    fn from(error: ort::Error) -> Self {
        runtime(error)
    }
}

impl From<ndarray::ShapeError> for BackendError {
    fn from(error: ndarray::ShapeError) -> Self {
        runtime(error)
    }
}

/// Atomic numbers, shape `[1, N]`
pub fn species_array(fragment: &Fragment) -> Result<Array2<i64>, BackendError> {
    let species = fragment
        .atoms()
        .iter()
        .map(|atom| atom.atomic_number())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Array2::from_shape_vec((1, fragment.len()), species)?)
}

/// Positions in Ångström, shape `[1, N, 3]`
pub fn coordinates_array(fragment: &Fragment) -> Result<Array3<f64>, BackendError> {
    Ok(Array3::from_shape_vec(
        (1, fragment.len(), 3),
        fragment.coordinates(),
    )?)
}

impl EnergyBackend for NeuralBackend {
    fn name(&self) -> &str {
        "neural"
    }

    fn energy(&mut self, fragment: &Fragment) -> Result<f64, BackendError> {
        let species = Value::from_array(species_array(fragment)?)?;
        let coordinates = coordinates_array(fragment)?;

        let NeuralConfig {
            species_input,
            coordinates_input,
            energy_output,
            precision,
            ..
        } = &self.config;

        let energy = match precision {
            Precision::Single => {
                let coordinates = Value::from_array(coordinates.mapv(|x| x as f32))?;
                let outputs = self.session.run(ort::inputs![
                    species_input.as_str() => species,
                    coordinates_input.as_str() => coordinates,
                ])?;
                let (_, energy) = outputs[energy_output.as_str()].try_extract_tensor::<f32>()?;
                energy.first().map(|&e| e as f64)
            }
            Precision::Double => {
                let coordinates = Value::from_array(coordinates)?;
                let outputs = self.session.run(ort::inputs![
                    species_input.as_str() => species,
                    coordinates_input.as_str() => coordinates,
                ])?;
                let (_, energy) = outputs[energy_output.as_str()].try_extract_tensor::<f64>()?;
                energy.first().copied()
            }
        };

        energy.ok_or(BackendError::MissingEnergy)
    }
}
