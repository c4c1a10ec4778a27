use nalgebra::Vector3;
use serde::Serialize;

use crate::{error::FragmentError, periodic_table::sym_to_num};

/// Represents an atom in a fragment.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Atom {
    pub(crate) symbol: String,
    /// position in Ångström
    pub(crate) position: Vector3<f64>,
}

impl Atom {
    pub fn new(symbol: impl Into<String>, position: Vector3<f64>) -> Self {
        Self {
            symbol: symbol.into(),
            position,
        }
    }

    /// The element symbol exactly as it appeared in the input
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    /// Returns the atomic number, for the elements the neural potential knows about.
    pub fn atomic_number(&self) -> Result<i64, FragmentError> {
        sym_to_num(&self.symbol)
    }
}
