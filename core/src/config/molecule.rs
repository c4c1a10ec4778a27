use std::{fs::File, io::BufReader, path::Path};

use nalgebra::Vector3;
use serde::Deserialize;

use crate::{
    atom::Atom,
    error::FragmentError,
    fragment::{check_symbol, Fragment},
};

/// Represents a full fragment in a JSON file.
/// A fragment is just a list of positioned atoms.
#[derive(Deserialize)]
pub struct ConfigFragment(Vec<ConfigAtom>);

#[derive(Deserialize)]
struct ConfigAtom {
    element: String,
    position: Vec<f64>,
}

impl ConfigFragment {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, serde_json::Error> {
        let file = File::open(path).map_err(serde_json::Error::io)?;
        serde_json::from_reader(BufReader::new(file))
    }
}

impl TryFrom<ConfigFragment> for Fragment {
    type Error = FragmentError;

    fn try_from(value: ConfigFragment) -> Result<Self, Self::Error> {
        let ConfigFragment(config_atoms) = value;

        let mut atoms = Vec::with_capacity(config_atoms.len());

        for (index, atom) in config_atoms.into_iter().enumerate() {
            let &[x, y, z] = atom.position.as_slice() else {
                return Err(FragmentError::BadPosition {
                    atom: index,
                    components: atom.position.len(),
                });
            };

            check_symbol(index, &atom.element)?;

            atoms.push(Atom::new(atom.element, Vector3::new(x, y, z)));
        }

        if atoms.is_empty() {
            return Err(FragmentError::EmptyFragment);
        }

        Ok(Fragment::new(atoms))
    }
}
