use std::{fmt, str::FromStr};

use itertools::Itertools;
use nalgebra::Vector3;
use serde::Serialize;

use crate::{atom::Atom, error::FragmentError};

/// A small set of atoms whose energy is evaluated as one unit.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Fragment {
    pub(crate) atoms: Vec<Atom>,
}

impl Fragment {
    pub fn new(atoms: Vec<Atom>) -> Self {
        Self { atoms }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.atoms.iter().map(Atom::symbol)
    }

    /// Returns all coordinates as `[x0, y0, z0, x1, ...]`
    pub fn coordinates(&self) -> Vec<f64> {
        self.atoms
            .iter()
            .flat_map(|atom| atom.position.iter().copied())
            .collect()
    }

    /// Builds a new fragment out of the atoms at `indices`, in the given order.
    pub fn subset(&self, indices: &[usize]) -> Result<Fragment, FragmentError> {
        let atoms = indices
            .iter()
            .map(|&index| {
                self.atoms
                    .get(index)
                    .cloned()
                    .ok_or(FragmentError::IndexOutOfRange {
                        index,
                        len: self.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { atoms })
    }
}

/// Parses a flat `symbol x y z symbol x y z ...` token stream. Any whitespace,
/// including newlines, separates tokens.
pub fn parse_fragment(input: &str) -> Result<Fragment, FragmentError> {
    let tokens = input.split_whitespace().collect::<Vec<_>>();

    if tokens.is_empty() {
        return Err(FragmentError::EmptyFragment);
    }
    if tokens.len() % 4 != 0 {
        return Err(FragmentError::TrailingTokens {
            count: tokens.len(),
        });
    }

    let atoms = tokens
        .into_iter()
        .tuples()
        .enumerate()
        .map(|(index, (symbol, x, y, z))| parse_atom(index, symbol, [x, y, z]))
        .collect::<Result<Vec<_>, _>>()?;

    log::trace!("parsed fragment with {} atoms", atoms.len());

    Ok(Fragment { atoms })
}

pub(crate) fn parse_atom(
    index: usize,
    symbol: &str,
    coordinates: [&str; 3],
) -> Result<Atom, FragmentError> {
    check_symbol(index, symbol)?;

    let mut position = Vector3::zeros();
    for (axis, token) in coordinates.iter().enumerate() {
        position[axis] = token
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| FragmentError::InvalidCoordinate {
                atom: index,
                token: token.to_string(),
            })?;
    }

    Ok(Atom::new(symbol, position))
}

/// Element symbols start with a letter. Psi4 receives them verbatim, so
/// anything else is rejected up front.
pub(crate) fn check_symbol(index: usize, symbol: &str) -> Result<(), FragmentError> {
    if !symbol.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(FragmentError::InvalidSymbol {
            atom: index,
            symbol: symbol.to_string(),
        });
    }
    Ok(())
}

impl FromStr for Fragment {
    type Err = FragmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fragment(s)
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, atom) in self.atoms.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            let [x, y, z] = [atom.position.x, atom.position.y, atom.position.z];
            write!(f, "{} {x:.10} {y:.10} {z:.10}", atom.symbol)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const WATER: &str = "O 0.000 0.000 0.117
        H 0.000 0.757 -0.467
        H 0.000 -0.757 -0.467";

    #[test]
    fn parses_water() {
        let fragment = parse_fragment(WATER).unwrap();

        assert_eq!(fragment.len(), 3);
        assert_eq!(fragment.symbols().collect::<Vec<_>>(), ["O", "H", "H"]);
        assert_relative_eq!(fragment.atoms()[1].position().y, 0.757);
        assert_relative_eq!(fragment.atoms()[2].position().z, -0.467);
    }

    #[test]
    fn single_line_and_multi_line_agree() {
        let flat = WATER.split_whitespace().join(" ");
        assert_eq!(
            parse_fragment(&flat).unwrap(),
            parse_fragment(WATER).unwrap()
        );
    }

    #[test]
    fn coordinates_are_row_major() {
        let fragment: Fragment = "O 1 2 3 H 4 5 6".parse().unwrap();
        assert_eq!(fragment.coordinates(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn empty_input() {
        assert_eq!(parse_fragment(""), Err(FragmentError::EmptyFragment));
        assert_eq!(parse_fragment(" \n\t "), Err(FragmentError::EmptyFragment));
    }

    #[test]
    fn trailing_tokens_are_an_error() {
        assert_eq!(
            parse_fragment("O 0 0 0 H 1"),
            Err(FragmentError::TrailingTokens { count: 6 })
        );
    }

    #[test]
    fn bad_coordinate_names_the_atom() {
        assert_eq!(
            parse_fragment("O 0 0 0 H 0.0 abc 1.0"),
            Err(FragmentError::InvalidCoordinate {
                atom: 1,
                token: "abc".to_string()
            })
        );
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        assert_eq!(
            parse_fragment("O nan 0 0"),
            Err(FragmentError::InvalidCoordinate {
                atom: 0,
                token: "nan".to_string()
            })
        );
        assert_eq!(
            parse_fragment("H 0 0 0 O 0 inf 0"),
            Err(FragmentError::InvalidCoordinate {
                atom: 1,
                token: "inf".to_string()
            })
        );
        assert!(matches!(
            parse_fragment("O 0 0 -infinity"),
            Err(FragmentError::InvalidCoordinate { atom: 0, .. })
        ));
    }

    #[test]
    fn numeric_symbol_is_rejected() {
        assert!(matches!(
            parse_fragment("8 0 0 0"),
            Err(FragmentError::InvalidSymbol { atom: 0, .. })
        ));
    }

    #[test]
    fn display_is_parseable() {
        let fragment = parse_fragment(WATER).unwrap();
        let rendered = fragment.to_string();

        assert_eq!(rendered.lines().count(), 3);
        assert!(rendered.starts_with("O 0.0000000000 0.0000000000 0.1170000000"));
        assert_eq!(parse_fragment(&rendered).unwrap(), fragment);
    }

    #[test]
    fn subset_keeps_order() {
        let fragment = parse_fragment(WATER).unwrap();
        let subset = fragment.subset(&[2, 0]).unwrap();

        assert_eq!(subset.symbols().collect::<Vec<_>>(), ["H", "O"]);
        assert_eq!(
            fragment.subset(&[3]),
            Err(FragmentError::IndexOutOfRange { index: 3, len: 3 })
        );
    }
}
