//! Reader for standard XYZ files: an atom count line, a comment line, then one
//! `symbol x y z` line per atom. Frames may follow each other in one file.
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::{
    error::{FragmentError, XyzError},
    fragment::{parse_atom, Fragment},
};

#[derive(Clone, Debug, PartialEq)]
pub struct XyzFrame {
    pub comment: String,
    pub fragment: Fragment,
}

pub fn load_xyz(path: impl AsRef<Path>) -> Result<Vec<XyzFrame>, XyzError> {
    read_xyz(BufReader::new(File::open(path)?))
}

pub fn read_xyz(reader: impl BufRead) -> Result<Vec<XyzFrame>, XyzError> {
    let mut lines = reader
        .lines()
        .enumerate()
        .map(|(index, line)| line.map(|line| (index + 1, line)));

    let mut frames = Vec::new();

    while let Some(line) = lines.next() {
        let (line_number, count_line) = line?;
        let count_line = count_line.trim();
        if count_line.is_empty() {
            continue;
        }

        let expected = count_line
            .parse::<usize>()
            .map_err(|_| XyzError::InvalidCount {
                line: line_number,
                found: count_line.to_string(),
            })?;
        if expected == 0 {
            return Err(XyzError::Atom {
                line: line_number,
                source: FragmentError::EmptyFragment,
            });
        }

        let comment = match lines.next() {
            Some(line) => line?.1.trim().to_string(),
            None => {
                return Err(XyzError::TruncatedFrame {
                    line: line_number,
                    expected,
                })
            }
        };

        let mut atoms = Vec::with_capacity(expected);
        let mut last_line = line_number + 1;
        while atoms.len() < expected {
            let Some(line) = lines.next() else {
                return Err(XyzError::TruncatedFrame {
                    line: last_line,
                    expected,
                });
            };
            let (line_number, atom_line) = line?;
            last_line = line_number;

            let mut tokens = atom_line.split_whitespace();
            let (Some(symbol), Some(x), Some(y), Some(z)) =
                (tokens.next(), tokens.next(), tokens.next(), tokens.next())
            else {
                return Err(XyzError::MalformedAtom { line: line_number });
            };

            let atom = parse_atom(atoms.len(), symbol, [x, y, z]).map_err(|source| {
                XyzError::Atom {
                    line: line_number,
                    source,
                }
            })?;
            atoms.push(atom);
        }

        log::debug!("read xyz frame '{comment}' with {expected} atoms");
        frames.push(XyzFrame {
            comment,
            fragment: Fragment::new(atoms),
        });
    }

    if frames.is_empty() {
        return Err(XyzError::Empty);
    }

    Ok(frames)
}
