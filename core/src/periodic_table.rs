use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::FragmentError;

/// The elements the water network was trained on. The discriminant is the
/// atomic number.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i64)]
pub enum ElementType {
    H = 1,
    O = 8,
}

impl ElementType {
    pub fn atomic_number(self) -> i64 {
        self as i64
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ElementType::H => "H",
            ElementType::O => "O",
        }
    }
}

impl FromStr for ElementType {
    type Err = FragmentError;

    fn from_str(symbol: &str) -> Result<Self, Self::Err> {
        match symbol {
            "H" | "h" => Ok(ElementType::H),
            "O" | "o" => Ok(ElementType::O),
            _ => Err(FragmentError::UnsupportedElement(symbol.to_string())),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Converts an element symbol into the atomic number the neural potential expects.
pub fn sym_to_num(symbol: &str) -> Result<i64, FragmentError> {
    symbol.parse::<ElementType>().map(ElementType::atomic_number)
}
