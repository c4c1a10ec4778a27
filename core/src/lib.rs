pub mod atom;
pub mod backend;
pub mod calculator;
pub mod config;
pub mod error;
pub mod fragment;
pub mod many_body;
pub mod periodic_table;
pub mod xyz;

pub use calculator::{calc_energy, EnergyCalculator};
pub use config::Config;
pub use fragment::{parse_fragment, Fragment};

/// CODATA 2018 conversion from Hartree to kcal/mol
pub const HARTREE_TO_KCAL_PER_MOL: f64 = 627.509_474_063_1;
