use std::{io, path::PathBuf, process::ExitStatus};

use thiserror::Error;

/// Errors produced while turning text into a [`Fragment`](crate::fragment::Fragment).
#[derive(Debug, Error, PartialEq)]
pub enum FragmentError {
    #[error("fragment contains no atoms")]
    EmptyFragment,

    #[error("fragment has {count} tokens, expected groups of four (symbol x y z)")]
    TrailingTokens { count: usize },

    #[error("atom {atom}: '{token}' is not a valid coordinate")]
    InvalidCoordinate { atom: usize, token: String },

    #[error("atom {atom}: '{symbol}' is not an element symbol")]
    InvalidSymbol { atom: usize, symbol: String },

    #[error("element '{0}' is not supported (only H and O)")]
    UnsupportedElement(String),

    #[error("atom {atom} has {components} position components, expected 3")]
    BadPosition { atom: usize, components: usize },

    #[error("atom index {index} out of range for a fragment of {len} atoms")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: expected an atom count, found '{found}'")]
    InvalidCount { line: usize, found: String },

    #[error("line {line}: frame ended early, expected {expected} atoms")]
    TruncatedFrame { line: usize, expected: usize },

    #[error("line {line}: expected `symbol x y z`")]
    MalformedAtom { line: usize },

    #[error("line {line}: {source}")]
    Atom {
        line: usize,
        #[source]
        source: FragmentError,
    },

    #[error("no frames found")]
    Empty,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("model '{model}' requires a [{section}] section")]
    MissingSection {
        model: &'static str,
        section: &'static str,
    },

    #[error("[{section}] {key}: {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend '{0}' was not compiled in")]
    Unavailable(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    EngineFailed {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("no energy found in engine output")]
    MissingEnergy,

    #[error("could not parse energy '{0}'")]
    InvalidEnergy(String),

    #[error(transparent)]
    Fragment(#[from] FragmentError),

    /// failures inside the neural network runtime
    #[error("network runtime: {0}")]
    Runtime(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Error)]
pub enum CalcError {
    #[error(transparent)]
    Fragment(#[from] FragmentError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{backend} backend: {source}")]
    Backend {
        backend: String,
        #[source]
        source: BackendError,
    },
}

#[derive(Debug, Error)]
pub enum ManyBodyError {
    #[error("monomer size must be at least 1")]
    ZeroMonomerSize,

    #[error("{atoms} atoms cannot be split into monomers of {monomer_size}")]
    UnevenMonomers { atoms: usize, monomer_size: usize },

    #[error("expansion order must be between 1 and {max}, got {order}")]
    InvalidOrder { order: usize, max: usize },

    #[error(transparent)]
    Calc(#[from] CalcError),
}
