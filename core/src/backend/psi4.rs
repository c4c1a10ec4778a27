use std::{
    fs,
    path::Path,
    process::{Command, Output},
};

use crate::{config::Psi4Config, error::BackendError, fragment::Fragment};

use super::EnergyBackend;

const INPUT_FILE: &str = "input.dat";
const OUTPUT_FILE: &str = "output.dat";
const ENERGY_MARKER: &str = "@FRAGMENT-ENERGY";
const STDERR_TAIL_LINES: usize = 20;

/// Runs the psi4 executable once per fragment in a fresh temporary directory.
pub struct Psi4Backend {
    config: Psi4Config,
}

impl Psi4Backend {
    pub fn new(config: Psi4Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Psi4Config {
        &self.config
    }

    /// Renders the psithon input for one fragment. The energy ends up on a
    /// marker line in the output file, see [`parse_energy`].
    pub fn render_input(&self, fragment: &Fragment) -> String {
        format!(
            r#"memory {memory}
set_num_threads({threads})

molecule fragment {{
{fragment}
}}

fragment_energy = energy('{level_of_theory}', molecule=fragment)
psi4.core.print_out("\n{ENERGY_MARKER} %.12f\n" % fragment_energy)
"#,
            memory = self.config.memory.trim(),
            threads = self.config.threads,
            level_of_theory = self.config.level_of_theory(),
        )
    }

    fn run(&self, dir: &Path) -> Result<Output, BackendError> {
        let scratch = self.config.scratch_dir.as_deref().unwrap_or(dir);

        Command::new(&self.config.executable)
            .arg(INPUT_FILE)
            .arg(OUTPUT_FILE)
            .current_dir(dir)
            .env("PSI_SCRATCH", scratch)
            .output()
            .map_err(|source| BackendError::Launch {
                program: self.config.executable.clone(),
                source,
            })
    }
}

impl EnergyBackend for Psi4Backend {
    fn name(&self) -> &str {
        "psi4"
    }

    fn energy(&mut self, fragment: &Fragment) -> Result<f64, BackendError> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(INPUT_FILE), self.render_input(fragment))?;

        log::debug!(
            "running {} ({}) on {} atoms in {}",
            self.config.executable.display(),
            self.config.level_of_theory(),
            fragment.len(),
            dir.path().display()
        );

        let output = self.run(dir.path())?;
        if !output.status.success() {
            return Err(BackendError::EngineFailed {
                program: self.config.executable.clone(),
                status: output.status,
                stderr: tail(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL_LINES),
            });
        }

        let log = fs::read_to_string(dir.path().join(OUTPUT_FILE))?;
        let energy = parse_energy(&log)?;
        log::trace!("psi4 energy: {energy}");

        Ok(energy)
    }
}

/// Pulls the energy out of a psi4 output file. If the marker shows up more than
/// once, the last one wins.
pub fn parse_energy(output: &str) -> Result<f64, BackendError> {
    let value = output
        .lines()
        .filter_map(|line| line.trim().strip_prefix(ENERGY_MARKER))
        .last()
        .ok_or(BackendError::MissingEnergy)?
        .trim();

    value
        .parse()
        .map_err(|_| BackendError::InvalidEnergy(value.to_string()))
}

fn tail(text: &str, lines: usize) -> String {
    let all = text.lines().collect::<Vec<_>>();
    all[all.len().saturating_sub(lines)..].join("\n")
}
