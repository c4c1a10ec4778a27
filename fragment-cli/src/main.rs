use std::{path::PathBuf, time::Instant};

use anyhow::{bail, Context};
use clap::{Args as ClapArgs, Parser, Subcommand};
use fragment_core::{
    config::ConfigFragment,
    many_body::{ManyBodyEnergies, ManyBodyExpansion},
    xyz::load_xyz,
    Config, EnergyCalculator, Fragment, HARTREE_TO_KCAL_PER_MOL,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: FragmentCommand,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    output_json: bool,
}

#[derive(ClapArgs, Debug)]
#[group(required = true, multiple = false)]
struct FragmentSource {
    /// Inline fragment, `symbol x y z` repeated
    #[arg(long, short)]
    fragment: Option<String>,
    /// An XYZ file. Every frame is evaluated
    #[arg(long)]
    xyz: Option<PathBuf>,
    /// A JSON list of `{"element": .., "position": [x, y, z]}`
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum FragmentCommand {
    /// Compute the energy of one or more fragments
    Energy {
        /// The calculation config (TOML)
        #[arg(long, short)]
        config: PathBuf,
        #[command(flatten)]
        source: FragmentSource,
        /// Report energies in kcal/mol instead of Hartree
        #[arg(long)]
        kcal: bool,
    },
    /// Many-body expansion of a cluster of identical monomers
    ManyBody {
        /// The calculation config (TOML)
        #[arg(long, short)]
        config: PathBuf,
        #[command(flatten)]
        source: FragmentSource,
        /// Number of atoms per monomer
        #[arg(long, default_value_t = 3)]
        monomer_size: usize,
        /// Highest n-body term to include
        #[arg(long, default_value_t = 2)]
        order: usize,
        /// Evaluate subsets in parallel, one engine instance per worker
        #[arg(long)]
        parallel: bool,
    },
}

#[derive(Serialize)]
struct EnergyRecord<'a> {
    label: &'a str,
    atoms: usize,
    energy: f64,
    unit: &'static str,
}

#[derive(Serialize)]
struct ManyBodyRecord<'a> {
    label: &'a str,
    total: f64,
    interaction_energy: f64,
    #[serde(flatten)]
    energies: &'a ManyBodyEnergies,
}

fn init_logging(verbose: bool) {
    if verbose && std::env::var_os("RUST_LOG").is_none() {
        pretty_env_logger::formatted_builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        pretty_env_logger::init();
    }
}

fn load_fragments(source: FragmentSource) -> anyhow::Result<Vec<(String, Fragment)>> {
    if let Some(fragment) = source.fragment {
        return Ok(vec![("fragment".to_string(), fragment.parse::<Fragment>()?)]);
    }

    if let Some(path) = source.json {
        let fragment = ConfigFragment::load(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        return Ok(vec![(path.display().to_string(), Fragment::try_from(fragment)?)]);
    }

    if let Some(path) = source.xyz {
        let frames = load_xyz(&path).with_context(|| format!("reading {}", path.display()))?;
        return Ok(frames
            .into_iter()
            .enumerate()
            .map(|(index, frame)| {
                let label = if frame.comment.is_empty() {
                    format!("frame {index}")
                } else {
                    frame.comment
                };
                (label, frame.fragment)
            })
            .collect());
    }

    bail!("no fragment given")
}

fn main() -> anyhow::Result<()> {
    let args: Args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        FragmentCommand::Energy {
            config,
            source,
            kcal,
        } => {
            let config = Config::load(&config)?;
            let fragments = load_fragments(source)?;
            let mut calculator = EnergyCalculator::from_config(&config)?;

            let (scale, unit) = if kcal {
                (HARTREE_TO_KCAL_PER_MOL, "kcal/mol")
            } else {
                (1.0, "hartree")
            };

            for (label, fragment) in &fragments {
                let start = Instant::now();
                let energy = calculator
                    .energy(fragment)
                    .with_context(|| format!("evaluating {label}"))?
                    * scale;
                log::info!("{label} evaluated in {:0.2?}", start.elapsed());

                if args.output_json {
                    let record = EnergyRecord {
                        label,
                        atoms: fragment.len(),
                        energy,
                        unit,
                    };
                    println!("{}", serde_json::to_string(&record)?);
                } else {
                    println!("{label}: {energy:.10} {unit}");
                }
            }
        }

        FragmentCommand::ManyBody {
            config,
            source,
            monomer_size,
            order,
            parallel,
        } => {
            let config = Config::load(&config)?;
            let expansion = ManyBodyExpansion::new(monomer_size, order);

            for (label, cluster) in load_fragments(source)? {
                let start = Instant::now();
                let energies = if parallel {
                    compute_parallel(&expansion, &config, &cluster)?
                } else {
                    expansion.compute(&mut EnergyCalculator::from_config(&config)?, &cluster)?
                };
                log::info!(
                    "{label}: {} subsets evaluated in {:0.2?}",
                    energies.subsets.len(),
                    start.elapsed()
                );

                if args.output_json {
                    let record = ManyBodyRecord {
                        label: &label,
                        total: energies.total(),
                        interaction_energy: energies.interaction_energy(),
                        energies: &energies,
                    };
                    println!("{}", serde_json::to_string_pretty(&record)?);
                } else {
                    println!("{label}");
                    for (index, contribution) in energies.contributions.iter().enumerate() {
                        println!("  {}-body: {contribution:.10} hartree", index + 1);
                    }
                    println!(
                        "  interaction energy: {:.10} hartree ({:.4} kcal/mol)",
                        energies.interaction_energy(),
                        energies.interaction_energy() * HARTREE_TO_KCAL_PER_MOL
                    );
                    println!("  total: {:.10} hartree", energies.total());
                }
            }
        }
    }

    Ok(())
}

#[cfg(feature = "rayon")]
fn compute_parallel(
    expansion: &ManyBodyExpansion,
    config: &Config,
    cluster: &Fragment,
) -> anyhow::Result<ManyBodyEnergies> {
    Ok(expansion.compute_parallel(config, cluster)?)
}

#[cfg(not(feature = "rayon"))]
fn compute_parallel(
    _expansion: &ManyBodyExpansion,
    _config: &Config,
    _cluster: &Fragment,
) -> anyhow::Result<ManyBodyEnergies> {
    bail!("--parallel requires building with the `rayon` feature")
}
