//! Many-body expansion of a cluster of identical monomers:
//!
//! E = Σ E_i + Σ ΔE_ij + Σ ΔE_ijk + ...
//!
//! where every increment is the subset energy minus the increments of all of
//! its proper subsets.
use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    calculator::EnergyCalculator,
    error::{CalcError, ManyBodyError},
    fragment::Fragment,
};

/// The energy of one subset of monomers, and its many-body increment.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubsetEnergy {
    pub monomers: Vec<usize>,
    pub energy: f64,
    pub increment: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ManyBodyEnergies {
    /// `contributions[n - 1]` is the summed n-body increment
    pub contributions: Vec<f64>,
    pub subsets: Vec<SubsetEnergy>,
}

impl ManyBodyEnergies {
    pub fn order(&self) -> usize {
        self.contributions.len()
    }

    /// The expansion truncated at [`order`](Self::order)
    pub fn total(&self) -> f64 {
        self.contributions.iter().sum()
    }

    pub fn interaction_energy(&self) -> f64 {
        self.total() - self.contributions.first().copied().unwrap_or_default()
    }
}

/// Splits a cluster into consecutive monomers of `monomer_size` atoms.
pub fn split_monomers(
    fragment: &Fragment,
    monomer_size: usize,
) -> Result<Vec<Fragment>, ManyBodyError> {
    if monomer_size == 0 {
        return Err(ManyBodyError::ZeroMonomerSize);
    }
    if fragment.is_empty() || fragment.len() % monomer_size != 0 {
        return Err(ManyBodyError::UnevenMonomers {
            atoms: fragment.len(),
            monomer_size,
        });
    }

    Ok(fragment
        .atoms()
        .chunks(monomer_size)
        .map(|atoms| Fragment::new(atoms.to_vec()))
        .collect())
}

#[derive(Copy, Clone, Debug)]
pub struct ManyBodyExpansion {
    pub monomer_size: usize,
    pub max_order: usize,
}

impl ManyBodyExpansion {
    pub fn new(monomer_size: usize, max_order: usize) -> Self {
        Self {
            monomer_size,
            max_order,
        }
    }

    pub fn compute(
        &self,
        calculator: &mut EnergyCalculator,
        cluster: &Fragment,
    ) -> Result<ManyBodyEnergies, ManyBodyError> {
        let subsets = self.subsets(cluster)?;

        let energies = subsets
            .into_iter()
            .map(|(monomers, fragment)| Ok((monomers, calculator.energy(&fragment)?)))
            .collect::<Result<Vec<_>, CalcError>>()?;

        Ok(self.assemble(energies))
    }

    /// Evaluates the subsets on the rayon pool. Every worker builds its own
    /// calculator from `config` the first time it picks up a subset.
    #[cfg(feature = "rayon")]
    pub fn compute_parallel(
        &self,
        config: &crate::config::Config,
        cluster: &Fragment,
    ) -> Result<ManyBodyEnergies, ManyBodyError> {
        use rayon::prelude::*;

        let subsets = self.subsets(cluster)?;

        let energies = subsets
            .into_par_iter()
            .map_init(
                || None::<EnergyCalculator>,
                |slot, (monomers, fragment)| {
                    let calculator = match slot {
                        Some(calculator) => calculator,
                        None => slot.insert(EnergyCalculator::from_config(config)?),
                    };
                    Ok((monomers, calculator.energy(&fragment)?))
                },
            )
            .collect::<Result<Vec<_>, CalcError>>()?;

        Ok(self.assemble(energies))
    }

    /// Every subset of monomers up to the expansion order, smallest first.
    fn subsets(&self, cluster: &Fragment) -> Result<Vec<(Vec<usize>, Fragment)>, ManyBodyError> {
        let monomers = split_monomers(cluster, self.monomer_size)?;

        if self.max_order == 0 || self.max_order > monomers.len() {
            return Err(ManyBodyError::InvalidOrder {
                order: self.max_order,
                max: monomers.len(),
            });
        }

        log::info!(
            "{}-body expansion over {} monomers",
            self.max_order,
            monomers.len()
        );

        let mut subsets = Vec::new();
        for order in 1..=self.max_order {
            for combination in (0..monomers.len()).combinations(order) {
                let atoms = combination
                    .iter()
                    .flat_map(|&m| m * self.monomer_size..(m + 1) * self.monomer_size)
                    .collect::<Vec<_>>();
                let fragment = cluster.subset(&atoms).map_err(CalcError::from)?;
                subsets.push((combination, fragment));
            }
        }

        log::debug!("{} subsets to evaluate", subsets.len());
        Ok(subsets)
    }

    /// `energies` must be ordered by subset size, as produced by [`Self::subsets`].
    fn assemble(&self, energies: Vec<(Vec<usize>, f64)>) -> ManyBodyEnergies {
        let mut increments = HashMap::<Vec<usize>, f64>::with_capacity(energies.len());
        let mut contributions = vec![0.0; self.max_order];
        let mut subsets = Vec::with_capacity(energies.len());

        for (monomers, energy) in energies {
            let lower_order = (1..monomers.len())
                .flat_map(|size| monomers.iter().copied().combinations(size))
                .map(|proper| increments[&proper])
                .sum::<f64>();
            let increment = energy - lower_order;

            log::trace!("subset {monomers:?}: energy {energy}, increment {increment}");

            contributions[monomers.len() - 1] += increment;
            increments.insert(monomers.clone(), increment);
            subsets.push(SubsetEnergy {
                monomers,
                energy,
                increment,
            });
        }

        ManyBodyEnergies {
            contributions,
            subsets,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::calculator::testing::PairwiseBackend;

    const TRIMER: &str = "
        O 0.000 0.000 0.000  H 0.757 0.586 0.000  H -0.757 0.586 0.000
        O 2.900 0.000 0.000  H 3.657 0.586 0.000  H 2.143 0.586 0.000
        O 1.450 2.500 0.000  H 2.207 3.086 0.000  H 0.693 3.086 0.000";

    fn calculator() -> EnergyCalculator {
        EnergyCalculator::with_backend(Box::new(PairwiseBackend::water()))
    }

    #[test]
    fn splits_into_monomers() {
        let cluster: Fragment = TRIMER.parse().unwrap();
        let monomers = split_monomers(&cluster, 3).unwrap();

        assert_eq!(monomers.len(), 3);
        assert_eq!(monomers[2].atoms()[0].position().y, 2.5);
    }

    #[test]
    fn uneven_split() {
        let cluster: Fragment = TRIMER.parse().unwrap();

        assert!(matches!(
            split_monomers(&cluster, 4),
            Err(ManyBodyError::UnevenMonomers {
                atoms: 9,
                monomer_size: 4
            })
        ));
        assert!(matches!(
            split_monomers(&cluster, 0),
            Err(ManyBodyError::ZeroMonomerSize)
        ));
    }

    #[test]
    fn order_is_bounded_by_monomer_count() {
        let cluster: Fragment = TRIMER.parse().unwrap();

        for order in [0, 4] {
            assert!(matches!(
                ManyBodyExpansion::new(3, order).compute(&mut calculator(), &cluster),
                Err(ManyBodyError::InvalidOrder { max: 3, .. })
            ));
        }
    }

    #[test]
    fn pairwise_model_has_no_three_body_term() {
        let cluster: Fragment = TRIMER.parse().unwrap();
        let full = calculator().energy(&cluster).unwrap();

        let energies = ManyBodyExpansion::new(3, 3)
            .compute(&mut calculator(), &cluster)
            .unwrap();

        assert_eq!(energies.order(), 3);
        assert_eq!(energies.subsets.len(), 3 + 3 + 1);
        assert_relative_eq!(energies.contributions[2], 0.0, epsilon = 1e-10);
        assert_relative_eq!(energies.total(), full, epsilon = 1e-10);
    }

    #[test]
    fn two_body_truncation_is_exact_for_pairwise_model() {
        let cluster: Fragment = TRIMER.parse().unwrap();
        let full = calculator().energy(&cluster).unwrap();

        let energies = ManyBodyExpansion::new(3, 2)
            .compute(&mut calculator(), &cluster)
            .unwrap();

        let monomer_sum: f64 = split_monomers(&cluster, 3)
            .unwrap()
            .iter()
            .map(|monomer| calculator().energy(monomer).unwrap())
            .sum();

        assert_relative_eq!(energies.contributions[0], monomer_sum, epsilon = 1e-10);
        assert_relative_eq!(energies.total(), full, epsilon = 1e-10);
        assert_relative_eq!(
            energies.interaction_energy(),
            full - monomer_sum,
            epsilon = 1e-10
        );
        assert!(energies.interaction_energy() > 0.0);
    }

    #[test]
    fn dimer_increment_matches_definition() {
        let cluster: Fragment = TRIMER.parse().unwrap();
        let energies = ManyBodyExpansion::new(3, 2)
            .compute(&mut calculator(), &cluster)
            .unwrap();

        let energy_of = |monomers: &[usize]| {
            energies
                .subsets
                .iter()
                .find(|subset| subset.monomers == monomers)
                .unwrap()
                .energy
        };
        let dimer = energies
            .subsets
            .iter()
            .find(|subset| subset.monomers == [0, 2])
            .unwrap();

        assert_relative_eq!(
            dimer.increment,
            energy_of(&[0, 2]) - energy_of(&[0]) - energy_of(&[2]),
            epsilon = 1e-12
        );
    }

    #[cfg(all(feature = "rayon", unix))]
    #[test]
    fn parallel_evaluation_matches_sequential() {
        use crate::{backend::psi4::testing::write_script, config::Config};

        // per-atom constants plus a term cubic in the atom count, so the 2- and
        // 3-body increments are non-zero
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "fake-psi4",
            r#"awk '$1 == "O" || $1 == "H" { n += 1; e += ($1 == "O" ? -75.0 : -0.5) + 0.001 * $2 }
END { printf "@FRAGMENT-ENERGY %.10f\n", e + 0.00001 * n * n * n }' "$1" > "$2""#,
        );
        let config = Config::from_toml_str(&format!(
            "[driver]\nmodel = \"psi4\"\n\n[psi4]\nmemory = \"500 MB\"\nmethod = \"scf\"\nbasis = \"sto-3g\"\nexecutable = '{}'\n",
            script.display()
        ))
        .unwrap();

        let cluster: Fragment = TRIMER.parse().unwrap();
        let expansion = ManyBodyExpansion::new(3, 3);

        let sequential = expansion
            .compute(&mut EnergyCalculator::from_config(&config).unwrap(), &cluster)
            .unwrap();
        let parallel = expansion.compute_parallel(&config, &cluster).unwrap();

        assert_eq!(
            parallel
                .subsets
                .iter()
                .map(|subset| subset.monomers.clone())
                .collect::<Vec<_>>(),
            [
                vec![0],
                vec![1],
                vec![2],
                vec![0, 1],
                vec![0, 2],
                vec![1, 2],
                vec![0, 1, 2]
            ]
        );
        assert_relative_eq!(parallel.contributions[1], 3.0 * 0.00162, epsilon = 1e-8);
        assert_relative_eq!(parallel.contributions[2], 0.00162, epsilon = 1e-8);
        for (a, b) in parallel.contributions.iter().zip(&sequential.contributions) {
            assert_relative_eq!(*a, *b, epsilon = 1e-10);
        }
        for (a, b) in parallel.subsets.iter().zip(&sequential.subsets) {
            assert_eq!(a.monomers, b.monomers);
            assert_relative_eq!(a.energy, b.energy, epsilon = 1e-10);
        }
    }
}
