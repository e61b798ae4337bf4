//! Population management and generational evolution.
//!
//! # Algorithm Overview
//!
//! Each generation follows this cycle:
//!
//! 1. **Evaluate Fitness** - Every individual is scored by the variance of its group
//!    sums, then the population is sorted ascending (best first)
//! 2. **Elite Selection** - The best `elite_count` individuals are copied unchanged
//!    into the next generation
//! 3. **Parent Selection** - Two distinct elites are drawn uniformly for each child
//! 4. **Crossover** - Single-point crossover with an interior cut point
//! 5. **Mutation** - Change mutation followed by swap mutation
//!
//! Because the elite survives unchanged, the best fitness never gets worse from one
//! generation to the next.
//!
//! # Parallelization
//!
//! Fitness evaluation is split into contiguous chunks evaluated on scoped threads.
//! Evaluation reads only the shared workload vector and uses no randomness, so the
//! outcome does not depend on the number of threads.

use std::{num::NonZeroUsize, thread};

use rand::{Rng, seq::index};
use workdiv_stats::descriptive::DescriptiveStats;

use crate::{assignment, workload::Workloads};

/// A candidate division: one group label per task and its fitness.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    assignment: Vec<u32>,
    variance: f64,
}

impl Individual {
    /// Creates an individual that has not been evaluated yet.
    ///
    /// Unevaluated individuals report a variance of `f64::INFINITY`.
    #[must_use]
    pub fn new(assignment: Vec<u32>) -> Self {
        Self {
            assignment,
            variance: f64::INFINITY,
        }
    }

    #[must_use]
    pub fn assignment(&self) -> &[u32] {
        &self.assignment
    }

    /// Returns the variance of the group sums (lower is better).
    #[must_use]
    pub fn variance(&self) -> f64 {
        self.variance
    }

    #[must_use]
    pub fn into_assignment(self) -> Vec<u32> {
        self.assignment
    }
}

/// A population of candidate divisions.
#[derive(Debug, Clone)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    /// Creates `count` individuals with uniformly random labels.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero.
    #[must_use]
    pub fn random<R>(rng: &mut R, count: usize, num_groups: u32, num_tasks: usize) -> Self
    where
        R: Rng + ?Sized,
    {
        assert!(count > 0, "population must not be empty");
        let individuals = (0..count)
            .map(|_| Individual::new(assignment::random(rng, num_groups, num_tasks)))
            .collect();
        Self { individuals }
    }

    /// Creates an unevaluated population from existing assignments.
    ///
    /// # Panics
    ///
    /// Panics if `assignments` is empty.
    #[must_use]
    pub fn from_assignments<I>(assignments: I) -> Self
    where
        I: IntoIterator<Item = Vec<u32>>,
    {
        let individuals = assignments
            .into_iter()
            .map(Individual::new)
            .collect::<Vec<_>>();
        assert!(!individuals.is_empty(), "population must not be empty");
        Self { individuals }
    }

    #[must_use]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Evaluates the fitness of every individual and sorts the population by
    /// variance ascending (best first).
    ///
    /// The sort is stable, so individuals with equal variance keep their order.
    pub fn evaluate_fitness(
        &mut self,
        workloads: &Workloads,
        num_groups: u32,
        threads: NonZeroUsize,
    ) {
        let chunk_size = self.individuals.len().div_ceil(threads.get()).max(1);
        if chunk_size >= self.individuals.len() {
            evaluate_chunk(&mut self.individuals, workloads, num_groups);
        } else {
            thread::scope(|s| {
                for chunk in self.individuals.chunks_mut(chunk_size) {
                    s.spawn(move || evaluate_chunk(chunk, workloads, num_groups));
                }
            });
        }

        self.individuals
            .sort_by(|a, b| a.variance.total_cmp(&b.variance));
    }

    /// Returns the first `count` individuals, which are the elite after
    /// [`Self::evaluate_fitness`].
    #[must_use]
    pub fn elite(&self, count: usize) -> &[Individual] {
        &self.individuals[..count.min(self.individuals.len())]
    }

    /// Returns the best individual of an evaluated population.
    #[must_use]
    pub fn best(&self) -> &Individual {
        &self.individuals[0]
    }

    #[must_use]
    pub fn into_best(self) -> Individual {
        self.individuals.into_iter().next().expect("population is never empty")
    }

    /// Computes descriptive statistics of the variances in the population.
    ///
    /// Useful for tracking how the whole population converges, not only the
    /// best individual.
    ///
    /// # Panics
    ///
    /// Panics if the population is not sorted, i.e. it has not been evaluated
    /// since it was bred.
    #[must_use]
    pub fn compute_fitness_stats(&self) -> DescriptiveStats {
        let variances = self
            .individuals
            .iter()
            .map(|ind| ind.variance)
            .collect::<Vec<_>>();
        DescriptiveStats::from_sorted(&variances).expect("population is never empty")
    }
}

fn evaluate_chunk(individuals: &mut [Individual], workloads: &Workloads, num_groups: u32) {
    for ind in individuals {
        ind.variance = workloads.variance(&ind.assignment, num_groups);
    }
}

/// Controls how a population turns into the next generation.
#[derive(Debug, Clone)]
pub struct PopulationEvolver {
    /// Number of groups; mutated labels are drawn from `[1, num_groups]`
    pub num_groups: u32,
    /// Number of top individuals preserved unchanged and used as parents
    pub elite_count: usize,
    /// Per-position probability of change mutation
    pub change_rate: f64,
    /// Per-child probability of swap mutation
    pub swap_rate: f64,
}

impl PopulationEvolver {
    /// Evolves the population to create the next generation.
    ///
    /// 1. Copies the top `elite_count` individuals unchanged
    /// 2. Fills the rest with children of two distinct random elites, produced by
    ///    crossover, change mutation and swap mutation in that order
    ///
    /// The returned population has the same size as the input.
    ///
    /// # Panics
    ///
    /// Panics if `population` is not sorted by variance ascending or if fewer
    /// than two elites are available.
    #[must_use]
    pub fn evolve<R>(&self, population: &Population, rng: &mut R) -> Population
    where
        R: Rng + ?Sized,
    {
        assert!(
            population
                .individuals
                .is_sorted_by(|a, b| a.variance <= b.variance)
        );
        let pool_size = population.len();
        let elite = population.elite(self.elite_count);
        assert!(
            elite.len() >= 2,
            "at least two elites are needed to pick distinct parents"
        );

        let mut next_individuals = Vec::with_capacity(pool_size);
        next_individuals.extend(elite.iter().cloned());

        while next_individuals.len() < pool_size {
            let parents = index::sample(rng, elite.len(), 2);
            let p1 = &elite[parents.index(0)];
            let p2 = &elite[parents.index(1)];

            let child = assignment::single_point_crossover(&p1.assignment, &p2.assignment, rng);
            let child = assignment::change_mutation(child, self.num_groups, self.change_rate, rng);
            let child = assignment::swap_mutation(child, self.swap_rate, rng);

            next_individuals.push(Individual::new(child));
        }

        Population {
            individuals: next_individuals,
        }
    }
}
