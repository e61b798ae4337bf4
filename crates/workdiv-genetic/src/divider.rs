//! The genetic divider: configuration, run loop and progress reporting.

use std::{
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use rand::Rng;
use serde::{Deserialize, Serialize};
use workdiv_stats::descriptive::DescriptiveStats;

use crate::{
    DivideError,
    genetic::{Population, PopulationEvolver},
    workload::Workloads,
};

/// Tuning parameters of a division run.
///
/// Missing fields take their default values when deserialized, so a partial
/// JSON object such as `{"generations": 200}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DividerConfig {
    /// Number of individuals in every generation
    pub pool_size: usize,
    /// Number of generations to run
    pub generations: usize,
    /// Number of best individuals kept unchanged and used as parents
    pub elite_count: usize,
    /// Per-position probability of change mutation
    pub change_rate: f64,
    /// Per-child probability of swap mutation
    pub swap_rate: f64,
    /// Threads used for fitness evaluation (`None` = available parallelism)
    pub threads: Option<NonZeroUsize>,
}

impl Default for DividerConfig {
    fn default() -> Self {
        Self {
            pool_size: Self::DEFAULT_POOL_SIZE,
            generations: Self::DEFAULT_GENERATIONS,
            elite_count: Self::DEFAULT_ELITE_COUNT,
            change_rate: Self::DEFAULT_MUTATION_RATE,
            swap_rate: Self::DEFAULT_MUTATION_RATE,
            threads: None,
        }
    }
}

impl DividerConfig {
    pub const DEFAULT_POOL_SIZE: usize = 1000;
    pub const DEFAULT_GENERATIONS: usize = 500;
    pub const DEFAULT_ELITE_COUNT: usize = 50;
    pub const DEFAULT_MUTATION_RATE: f64 = 0.05;

    /// Default configuration with the given pool size and generation count.
    #[must_use]
    pub fn new(pool_size: usize, generations: usize) -> Self {
        Self {
            pool_size,
            generations,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), DivideError> {
        if self.generations == 0 {
            return Err(DivideError::ZeroGenerations);
        }
        if self.elite_count < 2 {
            return Err(DivideError::EliteTooSmall {
                elite_count: self.elite_count,
            });
        }
        if self.pool_size < self.elite_count {
            return Err(DivideError::PoolSmallerThanElite {
                pool_size: self.pool_size,
                elite_count: self.elite_count,
            });
        }
        for (name, rate) in [
            ("change rate", self.change_rate),
            ("swap rate", self.swap_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(DivideError::InvalidRate { name, rate });
            }
        }
        Ok(())
    }

    fn thread_count(&self) -> NonZeroUsize {
        self.threads
            .or_else(|| thread::available_parallelism().ok())
            .unwrap_or(NonZeroUsize::MIN)
    }
}

/// Snapshot passed to a [`GenerationObserver`] after each selection step.
#[derive(Debug, Clone)]
pub struct GenerationProgress {
    /// Zero-based index of the generation
    pub generation: usize,
    /// Configured number of generations
    pub generations: usize,
    /// Variance of the best elite of this generation
    pub best_variance: f64,
    /// Distribution of variances over the whole population
    pub fitness_stats: DescriptiveStats,
}

impl GenerationProgress {
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.generation + 1 == self.generations
    }
}

/// Receives progress once per generation.
///
/// Implemented for every `FnMut(&GenerationProgress)`, so a closure can be
/// passed directly.
pub trait GenerationObserver {
    fn on_generation(&mut self, progress: &GenerationProgress);
}

impl<F> GenerationObserver for F
where
    F: FnMut(&GenerationProgress),
{
    fn on_generation(&mut self, progress: &GenerationProgress) {
        self(progress);
    }
}

/// Stop request checked at the start of every generation.
///
/// Clones share the same flag, so a clone handed to another thread (or to an
/// observer) can stop a running division. An optional deadline stops the run
/// once it has passed.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Some(deadline),
        }
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Result of a division run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Division {
    /// Group label (`1..=num_groups`) of each task
    pub assignment: Vec<u32>,
    /// Variance of the group sums of `assignment`
    pub variance: f64,
    /// Number of generations that completed
    pub generations_run: usize,
    /// Whether the run stopped before the configured number of generations
    pub cancelled: bool,
}

/// Divides weighted tasks into balanced groups with a genetic algorithm.
///
/// # Example
///
/// ```
/// use rand::SeedableRng as _;
/// use workdiv_genetic::divider::{DividerConfig, GeneticDivider};
///
/// let config = DividerConfig {
///     elite_count: 10,
///     ..DividerConfig::new(100, 50)
/// };
/// let divider = GeneticDivider::new(vec![10.0; 6], 3, config).unwrap();
/// let mut rng = rand::rngs::StdRng::seed_from_u64(0);
/// let division = divider.run(&mut rng);
///
/// assert_eq!(division.assignment.len(), 6);
/// assert!(division.assignment.iter().all(|g| (1..=3).contains(g)));
/// ```
#[derive(Debug, Clone)]
pub struct GeneticDivider {
    workloads: Workloads,
    num_groups: u32,
    config: DividerConfig,
}

impl GeneticDivider {
    /// Validates the inputs and creates a divider.
    ///
    /// Fails if `num_groups < 2`, if there are fewer tasks than groups, if a
    /// workload is negative or not finite, or if `config` is invalid. No
    /// randomness is consumed here.
    pub fn new(
        workloads: Vec<f64>,
        num_groups: u32,
        config: DividerConfig,
    ) -> Result<Self, DivideError> {
        if num_groups < 2 {
            return Err(DivideError::TooFewGroups { num_groups });
        }
        if workloads.len() < num_groups as usize {
            return Err(DivideError::TooFewTasks {
                num_tasks: workloads.len(),
                num_groups,
            });
        }
        let workloads = Workloads::new(workloads)?;
        config.validate()?;
        Ok(Self {
            workloads,
            num_groups,
            config,
        })
    }

    #[must_use]
    pub fn workloads(&self) -> &Workloads {
        &self.workloads
    }

    #[must_use]
    pub fn num_groups(&self) -> u32 {
        self.num_groups
    }

    #[must_use]
    pub fn config(&self) -> &DividerConfig {
        &self.config
    }

    /// Total workload of each group of `assignment`; element `g - 1` belongs
    /// to group `g`.
    #[must_use]
    pub fn group_totals(&self, assignment: &[u32]) -> Vec<f64> {
        self.workloads.group_sums(assignment, self.num_groups)
    }

    /// Runs all configured generations and returns the best division found.
    pub fn run<R>(&self, rng: &mut R) -> Division
    where
        R: Rng + ?Sized,
    {
        self.run_with(rng, &mut |_: &GenerationProgress| {}, &Cancellation::new())
    }

    /// Like [`Self::run`], reporting every generation to `observer` and
    /// stopping early once `cancel` fires.
    ///
    /// A cancelled run still returns the best individual of its current
    /// population.
    pub fn run_with<R, O>(&self, rng: &mut R, observer: &mut O, cancel: &Cancellation) -> Division
    where
        R: Rng + ?Sized,
        O: GenerationObserver + ?Sized,
    {
        let DividerConfig {
            pool_size,
            generations,
            elite_count,
            change_rate,
            swap_rate,
            threads: _,
        } = self.config;
        let threads = self.config.thread_count();
        let evolver = PopulationEvolver {
            num_groups: self.num_groups,
            elite_count,
            change_rate,
            swap_rate,
        };

        let mut population =
            Population::random(rng, pool_size, self.num_groups, self.workloads.len());
        let mut generations_run = 0;
        let mut cancelled = false;

        for generation in 0..generations {
            if cancel.is_cancelled() {
                log::debug!("division cancelled before generation {generation}");
                cancelled = true;
                break;
            }

            population.evaluate_fitness(&self.workloads, self.num_groups, threads);
            observer.on_generation(&GenerationProgress {
                generation,
                generations,
                best_variance: population.best().variance(),
                fitness_stats: population.compute_fitness_stats(),
            });

            population = evolver.evolve(&population, rng);
            generations_run += 1;
        }

        population.evaluate_fitness(&self.workloads, self.num_groups, threads);
        let best = population.into_best();
        Division {
            variance: best.variance(),
            assignment: best.into_assignment(),
            generations_run,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;

    use super::*;

    fn small_config() -> DividerConfig {
        DividerConfig {
            elite_count: 20,
            ..DividerConfig::new(200, 150)
        }
    }

    fn assert_valid(division: &Division, num_tasks: usize, num_groups: u32) {
        assert_eq!(division.assignment.len(), num_tasks);
        assert!(
            division
                .assignment
                .iter()
                .all(|g| (1..=num_groups).contains(g))
        );
        assert!(division.variance >= 0.0);
    }

    #[test]
    fn test_default_config() {
        let config = DividerConfig::default();
        assert_eq!(config.pool_size, 1000);
        assert_eq!(config.generations, 500);
        assert_eq!(config.elite_count, 50);
        assert_eq!(config.change_rate, 0.05);
        assert_eq!(config.swap_rate, 0.05);
        assert_eq!(config.threads, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: DividerConfig =
            serde_json::from_str(r#"{"generations": 20, "threads": 2}"#).unwrap();
        assert_eq!(config.generations, 20);
        assert_eq!(config.threads, NonZeroUsize::new(2));
        assert_eq!(config.pool_size, DividerConfig::DEFAULT_POOL_SIZE);
    }

    #[test]
    fn test_config_rejects_zero_threads() {
        assert!(serde_json::from_str::<DividerConfig>(r#"{"threads": 0}"#).is_err());
    }

    #[test]
    fn test_too_few_groups() {
        let err = GeneticDivider::new(vec![1.0, 2.0], 1, DividerConfig::default()).unwrap_err();
        assert_eq!(err, DivideError::TooFewGroups { num_groups: 1 });
    }

    #[test]
    fn test_too_few_tasks() {
        let err = GeneticDivider::new(vec![1.0, 2.0], 3, DividerConfig::default()).unwrap_err();
        assert_eq!(
            err,
            DivideError::TooFewTasks {
                num_tasks: 2,
                num_groups: 3
            }
        );
    }

    #[test]
    fn test_invalid_workload() {
        let err =
            GeneticDivider::new(vec![1.0, f64::NAN, 2.0], 2, DividerConfig::default()).unwrap_err();
        assert!(matches!(err, DivideError::InvalidWorkload { index: 1, .. }));
    }

    #[test]
    fn test_overflowing_workloads_rejected_before_run() {
        let config = DividerConfig {
            elite_count: 5,
            ..DividerConfig::new(20, 3)
        };
        let err = GeneticDivider::new(vec![1e308, 1e308, 1.0, 2.0], 2, config).unwrap_err();
        assert!(matches!(err, DivideError::WorkloadOverflow { .. }));
    }

    #[test]
    fn test_huge_workloads_run_to_completion() {
        let config = DividerConfig {
            elite_count: 5,
            ..DividerConfig::new(20, 3)
        };
        let workloads = vec![f64::MAX / 4.0, f64::MAX / 4.0, 1.0, 2.0];
        let divider = GeneticDivider::new(workloads, 2, config).unwrap();
        let division = divider.run(&mut Pcg64::seed_from_u64(0));
        assert_valid(&division, 4, 2);
    }

    #[test]
    fn test_invalid_config() {
        let new = |config| GeneticDivider::new(vec![1.0, 2.0, 3.0], 2, config).unwrap_err();

        assert_eq!(new(DividerConfig::new(1000, 0)), DivideError::ZeroGenerations);
        assert_eq!(
            new(DividerConfig::new(10, 5)),
            DivideError::PoolSmallerThanElite {
                pool_size: 10,
                elite_count: 50
            }
        );
        assert_eq!(
            new(DividerConfig {
                elite_count: 1,
                ..DividerConfig::default()
            }),
            DivideError::EliteTooSmall { elite_count: 1 }
        );
        assert_eq!(
            new(DividerConfig {
                swap_rate: 1.5,
                ..DividerConfig::default()
            }),
            DivideError::InvalidRate {
                name: "swap rate",
                rate: 1.5
            }
        );
    }

    #[test]
    fn test_equal_workloads_converge_to_zero() {
        let divider = GeneticDivider::new(vec![10.0; 6], 3, small_config()).unwrap();
        let mut rng = Pcg64::seed_from_u64(0);
        let division = divider.run(&mut rng);

        assert_valid(&division, 6, 3);
        assert_eq!(division.variance, 0.0);
        assert_eq!(divider.group_totals(&division.assignment), vec![20.0; 3]);
        assert_eq!(division.generations_run, 150);
        assert!(!division.cancelled);
    }

    #[test]
    fn test_one_task_per_group() {
        let divider = GeneticDivider::new(vec![4.0; 5], 5, small_config()).unwrap();
        let mut rng = Pcg64::seed_from_u64(1);
        let division = divider.run(&mut rng);

        assert_valid(&division, 5, 5);
        assert_eq!(division.variance, 0.0);
        let mut labels = division.assignment.clone();
        labels.sort_unstable();
        assert_eq!(labels, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_heavy_task_alone() {
        let divider =
            GeneticDivider::new(vec![5.0, 5.0, 5.0, 5.0, 20.0], 2, small_config()).unwrap();
        let mut rng = Pcg64::seed_from_u64(2);
        let division = divider.run(&mut rng);

        assert_valid(&division, 5, 2);
        assert_eq!(division.variance, 0.0);
        let heavy = division.assignment[4];
        assert!(division.assignment[..4].iter().all(|&g| g != heavy));
        assert_eq!(divider.group_totals(&division.assignment), vec![20.0, 20.0]);
    }

    #[test]
    fn test_results_always_valid() {
        for seed in 0..5 {
            let workloads = (0..23).map(|i| f64::from(i * 7 % 13) + 0.5).collect();
            let config = DividerConfig {
                elite_count: 5,
                ..DividerConfig::new(40, 10)
            };
            let divider = GeneticDivider::new(workloads, 4, config).unwrap();
            let mut rng = Pcg64::seed_from_u64(seed);
            let division = divider.run(&mut rng);
            assert_valid(&division, 23, 4);
        }
    }

    #[test]
    fn test_best_variance_never_increases() {
        let workloads = vec![12.0, 7.5, 3.0, 19.0, 4.25, 8.0, 11.0, 2.0, 6.5, 15.0];
        let divider = GeneticDivider::new(workloads, 3, small_config()).unwrap();
        let mut rng = Pcg64::seed_from_u64(3);

        let mut history = vec![];
        let division = divider.run_with(
            &mut rng,
            &mut |p: &GenerationProgress| history.push(p.best_variance),
            &Cancellation::new(),
        );

        assert_eq!(history.len(), 150);
        assert!(history.windows(2).all(|w| w[1] <= w[0]));
        assert!(division.variance <= *history.last().unwrap());
    }

    #[test]
    fn test_observer_sees_every_generation() {
        let divider = GeneticDivider::new(vec![1.0, 2.0, 3.0], 2, small_config()).unwrap();
        let mut rng = Pcg64::seed_from_u64(4);

        let mut seen = vec![];
        let _ = divider.run_with(
            &mut rng,
            &mut |p: &GenerationProgress| {
                assert_eq!(p.generations, 150);
                assert!(p.fitness_stats.min <= p.best_variance);
                seen.push((p.generation, p.is_last()));
            },
            &Cancellation::new(),
        );

        assert_eq!(seen.len(), 150);
        assert_eq!(seen[0], (0, false));
        assert_eq!(seen[149], (149, true));
    }

    #[test]
    fn test_same_seed_same_result() {
        let workloads: Vec<f64> = (1..=20).map(|i| f64::from(i * i % 17)).collect();
        let run = |threads| {
            let config = DividerConfig {
                threads: NonZeroUsize::new(threads),
                ..small_config()
            };
            let divider = GeneticDivider::new(workloads.clone(), 4, config).unwrap();
            divider.run(&mut Pcg64::seed_from_u64(42))
        };

        assert_eq!(run(1), run(1));
        assert_eq!(run(1), run(4));
    }

    #[test]
    fn test_cancelled_before_start() {
        let divider = GeneticDivider::new(vec![3.0, 1.0, 2.0, 5.0], 2, small_config()).unwrap();
        let cancel = Cancellation::new();
        cancel.cancel();

        let mut rng = Pcg64::seed_from_u64(5);
        let division = divider.run_with(&mut rng, &mut |_: &GenerationProgress| {}, &cancel);

        assert!(division.cancelled);
        assert_eq!(division.generations_run, 0);
        assert_valid(&division, 4, 2);
    }

    #[test]
    fn test_cancel_from_observer() {
        let divider = GeneticDivider::new(vec![3.0, 1.0, 2.0, 5.0], 2, small_config()).unwrap();
        let cancel = Cancellation::new();
        let handle = cancel.clone();

        let mut rng = Pcg64::seed_from_u64(6);
        let division = divider.run_with(
            &mut rng,
            &mut |p: &GenerationProgress| {
                if p.generation == 3 {
                    handle.cancel();
                }
            },
            &cancel,
        );

        assert!(division.cancelled);
        assert_eq!(division.generations_run, 4);
        assert_valid(&division, 4, 2);
    }

    #[test]
    fn test_expired_deadline() {
        let cancel = Cancellation::with_timeout(Duration::ZERO);
        assert!(cancel.is_cancelled());
        assert!(!Cancellation::with_timeout(Duration::from_secs(3600)).is_cancelled());
    }
}
