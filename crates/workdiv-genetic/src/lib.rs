//! Balanced division of weighted tasks into groups using a genetic algorithm.
//!
//! Given a workload per task and a number of groups `N`, the divider searches
//! for a label in `[1, N]` per task such that the per-group workload sums are
//! as equal as possible. Fitness is the population variance of the `N` group
//! sums; lower is better and `0.0` is a perfect balance.
//!
//! # How It Works
//!
//! 1. **Initialize** - `pool_size` random assignments
//! 2. **Evaluate** - Score every assignment by the variance of its group sums
//! 3. **Select** - Keep the `elite_count` best assignments unchanged
//! 4. **Breed** - Fill the pool with children of random elite pairs
//!    (single-point crossover, change mutation, swap mutation)
//! 5. **Repeat** - For a fixed number of generations, then return the best
//!
//! The result is the best assignment found within the generation budget, not
//! a guaranteed optimum.
//!
//! # Architecture
//!
//! ```text
//! GeneticDivider (divider)
//!     ↓ owns
//! Workloads (workload) ── scores ──→ Individual
//!     ↓                                  ↑
//! Population (genetic) ── evolves via ── PopulationEvolver
//!     ↓ uses
//! assignment operators (assignment)
//! ```
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng as _;
//! use workdiv_genetic::divider::{Cancellation, DividerConfig, GeneticDivider, GenerationProgress};
//!
//! let config = DividerConfig {
//!     elite_count: 10,
//!     ..DividerConfig::new(100, 30)
//! };
//! let divider = GeneticDivider::new(vec![5.0, 5.0, 5.0, 5.0, 20.0], 2, config)?;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let division = divider.run_with(
//!     &mut rng,
//!     &mut |p: &GenerationProgress| println!("Gen {}: {:.2}", p.generation, p.best_variance),
//!     &Cancellation::new(),
//! );
//! let totals = divider.group_totals(&division.assignment);
//! assert_eq!(totals.len(), 2);
//! # Ok::<(), workdiv_genetic::DivideError>(())
//! ```
//!
//! # Randomness
//!
//! Every random draw comes from the RNG passed to
//! [`GeneticDivider::run`](divider::GeneticDivider::run). Fitness evaluation runs
//! on worker threads but is deterministic, so a seeded RNG reproduces a run
//! exactly regardless of the thread count.

pub mod assignment;
pub mod divider;
pub mod genetic;
pub mod workload;

/// Reasons a division cannot start.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum DivideError {
    #[display("number of groups must be at least 2, got {num_groups}")]
    TooFewGroups { num_groups: u32 },
    #[display(
        "number of tasks ({num_tasks}) must be greater than or equal to the number of groups ({num_groups})"
    )]
    TooFewTasks { num_tasks: usize, num_groups: u32 },
    #[display("workload of task #{index} must be a finite non-negative number, got {value}")]
    InvalidWorkload { index: usize, value: f64 },
    #[display("total workload must be finite, got {total}")]
    WorkloadOverflow { total: f64 },
    #[display("elite count must be at least 2, got {elite_count}")]
    EliteTooSmall { elite_count: usize },
    #[display("pool size ({pool_size}) must not be smaller than the elite count ({elite_count})")]
    PoolSmallerThanElite {
        pool_size: usize,
        elite_count: usize,
    },
    #[display("number of generations must be at least 1")]
    ZeroGenerations,
    #[display("{name} must be within [0, 1], got {rate}")]
    InvalidRate { name: &'static str, rate: f64 },
}
