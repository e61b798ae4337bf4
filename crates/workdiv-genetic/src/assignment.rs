//! Operations on group assignments (chromosomes).
//!
//! An assignment is a `Vec<u32>` with one label in `[1, num_groups]` per task.
//! These functions implement the genetic operators used by
//! [`PopulationEvolver`](crate::genetic::PopulationEvolver):
//!
//! - **Initialization**: [`random`] draws every label uniformly
//! - **Crossover**: [`single_point_crossover`] joins a prefix of one parent to
//!   the suffix of the other
//! - **Mutation**: [`change_mutation`] relabels single positions,
//!   [`swap_mutation`] exchanges the labels of two positions
//!
//! The mutation operators take the assignment by value and return the mutated
//! vector. Callers that still need the original keep a clone, so an elite can
//! never be changed through a child derived from it.
//!
//! # Mutation Rates
//!
//! Change mutation makes one Bernoulli trial *per position*, while swap
//! mutation makes a single trial for the whole assignment and therefore swaps
//! at most once per call.

use rand::{Rng, seq::index};

/// Generates an assignment of `len` labels drawn uniformly from
/// `[1, num_groups]`.
///
/// No attempt is made to balance label counts.
pub fn random<R>(rng: &mut R, num_groups: u32, len: usize) -> Vec<u32>
where
    R: Rng + ?Sized,
{
    (0..len).map(|_| rng.random_range(1..=num_groups)).collect()
}

/// Performs single-point crossover with a random interior cut point.
///
/// The cut point `p` is drawn uniformly from `[1, len - 1]`, so the child
/// always takes position `0` from `p1` and position `len - 1` from `p2`.
///
/// # Panics
///
/// Panics if the parents have different lengths or fewer than two positions.
pub fn single_point_crossover<R>(p1: &[u32], p2: &[u32], rng: &mut R) -> Vec<u32>
where
    R: Rng + ?Sized,
{
    assert_eq!(p1.len(), p2.len());
    assert!(p1.len() >= 2, "crossover needs at least two positions");
    let point = rng.random_range(1..p1.len());
    crossover_at(p1, p2, point)
}

/// Builds `p1[..point] ++ p2[point..]`.
///
/// # Panics
///
/// Panics if the parents have different lengths or `point > len`.
#[must_use]
pub fn crossover_at(p1: &[u32], p2: &[u32], point: usize) -> Vec<u32> {
    assert_eq!(p1.len(), p2.len());
    let mut child = Vec::with_capacity(p1.len());
    child.extend_from_slice(&p1[..point]);
    child.extend_from_slice(&p2[point..]);
    child
}

/// Replaces each label with probability `rate` by a label drawn uniformly
/// from `[1, num_groups]`.
///
/// The replacement may equal the current label.
///
/// # Panics
///
/// Panics if `rate` is not within `[0, 1]`.
pub fn change_mutation<R>(mut labels: Vec<u32>, num_groups: u32, rate: f64, rng: &mut R) -> Vec<u32>
where
    R: Rng + ?Sized,
{
    for label in &mut labels {
        if rng.random_bool(rate) {
            *label = rng.random_range(1..=num_groups);
        }
    }
    labels
}

/// With probability `rate`, exchanges the labels of two distinct random
/// positions.
///
/// The multiset of labels is always preserved.
///
/// # Panics
///
/// Panics if `rate` is not within `[0, 1]`.
pub fn swap_mutation<R>(mut labels: Vec<u32>, rate: f64, rng: &mut R) -> Vec<u32>
where
    R: Rng + ?Sized,
{
    if labels.len() >= 2 && rng.random_bool(rate) {
        let picked = index::sample(rng, labels.len(), 2);
        labels.swap(picked.index(0), picked.index(1));
    }
    labels
}
