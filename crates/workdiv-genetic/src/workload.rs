//! Task workloads and the variance fitness function.

use std::iter;

use workdiv_stats::descriptive;

use crate::DivideError;

/// Validated workload vector of a division run.
///
/// Index `i` is task `i`. Every value is finite and non-negative, and the
/// vector never changes once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Workloads {
    values: Vec<f64>,
}

impl Workloads {
    /// Wraps `values` after checking that each workload is a finite,
    /// non-negative number and that their total is finite.
    ///
    /// A finite total bounds every group sum, so a fitness can never become
    /// `NaN`.
    pub fn new(values: Vec<f64>) -> Result<Self, DivideError> {
        if let Some((index, &value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(DivideError::InvalidWorkload { index, value });
        }
        let total = values.iter().sum::<f64>();
        if !total.is_finite() {
            return Err(DivideError::WorkloadOverflow { total });
        }
        Ok(Self { values })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sums the workloads of each group.
    ///
    /// Element `g - 1` of the result is the total workload of the tasks
    /// labeled `g`. Groups without any task sum to `0.0`.
    ///
    /// # Panics
    ///
    /// Panics if `labels` has a different length than the workload vector or
    /// contains a label outside `[1, num_groups]`.
    #[must_use]
    pub fn group_sums(&self, labels: &[u32], num_groups: u32) -> Vec<f64> {
        assert_eq!(labels.len(), self.values.len());
        let mut sums = vec![0.0; num_groups as usize];
        for (&label, &workload) in iter::zip(labels, &self.values) {
            assert!(
                (1..=num_groups).contains(&label),
                "label {label} out of range 1..={num_groups}"
            );
            sums[label as usize - 1] += workload;
        }
        sums
    }

    /// Fitness of an assignment: the population variance of its group sums.
    ///
    /// Lower is better and `0.0` means perfectly balanced groups. The value is
    /// deterministic for a given assignment.
    #[must_use]
    pub fn variance(&self, labels: &[u32], num_groups: u32) -> f64 {
        descriptive::population_variance(&self.group_sums(labels, num_groups)).unwrap_or_default()
    }
}
