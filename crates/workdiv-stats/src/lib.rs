//! Statistical helpers for the workdiv workspace.
//!
//! - **Population variance**: the fitness measure of a workload division
//! - **Descriptive statistics**: min, max, mean, median, variance and standard
//!   deviation, used to summarize the fitness distribution of a generation
//!
//! # Examples
//!
//! ```
//! use workdiv_stats::descriptive::{DescriptiveStats, population_variance};
//!
//! assert_eq!(population_variance(&[20.0, 20.0, 20.0]), Some(0.0));
//!
//! let stats = DescriptiveStats::new([1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```

pub mod descriptive;
