use std::path::PathBuf;

use anyhow::Context;
use rand::{Rng as _, SeedableRng as _};
use rand_distr::Normal;
use rand_pcg::Pcg64;
use serde_json::json;

use crate::util::Output;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GenerateTasksArg {
    /// Number of tasks to generate
    #[arg(long, default_value_t = 20)]
    count: usize,
    /// Mean workload
    #[arg(long, default_value_t = 10.0)]
    mean: f64,
    /// Standard deviation of the workload
    #[arg(long, default_value_t = 4.0)]
    std_dev: f64,
    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &GenerateTasksArg) -> anyhow::Result<()> {
    let GenerateTasksArg {
        count,
        mean,
        std_dev,
        seed,
        output,
    } = arg;
    let normal = Normal::new(*mean, *std_dev)
        .with_context(|| format!("Invalid workload distribution: mean {mean}, std dev {std_dev}"))?;
    let mut rng = match seed {
        Some(seed) => Pcg64::seed_from_u64(*seed),
        None => Pcg64::from_rng(&mut rand::rng()),
    };

    // negative draws are clamped, workloads are kept to two decimals
    let tasks = (1..=*count)
        .map(|i| {
            let workload = (rng.sample(normal).max(0.0) * 100.0).round() / 100.0;
            json!({ "Task": format!("Task {i}"), "Workload": workload })
        })
        .collect::<Vec<_>>();
    Output::save_json(&tasks, output.clone())?;

    log::info!("Generated {count} tasks");
    if let Some(path) = output {
        log::info!("  Path: {}", path.display());
    }
    Ok(())
}
