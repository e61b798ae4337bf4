use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

use anyhow::Context;
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64;
use workdiv_genetic::divider::{Cancellation, DividerConfig, GenerationProgress, GeneticDivider};

use crate::{
    model::{division_report::DivisionReport, task_table::TaskTable},
    util::{self, Output},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct DivideArg {
    /// Task table: JSON array of records with `task` and `workload` columns
    #[arg(long)]
    input: PathBuf,
    /// Number of groups (people) to divide the tasks into
    #[arg(long, short = 'n')]
    groups: u32,
    /// Divider configuration file (JSON); command line options override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of individuals per generation
    #[arg(long)]
    pool_size: Option<usize>,
    /// Number of generations
    #[arg(long)]
    generations: Option<usize>,
    /// Number of best individuals kept in each generation
    #[arg(long)]
    elite_count: Option<usize>,
    /// Per-position probability of change mutation
    #[arg(long)]
    change_rate: Option<f64>,
    /// Per-child probability of swap mutation
    #[arg(long)]
    swap_rate: Option<f64>,
    /// Threads used for fitness evaluation
    #[arg(long)]
    threads: Option<NonZeroUsize>,
    /// Random seed (a random one is chosen and reported if omitted)
    #[arg(long)]
    seed: Option<u64>,
    /// Stop early after this many seconds and report the best division so far
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Log progress every N generations
    #[arg(long, default_value = "50")]
    progress_interval: NonZeroUsize,
    /// Output file path
    #[arg(long, conflicts_with = "output_dir")]
    output: Option<PathBuf>,
    /// Output directory; the report is saved as `Task_Division_N{groups}_Result.json`
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl DivideArg {
    fn divider_config(&self) -> anyhow::Result<DividerConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_json_file::<DividerConfig, _>("divider config", path)?,
            None => DividerConfig::default(),
        };
        if let Some(pool_size) = self.pool_size {
            config.pool_size = pool_size;
        }
        if let Some(generations) = self.generations {
            config.generations = generations;
        }
        if let Some(elite_count) = self.elite_count {
            config.elite_count = elite_count;
        }
        if let Some(change_rate) = self.change_rate {
            config.change_rate = change_rate;
        }
        if let Some(swap_rate) = self.swap_rate {
            config.swap_rate = swap_rate;
        }
        if let Some(threads) = self.threads {
            config.threads = Some(threads);
        }
        Ok(config)
    }

    fn output_path(&self) -> Option<PathBuf> {
        match &self.output_dir {
            Some(dir) => Some(dir.join(DivisionReport::file_name(self.groups))),
            None => self.output.clone(),
        }
    }
}

pub(crate) fn run(arg: &DivideArg) -> anyhow::Result<()> {
    let table = TaskTable::open(&arg.input)?;
    let config = arg.divider_config()?;
    let divider = GeneticDivider::new(table.workloads().to_vec(), arg.groups, config)
        .with_context(|| format!("Cannot divide tasks of {}", arg.input.display()))?;

    let seed = arg.seed.unwrap_or_else(|| rand::rng().random());
    let config = divider.config();
    log::info!(
        "Dividing {} tasks into {} groups (pool size {}, {} generations, seed {seed})",
        table.len(),
        divider.num_groups(),
        config.pool_size,
        config.generations,
    );

    let cancel = arg
        .timeout_secs
        .map_or_else(Cancellation::new, |secs| {
            Cancellation::with_timeout(Duration::from_secs(secs))
        });
    let interval = arg.progress_interval.get();
    let mut observer = |p: &GenerationProgress| {
        if p.generation % interval == 0 || p.is_last() {
            log::info!("Gen {}: Best Variance = {:.2}", p.generation, p.best_variance);
        } else {
            log::debug!(
                "Gen {}: Best Variance = {:.2} (mean {:.2}, max {:.2})",
                p.generation,
                p.best_variance,
                p.fitness_stats.mean,
                p.fitness_stats.max,
            );
        }
    };

    let mut rng = Pcg64::seed_from_u64(seed);
    let division = divider.run_with(&mut rng, &mut observer, &cancel);
    if division.cancelled {
        log::warn!(
            "Timed out after {} of {} generations; reporting the best division so far",
            division.generations_run,
            config.generations,
        );
    }

    let report = DivisionReport::new(&divider, &division, seed, table);
    log::info!("Best variance: {:.2}", report.best_variance);
    for group in &report.groups {
        log::info!("  Group {}: {:.2}", group.group, group.total_workload);
    }

    let output = arg.output_path();
    Output::save_json(&report, output.clone())?;
    if let Some(path) = &output {
        log::info!("Report saved to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use clap::Parser as _;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::command::{CommandArgs, Mode};

    fn parse(args: &[&str]) -> Result<DivideArg, clap::Error> {
        let argv = ["workdiv", "divide", "--input", "tasks.json", "-n", "3"]
            .iter()
            .chain(args)
            .copied();
        match CommandArgs::try_parse_from(argv)?.mode {
            Mode::Divide(arg) => Ok(arg),
            Mode::GenerateTasks(_) => unreachable!("parsed the divide subcommand"),
        }
    }

    fn config_file(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_config_defaults_without_file_or_flags() {
        let arg = parse(&[]).unwrap();
        assert_eq!(arg.divider_config().unwrap(), DividerConfig::default());
    }

    #[test]
    fn test_flags_override_config_file() {
        let file = config_file(r#"{"pool_size": 300, "generations": 40, "elite_count": 10}"#);
        let path = file.path().to_str().unwrap();
        let arg = parse(&[
            "--config",
            path,
            "--generations",
            "7",
            "--swap-rate",
            "0.2",
            "--threads",
            "2",
        ])
        .unwrap();

        let config = arg.divider_config().unwrap();
        assert_eq!(
            config,
            DividerConfig {
                pool_size: 300,
                generations: 7,
                elite_count: 10,
                change_rate: DividerConfig::DEFAULT_MUTATION_RATE,
                swap_rate: 0.2,
                threads: NonZeroUsize::new(2),
            }
        );
    }

    #[test]
    fn test_invalid_config_file() {
        let file = config_file("{ not json");
        let arg = parse(&["--config", file.path().to_str().unwrap()]).unwrap();
        let err = arg.divider_config().unwrap_err();
        assert!(format!("{err:#}").contains("divider config"));
    }

    #[test]
    fn test_output_dir_uses_result_file_name() {
        let arg = parse(&["--output-dir", "out"]).unwrap();
        assert_eq!(
            arg.output_path(),
            Some(PathBuf::from("out").join("Task_Division_N3_Result.json"))
        );
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            parse(&["--output", "report.json"]).unwrap().output_path(),
            Some(PathBuf::from("report.json"))
        );
        assert_eq!(parse(&[]).unwrap().output_path(), None);
    }

    #[test]
    fn test_output_and_output_dir_conflict() {
        assert!(parse(&["--output", "report.json", "--output-dir", "out"]).is_err());
    }

    #[test]
    fn test_progress_interval_must_be_positive() {
        assert!(parse(&["--progress-interval", "0"]).is_err());
        assert_eq!(parse(&[]).unwrap().progress_interval.get(), 50);
    }
}
