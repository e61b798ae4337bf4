use clap::{Parser, Subcommand};

use self::{divide::DivideArg, generate_tasks::GenerateTasksArg};

mod divide;
mod generate_tasks;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Divide tasks into groups of balanced workload using a genetic algorithm
    Divide(#[clap(flatten)] DivideArg),
    /// Generate a random task table for trying out the divider
    GenerateTasks(#[clap(flatten)] GenerateTasksArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Divide(arg) => divide::run(&arg)?,
        Mode::GenerateTasks(arg) => generate_tasks::run(&arg)?,
    }
    Ok(())
}
