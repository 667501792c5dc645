use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "eskatt",
    version,
    about = "Property tax roll extraction and recalculation tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Ingest(IngestArgs),
    Check(CheckArgs),
    Recalc(RecalcArgs),
    Stats(StatsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = "skatteliste.csv")]
    pub output: PathBuf,

    #[arg(long)]
    pub issues_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub tables: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[arg(long, default_value = "skatteliste.csv")]
    pub input: PathBuf,

    #[arg(long, default_value_t = 10)]
    pub max_reported: usize,
}

#[derive(Args, Debug, Clone)]
pub struct RecalcArgs {
    #[arg(long, default_value = "skatteliste.csv")]
    pub input: PathBuf,

    #[arg(long)]
    pub tables: Option<PathBuf>,

    #[arg(long)]
    pub residential_rate: Option<f64>,

    #[arg(long)]
    pub commercial_rate: Option<f64>,

    #[arg(long)]
    pub deduction: Option<f64>,

    #[arg(long)]
    pub augmented_output: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    #[arg(long, default_value = "skatteliste.csv")]
    pub input: PathBuf,

    #[arg(long)]
    pub min_assessed: Option<f64>,

    #[arg(long)]
    pub max_assessed: Option<f64>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}
