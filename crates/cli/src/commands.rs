use clap::{Args, Subcommand, ValueEnum};
use engine_runtime::job::JobKind;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a batch job over a CSV file
    Run(RunArgs),
    /// Print the partition plan of a CSV file
    Partition {
        #[arg(long, help = "Input CSV file")]
        input: PathBuf,

        #[arg(long, default_value_t = 4)]
        grid_size: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    Memory,
    Jsonl,
}

#[derive(Args)]
pub struct RunArgs {
    #[arg(long, help = "Job to run: chunk, robust, partitioned or full")]
    pub job: JobKind,

    #[arg(long, help = "Input CSV file")]
    pub input: PathBuf,

    #[arg(long, help = "JSON settings file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = ".env file with ROAMING_* overrides")]
    pub env_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = SinkKind::Memory)]
    pub sink: SinkKind,

    #[arg(
        long,
        required_if_eq("sink", "jsonl"),
        help = "Output file for the jsonl sink"
    )]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Reject and delay records of the configured devices")]
    pub inject_faults: bool,

    #[arg(
        long,
        help = "If specified, writes the JSON summary to this file instead of stdout"
    )]
    pub summary: Option<PathBuf>,
}
