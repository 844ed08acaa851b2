use crate::{
    commands::{Commands, RunArgs, SinkKind},
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use connectors::{
    file::archive::FileArchiver,
    sink::{JsonLinesSink, MemorySink},
};
use engine_config::settings::{BatchSettings, env::EnvManager};
use engine_core::connectors::{
    notify::LogNotifier,
    sink::RecordSink,
    source::{CsvRecordSource, RecordSource},
};
use engine_processing::{
    partition::RangePartitioner,
    transform::{DeviceFaultInjection, FaultInjectionStrategy, NoFaults},
};
use engine_runtime::job::{JobOrchestrator, JobResources};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "roaming-sync",
    version = "0.1.0",
    about = "Batch loader for roaming status records"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<std::process::ExitCode, CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Run(args) => run_job(args).await?,
        Commands::Partition { input, grid_size } => {
            let source = CsvRecordSource::new(&input);
            let plan = RangePartitioner::partition_source(&source, grid_size)?;
            output::print_report(&plan)?;
            ExitCode::Success
        }
    };

    Ok(code.into())
}

async fn run_job(args: RunArgs) -> Result<ExitCode, CliError> {
    let mut env = EnvManager::from_process();
    if let Some(path) = &args.env_file {
        env.load_from_file(path)?;
    }
    let settings = BatchSettings::load(args.config.as_deref(), &env)?;

    let faults: Arc<dyn FaultInjectionStrategy> = if args.inject_faults || settings.faults.enabled {
        Arc::new(DeviceFaultInjection::from_settings(&settings.faults))
    } else {
        Arc::new(NoFaults)
    };

    let memory = MemorySink::new();
    let jsonl = match args.sink {
        SinkKind::Memory => None,
        SinkKind::Jsonl => {
            let path = args.output.as_ref().ok_or(CliError::MissingOutput)?;
            Some(Arc::new(JsonLinesSink::create(path).await?))
        }
    };
    let sink: Arc<dyn RecordSink> = match &jsonl {
        Some(jsonl) => Arc::clone(jsonl) as Arc<dyn RecordSink>,
        None => Arc::new(memory.clone()),
    };

    let source = CsvRecordSource::new(&args.input);
    info!(job = %args.job, input = %source.describe(), sink = ?args.sink, "Preparing job");

    let resources = JobResources {
        source: Arc::new(source),
        sink,
        archiver: Arc::new(FileArchiver::new(
            &settings.archive.source_dir,
            &settings.archive.backup_dir,
            &settings.archive.file_pattern,
        )),
        notifier: Arc::new(LogNotifier::new(settings.notify_on)),
        faults,
    };
    let orchestrator = JobOrchestrator::build(args.job, &settings, resources);

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let report = orchestrator.run(shutdown.cancel_token()).await;
    if shutdown.is_shutdown_requested() {
        warn!(job = %args.job, "Job interrupted by shutdown signal");
    }

    match jsonl {
        Some(jsonl) => jsonl.close().await?,
        None => info!(records = memory.len().await, "Records held by the memory sink"),
    }

    match &args.summary {
        Some(path) => output::write_report(&report.summary, path).await?,
        None => output::print_report(&report.summary)?,
    }

    Ok(ExitCode::for_status(report.status()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_runtime::job::JobKind;

    #[test]
    fn parses_run_arguments() {
        let cli = Cli::try_parse_from([
            "roaming-sync",
            "run",
            "--job",
            "robust",
            "--input",
            "data/roaming.csv",
            "--inject-faults",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.job, JobKind::RobustSync);
        assert_eq!(args.sink, SinkKind::Memory);
        assert!(args.inject_faults);
        assert!(args.summary.is_none());
    }

    #[test]
    fn jsonl_sink_requires_output() {
        let result = Cli::try_parse_from([
            "roaming-sync",
            "run",
            "--job",
            "chunk",
            "--input",
            "in.csv",
            "--sink",
            "jsonl",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_job() {
        let result =
            Cli::try_parse_from(["roaming-sync", "run", "--job", "nightly", "--input", "in.csv"]);
        assert!(result.is_err());
    }
}
