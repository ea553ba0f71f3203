use crate::{
    commands::{Commands, ConnectionArgs},
    conn::pinger,
    env::{DESTINATION_URL_VAR, EnvManager, SOURCE_URL_VAR},
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use connectors::adapter::{Adapter, DataFormat};
use engine_processing::{
    engine::SyncEngine,
    job::{IfExists, SyncJob, SyncMode},
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod env;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(name = "dbsync", version, about = "Table replication between databases")]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Load variables from this .env file (defaults to ~/.dbsync/.env when present)"
    )]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();
    let cancelled = shutdown.cancel_token();

    let code = tokio::select! {
        result = execute(cli) => match result {
            Ok(()) => ExitCode::Success,
            Err(err) => {
                error!(error = %err, "dbsync failed");
                ExitCode::GeneralError
            }
        },
        _ = cancelled.cancelled() => {
            warn!("Sync interrupted; chunks appended so far remain in the destination");
            ExitCode::ShutdownRequested
        }
    };

    std::process::exit(code.as_i32());
}

async fn execute(cli: Cli) -> Result<(), CliError> {
    let env = load_env(cli.env_file.as_deref())?;

    match cli.command {
        Commands::Full {
            connections,
            source_table,
            destination_table,
            if_exists,
            order_by,
            tuning,
            output,
        } => {
            let if_exists: IfExists = if_exists.parse()?;
            let job = SyncJob {
                source_table,
                destination_table,
                mode: SyncMode::Full {
                    if_exists,
                    order_by,
                },
                options: tuning.options(),
            };
            run_job(&env, &connections, &job, output.as_deref()).await?;
        }
        Commands::Incremental {
            connections,
            source_table,
            destination_table,
            primary_key,
            no_distinct_check,
            tuning,
            output,
        } => {
            let job = SyncJob {
                source_table,
                destination_table,
                mode: SyncMode::Incremental {
                    primary_key,
                    distinct_check: !no_distinct_check,
                },
                options: tuning.options(),
            };
            run_job(&env, &connections, &job, output.as_deref()).await?;
        }
        Commands::Run {
            job,
            connections,
            output,
        } => {
            info!(job = %job, "Loading job file");
            let content = tokio::fs::read_to_string(&job).await?;
            let job = SyncJob::from_json(&content)?;
            run_job(&env, &connections, &job, output.as_deref()).await?;
        }
        Commands::TestConn { format, conn_str } => {
            let format = match format {
                Some(format) => format.parse()?,
                None => DataFormat::from_url(&conn_str)?,
            };
            pinger(format, conn_str).ping().await?;
        }
    }

    Ok(())
}

fn load_env(env_file: Option<&std::path::Path>) -> Result<EnvManager, CliError> {
    let mut env = EnvManager::from_system();
    match env_file {
        Some(path) => env.load_from_file(path)?,
        None => {
            if let Some(path) = EnvManager::default_file().filter(|path| path.is_file()) {
                info!(path = %path.display(), "Loading default env file");
                env.load_from_file(path)?;
            }
        }
    }
    Ok(env)
}

/// Validates the job, connects both ends and runs it.
async fn run_job(
    env: &EnvManager,
    connections: &ConnectionArgs,
    job: &SyncJob,
    output: Option<&str>,
) -> Result<(), CliError> {
    job.options.validate()?;

    let source_url = env.resolve_url(connections.source.as_deref(), "source", SOURCE_URL_VAR)?;
    let destination_url = env.resolve_url(
        connections.destination.as_deref(),
        "destination",
        DESTINATION_URL_VAR,
    )?;

    let source = Adapter::from_url(&source_url).await?;
    let destination = Adapter::from_url(&destination_url).await?;

    let engine = SyncEngine::new(source, destination);
    let report = engine.run(job).await?;

    output::emit_report(&report, output).await
}
