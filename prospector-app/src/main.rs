use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, LocationArgs, SearchArgs};
use prospector_common::OutputFormat;
use prospector_common::observability::{LogConfig, init_logging};
use prospector_config::{ProspectorConfig, ProspectorConfigLoader, default_config_path};
use prospector_search::SearchStatus;
use std::process::ExitCode;

mod cli;
mod report;
mod wiring;

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let cfg = load_config(&cli)?;
    let interactive = !matches!(cli.command, Some(Commands::Search(_)));

    let log_path = init_logging(LogConfig {
        app_name: "prospector",
        log_dir: cfg.logging.directory.clone(),
        emit_stderr: cli.verbose && !interactive,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
    })?;
    tracing::info!(log = %log_path.display(), config = ?cli.config, "prospector.start");

    match cli.command {
        Some(Commands::Search(args)) => search(&cfg, args).await,
        Some(Commands::Tui(location)) => tui(&cfg, location).await,
        None => tui(&cfg, LocationArgs::default()).await,
    }
}

fn load_config(cli: &Cli) -> Result<ProspectorConfig> {
    let loader = ProspectorConfigLoader::new();
    let loader = match cli.config.clone().or_else(default_config_path) {
        Some(path) => loader.with_file(path),
        None => loader,
    };
    loader.load().context("failed to load configuration")
}

async fn tui(cfg: &ProspectorConfig, location: LocationArgs) -> Result<ExitCode> {
    let orchestrator = wiring::build_orchestrator(cfg, &location)?;
    let use_location = location.use_location(cfg.geolocation.use_by_default);
    wiring::run_tui(orchestrator, use_location).await?;
    Ok(ExitCode::SUCCESS)
}

async fn search(cfg: &ProspectorConfig, args: SearchArgs) -> Result<ExitCode> {
    let query = args.query_text();
    if query.is_empty() {
        anyhow::bail!("query must not be empty");
    }

    let mut orchestrator = wiring::build_orchestrator(cfg, &args.location)?;
    let use_location = args.location.use_location(cfg.geolocation.use_by_default);
    let state = orchestrator.submit(&query, use_location).await;

    match args.format {
        OutputFormat::Json => println!("{}", report::render_json(state)?),
        OutputFormat::Text if state.status() == SearchStatus::Error => {
            eprint!("{}", report::render_text(state))
        }
        OutputFormat::Text => print!("{}", report::render_text(state)),
    }

    Ok(if state.status() == SearchStatus::Error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
