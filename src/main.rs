use clap::Parser;
use std::process::ExitCode;
use trx::cancel::{cancel_on_signal, CancellationToken};
use trx::cli::Cli;
use trx::config::{Config, ConfigLoader};
use trx::error::{AppError, AppResult};
use trx::logging::init_tracing;
use trx::{app, port};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&Config::default().logging);
            return report(&e);
        }
    };
    init_tracing(&config.logging);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn load_config(cli: &Cli) -> AppResult<Config> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    Ok(loader.into_config())
}

async fn run(cli: Cli, config: Config) -> AppResult<()> {
    if cli.list_ports {
        for name in port::available_port_names()? {
            println!("{name}");
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let batch = tokio::task::spawn_blocking(move || app::execute(&cli, &config, cancel))
        .await
        .map_err(|e| AppError::Join(e.to_string()))??;

    tracing::debug!(
        commands = batch.reports.len(),
        lines = batch.total_lines(),
        cancelled = batch.cancelled,
        "done"
    );
    Ok(())
}

fn report(err: &AppError) -> ExitCode {
    tracing::debug!(error = ?err, "trx failed");
    eprintln!("trx: {err}");
    ExitCode::from(err)
}
