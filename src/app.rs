//! Wiring from parsed arguments to a finished command batch.

use crate::cancel::CancellationToken;
use crate::cli::Cli;
use crate::config::{
    load_device_profile, Config, SearchPaths, COMMAND_FILE_EXT, PROFILE_EXT,
};
use crate::error::{AppError, AppResult};
use crate::line::FramingOptions;
use crate::output::OutputSink;
use crate::port::{DeviceOpener, PortConfiguration, SerialPortSession};
use crate::runner::{BatchReport, CommandRunner, LineSink};
use crate::script::load_commands;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing::{debug, info, warn};

/// Everything needed to run a batch, resolved from arguments and files.
#[derive(Debug, Clone)]
pub struct Plan {
    pub port: PortConfiguration,
    pub framing: FramingOptions,
    pub commands: Vec<String>,
    /// Effective settings, printed in verbose mode.
    pub settings: Vec<(&'static str, String)>,
}

/// Resolve the device profile, defaults and command file named by `cli`.
pub fn plan(cli: &Cli, config: &Config) -> AppResult<Plan> {
    let search = SearchPaths::from_env(&config.search.extra_dirs);
    let mut settings = cli.port_settings();
    let mut shown = Vec::new();

    if let Some(input) = &cli.input {
        shown.push(("input", input.clone()));
    }
    if let Some(output) = &cli.output {
        shown.push(("output", output.display().to_string()));
    }
    if let Some(device) = &cli.device {
        let path = search.resolve(device, PROFILE_EXT)?;
        debug!(device, path = %path.display(), "using device profile");
        load_device_profile(&path, &mut settings)?;
        shown.push(("device", device.clone()));
    }

    let port = settings.into_configuration(&config.defaults)?;
    let framing = config.framing.options()?;

    let mut commands = cli.commands.clone();
    if let Some(input) = &cli.input {
        let path = search.resolve(input, COMMAND_FILE_EXT)?;
        debug!(input, path = %path.display(), "using command file");
        commands.extend(load_commands(&path)?);
    }

    shown.push(("verbose", u8::from(cli.verbose).to_string()));
    shown.push(("quiet", u8::from(cli.quiet).to_string()));
    shown.push(("port", port.device_path().display().to_string()));
    shown.push(("baudrate", port.baud_rate().to_string()));
    shown.push(("timeout", format!("{:.6}", port.response_timeout().as_secs_f64())));
    shown.push(("count", port.max_lines().to_string()));

    Ok(Plan {
        port,
        framing,
        commands,
        settings: shown,
    })
}

/// Open and configure the port, run `commands`, then restore and close it.
///
/// The port is closed even when the sink fails part way through.
pub fn run_session<O: DeviceOpener>(
    opener: &O,
    port: &PortConfiguration,
    framing: FramingOptions,
    commands: &[String],
    sink: &mut dyn LineSink,
    cancel: CancellationToken,
) -> AppResult<BatchReport> {
    let mut session = SerialPortSession::new(port.device_path());
    session.open(opener)?;
    session.configure(port.baud_rate())?;
    info!(
        port = %port.device_path().display(),
        baud = %port.baud_rate(),
        commands = commands.len(),
        "serial port ready"
    );

    let outcome = CommandRunner::new(&mut session, port, framing, cancel).run_batch(commands, sink);

    if let Err(e) = session.close() {
        warn!(error = %e, "serial port closed without restoring its settings");
    }

    let batch = outcome?;
    if batch.cancelled {
        info!(completed = batch.reports.len(), "batch cancelled");
    }
    Ok(batch)
}

/// Run the batch `cli` describes against real hardware.
#[cfg(unix)]
pub fn execute(cli: &Cli, config: &Config, cancel: CancellationToken) -> AppResult<BatchReport> {
    let plan = plan(cli, config)?;

    let writer: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(AppError::OutputFile)?)),
        None => Box::new(io::stdout().lock()),
    };
    let mut sink = OutputSink::new(writer, cli.quiet, cli.verbose);
    sink.write_settings(&plan.settings)
        .map_err(|e| AppError::Output(e.into()))?;

    if plan.commands.is_empty() {
        warn!("no commands given");
    }

    let batch = run_session(
        &crate::port::TermiosOpener,
        &plan.port,
        plan.framing,
        &plan.commands,
        &mut sink,
        cancel,
    )?;
    sink.flush().map_err(|e| AppError::Output(e.into()))?;
    Ok(batch)
}

#[cfg(not(unix))]
pub fn execute(_cli: &Cli, _config: &Config, _cancel: CancellationToken) -> AppResult<BatchReport> {
    Err(AppError::Unsupported(
        "terminal line settings are only available on unix-like systems",
    ))
}
