//! Command-line arguments.

use crate::config::PortSettings;
use crate::port::{parse_timeout, BaudRate, LineLimit};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "trx",
    version,
    about = "Send commands to a serial device and print its line-oriented responses.",
    long_about = "Send commands to a serial device and print its line-oriented responses.\n\n\
                  Each command is written followed by a carriage return. Response lines are \
                  read until the line count is reached or the device stays silent for the \
                  timeout."
)]
pub struct Cli {
    /// Baud rate (1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400)
    #[arg(short, long)]
    pub baudrate: Option<BaudRate>,

    /// Serial device path
    #[arg(short, long)]
    pub port: Option<PathBuf>,

    /// Seconds to wait for each response line
    #[arg(short, long, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Response lines to read per command (-1 or "unbounded" for no limit)
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    pub count: Option<LineLimit>,

    /// Device profile name or path
    #[arg(short, long)]
    pub device: Option<String>,

    /// Command file name or path
    #[arg(short, long)]
    pub input: Option<String>,

    /// Write responses to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print settings and label commands and responses
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not print responses
    #[arg(short, long)]
    pub quiet: bool,

    /// Application configuration file (trx.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// List serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Commands to send, in order, before any from the command file
    #[arg(value_name = "COMMAND")]
    pub commands: Vec<String>,
}

impl Cli {
    /// Port settings given on the command line.
    pub fn port_settings(&self) -> PortSettings {
        PortSettings {
            port: self.port.clone(),
            baudrate: self.baudrate,
            timeout: self.timeout,
            count: self.count,
        }
    }
}
