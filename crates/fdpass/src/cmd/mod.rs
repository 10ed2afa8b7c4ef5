use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod doctor;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a file's descriptor with a payload.
    Send(SendArgs),
    /// Listen and print received messages and descriptors.
    Listen(ListenArgs),
    /// Run local descriptor-passing health checks.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Doctor(args) => doctor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// File whose descriptor is transferred.
    #[arg(long, value_name = "PATH")]
    pub file: PathBuf,
    /// Payload to piggyback on the descriptor.
    #[arg(long, default_value = "NONE")]
    pub data: String,
    /// Transmit only the first N payload bytes.
    #[arg(long, value_name = "N")]
    pub take: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Read up to N bytes through each received descriptor and include
    /// them in the report.
    #[arg(long, value_name = "N")]
    pub read_fd: Option<usize>,
    /// Receive buffer capacity in bytes.
    #[arg(long, default_value = "4096")]
    pub buffer_size: usize,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
