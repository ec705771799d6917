mod config;
mod context;
mod error;
mod logging;
mod setup;

use crate::config::{Args, Config};
use crate::context::LocalHost;
use crate::error::InstallError;
use crate::setup::{Host, utils::cmd::System};
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

fn run(args: Args) -> Result<(), InstallError> {
	let config = Config::resolve(args, &LocalHost)?;
	let host = Host::new(&config, &System, "/");
	setup::setup(&host)
}

fn main() -> ExitCode {
	let args = Args::parse();
	logging::init(args.debug);
	info!("Node setup started.");
	if let Err(err) = run(args) {
		error!("Installer failed: {err}");
		return ExitCode::FAILURE;
	}
	info!("Node setup finished successfully.");
	ExitCode::SUCCESS
}
