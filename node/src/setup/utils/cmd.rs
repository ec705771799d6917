use crate::error::InstallError;
use std::{
	io::Write,
	process::{Command, Output, Stdio},
};
use tracing::debug;

/// Executes host commands. Every non-zero exit is an error except through `succeeds`.
pub trait Runner {
	fn run(&self, program: &str, args: &[&str]) -> Result<(), InstallError>;
	fn output(&self, program: &str, args: &[&str]) -> Result<Vec<u8>, InstallError>;
	fn input(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<(), InstallError>;
	fn succeeds(&self, program: &str, args: &[&str]) -> Result<bool, InstallError>;

	fn output_string(&self, program: &str, args: &[&str]) -> Result<String, InstallError> {
		Ok(String::from_utf8(self.output(program, args)?)?)
	}
}

pub fn render(program: &str, args: &[&str]) -> String {
	if args.is_empty() {
		program.to_owned()
	} else {
		format!("{program} {}", args.join(" "))
	}
}

const SECRET_FLAGS: &[&str] = &["--token"];

/// Like `render`, with the values of secret flags masked. Used for logs and errors.
pub fn render_redacted(program: &str, args: &[&str]) -> String {
	let mut masked = Vec::with_capacity(args.len());
	let mut hide_next = false;
	for &arg in args {
		masked.push(if hide_next { "<redacted>" } else { arg });
		hide_next = SECRET_FLAGS.contains(&arg);
	}
	render(program, &masked)
}

fn stderr_of(output: &Output) -> Option<String> {
	if output.stderr.is_empty() {
		None
	} else {
		Some(String::from_utf8_lossy(&output.stderr).trim().to_owned())
	}
}

pub struct System;

impl Runner for System {
	fn run(&self, program: &str, args: &[&str]) -> Result<(), InstallError> {
		let cmd = render_redacted(program, args);
		debug!("Running: {cmd}");
		let status = Command::new(program)
			.args(args)
			.status()
			.map_err(|source| InstallError::CommandLaunch {
				cmd: cmd.clone(),
				source,
			})?;
		if !status.success() {
			return Err(InstallError::CommandFailed {
				cmd,
				status,
				stderr: None,
			});
		}
		Ok(())
	}

	fn output(&self, program: &str, args: &[&str]) -> Result<Vec<u8>, InstallError> {
		let cmd = render_redacted(program, args);
		debug!("Running: {cmd}");
		let output = Command::new(program)
			.args(args)
			.output()
			.map_err(|source| InstallError::CommandLaunch {
				cmd: cmd.clone(),
				source,
			})?;
		if !output.status.success() {
			return Err(InstallError::CommandFailed {
				cmd,
				status: output.status,
				stderr: stderr_of(&output),
			});
		}
		Ok(output.stdout)
	}

	fn input(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<(), InstallError> {
		let cmd = render_redacted(program, args);
		debug!("Running: {cmd} (with {} bytes of stdin)", stdin.len());
		let mut child = Command::new(program)
			.args(args)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()
			.map_err(|source| InstallError::CommandLaunch {
				cmd: cmd.clone(),
				source,
			})?;
		// Dropped at the end of the block so the child sees EOF.
		{
			let mut pipe = child.stdin.take().ok_or_else(|| InstallError::CommandLaunch {
				cmd: cmd.clone(),
				source: std::io::Error::other("stdin unavailable"),
			})?;
			pipe.write_all(stdin)?;
		}
		let output = child
			.wait_with_output()
			.map_err(|source| InstallError::CommandLaunch {
				cmd: cmd.clone(),
				source,
			})?;
		if !output.status.success() {
			return Err(InstallError::CommandFailed {
				cmd,
				status: output.status,
				stderr: stderr_of(&output),
			});
		}
		Ok(())
	}

	fn succeeds(&self, program: &str, args: &[&str]) -> Result<bool, InstallError> {
		let cmd = render_redacted(program, args);
		debug!("Checking: {cmd}");
		let status = Command::new(program)
			.args(args)
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.status()
			.map_err(|source| InstallError::CommandLaunch { cmd, source })?;
		Ok(status.success())
	}
}
