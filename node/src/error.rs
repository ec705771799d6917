use std::{io, process::ExitStatus, string::FromUtf8Error};

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
	#[error("I/O error: {0}.")]
	Io(#[from] io::Error),

	#[error("Failed to execute command '{cmd}': {source}")]
	CommandLaunch {
		cmd: String,
		#[source]
		source: io::Error,
	},

	#[error("Command failed ({status}): {cmd}{}", render_stderr(.stderr))]
	CommandFailed {
		cmd: String,
		status: ExitStatus,
		stderr: Option<String>,
	},

	#[error("Step '{step}' failed after attempt to set it.")]
	StepFailed { step: &'static str },

	#[error("Step '{step}' failed: {source}")]
	Step {
		step: &'static str,
		#[source]
		source: Box<InstallError>,
	},

	#[error("Unsupported architecture '{0}', expected one of amd64, x86_64, arm64, aarch64.")]
	UnsupportedArch(String),

	#[error("This installer must be run as root (effective uid {0}).")]
	NotRoot(u32),

	#[error("Install method '{0}' is not supported yet.")]
	UnsupportedInstallMethod(String),

	#[error("Unknown install method '{0}', expected apt or tar.")]
	UnknownInstallMethod(String),

	#[error("No install method given and apt-get is not available, set INSTALL_METHOD.")]
	MissingInstallMethod,

	#[error("Invalid configuration: {0}.")]
	Config(String),

	#[error("String error: {0}.")]
	StringError(#[from] FromUtf8Error),
}

fn render_stderr(stderr: &Option<String>) -> String {
	match stderr {
		Some(err) if !err.is_empty() => format!(": {err}"),
		_ => String::new(),
	}
}

impl InstallError {
	pub fn in_step(self, step: &'static str) -> Self {
		match self {
			err @ (InstallError::StepFailed { .. } | InstallError::Step { .. }) => err,
			err => InstallError::Step {
				step,
				source: Box::new(err),
			},
		}
	}
}
