mod steps;
pub mod utils;

use crate::config::Config;
use crate::error::InstallError;
use crate::setup::steps::{Containerd, Crictl, DisableSwap, Join, KernelModules, Kubes, Sysctl};
use crate::setup::utils::cmd::Runner;
use std::{
	fs,
	path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Everything a step may touch: the validated config, a command runner, and the filesystem root.
pub struct Host<'a> {
	pub config: &'a Config,
	pub runner: &'a dyn Runner,
	root: PathBuf,
}

impl<'a> Host<'a> {
	pub fn new(config: &'a Config, runner: &'a dyn Runner, root: impl Into<PathBuf>) -> Self {
		Self {
			config,
			runner,
			root: root.into(),
		}
	}

	/// Maps an absolute host path under this host's root.
	pub fn path(&self, absolute: &str) -> PathBuf {
		self.root.join(absolute.trim_start_matches('/'))
	}

	pub fn exists(&self, absolute: &str) -> bool {
		self.path(absolute).exists()
	}

	pub fn write(&self, absolute: &str, contents: impl AsRef<[u8]>) -> Result<(), InstallError> {
		let path = self.path(absolute);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}
		fs::write(path, contents)?;
		Ok(())
	}

	/// Contents of `absolute`, or `None` if it is missing or unreadable.
	pub fn read(&self, absolute: &str) -> Option<Vec<u8>> {
		match fs::read(self.path(absolute)) {
			Ok(contents) => Some(contents),
			Err(err) => {
				debug!("Cannot read {absolute}: {:?} ({err}).", err.kind());
				None
			}
		}
	}

	pub fn mkdir(&self, absolute: &str) -> Result<PathBuf, InstallError> {
		let path = self.path(absolute);
		fs::create_dir_all(&path)?;
		Ok(path)
	}

	pub fn systemctl(&self, args: &[&str]) -> Result<(), InstallError> {
		self.runner.run("systemctl", args)
	}

	pub fn is_active(&self, service: &str) -> Result<bool, InstallError> {
		self.runner.succeeds("systemctl", &["is-active", "--quiet", service])
	}
}

pub fn path_arg(path: &Path) -> String {
	path.to_string_lossy().into_owned()
}

pub trait SetupStep {
	fn name(&self) -> &'static str;
	fn check(&self, host: &Host) -> Result<bool, InstallError>;
	fn set(&self, host: &Host) -> Result<(), InstallError>;

	/// Confirms `set` took effect. Defaults to `check`.
	fn verify(&self, host: &Host) -> Result<bool, InstallError> {
		self.check(host)
	}
}

pub const SETUP_STEPS: &[&dyn SetupStep] = &[
	&DisableSwap,
	&KernelModules,
	&Sysctl,
	&Containerd,
	&Kubes,
	&Crictl,
	&Join,
];

pub fn setup(host: &Host) -> Result<(), InstallError> {
	run_steps(host, SETUP_STEPS)
}

fn run_steps(host: &Host, steps: &[&dyn SetupStep]) -> Result<(), InstallError> {
	for step in steps {
		let name = step.name();
		info!("Step {name}.");
		if step.check(host).map_err(|err| err.in_step(name))? {
			continue;
		}
		step.set(host).map_err(|err| err.in_step(name))?;
		if !step.verify(host).map_err(|err| err.in_step(name))? {
			return Err(InstallError::StepFailed { step: name });
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{InstallMethod, fixture};
	use crate::setup::utils::cmd::fake::Recorder;
	use std::cell::Cell;

	struct Flaky {
		satisfied: Cell<bool>,
		fixes: bool,
	}

	impl SetupStep for Flaky {
		fn name(&self) -> &'static str {
			"Flaky"
		}

		fn check(&self, _host: &Host) -> Result<bool, InstallError> {
			Ok(self.satisfied.get())
		}

		fn set(&self, _host: &Host) -> Result<(), InstallError> {
			self.satisfied.set(self.fixes);
			Ok(())
		}
	}

	struct Broken;

	impl SetupStep for Broken {
		fn name(&self) -> &'static str {
			"Broken"
		}

		fn check(&self, _host: &Host) -> Result<bool, InstallError> {
			Ok(false)
		}

		fn set(&self, host: &Host) -> Result<(), InstallError> {
			host.runner.run("apt-get", &["update"])
		}
	}

	#[test]
	fn host_paths_are_rooted() {
		let config = fixture::config(InstallMethod::Apt);
		let runner = Recorder::new();
		let host = Host::new(&config, &runner, "/tmp/root");
		assert_eq!(
			host.path("/etc/sysctl.d/k8s.conf"),
			PathBuf::from("/tmp/root/etc/sysctl.d/k8s.conf")
		);
		let host = Host::new(&config, &runner, "/");
		assert_eq!(host.path("/etc/sysctl.d/k8s.conf"), PathBuf::from("/etc/sysctl.d/k8s.conf"));
	}

	#[test]
	fn satisfied_steps_are_not_set() {
		let config = fixture::config(InstallMethod::Apt);
		let runner = Recorder::new();
		let host = Host::new(&config, &runner, "/");
		let step = Flaky {
			satisfied: Cell::new(true),
			fixes: false,
		};
		run_steps(&host, &[&step]).unwrap();
	}

	#[test]
	fn step_still_unsatisfied_after_set_fails() {
		let config = fixture::config(InstallMethod::Apt);
		let runner = Recorder::new();
		let host = Host::new(&config, &runner, "/");
		let fixed = Flaky {
			satisfied: Cell::new(false),
			fixes: true,
		};
		let stuck = Flaky {
			satisfied: Cell::new(false),
			fixes: false,
		};
		run_steps(&host, &[&fixed]).unwrap();
		let err = run_steps(&host, &[&stuck]).unwrap_err();
		assert!(matches!(err, InstallError::StepFailed { step: "Flaky" }));
	}

	#[test]
	fn first_failure_stops_the_run_with_step_identity() {
		let config = fixture::config(InstallMethod::Apt);
		let runner = Recorder::new().with_failure("apt-get");
		let host = Host::new(&config, &runner, "/");
		let after = Flaky {
			satisfied: Cell::new(false),
			fixes: true,
		};
		let err = run_steps(&host, &[&Broken, &after]).unwrap_err();
		assert!(matches!(err, InstallError::Step { step: "Broken", .. }));
		assert!(!after.satisfied.get());
	}

	#[test]
	fn unreadable_paths_read_as_none() {
		let root = tempfile::tempdir().unwrap();
		let config = fixture::config(InstallMethod::Apt);
		let runner = Recorder::new();
		let host = Host::new(&config, &runner, root.path());
		host.mkdir("/etc/containerd/config.toml").unwrap();
		assert_eq!(host.read("/etc/containerd/config.toml"), None);
		assert_eq!(host.read("/etc/missing.conf"), None);
	}

	#[test]
	fn verify_runs_after_set() {
		struct Attempted;

		impl SetupStep for Attempted {
			fn name(&self) -> &'static str {
				"Attempted"
			}

			fn check(&self, _host: &Host) -> Result<bool, InstallError> {
				Ok(false)
			}

			fn set(&self, host: &Host) -> Result<(), InstallError> {
				host.runner.run("kubeadm", &["join"])
			}

			fn verify(&self, _host: &Host) -> Result<bool, InstallError> {
				Ok(true)
			}
		}

		let config = fixture::config(InstallMethod::Apt);
		let runner = Recorder::new();
		let host = Host::new(&config, &runner, "/");
		run_steps(&host, &[&Attempted]).unwrap();
		assert_eq!(runner.calls(), vec!["kubeadm join"]);
	}

	#[test]
	fn write_creates_parent_directories() {
		let root = tempfile::tempdir().unwrap();
		let config = fixture::config(InstallMethod::Apt);
		let runner = Recorder::new();
		let host = Host::new(&config, &runner, root.path());
		host.write("/etc/containerd/config.toml", "version = 2\n").unwrap();
		assert_eq!(host.read("/etc/containerd/config.toml").unwrap(), b"version = 2\n");
	}
}
