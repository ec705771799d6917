use crate::config::{Arch, InstallMethod};
use crate::error::InstallError;
use crate::setup::utils::fetch;
use crate::setup::{Host, SetupStep, path_arg};
use tracing::{debug, info, warn};

/// CRI debugging CLI. Only installed by the tar method; apt pulls cri-tools in with kubeadm.
pub struct Crictl;

impl Crictl {
	pub const BINARY_PATH: &str = "/usr/local/bin/crictl";

	pub fn tag(version: &str) -> String {
		if version.starts_with('v') {
			version.to_owned()
		} else {
			format!("v{version}")
		}
	}

	/// The version token of `crictl --version` output, without its `v` prefix.
	pub fn reported_version(output: &str) -> Option<&str> {
		output.split_whitespace().last().map(|token| token.trim_start_matches('v'))
	}

	pub fn url(version: &str, arch: Arch) -> String {
		let tag = Crictl::tag(version);
		format!("https://github.com/kubernetes-sigs/cri-tools/releases/download/{tag}/crictl-{tag}-linux-{arch}.tar.gz")
	}
}

impl SetupStep for Crictl {
	fn name(&self) -> &'static str {
		"Crictl"
	}

	fn check(&self, host: &Host) -> Result<bool, InstallError> {
		if host.config.install_method != InstallMethod::Tar {
			debug!("crictl is managed by the package manager.");
			return Ok(true);
		}
		let Some(version) = host.config.crictl_version.as_deref() else {
			warn!("CRICTL_VERSION not set, skipping crictl installation.");
			return Ok(true);
		};
		if !host.exists(Crictl::BINARY_PATH) {
			info!("crictl is not installed.");
			return Ok(false);
		}
		let crictl = path_arg(&host.path(Crictl::BINARY_PATH));
		let reported = match host.runner.output_string(&crictl, &["--version"]) {
			Ok(reported) => reported,
			Err(err) => {
				info!("crictl version is unavailable: {err}.");
				return Ok(false);
			}
		};
		let wanted = Crictl::tag(version);
		let is_current =
			Crictl::reported_version(&reported) == Some(wanted.trim_start_matches('v'));
		if !is_current {
			info!("crictl reports '{}', want {version}.", reported.trim());
		}
		Ok(is_current)
	}

	fn set(&self, host: &Host) -> Result<(), InstallError> {
		let Some(version) = host.config.crictl_version.as_deref() else {
			return Ok(());
		};
		info!("Installing crictl {version}.");
		let scratch = tempfile::Builder::new().prefix("8inary-node-").tempdir()?;
		let bin_dir = host.mkdir("/usr/local/bin")?;
		let url = Crictl::url(version, host.config.arch);
		fetch::unpack(host.runner, &url, scratch.path(), &bin_dir)
	}
}
