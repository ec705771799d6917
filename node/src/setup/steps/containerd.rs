use crate::config::{Arch, InstallMethod};
use crate::error::InstallError;
use crate::setup::utils::{fetch, pkg};
use crate::setup::{Host, SetupStep, path_arg};
use tracing::{info, warn};

pub struct Containerd;

impl Containerd {
	pub const PACKAGE_NAME: &str = "containerd";
	pub const CONFIG_PATH: &str = "/etc/containerd/config.toml";
	pub const CONTAINERD_VERSION: &str = "1.7.24";
	pub const RUNC_VERSION: &str = "1.2.3";
	pub const CNI_PLUGINS_VERSION: &str = "1.6.1";
	pub const UNIT_PATH: &str = "/usr/local/lib/systemd/system/containerd.service";
	pub const BINARY_PATH: &str = "/usr/local/bin/containerd";
	pub const RUNC_PATH: &str = "/usr/local/sbin/runc";
	pub const CNI_BIN_DIR: &str = "/opt/cni/bin";

	pub fn containerd_url(arch: Arch) -> String {
		let version = Containerd::CONTAINERD_VERSION;
		format!("https://github.com/containerd/containerd/releases/download/v{version}/containerd-{version}-linux-{arch}.tar.gz")
	}

	pub fn unit_url() -> String {
		format!(
			"https://raw.githubusercontent.com/containerd/containerd/v{}/containerd.service",
			Containerd::CONTAINERD_VERSION
		)
	}

	pub fn runc_url(arch: Arch) -> String {
		format!(
			"https://github.com/opencontainers/runc/releases/download/v{}/runc.{arch}",
			Containerd::RUNC_VERSION
		)
	}

	pub fn cni_plugins_url(arch: Arch) -> String {
		let version = Containerd::CNI_PLUGINS_VERSION;
		format!("https://github.com/containernetworking/plugins/releases/download/v{version}/cni-plugins-linux-{arch}-v{version}.tgz")
	}

	/// Switches runc to the systemd cgroup driver, which kubelet expects.
	pub fn with_systemd_cgroup(config: &str) -> String {
		config.replace("SystemdCgroup = false", "SystemdCgroup = true")
	}

	fn is_configured(host: &Host) -> bool {
		host.read(Containerd::CONFIG_PATH)
			.is_some_and(|config| String::from_utf8_lossy(&config).contains("SystemdCgroup = true"))
	}

	fn write_config(host: &Host) -> Result<(), InstallError> {
		let existing = host
			.read(Containerd::CONFIG_PATH)
			.and_then(|config| String::from_utf8(config).ok())
			.filter(|config| config.contains("SystemdCgroup"));
		let config = match existing {
			Some(config) => {
				info!("Containerd config already exists, updating cgroup driver.");
				config
			}
			None => {
				info!("Generating default containerd config.");
				host.runner
					.output_string(Containerd::PACKAGE_NAME, &["config", "default"])?
			}
		};
		let config = Containerd::with_systemd_cgroup(&config);
		if !config.contains("SystemdCgroup = true") {
			return Err(InstallError::Config(format!(
				"{} has no SystemdCgroup option to enable",
				Containerd::CONFIG_PATH
			)));
		}
		host.write(Containerd::CONFIG_PATH, config)
	}

	fn install_apt(host: &Host) -> Result<(), InstallError> {
		info!("Installing containerd via apt-get.");
		pkg::update(host.runner)?;
		pkg::install(host.runner, &[Containerd::PACKAGE_NAME])?;
		Containerd::write_config(host)?;
		info!("Restarting containerd service.");
		host.systemctl(&["restart", Containerd::PACKAGE_NAME])?;
		host.systemctl(&["enable", Containerd::PACKAGE_NAME])?;
		pkg::hold(host.runner, &[Containerd::PACKAGE_NAME])
	}

	fn install_tar(host: &Host) -> Result<(), InstallError> {
		let arch = host.config.arch;
		info!("Installing containerd {} from release tarballs.", Containerd::CONTAINERD_VERSION);
		let scratch = tempfile::Builder::new().prefix("8inary-node-").tempdir()?;

		let prefix = host.mkdir("/usr/local")?;
		fetch::unpack(host.runner, &Containerd::containerd_url(arch), scratch.path(), &prefix)?;
		let unit = fetch::text(host.runner, &Containerd::unit_url())?;
		host.write(Containerd::UNIT_PATH, unit)?;

		let runc = scratch.path().join("runc");
		fetch::download(host.runner, &Containerd::runc_url(arch), &runc)?;
		host.mkdir("/usr/local/sbin")?;
		host.runner.run(
			"install",
			&["-m", "755", &path_arg(&runc), &path_arg(&host.path(Containerd::RUNC_PATH))],
		)?;

		let cni_bin = host.mkdir(Containerd::CNI_BIN_DIR)?;
		fetch::unpack(host.runner, &Containerd::cni_plugins_url(arch), scratch.path(), &cni_bin)?;

		Containerd::write_config(host)?;
		host.systemctl(&["daemon-reload"])?;
		host.systemctl(&["enable", Containerd::PACKAGE_NAME])?;
		info!("Restarting containerd service.");
		host.systemctl(&["restart", Containerd::PACKAGE_NAME])
	}
}

impl SetupStep for Containerd {
	fn name(&self) -> &'static str {
		"Containerd"
	}

	fn check(&self, host: &Host) -> Result<bool, InstallError> {
		let is_installed = match host.config.install_method {
			InstallMethod::Apt => pkg::is_installed(host.runner, Containerd::PACKAGE_NAME)?,
			InstallMethod::Tar => {
				host.exists(Containerd::BINARY_PATH)
					&& host.exists(Containerd::RUNC_PATH)
					&& host.exists(Containerd::UNIT_PATH)
			}
			method => return Err(InstallError::UnsupportedInstallMethod(method.to_string())),
		};
		if !is_installed {
			info!("Containerd is not installed.");
			return Ok(false);
		}
		if !Containerd::is_configured(host) {
			info!("Containerd is not configured.");
			return Ok(false);
		}
		if !host.is_active(Containerd::PACKAGE_NAME)? {
			info!("Containerd is not active.");
			return Ok(false);
		}
		info!("Containerd is already configured and active.");
		Ok(true)
	}

	fn set(&self, host: &Host) -> Result<(), InstallError> {
		match host.config.install_method {
			InstallMethod::Apt => Containerd::install_apt(host),
			InstallMethod::Tar => Containerd::install_tar(host),
			method => {
				warn!("No containerd installer for {method}.");
				Err(InstallError::UnsupportedInstallMethod(method.to_string()))
			}
		}
	}
}
