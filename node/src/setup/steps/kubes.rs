use crate::config::{Arch, InstallMethod, KubeVersion};
use crate::error::InstallError;
use crate::setup::utils::{fetch, pkg};
use crate::setup::{Host, SetupStep, path_arg};
use tracing::info;

pub struct Kubes;

impl Kubes {
	pub const PACKAGE_NAMES: &[&str] = &["kubelet", "kubeadm", "kubectl"];
	pub const APT_PREREQUISITES: &[&str] =
		&["apt-transport-https", "ca-certificates", "curl", "gpg"];
	pub const APT_CONFIG_PATH: &str = "/etc/apt/sources.list.d/kubernetes.list";
	pub const APT_KEY_PATH: &str = "/etc/apt/keyrings/kubernetes-apt-keyring.gpg";
	pub const BIN_DIR: &str = "/usr/local/bin";
	pub const RELEASE_TEMPLATES_VERSION: &str = "v0.16.2";
	pub const KUBELET_UNIT_PATH: &str = "/usr/lib/systemd/system/kubelet.service";
	pub const KUBEADM_DROPIN_PATH: &str =
		"/usr/lib/systemd/system/kubelet.service.d/10-kubeadm.conf";

	pub fn apt_base_url(version: &KubeVersion) -> String {
		format!("https://pkgs.k8s.io/core:/stable:/{}/deb", version.channel())
	}

	pub fn apt_source(version: &KubeVersion) -> String {
		format!("deb [signed-by={}] {}/ /\n", Kubes::APT_KEY_PATH, Kubes::apt_base_url(version))
	}

	pub fn binary_url(version: &KubeVersion, arch: Arch, binary: &str) -> String {
		format!("https://dl.k8s.io/release/{}/bin/linux/{arch}/{binary}", version.tag())
	}

	pub fn template_url(component: &str, file: &str) -> String {
		format!(
			"https://raw.githubusercontent.com/kubernetes/release/{}/cmd/krel/templates/latest/{component}/{file}",
			Kubes::RELEASE_TEMPLATES_VERSION
		)
	}

	/// Points upstream unit templates, written for /usr/bin, at our binary directory.
	pub fn relocate(template: &str) -> String {
		template.replace("/usr/bin", Kubes::BIN_DIR)
	}

	fn install_apt(host: &Host) -> Result<(), InstallError> {
		let version = &host.config.kubernetes_version;
		info!("Installing Kubernetes {version} tooling via apt-get.");
		pkg::update(host.runner)?;
		pkg::install(host.runner, Kubes::APT_PREREQUISITES)?;
		let key_url = format!("{}/Release.key", Kubes::apt_base_url(version));
		let key = fetch::bytes(host.runner, &key_url)?;
		host.mkdir("/etc/apt/keyrings")?;
		let key_path = path_arg(&host.path(Kubes::APT_KEY_PATH));
		host.runner.input("gpg", &["--dearmor", "--yes", "-o", &key_path], &key)?;
		host.write(Kubes::APT_CONFIG_PATH, Kubes::apt_source(version))?;
		pkg::update(host.runner)?;
		let pinned = Kubes::PACKAGE_NAMES
			.iter()
			.map(|name| format!("{name}={}", version.deb_version()))
			.collect::<Vec<_>>();
		pkg::install(host.runner, &pinned.iter().map(String::as_str).collect::<Vec<_>>())?;
		pkg::hold(host.runner, Kubes::PACKAGE_NAMES)?;
		host.systemctl(&["enable", "--now", "kubelet"])?;
		info!("Kubernetes tooling installed.");
		Ok(())
	}

	fn install_tar(host: &Host) -> Result<(), InstallError> {
		let version = &host.config.kubernetes_version;
		let arch = host.config.arch;
		info!("Installing Kubernetes {version} binaries for {arch}.");
		let scratch = tempfile::Builder::new().prefix("8inary-node-").tempdir()?;
		host.mkdir(Kubes::BIN_DIR)?;
		for &binary in Kubes::PACKAGE_NAMES {
			let download = scratch.path().join(binary);
			fetch::download(host.runner, &Kubes::binary_url(version, arch, binary), &download)?;
			let dest = host.path(&format!("{}/{binary}", Kubes::BIN_DIR));
			host.runner.run("install", &["-m", "755", &path_arg(&download), &path_arg(&dest)])?;
		}
		let unit = fetch::text(host.runner, &Kubes::template_url("kubelet", "kubelet.service"))?;
		host.write(Kubes::KUBELET_UNIT_PATH, Kubes::relocate(&unit))?;
		let dropin = fetch::text(host.runner, &Kubes::template_url("kubeadm", "10-kubeadm.conf"))?;
		host.write(Kubes::KUBEADM_DROPIN_PATH, Kubes::relocate(&dropin))?;
		host.systemctl(&["daemon-reload"])?;
		host.systemctl(&["enable", "--now", "kubelet"])?;
		info!("Kubernetes binaries installed.");
		Ok(())
	}

	fn check_apt(host: &Host) -> Result<bool, InstallError> {
		let wanted = host.config.kubernetes_version.deb_version();
		for &package_name in Kubes::PACKAGE_NAMES {
			match pkg::installed_version(host.runner, package_name)? {
				None => {
					info!("{package_name} is not installed.");
					return Ok(false);
				}
				Some(installed) if installed != wanted => {
					info!("{package_name} {installed} is installed, want {wanted}.");
					return Ok(false);
				}
				Some(_) => {}
			}
		}
		Ok(true)
	}

	fn check_tar(host: &Host) -> Result<bool, InstallError> {
		for &binary in Kubes::PACKAGE_NAMES {
			if !host.exists(&format!("{}/{binary}", Kubes::BIN_DIR)) {
				info!("{binary} is not installed.");
				return Ok(false);
			}
		}
		if !host.exists(Kubes::KUBELET_UNIT_PATH) {
			info!("kubelet service unit is missing.");
			return Ok(false);
		}
		let kubeadm = path_arg(&host.path(&format!("{}/kubeadm", Kubes::BIN_DIR)));
		let reported = match host.runner.output_string(&kubeadm, &["version", "-o", "short"]) {
			Ok(reported) => reported,
			Err(err) => {
				info!("kubeadm version is unavailable: {err}.");
				return Ok(false);
			}
		};
		let wanted = host.config.kubernetes_version.tag();
		if reported.trim() != wanted {
			info!("kubeadm reports {}, want {wanted}.", reported.trim());
			return Ok(false);
		}
		Ok(true)
	}
}

impl SetupStep for Kubes {
	fn name(&self) -> &'static str {
		"Kubes"
	}

	fn check(&self, host: &Host) -> Result<bool, InstallError> {
		let installed = match host.config.install_method {
			InstallMethod::Apt => Kubes::check_apt(host)?,
			InstallMethod::Tar => Kubes::check_tar(host)?,
			method => return Err(InstallError::UnsupportedInstallMethod(method.to_string())),
		};
		if installed {
			info!("Kubes are installed.");
		}
		Ok(installed)
	}

	fn set(&self, host: &Host) -> Result<(), InstallError> {
		match host.config.install_method {
			InstallMethod::Apt => Kubes::install_apt(host),
			InstallMethod::Tar => Kubes::install_tar(host),
			method => Err(InstallError::UnsupportedInstallMethod(method.to_string())),
		}
	}
}
