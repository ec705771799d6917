use crate::error::InstallError;
use crate::setup::{Host, SetupStep};
use hex_literal::hex;
use sha2::{Digest, Sha256};
use tracing::info;

pub struct KernelModules;

impl KernelModules {
	pub const CONFIG_PATH: &str = "/etc/modules-load.d/k8s.conf";
	pub const MODULES: &[&str] = &["overlay", "br_netfilter"];
	const CONFIG_SHA256: [u8; 32] =
		hex!("fcaf07413a456d658640930cef56ed4d13330123e3b522c481021613c64755e3");

	pub fn config_txt() -> String {
		KernelModules::MODULES.join("\n") + "\n"
	}

	pub fn is_loaded(host: &Host, module_name: &str) -> bool {
		host.exists(&format!("/sys/module/{module_name}"))
	}
}

impl SetupStep for KernelModules {
	fn name(&self) -> &'static str {
		"KernelModules"
	}

	fn check(&self, host: &Host) -> Result<bool, InstallError> {
		let Some(config_txt) = host.read(KernelModules::CONFIG_PATH) else {
			info!("Kernel module config missing or unreadable.");
			return Ok(false);
		};
		if Sha256::digest(&config_txt)[..] != KernelModules::CONFIG_SHA256 {
			info!("Kernel modules are misconfigured.");
			return Ok(false);
		}
		for &module_name in KernelModules::MODULES {
			if !KernelModules::is_loaded(host, module_name) {
				info!("Kernel module {module_name} is not loaded.");
				return Ok(false);
			}
		}
		info!("Kernel modules are already configured and loaded.");
		Ok(true)
	}

	fn set(&self, host: &Host) -> Result<(), InstallError> {
		info!("Configuring kernel modules.");
		host.write(KernelModules::CONFIG_PATH, KernelModules::config_txt())?;
		for &module_name in KernelModules::MODULES {
			info!("Loading kernel module: {module_name}.");
			host.runner.run("modprobe", &[module_name])?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{InstallMethod, fixture};
	use crate::setup::utils::cmd::fake::Recorder;
	use std::{fs, path::PathBuf};

	fn modprobe_loads(root: PathBuf) -> impl Fn() + 'static {
		move || {
			for &module_name in KernelModules::MODULES {
				fs::create_dir_all(root.join("sys/module").join(module_name)).unwrap();
			}
		}
	}

	#[test]
	fn expected_digest_matches_config() {
		assert_eq!(Sha256::digest(KernelModules::config_txt())[..], KernelModules::CONFIG_SHA256);
	}

	#[test]
	fn set_writes_config_and_loads_modules() {
		let root = tempfile::tempdir().unwrap();
		let config = fixture::config(InstallMethod::Apt);
		let runner =
			Recorder::new().with_hook("modprobe", modprobe_loads(root.path().to_path_buf()));
		let host = Host::new(&config, &runner, root.path());

		assert!(!KernelModules.check(&host).unwrap());
		KernelModules.set(&host).unwrap();
		assert!(KernelModules.check(&host).unwrap());
		assert_eq!(runner.calls(), vec!["modprobe overlay", "modprobe br_netfilter"]);
	}

	#[test]
	fn set_twice_is_idempotent() {
		let root = tempfile::tempdir().unwrap();
		let config = fixture::config(InstallMethod::Apt);
		let runner =
			Recorder::new().with_hook("modprobe", modprobe_loads(root.path().to_path_buf()));
		let host = Host::new(&config, &runner, root.path());

		KernelModules.set(&host).unwrap();
		let first = host.read(KernelModules::CONFIG_PATH).unwrap();
		KernelModules.set(&host).unwrap();
		assert_eq!(host.read(KernelModules::CONFIG_PATH).unwrap(), first);
		assert!(KernelModules.check(&host).unwrap());
	}

	#[test]
	fn tampered_config_is_detected() {
		let root = tempfile::tempdir().unwrap();
		let config = fixture::config(InstallMethod::Apt);
		let runner =
			Recorder::new().with_hook("modprobe", modprobe_loads(root.path().to_path_buf()));
		let host = Host::new(&config, &runner, root.path());
		KernelModules.set(&host).unwrap();
		host.write(KernelModules::CONFIG_PATH, "overlay\n").unwrap();
		assert!(!KernelModules.check(&host).unwrap());
	}
}
