use crate::error::InstallError;
use crate::setup::{Host, SetupStep};
use hex_literal::hex;
use sha2::{Digest, Sha256};
use tracing::info;

pub struct Sysctl;

impl Sysctl {
	pub const CONFIG_PATH: &str = "/etc/sysctl.d/k8s.conf";
	pub const PARAMS: &[(&str, &str)] = &[
		("net.bridge.bridge-nf-call-iptables", "1"),
		("net.bridge.bridge-nf-call-ip6tables", "1"),
		("net.ipv4.ip_forward", "1"),
	];
	const CONFIG_SHA256: [u8; 32] =
		hex!("6e3f751b8409493b80fb7154ee21989dece3322d8b9018157ffef64dfbc10799");

	pub fn config_txt() -> String {
		Sysctl::PARAMS
			.iter()
			.map(|(key, value)| format!("{key} = {value}\n"))
			.collect()
	}
}

impl SetupStep for Sysctl {
	fn name(&self) -> &'static str {
		"Sysctl"
	}

	fn check(&self, host: &Host) -> Result<bool, InstallError> {
		let Some(config_txt) = host.read(Sysctl::CONFIG_PATH) else {
			info!("Sysctl config missing or unreadable.");
			return Ok(false);
		};
		if Sha256::digest(&config_txt)[..] != Sysctl::CONFIG_SHA256 {
			info!("Sysctl is misconfigured.");
			return Ok(false);
		}
		info!("Sysctl already configured.");
		Ok(true)
	}

	fn set(&self, host: &Host) -> Result<(), InstallError> {
		info!("Configuring sysctl.");
		host.write(Sysctl::CONFIG_PATH, Sysctl::config_txt())?;
		host.runner.run("sysctl", &["--system"])?;
		info!("Sysctl has been successfully configured.");
		Ok(())
	}
}
