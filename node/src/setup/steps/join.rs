use crate::config::JoinCredentials;
use crate::error::InstallError;
use crate::setup::{Host, SetupStep};
use tracing::{info, warn};

pub struct Join;

impl Join {
	/// Written by kubeadm once the node has joined.
	pub const KUBELET_CONFIG_PATH: &str = "/etc/kubernetes/kubelet.conf";

	pub fn verbosity(debug: bool) -> u8 {
		if debug { 5 } else { 2 }
	}

	pub fn args(credentials: &JoinCredentials, debug: bool) -> Vec<String> {
		vec![
			"join".to_owned(),
			credentials.url.clone(),
			"--token".to_owned(),
			credentials.token.clone(),
			"--discovery-token-ca-cert-hash".to_owned(),
			credentials.ca_cert_hash.clone(),
			format!("--v={}", Join::verbosity(debug)),
		]
	}
}

impl SetupStep for Join {
	fn name(&self) -> &'static str {
		"Join"
	}

	fn check(&self, host: &Host) -> Result<bool, InstallError> {
		if let Err(missing) = host.config.join_credentials() {
			for name in missing {
				warn!("{name} not set, skipping cluster join.");
			}
			return Ok(true);
		}
		if host.exists(Join::KUBELET_CONFIG_PATH) {
			warn!("{} exists, kubeadm preflight may refuse to join.", Join::KUBELET_CONFIG_PATH);
		}
		Ok(false)
	}

	fn verify(&self, host: &Host) -> Result<bool, InstallError> {
		if host.config.join_credentials().is_err() {
			return Ok(true);
		}
		Ok(host.exists(Join::KUBELET_CONFIG_PATH))
	}

	fn set(&self, host: &Host) -> Result<(), InstallError> {
		let Ok(credentials) = host.config.join_credentials() else {
			return Ok(());
		};
		info!("Joining cluster at {}.", credentials.url);
		let args = Join::args(&credentials, host.config.debug);
		let args = args.iter().map(String::as_str).collect::<Vec<_>>();
		host.runner.run("kubeadm", &args)?;
		info!("Joined cluster at {}.", credentials.url);
		Ok(())
	}
}
