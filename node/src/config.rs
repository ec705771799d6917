use crate::context::HostFacts;
use crate::error::InstallError;
use clap::{ArgAction, Parser, builder::FalseyValueParser};
use std::{fmt, str::FromStr};
use tracing::{info, warn};

/// Raw invocation settings. Every option is normally supplied through the environment.
#[derive(Debug, Default, Parser)]
#[command(
	name = "8inary-node",
	version,
	about = "Bootstrap this host and join it to a Kubernetes cluster"
)]
pub struct Args {
	/// Trace every command and raise kubeadm verbosity.
	#[arg(
		long,
		env = "DEBUG",
		action = ArgAction::SetTrue,
		value_parser = FalseyValueParser::new()
	)]
	pub debug: bool,

	/// apt or tar (rpm and airgap are reserved).
	#[arg(long, env = "INSTALL_METHOD")]
	pub install_method: Option<String>,

	#[arg(long, env = "KUBERNETES_VERSION")]
	pub kubernetes_version: Option<String>,

	/// crictl release tag, tar method only.
	#[arg(long, env = "CRICTL_VERSION")]
	pub crictl_version: Option<String>,

	#[arg(long, env = "JOIN_TOKEN", hide_env_values = true)]
	pub join_token: Option<String>,

	#[arg(long, env = "JOIN_TOKEN_CACERT_HASH")]
	pub join_token_cacert_hash: Option<String>,

	/// Control plane endpoint, e.g. 192.168.0.2:6443.
	#[arg(long, env = "JOIN_URL")]
	pub join_url: Option<String>,

	/// Overrides the detected machine architecture.
	#[arg(long, env = "ARCH")]
	pub arch: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
	Amd64,
	Arm64,
}

impl Arch {
	pub fn as_str(self) -> &'static str {
		match self {
			Arch::Amd64 => "amd64",
			Arch::Arm64 => "arm64",
		}
	}
}

impl FromStr for Arch {
	type Err = InstallError;

	fn from_str(machine: &str) -> Result<Self, Self::Err> {
		match machine.trim() {
			"amd64" | "x86_64" => Ok(Arch::Amd64),
			"arm64" | "aarch64" => Ok(Arch::Arm64),
			other => Err(InstallError::UnsupportedArch(other.to_owned())),
		}
	}
}

impl fmt::Display for Arch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMethod {
	Apt,
	Tar,
	Rpm,
	Airgap,
}

impl FromStr for InstallMethod {
	type Err = InstallError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.trim().to_ascii_lowercase().as_str() {
			"apt" => Ok(InstallMethod::Apt),
			"tar" => Ok(InstallMethod::Tar),
			"rpm" => Ok(InstallMethod::Rpm),
			"airgap" => Ok(InstallMethod::Airgap),
			_ => Err(InstallError::UnknownInstallMethod(value.to_owned())),
		}
	}
}

impl fmt::Display for InstallMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			InstallMethod::Apt => "apt",
			InstallMethod::Tar => "tar",
			InstallMethod::Rpm => "rpm",
			InstallMethod::Airgap => "airgap",
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KubeVersion {
	pub major: u32,
	pub minor: u32,
	pub patch: u32,
}

impl KubeVersion {
	/// Used whenever KUBERNETES_VERSION is not set. This is a pinned release, not "latest".
	pub const FALLBACK: KubeVersion = KubeVersion {
		major: 1,
		minor: 34,
		patch: 2,
	};

	/// Release tag, e.g. `v1.34.2`.
	pub fn tag(&self) -> String {
		format!("v{self}")
	}

	/// pkgs.k8s.io repository channel, e.g. `v1.34`.
	pub fn channel(&self) -> String {
		format!("v{}.{}", self.major, self.minor)
	}

	/// Debian package version published on pkgs.k8s.io.
	pub fn deb_version(&self) -> String {
		format!("{self}-1.1")
	}
}

impl FromStr for KubeVersion {
	type Err = InstallError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		let invalid = || {
			InstallError::Config(format!("Kubernetes version '{value}' is not of the form 1.34.2"))
		};
		let trimmed = value.trim();
		let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
		let parts = bare
			.split('.')
			.map(|part| part.parse::<u32>().map_err(|_| invalid()))
			.collect::<Result<Vec<_>, _>>()?;
		match parts[..] {
			[major, minor, patch] => Ok(KubeVersion { major, minor, patch }),
			_ => Err(invalid()),
		}
	}
}

impl fmt::Display for KubeVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
	}
}

#[derive(Clone, PartialEq, Eq)]
pub struct JoinCredentials {
	pub token: String,
	pub ca_cert_hash: String,
	pub url: String,
}

impl fmt::Debug for JoinCredentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("JoinCredentials")
			.field("token", &"<redacted>")
			.field("ca_cert_hash", &self.ca_cert_hash)
			.field("url", &self.url)
			.finish()
	}
}

/// Validated settings shared by every setup step.
#[derive(Debug, Clone)]
pub struct Config {
	pub debug: bool,
	pub arch: Arch,
	pub install_method: InstallMethod,
	pub kubernetes_version: KubeVersion,
	pub crictl_version: Option<String>,
	pub join_token: Option<String>,
	pub join_token_cacert_hash: Option<String>,
	pub join_url: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
	value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

impl Config {
	/// Order matters: architecture, privilege, then install method, all before any side effect.
	pub fn resolve(args: Args, host: &dyn HostFacts) -> Result<Config, InstallError> {
		let arch = match non_empty(args.arch) {
			Some(arch) => arch.parse::<Arch>()?,
			None => host.machine()?.parse::<Arch>()?,
		};
		info!("Architecture: {arch}.");

		let uid = host.effective_uid();
		if uid != 0 {
			return Err(InstallError::NotRoot(uid));
		}

		let install_method = match non_empty(args.install_method) {
			Some(method) => method.parse::<InstallMethod>()?,
			None if host.has_program("apt-get") => InstallMethod::Apt,
			None => return Err(InstallError::MissingInstallMethod),
		};
		if matches!(install_method, InstallMethod::Rpm | InstallMethod::Airgap) {
			return Err(InstallError::UnsupportedInstallMethod(install_method.to_string()));
		}
		info!("Install method: {install_method}.");

		let kubernetes_version = match non_empty(args.kubernetes_version) {
			Some(version) => version.parse::<KubeVersion>()?,
			None => {
				warn!(
					"KUBERNETES_VERSION not set, using pinned fallback {} rather than the latest release.",
					KubeVersion::FALLBACK
				);
				KubeVersion::FALLBACK
			}
		};
		info!("Kubernetes version: {kubernetes_version}.");

		Ok(Config {
			debug: args.debug,
			arch,
			install_method,
			kubernetes_version,
			crictl_version: non_empty(args.crictl_version),
			join_token: non_empty(args.join_token),
			join_token_cacert_hash: non_empty(args.join_token_cacert_hash),
			join_url: non_empty(args.join_url),
		})
	}

	/// All three credentials, or the environment variable names that are missing.
	pub fn join_credentials(&self) -> Result<JoinCredentials, Vec<&'static str>> {
		let mut missing = Vec::new();
		if self.join_token.is_none() {
			missing.push("JOIN_TOKEN");
		}
		if self.join_token_cacert_hash.is_none() {
			missing.push("JOIN_TOKEN_CACERT_HASH");
		}
		if self.join_url.is_none() {
			missing.push("JOIN_URL");
		}
		match (&self.join_token, &self.join_token_cacert_hash, &self.join_url) {
			(Some(token), Some(ca_cert_hash), Some(url)) => Ok(JoinCredentials {
				token: token.clone(),
				ca_cert_hash: ca_cert_hash.clone(),
				url: url.clone(),
			}),
			_ => Err(missing),
		}
	}
}
