use crate::error::InstallError;
use crate::setup::utils::cmd::Runner;

pub const NONINTERACTIVE: &str = "DEBIAN_FRONTEND=noninteractive";

fn query(
	runner: &dyn Runner,
	format: &str,
	package_name: &str,
) -> Result<Option<String>, InstallError> {
	let format_arg = format!("-f={format}");
	if !runner.succeeds("dpkg-query", &["-W", &format_arg, package_name])? {
		return Ok(None);
	}
	let stdout = runner.output_string("dpkg-query", &["-W", &format_arg, package_name])?;
	Ok(Some(stdout.trim().to_owned()))
}

pub fn is_installed(runner: &dyn Runner, package_name: &str) -> Result<bool, InstallError> {
	let installed = query(runner, "${Status}", package_name)?
		.is_some_and(|status| status == "install ok installed" || status == "hold ok installed");
	Ok(installed)
}

pub fn installed_version(
	runner: &dyn Runner,
	package_name: &str,
) -> Result<Option<String>, InstallError> {
	if !is_installed(runner, package_name)? {
		return Ok(None);
	}
	query(runner, "${Version}", package_name)
}

pub fn update(runner: &dyn Runner) -> Result<(), InstallError> {
	runner.run("apt-get", &["update"])
}

pub fn install(runner: &dyn Runner, package_names: &[&str]) -> Result<(), InstallError> {
	let mut args = vec![
		NONINTERACTIVE,
		"apt-get",
		"install",
		"-y",
		"--no-install-recommends",
		"--allow-change-held-packages",
	];
	args.extend_from_slice(package_names);
	runner.run("env", &args)
}

pub fn hold(runner: &dyn Runner, package_names: &[&str]) -> Result<(), InstallError> {
	let mut args = vec!["hold"];
	args.extend_from_slice(package_names);
	runner.run("apt-mark", &args)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::setup::utils::cmd::fake::Recorder;

	#[test]
	fn held_packages_count_as_installed() {
		let runner = Recorder::new()
			.with_status("dpkg-query -W -f=${Status} kubelet", true)
			.with_output("dpkg-query -W -f=${Status} kubelet", "hold ok installed");
		assert!(is_installed(&runner, "kubelet").unwrap());
	}

	#[test]
	fn unknown_packages_are_not_installed() {
		let runner = Recorder::new();
		assert!(!is_installed(&runner, "kubelet").unwrap());
		assert_eq!(installed_version(&runner, "kubelet").unwrap(), None);
	}

	#[test]
	fn removed_but_configured_is_not_installed() {
		let runner = Recorder::new()
			.with_status("dpkg-query -W -f=${Status} containerd", true)
			.with_output("dpkg-query -W -f=${Status} containerd", "deinstall ok config-files");
		assert!(!is_installed(&runner, "containerd").unwrap());
	}

	#[test]
	fn version_is_read_for_installed_packages() {
		let runner = Recorder::new()
			.with_status("dpkg-query -W -f=${Status} kubeadm", true)
			.with_output("dpkg-query -W -f=${Status} kubeadm", "install ok installed")
			.with_status("dpkg-query -W -f=${Version} kubeadm", true)
			.with_output("dpkg-query -W -f=${Version} kubeadm", "1.34.2-1.1\n");
		assert_eq!(installed_version(&runner, "kubeadm").unwrap().as_deref(), Some("1.34.2-1.1"));
	}

	#[test]
	fn install_is_noninteractive() {
		let runner = Recorder::new();
		install(&runner, &["containerd"]).unwrap();
		hold(&runner, &["containerd"]).unwrap();
		assert_eq!(
			runner.calls(),
			vec![
				"env DEBIAN_FRONTEND=noninteractive apt-get install -y --no-install-recommends --allow-change-held-packages containerd",
				"apt-mark hold containerd",
			]
		);
	}
}
