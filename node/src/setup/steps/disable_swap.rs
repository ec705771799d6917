use crate::error::InstallError;
use crate::setup::{Host, SetupStep};
use std::fs;
use tracing::info;

pub struct DisableSwap;

impl DisableSwap {
	pub const SWAPS_PATH: &str = "/proc/swaps";
	pub const FSTAB_PATH: &str = "/etc/fstab";

	fn is_swap_entry(line: &str) -> bool {
		!line.trim_start().starts_with('#') && line.split_whitespace().nth(2) == Some("swap")
	}

	/// fstab without its swap entries, trailing newline preserved.
	pub fn strip_swap(fstab: &str) -> String {
		let cleaned = fstab
			.lines()
			.filter(|line| !DisableSwap::is_swap_entry(line))
			.collect::<Vec<_>>()
			.join("\n");
		if fstab.ends_with('\n') && !cleaned.is_empty() {
			cleaned + "\n"
		} else {
			cleaned
		}
	}
}

impl SetupStep for DisableSwap {
	fn name(&self) -> &'static str {
		"DisableSwap"
	}

	fn check(&self, host: &Host) -> Result<bool, InstallError> {
		// The first line of /proc/swaps is a header.
		let swaps = fs::read_to_string(host.path(DisableSwap::SWAPS_PATH)).unwrap_or_default();
		if swaps.lines().count() > 1 {
			info!("Swap is enabled.");
			return Ok(false);
		}
		let Ok(fstab) = fs::read_to_string(host.path(DisableSwap::FSTAB_PATH)) else {
			return Ok(true);
		};
		if fstab.lines().any(DisableSwap::is_swap_entry) {
			info!("Swap is enabled in fstab.");
			return Ok(false);
		}
		info!("Swap is disabled.");
		Ok(true)
	}

	fn set(&self, host: &Host) -> Result<(), InstallError> {
		info!("Disabling swap.");
		host.runner.run("swapoff", &["-a"])?;
		let fstab_path = host.path(DisableSwap::FSTAB_PATH);
		let Ok(original) = fs::read_to_string(&fstab_path) else {
			return Ok(());
		};
		let cleaned = DisableSwap::strip_swap(&original);
		if cleaned != original {
			info!("Removing swap entries from {}.", DisableSwap::FSTAB_PATH);
			fs::write(&fstab_path, cleaned)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{InstallMethod, fixture};
	use crate::setup::utils::cmd::fake::Recorder;

	const FSTAB: &str = "\
# /etc/fstab
UUID=1234 / ext4 errors=remount-ro 0 1
/swap.img none swap sw 0 0
UUID=5678 /boot/efi vfat umask=0077 0 1
";

	#[test]
	fn strip_swap_keeps_other_entries() {
		let cleaned = DisableSwap::strip_swap(FSTAB);
		assert_eq!(
			cleaned,
			"# /etc/fstab\nUUID=1234 / ext4 errors=remount-ro 0 1\nUUID=5678 /boot/efi vfat umask=0077 0 1\n"
		);
		assert_eq!(DisableSwap::strip_swap(&cleaned), cleaned);
	}

	#[test]
	fn commented_swap_is_ignored() {
		let fstab = "#/swap.img none swap sw 0 0\n";
		assert_eq!(DisableSwap::strip_swap(fstab), fstab);
	}

	#[test]
	fn swap_is_disabled_and_removed_from_fstab() {
		let root = tempfile::tempdir().unwrap();
		let config = fixture::config(InstallMethod::Apt);
		let swaps = root.path().join("proc/swaps");
		let swaps_hook = swaps.clone();
		let runner = Recorder::new().with_hook("swapoff", move || {
			fs::write(&swaps_hook, "Filename Type Size Used Priority\n").unwrap();
		});
		let host = Host::new(&config, &runner, root.path());
		host.write("/proc/swaps", "Filename Type Size Used Priority\n/swap.img file 2097148 0 -2\n")
			.unwrap();
		host.write("/etc/fstab", FSTAB).unwrap();

		assert!(!DisableSwap.check(&host).unwrap());
		DisableSwap.set(&host).unwrap();
		assert!(DisableSwap.check(&host).unwrap());
		assert_eq!(runner.calls(), vec!["swapoff -a"]);
		let fstab = fs::read_to_string(root.path().join("etc/fstab")).unwrap();
		assert!(!fstab.contains("swap"));
	}
}
