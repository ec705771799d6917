use crate::error::InstallError;
use crate::setup::utils::cmd::Runner;
use std::path::Path;
use tracing::info;

// Downloads are not retried and not checksummed.
pub fn download(runner: &dyn Runner, url: &str, dest: &Path) -> Result<(), InstallError> {
	info!("Downloading {url}.");
	let dest = dest.to_string_lossy();
	runner.run("curl", &["-fsSL", "--location", "-o", &dest, url])
}

pub fn text(runner: &dyn Runner, url: &str) -> Result<String, InstallError> {
	info!("Fetching {url}.");
	runner.output_string("curl", &["-fsSL", "--location", url])
}

pub fn bytes(runner: &dyn Runner, url: &str) -> Result<Vec<u8>, InstallError> {
	info!("Fetching {url}.");
	runner.output("curl", &["-fsSL", "--location", url])
}

pub fn extract(runner: &dyn Runner, archive: &Path, dir: &Path) -> Result<(), InstallError> {
	let archive = archive.to_string_lossy();
	let dir = dir.to_string_lossy();
	runner.run("tar", &["-C", &dir, "-xzf", &archive])
}

/// Downloads a gzip tarball into `scratch` and unpacks it into `dir`.
pub fn unpack(
	runner: &dyn Runner,
	url: &str,
	scratch: &Path,
	dir: &Path,
) -> Result<(), InstallError> {
	let name = url.rsplit('/').next().unwrap_or("archive.tar.gz");
	let archive = scratch.join(name);
	download(runner, url, &archive)?;
	extract(runner, &archive, dir)
}
