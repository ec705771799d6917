use crate::error::InstallError;
use std::{ffi::CStr, io, mem::MaybeUninit};

/// Facts about the host needed before any step may run.
pub trait HostFacts {
	fn machine(&self) -> Result<String, InstallError>;
	fn effective_uid(&self) -> u32;
	fn has_program(&self, name: &str) -> bool;
}

pub struct LocalHost;

impl HostFacts for LocalHost {
	fn machine(&self) -> Result<String, InstallError> {
		let mut uts = MaybeUninit::<libc::utsname>::zeroed();
		// SAFETY: uname only writes into the provided buffer.
		if unsafe { libc::uname(uts.as_mut_ptr()) } != 0 {
			return Err(io::Error::last_os_error().into());
		}
		// SAFETY: uname succeeded, so the struct is initialised and machine is NUL terminated.
		let uts = unsafe { uts.assume_init() };
		let machine = unsafe { CStr::from_ptr(uts.machine.as_ptr()) };
		Ok(machine.to_string_lossy().trim().to_owned())
	}

	fn effective_uid(&self) -> u32 {
		// SAFETY: geteuid has no preconditions and cannot fail.
		unsafe { libc::geteuid() }
	}

	fn has_program(&self, name: &str) -> bool {
		which::which(name).is_ok()
	}
}
