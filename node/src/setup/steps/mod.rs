pub mod containerd;
pub mod crictl;
pub mod disable_swap;
pub mod join;
pub mod kernel_modules;
pub mod kubes;
pub mod sysctl;

pub use containerd::Containerd;
pub use crictl::Crictl;
pub use disable_swap::DisableSwap;
pub use join::Join;
pub use kernel_modules::KernelModules;
pub use kubes::Kubes;
pub use sysctl::Sysctl;
