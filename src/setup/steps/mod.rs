pub mod base_packages;
pub mod cluster;
pub mod containerd;
pub mod crictl;
pub mod disable_swap;
pub mod hosts;
pub mod kernel_modules;
pub mod kubetools;
pub mod repos;
pub mod selinux;
pub mod sysctl;
pub mod verify;

pub use base_packages::BasePackages;
pub use cluster::Cluster;
pub use containerd::Containerd;
pub use crictl::Crictl;
pub use disable_swap::DisableSwap;
pub use hosts::Hosts;
pub use kernel_modules::KernelModules;
pub use kubetools::KubeTools;
pub use repos::Repos;
pub use selinux::Selinux;
pub use sysctl::Sysctl;
pub use verify::Verify;
