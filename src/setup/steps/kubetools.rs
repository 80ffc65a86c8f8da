use crate::context::RunContext;
use crate::error::InstallError;
use crate::setup::utils::{cmd, fingerprint, pkg};
use crate::setup::SetupStep;
use hex_literal::hex;
use std::fs;
use tracing::info;

pub struct KubeTools;

impl KubeTools {
	pub const PACKAGE_NAMES: &[&str] = &["kubelet", "kubeadm", "kubectl"];
	pub const SERVICE_NAME: &str = "kubelet";
	pub const SYSCONFIG_PATH: &str = "/etc/sysconfig/kubelet";
	pub const SYSCONFIG_TXT: &str = "KUBELET_EXTRA_ARGS=\"--cgroup-driver=systemd \
--container-runtime-endpoint=unix:///run/containerd/containerd.sock\"\n";
	const SYSCONFIG_SHA256: [u8; 32] =
		hex!("7cab9725a66abb4bdc8bdc7d5d9b69626e68f734ed9e49327d182d6f968a6695");
}

/// Yum package spec, optionally pinned: "kubelet" or "kubelet-1.23.6".
fn versioned(package_name: &str, version: Option<&str>) -> String {
	match version {
		Some(version) => format!("{package_name}-{}", version.trim_start_matches('v')),
		None => package_name.to_owned(),
	}
}

impl SetupStep for KubeTools {
	fn name(&self) -> &'static str {
		"KubeTools"
	}

	fn check(&self, _ctx: &RunContext) -> Result<bool, InstallError> {
		for package_name in KubeTools::PACKAGE_NAMES {
			if !pkg::is_installed(package_name) {
				info!("{package_name} is not installed.");
				return Ok(false);
			}
		}
		if !fingerprint::file_matches(KubeTools::SYSCONFIG_PATH, &KubeTools::SYSCONFIG_SHA256) {
			info!("Kubelet sysconfig missing or unexpected.");
			return Ok(false);
		}
		if !cmd::service_enabled(KubeTools::SERVICE_NAME) {
			info!("Kubelet service is not enabled.");
			return Ok(false);
		}
		Ok(true)
	}

	fn set(&self, ctx: &RunContext) -> Result<(), InstallError> {
		let missing = KubeTools::PACKAGE_NAMES
			.iter()
			.filter(|name| !pkg::is_installed(name))
			.map(|name| versioned(name, ctx.kube_version.as_deref()))
			.collect::<Vec<String>>();
		if !missing.is_empty() {
			info!("Installing Kubernetes tooling: {}.", missing.join(", "));
			let specs = missing.iter().map(String::as_str).collect::<Vec<&str>>();
			pkg::install(&specs)?;
		}
		info!("Pointing kubelet at containerd with the systemd cgroup driver.");
		fs::write(KubeTools::SYSCONFIG_PATH, KubeTools::SYSCONFIG_TXT)?;
		cmd::run("systemctl", &["enable", KubeTools::SERVICE_NAME])?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::setup::steps::Containerd;

	#[test]
	fn sysconfig_fingerprint_matches_the_rendered_content() {
		assert_eq!(
			fingerprint::digest_of(KubeTools::SYSCONFIG_TXT),
			KubeTools::SYSCONFIG_SHA256
		);
	}

	#[test]
	fn sysconfig_carries_cgroup_driver_and_runtime_socket() {
		assert!(KubeTools::SYSCONFIG_TXT.contains("--cgroup-driver=systemd"));
		assert!(KubeTools::SYSCONFIG_TXT.contains(Containerd::SOCKET));
	}

	#[test]
	fn version_pin_is_applied_and_v_prefix_stripped() {
		assert_eq!(versioned("kubelet", None), "kubelet");
		assert_eq!(versioned("kubelet", Some("1.23.6")), "kubelet-1.23.6");
		assert_eq!(versioned("kubeadm", Some("v1.23.6")), "kubeadm-1.23.6");
	}
}
