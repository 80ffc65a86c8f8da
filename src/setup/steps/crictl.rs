use crate::context::RunContext;
use crate::error::InstallError;
use crate::setup::utils::{cmd, fingerprint};
use crate::setup::SetupStep;
use hex_literal::hex;
use std::{fs, path::Path};
use tracing::info;

pub struct Crictl;

impl Crictl {
	pub const VERSION: &str = "v1.24.2";
	pub const BIN_PATH: &str = "/usr/local/bin/crictl";
	pub const CONFIG_PATH: &str = "/etc/crictl.yaml";
	pub const CONFIG_TXT: &str = "runtime-endpoint: unix:///run/containerd/containerd.sock\n\
		image-endpoint: unix:///run/containerd/containerd.sock\n\
		timeout: 10\n\
		debug: false\n";
	const CONFIG_SHA256: [u8; 32] =
		hex!("d2725490e1fb2e6f565605f09871c1440371b85e04de5d70bbac05954d827f72");

	fn release_url() -> String {
		format!(
			"https://github.com/kubernetes-sigs/cri-tools/releases/download/{v}/crictl-{v}-linux-amd64.tar.gz",
			v = Crictl::VERSION,
		)
	}

	fn is_present() -> bool {
		which::which("crictl").is_ok() || Path::new(Crictl::BIN_PATH).exists()
	}
}

impl SetupStep for Crictl {
	fn name(&self) -> &'static str {
		"Crictl"
	}

	fn check(&self, _ctx: &RunContext) -> Result<bool, InstallError> {
		if !Crictl::is_present() {
			info!("crictl is not installed.");
			return Ok(false);
		}
		if !fingerprint::file_matches(Crictl::CONFIG_PATH, &Crictl::CONFIG_SHA256) {
			info!("crictl is not pointed at the containerd socket.");
			return Ok(false);
		}
		Ok(true)
	}

	fn set(&self, _ctx: &RunContext) -> Result<(), InstallError> {
		if !Crictl::is_present() {
			info!("Downloading crictl {}.", Crictl::VERSION);
			let staging = tempfile::tempdir()?;
			let tarball = staging.path().join("crictl.tar.gz");
			let tarball = tarball.to_string_lossy().into_owned();
			cmd::run("curl", &["-fsSL", "-o", &tarball, &Crictl::release_url()])?;
			cmd::run("tar", &["-xzf", &tarball, "-C", "/usr/local/bin"])?;
		}
		info!("Pointing crictl at the containerd socket.");
		fs::write(Crictl::CONFIG_PATH, Crictl::CONFIG_TXT)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::setup::steps::Containerd;

	#[test]
	fn crictl_config_fingerprint_matches_the_rendered_content() {
		assert_eq!(fingerprint::digest_of(Crictl::CONFIG_TXT), Crictl::CONFIG_SHA256);
	}

	#[test]
	fn crictl_talks_to_the_runtime_socket_with_a_ten_second_timeout() {
		assert!(Crictl::CONFIG_TXT.contains(Containerd::SOCKET));
		assert!(Crictl::CONFIG_TXT.contains("timeout: 10"));
	}

	#[test]
	fn release_url_is_pinned_to_one_version() {
		let url = Crictl::release_url();
		assert!(url.contains("/v1.24.2/crictl-v1.24.2-linux-amd64.tar.gz"));
	}
}
