use crate::context::RunContext;
use crate::error::InstallError;
use crate::setup::utils::{cmd, fingerprint};
use crate::setup::SetupStep;
use hex_literal::hex;
use std::fs;
use tracing::info;

pub struct Sysctl;

impl Sysctl {
	pub const CONFIG_PATH: &str = "/etc/sysctl.d/k8s.conf";
	pub const CONFIG_TXT: &str = "net.bridge.bridge-nf-call-iptables = 1\n\
		net.bridge.bridge-nf-call-ip6tables = 1\n\
		net.ipv4.ip_forward = 1\n";
	const CONFIG_SHA256: [u8; 32] =
		hex!("6e3f751b8409493b80fb7154ee21989dece3322d8b9018157ffef64dfbc10799");
}

impl SetupStep for Sysctl {
	fn name(&self) -> &'static str {
		"Sysctl"
	}

	fn check(&self, ctx: &RunContext) -> Result<bool, InstallError> {
		if ctx.nested {
			info!("Nested execution, sysctls left to the host.");
			return Ok(true);
		}
		if !fingerprint::file_matches(Sysctl::CONFIG_PATH, &Sysctl::CONFIG_SHA256) {
			info!("Bridge/forwarding sysctl config missing or unexpected.");
			return Ok(false);
		}
		Ok(true)
	}

	fn set(&self, _ctx: &RunContext) -> Result<(), InstallError> {
		info!("Writing bridge and forwarding sysctls.");
		fs::write(Sysctl::CONFIG_PATH, Sysctl::CONFIG_TXT)?;
		cmd::run("sysctl", &["--system"])?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sysctl_fingerprint_matches_the_rendered_content() {
		assert_eq!(fingerprint::digest_of(Sysctl::CONFIG_TXT), Sysctl::CONFIG_SHA256);
	}
}
