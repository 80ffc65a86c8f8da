use crate::context::RunContext;
use crate::error::InstallError;
use crate::setup::utils::{cmd, fingerprint};
use crate::setup::SetupStep;
use hex_literal::hex;
use std::{fs, path::Path};
use tracing::info;

pub struct KernelModules;

impl KernelModules {
	pub const CONFIG_PATH: &str = "/etc/modules-load.d/k8s.conf";
	pub const MODULES: &[&str] = &["overlay", "br_netfilter"];
	pub const CONFIG_TXT: &str = "overlay\nbr_netfilter\n";
	const CONFIG_SHA256: [u8; 32] =
		hex!("fcaf07413a456d658640930cef56ed4d13330123e3b522c481021613c64755e3");

	fn is_loaded(module_name: &str) -> bool {
		Path::new("/sys/module/").join(module_name).exists()
	}
}

impl SetupStep for KernelModules {
	fn name(&self) -> &'static str {
		"KernelModules"
	}

	fn check(&self, ctx: &RunContext) -> Result<bool, InstallError> {
		if ctx.nested {
			info!("Nested execution, kernel modules left to the host.");
			return Ok(true);
		}
		if !fingerprint::file_matches(KernelModules::CONFIG_PATH, &KernelModules::CONFIG_SHA256) {
			info!("Kernel module load list missing or unexpected.");
			return Ok(false);
		}
		for module in KernelModules::MODULES {
			if !KernelModules::is_loaded(module) {
				info!("Kernel module {module} is not loaded.");
				return Ok(false);
			}
		}
		Ok(true)
	}

	fn set(&self, _ctx: &RunContext) -> Result<(), InstallError> {
		info!("Writing kernel module load list.");
		fs::write(KernelModules::CONFIG_PATH, KernelModules::CONFIG_TXT)?;
		for &module in KernelModules::MODULES {
			info!("Loading kernel module {module}.");
			cmd::run("modprobe", &[module])?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn load_list_fingerprint_matches_the_rendered_content() {
		assert_eq!(
			fingerprint::digest_of(KernelModules::CONFIG_TXT),
			KernelModules::CONFIG_SHA256
		);
	}
}
