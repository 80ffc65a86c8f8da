use crate::context::RunContext;
use crate::error::InstallError;
use crate::setup::utils::pkg;
use crate::setup::SetupStep;
use tracing::{info, warn};

pub struct BasePackages;

impl BasePackages {
	/// Installed in small batches so one broken package does not sink the
	/// rest; a failed batch is logged and skipped.
	pub const BATCHES: &[&[&str]] = &[
		&["conntrack-tools", "socat", "ebtables", "ethtool"],
		&["ipset", "ipvsadm"],
		&["curl", "wget", "tar"],
	];
}

impl SetupStep for BasePackages {
	fn name(&self) -> &'static str {
		"BasePackages"
	}

	fn check(&self, _ctx: &RunContext) -> Result<bool, InstallError> {
		for batch in BasePackages::BATCHES {
			for package_name in *batch {
				if !pkg::is_installed(package_name) {
					info!("Utility package {package_name} is not installed.");
					return Ok(false);
				}
			}
		}
		Ok(true)
	}

	fn set(&self, _ctx: &RunContext) -> Result<(), InstallError> {
		for batch in BasePackages::BATCHES {
			let missing = batch
				.iter()
				.copied()
				.filter(|name| !pkg::is_installed(name))
				.collect::<Vec<&str>>();
			if missing.is_empty() {
				continue;
			}
			info!("Installing utility packages: {}.", missing.join(", "));
			if let Err(err) = pkg::install(&missing) {
				warn!("Batch {} failed, skipping: {err}", missing.join(", "));
			}
		}
		Ok(())
	}
}
