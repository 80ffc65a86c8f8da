use crate::context::RunContext;
use crate::error::InstallError;
use crate::setup::utils::cmd;
use crate::setup::SetupStep;
use std::{fs, path::Path, process::Command};
use tracing::info;

pub struct Selinux;

impl Selinux {
	pub const CONFIG_PATH: &str = "/etc/selinux/config";
}

impl SetupStep for Selinux {
	fn name(&self) -> &'static str {
		"Selinux"
	}

	fn check(&self, ctx: &RunContext) -> Result<bool, InstallError> {
		if ctx.nested {
			info!("Nested execution, SELinux left to the host.");
			return Ok(true);
		}
		if !Path::new(Selinux::CONFIG_PATH).exists() {
			info!("No SELinux config present, nothing to disable.");
			return Ok(true);
		}
		let enforcing = cmd::output("getenforce", &[])
			.map(|mode| mode.trim() == "Enforcing")
			.unwrap_or(false);
		if enforcing {
			info!("SELinux is currently enforcing.");
			return Ok(false);
		}
		let config_txt = fs::read_to_string(Selinux::CONFIG_PATH)?;
		let disabled = config_txt
			.lines()
			.any(|line| line.trim() == "SELINUX=disabled");
		if !disabled {
			info!("SELinux is not disabled in its config.");
		}
		Ok(disabled)
	}

	fn set(&self, _ctx: &RunContext) -> Result<(), InstallError> {
		info!("Disabling SELinux.");
		// Already-permissive systems report an error here; that is fine.
		let _ = Command::new("setenforce").arg("0").status();
		let original = fs::read_to_string(Selinux::CONFIG_PATH)?;
		let updated = disable_in_config(&original);
		if updated != original {
			fs::write(Selinux::CONFIG_PATH, updated)?;
		}
		info!("SELinux disabled for this and future boots.");
		Ok(())
	}
}

fn disable_in_config(config: &str) -> String {
	config
		.lines()
		.map(|line| {
			if line.trim_start().starts_with("SELINUX=") {
				"SELINUX=disabled"
			} else {
				line
			}
		})
		.collect::<Vec<_>>()
		.join("\n")
		+ "\n"
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn enforcing_mode_line_is_rewritten_in_place() {
		let config = "# comment\nSELINUX=enforcing\nSELINUXTYPE=targeted\n";
		let updated = disable_in_config(config);
		assert!(updated.contains("SELINUX=disabled\n"));
		assert!(updated.contains("SELINUXTYPE=targeted"));
		assert!(!updated.contains("SELINUX=enforcing"));
	}

	#[test]
	fn already_disabled_config_is_unchanged() {
		let config = "SELINUX=disabled\nSELINUXTYPE=targeted\n";
		assert_eq!(disable_in_config(config), config);
	}
}
