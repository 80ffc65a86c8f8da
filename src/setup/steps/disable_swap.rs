use crate::context::RunContext;
use crate::error::InstallError;
use crate::setup::utils::cmd;
use crate::setup::SetupStep;
use std::fs;
use tracing::info;

pub struct DisableSwap;

impl DisableSwap {
	pub const FSTAB_PATH: &str = "/etc/fstab";
}

impl SetupStep for DisableSwap {
	fn name(&self) -> &'static str {
		"DisableSwap"
	}

	fn check(&self, ctx: &RunContext) -> Result<bool, InstallError> {
		if ctx.nested {
			info!("Nested execution, swap left to the host.");
			return Ok(true);
		}
		let is_swap_on = fs::read_to_string("/proc/swaps")?.lines().count() > 1;
		if is_swap_on {
			info!("Swap is enabled.");
			return Ok(false);
		}
		let Ok(config_txt) = fs::read_to_string(DisableSwap::FSTAB_PATH) else {
			info!("fstab is missing or unreadable.");
			return Ok(false);
		};
		if has_swap_entry(&config_txt) {
			info!("Swap is enabled in fstab.");
			return Ok(false);
		}
		Ok(true)
	}

	fn set(&self, _ctx: &RunContext) -> Result<(), InstallError> {
		cmd::run("swapoff", &["-a"])?;
		let original = fs::read_to_string(DisableSwap::FSTAB_PATH)?;
		let updated = comment_swap_entries(&original);
		if updated != original {
			info!("Commenting swap entries out of fstab.");
			fs::write(DisableSwap::FSTAB_PATH, updated)?;
		}
		Ok(())
	}
}

fn is_swap_line(line: &str) -> bool {
	!line.trim_start().starts_with('#')
		&& line.split_whitespace().nth(2).is_some_and(|fs_type| fs_type == "swap")
}

fn has_swap_entry(fstab: &str) -> bool {
	fstab.lines().any(is_swap_line)
}

/// Swap entries are commented out rather than deleted, so the operator can
/// restore them by hand after a cleanup.
fn comment_swap_entries(fstab: &str) -> String {
	let updated = fstab
		.lines()
		.map(|line| {
			if is_swap_line(line) {
				format!("#{line}")
			} else {
				line.to_owned()
			}
		})
		.collect::<Vec<_>>()
		.join("\n");
	if fstab.ends_with('\n') {
		updated + "\n"
	} else {
		updated
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn swap_lines_are_commented_out_and_others_kept() {
		let fstab = "/dev/sda1 / ext4 defaults 0 1\n/dev/sda2 swap swap defaults 0 0\n";
		let updated = comment_swap_entries(fstab);
		assert!(updated.contains("#/dev/sda2 swap swap defaults 0 0"));
		assert!(updated.contains("/dev/sda1 / ext4 defaults 0 1"));
		assert!(!has_swap_entry(&updated));
	}

	#[test]
	fn commented_swap_lines_do_not_count_as_entries() {
		assert!(!has_swap_entry("#/dev/sda2 swap swap defaults 0 0\n"));
		assert!(has_swap_entry("/dev/sda2 swap swap defaults 0 0\n"));
	}
}
