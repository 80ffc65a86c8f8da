use crate::error::InstallError;
use crate::input::InputProvider;
use crate::netaddr;
use std::{env, fs, net::Ipv4Addr, path::Path, process::Command};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
	Master,
	Worker,
}

/// Everything a phase needs to know about this run, gathered up front so the
/// apply sequence itself never blocks on the operator.
#[derive(Debug)]
pub struct RunContext {
	pub role: NodeRole,
	pub node_ip: Ipv4Addr,
	pub hostname: String,
	/// True when running inside a container; host preparation is skipped.
	pub nested: bool,
	/// Kubernetes package version, e.g. "1.23.6". None means repo default.
	pub kube_version: Option<String>,
	/// Worker only: the externally generated join command, executed verbatim.
	pub join_command: Option<String>,
	/// Master only: additional user to receive cluster credentials.
	pub extra_user: Option<String>,
}

pub fn gather(input: &mut dyn InputProvider) -> Result<RunContext, InstallError> {
	let hostname = resolve_hostname()?;
	let nested = detect_nested();
	if nested {
		info!("Container-nested execution detected, host preparation will be skipped.");
	}
	let node_ip = resolve_node_ip(input)?;
	let role = if input.confirm("Initialize this node as a new cluster master?")? {
		NodeRole::Master
	} else {
		NodeRole::Worker
	};
	let kube_version = optional(input.line("Kubernetes version (blank for repo default)")?);
	let join_command = match role {
		NodeRole::Master => None,
		NodeRole::Worker => {
			let cmd = input.line("Paste the kubeadm join command from the master")?;
			if cmd.is_empty() {
				return Err(InstallError::Input("A join command is required for a worker".to_owned()));
			}
			Some(cmd)
		}
	};
	let extra_user = match role {
		NodeRole::Master => optional(input.line("Additional user for kubectl access (blank to skip)")?),
		NodeRole::Worker => None,
	};
	info!("Run context: role {role:?}, address {node_ip}, host {hostname}.");
	Ok(RunContext {
		role,
		node_ip,
		hostname,
		nested,
		kube_version,
		join_command,
		extra_user,
	})
}

fn optional(txt: String) -> Option<String> {
	if txt.is_empty() {
		None
	} else {
		Some(txt)
	}
}

fn resolve_node_ip(input: &mut dyn InputProvider) -> Result<Ipv4Addr, InstallError> {
	if let Some(detected) = netaddr::detect() {
		if input.confirm(&format!("Use detected node address {detected}?"))? {
			return Ok(detected);
		}
	}
	manual_address(input)
}

fn manual_address(input: &mut dyn InputProvider) -> Result<Ipv4Addr, InstallError> {
	loop {
		let entry = input.line("Node IPv4 address")?;
		match entry.parse::<Ipv4Addr>() {
			Ok(addr) => return Ok(addr),
			Err(_) => info!("'{entry}' is not a valid IPv4 address."),
		}
	}
}

fn resolve_hostname() -> Result<String, InstallError> {
	let output = Command::new("hostname")
		.output()
		.map_err(|source| InstallError::CommandLaunch {
			cmd: "hostname".to_owned(),
			source,
		})?;
	Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

fn detect_nested() -> bool {
	if Path::new("/.dockerenv").exists() {
		return true;
	}
	fs::read_to_string("/proc/1/cgroup")
		.map(|cgroups| cgroup_indicates_container(&cgroups))
		.unwrap_or(false)
}

fn cgroup_indicates_container(cgroups: &str) -> bool {
	cgroups
		.lines()
		.any(|line| ["docker", "kubepods", "lxc", "containerd"].iter().any(|tag| line.contains(tag)))
}

/// The install mutates system state; anything but uid 0 is refused.
pub fn ensure_root() -> Result<(), InstallError> {
	let output = Command::new("id")
		.arg("-u")
		.output()
		.map_err(|source| InstallError::CommandLaunch {
			cmd: "id -u".to_owned(),
			source,
		})?;
	let uid = String::from_utf8_lossy(&output.stdout).trim().to_owned();
	if uid != "0" {
		return Err(InstallError::Config("this program must run as root".to_owned()));
	}
	Ok(())
}

/// The login that invoked us through sudo, falling back to root.
pub fn invoking_user() -> String {
	env::var("SUDO_USER").unwrap_or_else(|_| "root".to_owned())
}

pub fn home_of(user: &str) -> Result<String, InstallError> {
	if user == "root" {
		return Ok("/root".to_owned());
	}
	let output = Command::new("getent")
		.args(["passwd", user])
		.output()
		.map_err(|source| InstallError::CommandLaunch {
			cmd: format!("getent passwd {user}"),
			source,
		})?;
	let passwd = String::from_utf8_lossy(&output.stdout).trim().to_owned();
	passwd
		.split(':')
		.nth(5)
		.map(|home| home.to_owned())
		.filter(|home| !home.is_empty())
		.ok_or_else(|| InstallError::Config(format!("no home directory for user {user}")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::input::Scripted;

	#[test]
	fn cgroup_markers_flag_container_nesting() {
		assert!(cgroup_indicates_container("12:pids:/docker/abcdef\n"));
		assert!(cgroup_indicates_container("1:name=systemd:/kubepods/pod1\n"));
		assert!(!cgroup_indicates_container("1:name=systemd:/init.scope\n"));
	}

	#[test]
	fn manual_address_entry_rejects_garbage_then_accepts() {
		let mut input = Scripted::new(&["not-an-ip", "10.0.0.5"]);
		let addr = manual_address(&mut input).unwrap();
		assert_eq!(addr, Ipv4Addr::new(10, 0, 0, 5));
	}

	#[test]
	fn blank_version_means_repo_default() {
		assert_eq!(optional(String::new()), None);
		assert_eq!(optional("1.23.6".to_owned()), Some("1.23.6".to_owned()));
	}
}
