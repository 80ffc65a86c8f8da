use crate::error::InstallError;
use crate::setup::utils::cmd;

pub const KUBECONFIG: &str = "/etc/kubernetes/admin.conf";

pub fn status(args: &[&str]) -> Result<(), InstallError> {
	let mut full = vec!["--kubeconfig", KUBECONFIG];
	full.extend_from_slice(args);
	cmd::run("kubectl", &full)
}

pub fn output(args: &[&str]) -> Result<String, InstallError> {
	let mut full = vec!["--kubeconfig", KUBECONFIG];
	full.extend_from_slice(args);
	cmd::output("kubectl", &full)
}

/// Quiet probe; false also covers an unreachable API server.
pub fn probe(args: &[&str]) -> bool {
	let mut full = vec!["--kubeconfig", KUBECONFIG];
	full.extend_from_slice(args);
	cmd::probe("kubectl", &full)
}

pub fn api_reachable() -> bool {
	probe(&["get", "--raw", "/healthz"])
}

pub fn is_daemonset_installed(name: &str, namespace: &str) -> bool {
	probe(&["get", "daemonset", name, "-n", namespace])
}

/// Any node in Ready state, per `kubectl get nodes --no-headers`.
pub fn any_node_ready() -> Result<bool, InstallError> {
	let listing = output(&["get", "nodes", "--no-headers"])?;
	Ok(parse_any_ready(&listing))
}

fn parse_any_ready(listing: &str) -> bool {
	listing
		.lines()
		.any(|line| line.split_whitespace().nth(1) == Some("Ready"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn node_listing_ready_states_are_recognized() {
		assert!(parse_any_ready("node-a   Ready    control-plane   5m   v1.23.6\n"));
		assert!(!parse_any_ready("node-a   NotReady   control-plane   5m   v1.23.6\n"));
		assert!(!parse_any_ready(""));
	}
}
