use crate::context;
use crate::error::InstallError;
use crate::input::InputProvider;
use crate::setup::steps::{Containerd, Crictl, KernelModules, KubeTools, Repos, Sysctl};
use crate::setup::utils::{cmd, pkg};
use std::{fs, path::Path};
use tracing::{info, warn};

const STATE_DIRS: &[&str] = &[
	"/etc/kubernetes",
	"/var/lib/kubelet",
	"/var/lib/etcd",
	"/etc/cni/net.d",
	"/var/lib/cni",
	"/etc/containerd",
];

const CONFIG_FILES: &[&str] = &[
	Crictl::CONFIG_PATH,
	KubeTools::SYSCONFIG_PATH,
	KernelModules::CONFIG_PATH,
	Sysctl::CONFIG_PATH,
];

/// Interfaces left behind by pod network add-ons.
const POD_NETWORK_LINKS: &[&str] = &["cni0", "flannel.1", "kube-ipvs0"];

const REMOVABLE_PACKAGES: &[&str] = &["kubelet", "kubeadm", "kubectl", "containerd.io"];

fn best_effort<T>(what: &str, result: Result<T, InstallError>) {
	if let Err(err) = result {
		warn!("{what} failed, continuing: {err}");
	}
}

/// Best-effort teardown of everything the install put in place. Nothing here
/// is fatal except a broken prompt; the goal is to get as close to a clean
/// host as possible.
pub fn run(input: &mut dyn InputProvider) -> Result<(), InstallError> {
	info!("Cleanup started.");
	best_effort(
		"Stopping kubelet",
		cmd::run("systemctl", &["stop", KubeTools::SERVICE_NAME]),
	);
	best_effort("Resetting cluster state", cmd::run("kubeadm", &["reset", "--force"]));
	best_effort(
		"Stopping containerd",
		cmd::run("systemctl", &["stop", Containerd::SERVICE_NAME]),
	);
	for dir in STATE_DIRS {
		if Path::new(dir).exists() {
			best_effort(dir, fs::remove_dir_all(dir).map_err(InstallError::from));
		}
	}
	for file in CONFIG_FILES {
		if Path::new(file).exists() {
			best_effort(file, fs::remove_file(file).map_err(InstallError::from));
		}
	}
	let user = context::invoking_user();
	if let Ok(home) = context::home_of(&user) {
		let kube_dir = format!("{home}/.kube");
		if Path::new(&kube_dir).exists() {
			best_effort(&kube_dir, fs::remove_dir_all(&kube_dir).map_err(InstallError::from));
		}
	}
	for link in POD_NETWORK_LINKS {
		if cmd::probe("ip", &["link", "show", link]) {
			best_effort(
				&format!("Deleting interface {link}"),
				cmd::run("ip", &["link", "delete", link]),
			);
		}
	}
	restore_repos();
	flush_firewall();
	if input.confirm("Remove the installed packages as well?")? {
		best_effort("Removing packages", pkg::remove(REMOVABLE_PACKAGES));
	}
	info!("Cleanup finished.");
	Ok(())
}

/// Put the pre-install repository definitions back, if we ever backed any up.
fn restore_repos() {
	let backup_dir = Path::new(Repos::BACKUP_DIR);
	if !backup_dir.exists() {
		info!("No repository backup found, leaving repositories as they are.");
		return;
	}
	info!("Restoring backed up repository definitions.");
	for path in [Repos::BASE_REPO_PATH, Repos::DOCKER_REPO_PATH, Repos::K8S_REPO_PATH] {
		if Path::new(path).exists() {
			best_effort(path, fs::remove_file(path).map_err(InstallError::from));
		}
	}
	best_effort("Restoring repository files", move_back(backup_dir));
	if backup_dir.exists() {
		best_effort(
			"Removing the backup directory",
			fs::remove_dir_all(backup_dir).map_err(InstallError::from),
		);
	}
}

fn move_back(backup_dir: &Path) -> Result<(), InstallError> {
	for entry in fs::read_dir(backup_dir)? {
		let path = entry?.path();
		if let Some(file_name) = path.file_name() {
			fs::rename(&path, Path::new(Repos::REPO_DIR).join(file_name))?;
		}
	}
	Ok(())
}

fn flush_firewall() {
	info!("Flushing firewall rules to accept-all.");
	for args in [
		["-F"].as_slice(),
		["-t", "nat", "-F"].as_slice(),
		["-t", "mangle", "-F"].as_slice(),
		["-X"].as_slice(),
	] {
		best_effort("Flushing iptables", cmd::run("iptables", args));
	}
}
