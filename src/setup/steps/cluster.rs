use crate::context::{self, NodeRole, RunContext};
use crate::error::InstallError;
use crate::setup::steps::Containerd;
use crate::setup::utils::{cmd, kubectl};
use crate::setup::SetupStep;
use std::{fs, net::Ipv4Addr, path::Path};
use tracing::{info, warn};

pub struct Cluster;

impl Cluster {
	pub const CONTROL_PLANE_PORT: u16 = 6443;
	pub const POD_SUBNET: &str = "10.244.0.0/16";
	pub const SERVICE_SUBNET: &str = "10.96.0.0/12";
	pub const IMAGE_REPOSITORY: &str = "registry.aliyuncs.com/google_containers";
	pub const ADMIN_CONF: &str = "/etc/kubernetes/admin.conf";
	pub const KUBELET_CONF: &str = "/etc/kubernetes/kubelet.conf";
	pub const FLANNEL_MANIFEST_URL: &str =
		"https://raw.githubusercontent.com/flannel-io/flannel/master/Documentation/kube-flannel.yml";
	pub const FLANNEL_DAEMONSET: &str = "kube-flannel-ds";
	pub const FLANNEL_NAMESPACE: &str = "kube-flannel";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BootstrapState {
	Uninitialized,
	Healthy,
	Unhealthy,
}

fn probe_state() -> BootstrapState {
	if !Path::new(Cluster::ADMIN_CONF).exists() {
		return BootstrapState::Uninitialized;
	}
	if cmd::service_active("kubelet") && kubectl::api_reachable() {
		BootstrapState::Healthy
	} else {
		BootstrapState::Unhealthy
	}
}

/// The kubeadm bootstrap descriptor: advertise address, CRI socket, subnets,
/// and the regional image mirror.
fn render_bootstrap_config(node_ip: Ipv4Addr, hostname: &str, version: Option<&str>) -> String {
	let version_line = version
		.map(|v| format!("kubernetesVersion: v{}\n", v.trim_start_matches('v')))
		.unwrap_or_default();
	format!(
		"apiVersion: kubeadm.k8s.io/v1beta3\n\
		kind: InitConfiguration\n\
		localAPIEndpoint:\n\
		\x20 advertiseAddress: {node_ip}\n\
		\x20 bindPort: {port}\n\
		nodeRegistration:\n\
		\x20 name: {hostname}\n\
		\x20 criSocket: {socket}\n\
		---\n\
		apiVersion: kubeadm.k8s.io/v1beta3\n\
		kind: ClusterConfiguration\n\
		imageRepository: {mirror}\n\
		{version_line}\
		networking:\n\
		\x20 podSubnet: {pod}\n\
		\x20 serviceSubnet: {service}\n\
		---\n\
		apiVersion: kubelet.config.k8s.io/v1beta1\n\
		kind: KubeletConfiguration\n\
		cgroupDriver: systemd\n",
		port = Cluster::CONTROL_PLANE_PORT,
		socket = Containerd::SOCKET,
		mirror = Cluster::IMAGE_REPOSITORY,
		pod = Cluster::POD_SUBNET,
		service = Cluster::SERVICE_SUBNET,
	)
}

fn init_cluster(ctx: &RunContext) -> Result<(), InstallError> {
	let staging = tempfile::tempdir()?;
	let config_path = staging.path().join("kubeadm-config.yaml");
	fs::write(
		&config_path,
		render_bootstrap_config(ctx.node_ip, &ctx.hostname, ctx.kube_version.as_deref()),
	)?;
	let config_path = config_path.to_string_lossy().into_owned();
	info!("Pre-pulling control plane images.");
	if let Err(err) = cmd::run("kubeadm", &["config", "images", "pull", "--config", &config_path]) {
		warn!("Image pre-pull failed, kubeadm init will pull on demand: {err}");
	}
	info!("Initializing the cluster with kubeadm.");
	cmd::run("kubeadm", &["init", "--config", &config_path])?;
	info!("Cluster initialized.");
	Ok(())
}

fn credentials_path(user: &str) -> Result<String, InstallError> {
	Ok(format!("{}/.kube/config", context::home_of(user)?))
}

fn install_credentials(user: &str) -> Result<(), InstallError> {
	let home = context::home_of(user)?;
	cmd::shell(&format!(
		"mkdir -p {home}/.kube && \
		cp -f {conf} {home}/.kube/config && \
		chown {user}:{user} {home}/.kube/config",
		conf = Cluster::ADMIN_CONF,
	))?;
	info!("Cluster credentials installed for {user}.");
	Ok(())
}

fn ensure_pod_network() {
	if kubectl::is_daemonset_installed(Cluster::FLANNEL_DAEMONSET, Cluster::FLANNEL_NAMESPACE) {
		info!("Pod network add-on is already installed.");
		return;
	}
	info!("Installing the flannel pod network add-on.");
	if let Err(err) = kubectl::status(&["apply", "-f", Cluster::FLANNEL_MANIFEST_URL]) {
		warn!("Pod network installation failed, install it manually later: {err}");
	}
}

impl SetupStep for Cluster {
	fn name(&self) -> &'static str {
		"Cluster"
	}

	fn check(&self, ctx: &RunContext) -> Result<bool, InstallError> {
		match ctx.role {
			NodeRole::Worker => {
				let joined = Path::new(Cluster::KUBELET_CONF).exists()
					&& cmd::service_active("kubelet");
				if joined {
					info!("This node has already joined a cluster.");
				}
				Ok(joined)
			}
			NodeRole::Master => {
				if probe_state() != BootstrapState::Healthy {
					info!("Control plane is not initialized and healthy.");
					return Ok(false);
				}
				if !kubectl::is_daemonset_installed(
					Cluster::FLANNEL_DAEMONSET,
					Cluster::FLANNEL_NAMESPACE,
				) {
					info!("Pod network add-on is missing.");
					return Ok(false);
				}
				let user = context::invoking_user();
				if !Path::new(&credentials_path(&user)?).exists() {
					info!("Cluster credentials for {user} are missing.");
					return Ok(false);
				}
				Ok(true)
			}
		}
	}

	fn set(&self, ctx: &RunContext) -> Result<(), InstallError> {
		match ctx.role {
			NodeRole::Worker => {
				let join_command = ctx
					.join_command
					.as_deref()
					.ok_or_else(|| InstallError::Config("no join command provided".to_owned()))?;
				info!("Joining the cluster.");
				cmd::run("bash", &["-c", join_command])?;
				info!("This node has joined the cluster.");
				Ok(())
			}
			NodeRole::Master => {
				match probe_state() {
					BootstrapState::Healthy => {
						info!("Control plane is already healthy, skipping init.");
					}
					BootstrapState::Unhealthy => {
						warn!("Stale cluster state found, resetting before init.");
						cmd::run("kubeadm", &["reset", "--force"])?;
						init_cluster(ctx)?;
					}
					BootstrapState::Uninitialized => init_cluster(ctx)?,
				}
				install_credentials(&context::invoking_user())?;
				if let Some(extra_user) = &ctx.extra_user {
					if let Err(err) = install_credentials(extra_user) {
						warn!("Could not install credentials for {extra_user}: {err}");
					}
				}
				ensure_pod_network();
				Ok(())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bootstrap_descriptor_carries_address_and_subnets() {
		let config = render_bootstrap_config(Ipv4Addr::new(10, 0, 0, 5), "node-a", None);
		assert!(config.contains("advertiseAddress: 10.0.0.5"));
		assert!(config.contains("podSubnet: 10.244.0.0/16"));
		assert!(config.contains("serviceSubnet: 10.96.0.0/12"));
		assert!(config.contains("name: node-a"));
		assert!(config.contains(&format!("criSocket: {}", Containerd::SOCKET)));
		assert!(config.contains(&format!("imageRepository: {}", Cluster::IMAGE_REPOSITORY)));
		assert!(!config.contains("kubernetesVersion"));
	}

	#[test]
	fn bootstrap_descriptor_pins_the_requested_version() {
		let config = render_bootstrap_config(Ipv4Addr::new(10, 0, 0, 5), "node-a", Some("1.23.6"));
		assert!(config.contains("kubernetesVersion: v1.23.6\n"));
	}

	#[test]
	fn descriptor_yaml_indentation_survives_rendering() {
		let config = render_bootstrap_config(Ipv4Addr::new(10, 0, 0, 5), "node-a", None);
		assert!(config.contains("localAPIEndpoint:\n  advertiseAddress: 10.0.0.5\n  bindPort: 6443\n"));
	}
}
