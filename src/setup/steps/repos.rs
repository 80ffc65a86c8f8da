use crate::context::RunContext;
use crate::error::InstallError;
use crate::setup::utils::pkg;
use crate::setup::SetupStep;
use std::{fs, path::Path};
use tracing::{info, warn};

pub struct Repos;

impl Repos {
	pub const REPO_DIR: &str = "/etc/yum.repos.d";
	/// Originals are moved here exactly once so cleanup can restore them.
	pub const BACKUP_DIR: &str = "/etc/yum.repos.d/kubeinit-backup";
	pub const MIRROR_HOST: &str = "mirrors.aliyun.com";
	pub const BASE_REPO_PATH: &str = "/etc/yum.repos.d/CentOS-Base.repo";
	pub const DOCKER_REPO_PATH: &str = "/etc/yum.repos.d/docker-ce.repo";
	pub const K8S_REPO_PATH: &str = "/etc/yum.repos.d/kubernetes.repo";

	pub const BASE_REPO_TXT: &str = "[base]\n\
		name=CentOS-$releasever - Base - Aliyun\n\
		baseurl=https://mirrors.aliyun.com/centos/$releasever/os/$basearch/\n\
		gpgcheck=1\n\
		gpgkey=https://mirrors.aliyun.com/centos/RPM-GPG-KEY-CentOS-7\n\
		\n\
		[updates]\n\
		name=CentOS-$releasever - Updates - Aliyun\n\
		baseurl=https://mirrors.aliyun.com/centos/$releasever/updates/$basearch/\n\
		gpgcheck=1\n\
		gpgkey=https://mirrors.aliyun.com/centos/RPM-GPG-KEY-CentOS-7\n\
		\n\
		[extras]\n\
		name=CentOS-$releasever - Extras - Aliyun\n\
		baseurl=https://mirrors.aliyun.com/centos/$releasever/extras/$basearch/\n\
		gpgcheck=1\n\
		gpgkey=https://mirrors.aliyun.com/centos/RPM-GPG-KEY-CentOS-7\n";

	pub const DOCKER_REPO_TXT: &str = "[docker-ce-stable]\n\
		name=Docker CE Stable - Aliyun\n\
		baseurl=https://mirrors.aliyun.com/docker-ce/linux/centos/$releasever/$basearch/stable\n\
		enabled=1\n\
		gpgcheck=1\n\
		gpgkey=https://mirrors.aliyun.com/docker-ce/linux/centos/gpg\n";

	pub const K8S_REPO_TXT: &str = "[kubernetes]\n\
		name=Kubernetes - Aliyun\n\
		baseurl=https://mirrors.aliyun.com/kubernetes/yum/repos/kubernetes-el7-x86_64/\n\
		enabled=1\n\
		gpgcheck=0\n\
		repo_gpgcheck=0\n";

	fn points_at_mirror(path: &str) -> bool {
		fs::read_to_string(path)
			.map(|txt| txt.contains(Repos::MIRROR_HOST))
			.unwrap_or(false)
	}

	fn backup_originals_once() -> Result<(), InstallError> {
		let backup_dir = Path::new(Repos::BACKUP_DIR);
		if backup_dir.exists() {
			info!("Repository backup already exists, leaving it untouched.");
			return Ok(());
		}
		info!("Backing up existing repository definitions.");
		fs::create_dir_all(backup_dir)?;
		for entry in fs::read_dir(Repos::REPO_DIR)? {
			let path = entry?.path();
			if path.extension().is_some_and(|ext| ext == "repo") {
				if let Some(file_name) = path.file_name() {
					fs::rename(&path, backup_dir.join(file_name))?;
				}
			}
		}
		Ok(())
	}
}

impl SetupStep for Repos {
	fn name(&self) -> &'static str {
		"Repos"
	}

	fn check(&self, _ctx: &RunContext) -> Result<bool, InstallError> {
		let all_mirrored = [Repos::BASE_REPO_PATH, Repos::DOCKER_REPO_PATH, Repos::K8S_REPO_PATH]
			.iter()
			.all(|path| Repos::points_at_mirror(path));
		if !all_mirrored {
			info!("Package repositories are not yet pointed at the regional mirrors.");
		}
		Ok(all_mirrored)
	}

	fn set(&self, _ctx: &RunContext) -> Result<(), InstallError> {
		Repos::backup_originals_once()?;
		info!("Writing regional mirror repository definitions.");
		fs::write(Repos::BASE_REPO_PATH, Repos::BASE_REPO_TXT)?;
		fs::write(Repos::DOCKER_REPO_PATH, Repos::DOCKER_REPO_TXT)?;
		fs::write(Repos::K8S_REPO_PATH, Repos::K8S_REPO_TXT)?;
		if let Err(err) = pkg::refresh_cache() {
			warn!("Package cache refresh failed, continuing: {err}");
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_rendered_repo_points_at_the_mirror_host() {
		for txt in [Repos::BASE_REPO_TXT, Repos::DOCKER_REPO_TXT, Repos::K8S_REPO_TXT] {
			assert!(txt.contains(Repos::MIRROR_HOST));
		}
	}

	#[test]
	fn kubernetes_repo_targets_the_el7_tree() {
		assert!(Repos::K8S_REPO_TXT.contains("kubernetes-el7-x86_64"));
		assert!(Repos::K8S_REPO_TXT.contains("[kubernetes]"));
	}
}
