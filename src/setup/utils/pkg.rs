use crate::error::InstallError;
use crate::setup::utils::cmd;

pub enum PkgManager {
	Yum,
}

fn get_pkg_manager() -> PkgManager {
	PkgManager::Yum
}

pub fn is_installed(package_name: &str) -> bool {
	match get_pkg_manager() {
		PkgManager::Yum => cmd::probe("rpm", &["-q", package_name]),
	}
}

pub fn install(package_names: &[&str]) -> Result<(), InstallError> {
	match get_pkg_manager() {
		PkgManager::Yum => {
			let mut args = vec!["install", "-y"];
			args.extend_from_slice(package_names);
			cmd::run("yum", &args)
		}
	}
}

pub fn remove(package_names: &[&str]) -> Result<(), InstallError> {
	match get_pkg_manager() {
		PkgManager::Yum => {
			let mut args = vec!["remove", "-y"];
			args.extend_from_slice(package_names);
			cmd::run("yum", &args)
		}
	}
}

pub fn refresh_cache() -> Result<(), InstallError> {
	match get_pkg_manager() {
		PkgManager::Yum => cmd::run("yum", &["makecache", "fast"]),
	}
}
