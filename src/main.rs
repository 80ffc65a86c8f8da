mod cleanup;
mod context;
mod error;
mod input;
mod logging;
mod netaddr;
mod setup;

use crate::context::NodeRole;
use crate::setup::utils::cmd;
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "kubeinit", version, about = "Kubernetes installer for CentOS hosts")]
struct Cli {
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
	/// Undo the installation: stop services, reset cluster state, restore repos.
	Cleanup,
}

fn main() -> Result<()> {
	logging::init();
	let cli = Cli::parse();
	if let Err(err) = context::ensure_root() {
		error!("{err}");
		std::process::exit(1);
	}
	let mut input = input::Terminal;
	match cli.command {
		Some(Command::Cleanup) => cleanup::run(&mut input)?,
		None => {
			info!("Cluster installation started.");
			let ctx = context::gather(&mut input)?;
			if let Err(err) = setup::run(&ctx) {
				error!("Installation failed: {err}");
				error!("Run 'kubeinit cleanup' to undo partial state before retrying.");
				std::process::exit(1);
			}
			report(&ctx);
			info!("Cluster installation finished successfully.");
		}
	}
	Ok(())
}

fn report(ctx: &context::RunContext) {
	match ctx.role {
		NodeRole::Master => {
			info!("Inspect the cluster with: kubectl get nodes");
			match cmd::output("kubeadm", &["token", "create", "--print-join-command"]) {
				Ok(join_command) => {
					info!("Join worker nodes with:\n{}", join_command.trim());
				}
				Err(err) => warn!("Could not mint a join command: {err}"),
			}
		}
		NodeRole::Worker => {
			info!("Verify this node from the master with: kubectl get nodes");
		}
	}
}
