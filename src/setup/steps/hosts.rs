use crate::context::RunContext;
use crate::error::InstallError;
use crate::setup::utils::hostsfile;
use crate::setup::SetupStep;
use std::fs;
use tracing::info;

pub struct Hosts;

impl SetupStep for Hosts {
	fn name(&self) -> &'static str {
		"Hosts"
	}

	fn check(&self, ctx: &RunContext) -> Result<bool, InstallError> {
		let content = fs::read_to_string(hostsfile::HOSTS_PATH)?;
		let mapped = hostsfile::has_mapping(&content, &ctx.node_ip.to_string(), &ctx.hostname);
		if !mapped {
			info!("Hosts file does not map {} to {}.", ctx.node_ip, ctx.hostname);
		}
		Ok(mapped)
	}

	fn set(&self, ctx: &RunContext) -> Result<(), InstallError> {
		info!("Mapping {} to {} in the hosts file.", ctx.node_ip, ctx.hostname);
		hostsfile::apply(&ctx.node_ip.to_string(), &ctx.hostname)
	}
}
