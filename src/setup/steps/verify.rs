use crate::context::{NodeRole, RunContext};
use crate::error::InstallError;
use crate::setup::utils::kubectl;
use crate::setup::SetupStep;
use std::{thread::sleep, time::Duration};
use tracing::{info, warn};

pub struct Verify;

impl Verify {
	pub const ATTEMPTS: u32 = 30;
	pub const INTERVAL: Duration = Duration::from_secs(10);
}

impl SetupStep for Verify {
	fn name(&self) -> &'static str {
		"Verify"
	}

	fn check(&self, ctx: &RunContext) -> Result<bool, InstallError> {
		match ctx.role {
			// A worker cannot see the API; readiness shows up on the master.
			NodeRole::Worker => Ok(true),
			NodeRole::Master => Ok(kubectl::any_node_ready().unwrap_or(false)),
		}
	}

	fn set(&self, _ctx: &RunContext) -> Result<(), InstallError> {
		info!("Waiting for a node to report Ready.");
		for attempt in 1..=Verify::ATTEMPTS {
			if kubectl::any_node_ready().unwrap_or(false) {
				info!("Node is Ready after {attempt} checks.");
				return Ok(());
			}
			sleep(Verify::INTERVAL);
		}
		warn!(
			"No node reported Ready within {} attempts; the pod network may still be starting.",
			Verify::ATTEMPTS
		);
		Ok(())
	}
}
