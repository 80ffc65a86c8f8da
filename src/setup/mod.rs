pub mod steps;
pub mod utils;

use crate::context::RunContext;
use crate::error::InstallError;
use crate::setup::steps::{
	BasePackages, Cluster, Containerd, Crictl, DisableSwap, Hosts, KernelModules, KubeTools,
	Repos, Selinux, Sysctl, Verify,
};
use tracing::{info, warn};

pub trait SetupStep {
	fn name(&self) -> &'static str;
	/// Probe live system state; true means the phase is already satisfied.
	fn check(&self, ctx: &RunContext) -> Result<bool, InstallError>;
	/// Apply the phase.
	fn set(&self, ctx: &RunContext) -> Result<(), InstallError>;
}

/// A Hard failure aborts the run; a Soft failure is logged and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
	Hard,
	Soft,
}

/// The severity policy, in execution order. Reviewed here rather than decided
/// inside each phase.
const PHASES: &[(&dyn SetupStep, Severity)] = &[
	(&Selinux, Severity::Soft),
	(&DisableSwap, Severity::Soft),
	(&KernelModules, Severity::Soft),
	(&Sysctl, Severity::Soft),
	(&Repos, Severity::Hard),
	(&BasePackages, Severity::Soft),
	(&Containerd, Severity::Hard),
	(&Crictl, Severity::Hard),
	(&KubeTools, Severity::Hard),
	(&Hosts, Severity::Soft),
	(&Cluster, Severity::Hard),
	(&Verify, Severity::Soft),
];

pub fn run(ctx: &RunContext) -> Result<(), InstallError> {
	run_phases(PHASES, ctx)
}

fn run_phases(
	phases: &[(&dyn SetupStep, Severity)],
	ctx: &RunContext,
) -> Result<(), InstallError> {
	for (step, severity) in phases {
		match step.check(ctx) {
			Ok(true) => {
				info!("Phase {} is already satisfied, skipping.", step.name());
				continue;
			}
			Ok(false) => {}
			Err(err) => match severity {
				Severity::Hard => return Err(err),
				Severity::Soft => {
					warn!("Phase {} probe failed, skipping: {err}", step.name());
					continue;
				}
			},
		}
		info!("Applying phase {}.", step.name());
		if let Err(err) = step.set(ctx) {
			match severity {
				Severity::Hard => return Err(err),
				Severity::Soft => {
					warn!("Phase {} failed, continuing: {err}", step.name());
					continue;
				}
			}
		}
		// Verification probe; a mismatch is never fatal on its own since some
		// phases legitimately settle late (service restarts, API warm-up).
		if !step.check(ctx).unwrap_or(false) {
			warn!("Phase {} still reports unsatisfied after apply.", step.name());
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::{NodeRole, RunContext};
	use std::cell::Cell;
	use std::net::Ipv4Addr;

	fn test_ctx() -> RunContext {
		RunContext {
			role: NodeRole::Master,
			node_ip: Ipv4Addr::new(10, 0, 0, 5),
			hostname: "node-a".to_owned(),
			nested: false,
			kube_version: None,
			join_command: None,
			extra_user: None,
		}
	}

	struct Stub {
		satisfied: bool,
		fails: bool,
		applied: Cell<u32>,
	}

	impl Stub {
		fn new(satisfied: bool, fails: bool) -> Self {
			Stub {
				satisfied,
				fails,
				applied: Cell::new(0),
			}
		}
	}

	impl SetupStep for Stub {
		fn name(&self) -> &'static str {
			"Stub"
		}

		fn check(&self, _ctx: &RunContext) -> Result<bool, InstallError> {
			Ok(self.satisfied || self.applied.get() > 0)
		}

		fn set(&self, _ctx: &RunContext) -> Result<(), InstallError> {
			if self.fails {
				return Err(InstallError::Config("stub failure".to_owned()));
			}
			self.applied.set(self.applied.get() + 1);
			Ok(())
		}
	}

	#[test]
	fn satisfied_phases_are_not_reapplied() {
		let done = Stub::new(true, false);
		let pending = Stub::new(false, false);
		let phases: &[(&dyn SetupStep, Severity)] =
			&[(&done, Severity::Hard), (&pending, Severity::Hard)];
		run_phases(phases, &test_ctx()).unwrap();
		assert_eq!(done.applied.get(), 0);
		assert_eq!(pending.applied.get(), 1);
	}

	#[test]
	fn soft_failure_continues_to_later_phases() {
		let broken = Stub::new(false, true);
		let after = Stub::new(false, false);
		let phases: &[(&dyn SetupStep, Severity)] =
			&[(&broken, Severity::Soft), (&after, Severity::Hard)];
		run_phases(phases, &test_ctx()).unwrap();
		assert_eq!(after.applied.get(), 1);
	}

	#[test]
	fn hard_failure_aborts_the_run() {
		let broken = Stub::new(false, true);
		let after = Stub::new(false, false);
		let phases: &[(&dyn SetupStep, Severity)] =
			&[(&broken, Severity::Hard), (&after, Severity::Hard)];
		assert!(run_phases(phases, &test_ctx()).is_err());
		assert_eq!(after.applied.get(), 0);
	}
}
