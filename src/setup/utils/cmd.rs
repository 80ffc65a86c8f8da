use crate::error::InstallError;
use std::process::{Command, Stdio};

fn display(program: &str, args: &[&str]) -> String {
	if args.is_empty() {
		program.to_owned()
	} else {
		format!("{program} {}", args.join(" "))
	}
}

/// Run a command with inherited stdio; non-zero exit is an error.
pub fn run(program: &str, args: &[&str]) -> Result<(), InstallError> {
	let status = Command::new(program)
		.args(args)
		.status()
		.map_err(|source| InstallError::CommandLaunch {
			cmd: display(program, args),
			source,
		})?;
	if !status.success() {
		return Err(InstallError::CommandFailed {
			cmd: display(program, args),
			status,
			stderr: None,
		});
	}
	Ok(())
}

/// Run a command and capture stdout; non-zero exit is an error carrying
/// whatever the command wrote to stderr.
pub fn output(program: &str, args: &[&str]) -> Result<String, InstallError> {
	let output = Command::new(program)
		.args(args)
		.output()
		.map_err(|source| InstallError::CommandLaunch {
			cmd: display(program, args),
			source,
		})?;
	if !output.status.success() {
		let stderr = if output.stderr.is_empty() {
			None
		} else {
			Some(String::from_utf8_lossy(&output.stderr).trim().to_owned())
		};
		return Err(InstallError::CommandFailed {
			cmd: display(program, args),
			status: output.status,
			stderr,
		});
	}
	Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Silent existence/state probe: true only if the command ran and succeeded.
pub fn probe(program: &str, args: &[&str]) -> bool {
	Command::new(program)
		.args(args)
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.is_ok_and(|status| status.success())
}

/// Run a shell snippet with inherited stdio; non-zero exit is an error.
pub fn shell(script: &str) -> Result<(), InstallError> {
	let status = Command::new("sh")
		.arg("-c")
		.arg(script)
		.status()
		.map_err(|source| InstallError::CommandLaunch {
			cmd: format!("sh -c {script}"),
			source,
		})?;
	if !status.success() {
		return Err(InstallError::CommandFailed {
			cmd: format!("sh -c {script}"),
			status,
			stderr: None,
		});
	}
	Ok(())
}

pub fn service_active(unit: &str) -> bool {
	probe("systemctl", &["is-active", "--quiet", unit])
}

pub fn service_enabled(unit: &str) -> bool {
	probe("systemctl", &["is-enabled", "--quiet", unit])
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn probe_distinguishes_success_from_failure() {
		assert!(probe("true", &[]));
		assert!(!probe("false", &[]));
		assert!(!probe("definitely-not-a-real-command", &[]));
	}

	#[test]
	fn output_captures_stdout_and_flags_failure() {
		assert_eq!(output("echo", &["hello"]).unwrap().trim(), "hello");
		assert!(matches!(
			output("false", &[]),
			Err(InstallError::CommandFailed { .. })
		));
		assert!(matches!(
			output("definitely-not-a-real-command", &[]),
			Err(InstallError::CommandLaunch { .. })
		));
	}
}
