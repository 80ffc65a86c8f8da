use crate::error::InstallError;
use dialoguer::{Confirm, Input};

/// Operator prompts, abstracted so cluster decisions can be scripted in tests.
pub trait InputProvider {
	/// Yes/no question; a blank answer means yes.
	fn confirm(&mut self, prompt: &str) -> Result<bool, InstallError>;
	/// Free-text entry; may be blank.
	fn line(&mut self, prompt: &str) -> Result<String, InstallError>;
}

pub struct Terminal;

impl InputProvider for Terminal {
	fn confirm(&mut self, prompt: &str) -> Result<bool, InstallError> {
		Confirm::new()
			.with_prompt(prompt)
			.default(true)
			.interact()
			.map_err(|err| InstallError::Input(err.to_string()))
	}

	fn line(&mut self, prompt: &str) -> Result<String, InstallError> {
		Input::<String>::new()
			.with_prompt(prompt)
			.allow_empty(true)
			.interact_text()
			.map(|txt| txt.trim().to_owned())
			.map_err(|err| InstallError::Input(err.to_string()))
	}
}

/// Canned answers, consumed in order. Intended for tests and unattended runs.
#[allow(dead_code)]
pub struct Scripted {
	answers: std::collections::VecDeque<String>,
}

#[allow(dead_code)]
impl Scripted {
	pub fn new(answers: &[&str]) -> Self {
		Scripted {
			answers: answers.iter().map(|ans| (*ans).to_owned()).collect(),
		}
	}

	fn next(&mut self) -> Result<String, InstallError> {
		self.answers
			.pop_front()
			.ok_or_else(|| InstallError::Input("Scripted input exhausted".to_owned()))
	}
}

impl InputProvider for Scripted {
	fn confirm(&mut self, _prompt: &str) -> Result<bool, InstallError> {
		let answer = self.next()?;
		Ok(answer.is_empty() || answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
	}

	fn line(&mut self, _prompt: &str) -> Result<String, InstallError> {
		Ok(self.next()?.trim().to_owned())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scripted_confirm_defaults_to_yes_on_blank() {
		let mut input = Scripted::new(&["", "n", "YES"]);
		assert!(input.confirm("continue?").unwrap());
		assert!(!input.confirm("continue?").unwrap());
		assert!(input.confirm("continue?").unwrap());
	}

	#[test]
	fn scripted_line_trims_and_errors_when_exhausted() {
		let mut input = Scripted::new(&[" 10.0.0.5 "]);
		assert_eq!(input.line("ip").unwrap(), "10.0.0.5");
		assert!(input.line("ip").is_err());
	}
}
