//! Confirmation prompt and action menu.

use std::io::{self, BufRead, Write};

/// What the operator picked from the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
	Export,
	Patch,
	RestartAll,
	Exit,
}

impl Action {
	fn from_choice(choice: &str) -> Option<Self> {
		match choice {
			"1" => Some(Self::Export),
			"2" => Some(Self::Patch),
			"3" => Some(Self::RestartAll),
			"4" => Some(Self::Exit),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
	AwaitConfirm,
	AwaitAction,
	/// Terminal; carries the action to run, if any.
	Done(Option<Action>),
}

const MENU: &str = "\
Select an action:
1: Export Deployments to file
2: Patch Deployments from file
3: Restart all Deployments
4: Exit";

/// Line-driven prompt state machine.
pub struct Shell<R, W> {
	input: R,
	output: W,
	state: State,
}

impl<R: BufRead, W: Write> Shell<R, W> {
	pub fn new(input: R, output: W) -> Self {
		Self {
			input,
			output,
			state: State::AwaitConfirm,
		}
	}

	pub fn state(&self) -> State {
		self.state
	}

	/// Drive the prompts to completion and return the chosen action.
	///
	/// `Action::Exit`, a refused confirmation and an invalid choice all yield `None`.
	pub fn run(&mut self) -> io::Result<Option<Action>> {
		loop {
			if let State::Done(action) = self.state {
				return Ok(action);
			}
			self.state = self.step()?;
		}
	}

	fn step(&mut self) -> io::Result<State> {
		match self.state {
			State::AwaitConfirm => {
				write!(
					self.output,
					"Do you want to proceed with running the script? (Y/N): "
				)?;
				self.output.flush()?;

				let answer = self.read_line()?;
				if answer.is_some_and(|a| a.eq_ignore_ascii_case("y")) {
					Ok(State::AwaitAction)
				} else {
					writeln!(self.output, "\nOperation cancelled.")?;
					Ok(State::Done(None))
				}
			}
			State::AwaitAction => {
				writeln!(self.output, "\n{MENU}")?;
				self.output.flush()?;

				let choice = self.read_line()?.unwrap_or_default();
				match Action::from_choice(&choice) {
					Some(Action::Exit) => {
						writeln!(self.output, "\nExiting.")?;
						Ok(State::Done(None))
					}
					Some(action) => {
						tracing::debug!(?action, "menu choice");
						Ok(State::Done(Some(action)))
					}
					None => {
						writeln!(
							self.output,
							"Invalid choice, please select a valid action."
						)?;
						Ok(State::Done(None))
					}
				}
			}
			done @ State::Done(_) => Ok(done),
		}
	}

	/// Trimmed next line, `None` at end of input.
	fn read_line(&mut self) -> io::Result<Option<String>> {
		let mut line = String::new();
		if self.input.read_line(&mut line)? == 0 {
			return Ok(None);
		}
		Ok(Some(line.trim().to_string()))
	}
}

#[cfg(test)]
mod tests {
	use std::io::Cursor;

	use rstest::rstest;

	use super::*;

	fn run(input: &str) -> (Option<Action>, String) {
		let mut output = Vec::new();
		let action = Shell::new(Cursor::new(input), &mut output).run().unwrap();
		(action, String::from_utf8(output).unwrap())
	}

	#[rstest]
	#[case("y\n1\n", Some(Action::Export))]
	#[case(" Y \n2\n", Some(Action::Patch))]
	#[case("Y\n 3 \n", Some(Action::RestartAll))]
	#[case("Y\n4\n", None)]
	fn test_menu_choice(#[case] input: &str, #[case] expected: Option<Action>) {
		assert_eq!(run(input).0, expected);
	}

	#[rstest]
	#[case("n\n1\n")]
	#[case("yes\n1\n")]
	#[case("\n")]
	#[case("")]
	fn test_refused_confirmation(#[case] input: &str) {
		let (action, output) = run(input);
		assert_eq!(action, None);
		assert!(output.contains("Operation cancelled."));
		assert!(!output.contains("Select an action"));
	}

	#[test]
	fn test_invalid_choice() {
		let (action, output) = run("Y\n7\n");
		assert_eq!(action, None);
		assert!(output.contains("Invalid choice"));
	}

	#[test]
	fn test_menu_eof_is_invalid() {
		let (action, output) = run("Y\n");
		assert_eq!(action, None);
		assert!(output.contains("Invalid choice"));
	}

	#[test]
	fn test_state_transitions() {
		let mut shell = Shell::new(Cursor::new("Y\n1\n"), Vec::new());
		assert_eq!(shell.state(), State::AwaitConfirm);
		shell.state = shell.step().unwrap();
		assert_eq!(shell.state(), State::AwaitAction);
		shell.run().unwrap();
		assert_eq!(shell.state(), State::Done(Some(Action::Export)));
	}
}
