//! Progress bar shown while the export file is written.

use std::{io::IsTerminal, thread, time::Duration};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const TEMPLATE: &str = "{spinner} [{bar:30}] {percent}% - Writing {pos}/{len} {msg}";

pub struct ExportProgress {
	bar: ProgressBar,
	pace: Duration,
}

impl ExportProgress {
	/// Drawn on stderr, and only when stderr is a terminal.
	pub fn new(total: usize, pace: Duration) -> Self {
		let target = if std::io::stderr().is_terminal() {
			ProgressDrawTarget::stderr()
		} else {
			ProgressDrawTarget::hidden()
		};
		Self::with_target(total, pace, target)
	}

	pub fn with_target(total: usize, pace: Duration, target: ProgressDrawTarget) -> Self {
		let bar = ProgressBar::with_draw_target(Some(total as u64), target);
		bar.set_style(
			ProgressStyle::default_bar()
				.template(TEMPLATE)
				.unwrap_or_else(|_| ProgressStyle::default_bar())
				.progress_chars("=> "),
		);
		Self { bar, pace }
	}

	/// Called once per written row. Pacing is skipped when nothing is drawn.
	pub fn advance(&self, current: usize, total: usize, name: &str) {
		self.bar.set_length(total as u64);
		self.bar.set_position(current as u64);
		self.bar.set_message(name.to_string());
		if !self.bar.is_hidden() && !self.pace.is_zero() {
			thread::sleep(self.pace);
		}
	}

	pub fn finish(&self) {
		self.bar.finish_and_clear();
	}

	pub fn position(&self) -> u64 {
		self.bar.position()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hidden_progress_tracks_position() {
		let progress =
			ExportProgress::with_target(3, Duration::from_secs(10), ProgressDrawTarget::hidden());
		progress.advance(1, 3, "api");
		progress.advance(2, 3, "web");
		assert_eq!(progress.position(), 2);
		progress.finish();
	}
}
