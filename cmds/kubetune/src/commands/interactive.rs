//! Interactive session: confirmation, menu, then one action.

use std::io::{BufRead, Write};

use anyhow::Result;

use super::{export, patch, restart};
use crate::{
	config::Settings,
	shell::{Action, Shell},
};

/// Patch and restart failures are printed, not returned; export failures are fatal.
pub fn run<R: BufRead, W: Write>(settings: &Settings, input: R, mut writer: W) -> Result<()> {
	let action = Shell::new(input, &mut writer).run()?;

	match action {
		None | Some(Action::Exit) => {}
		Some(Action::Export) => export::run(settings, &mut writer)?,
		Some(Action::Patch) => {
			if let Err(e) = patch::run_file(settings, &mut writer) {
				tracing::warn!(error = %format!("{e:#}"), "patch failed");
				writeln!(writer, "Error updating Kubernetes specs: {e:#}")?;
			}
		}
		Some(Action::RestartAll) => {
			if let Err(e) = restart::run(settings, &restart::RestartArgs::default(), &mut writer)
			{
				tracing::warn!(error = %format!("{e:#}"), "restart failed");
				writeln!(writer, "Error restarting deployments: {e:#}")?;
			}
		}
	}

	Ok(())
}
