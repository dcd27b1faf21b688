//! Push edited rows back onto the cluster.

use std::{
	error::Error as _,
	fmt,
	io::{self, Write},
};

use tracing::instrument;

use crate::{
	k8s::{
		mutator::{ClusterMutator, MutationError},
		patch::{HpaUpdate, ResourceUpdate, RolloutUpdate},
	},
	record::{Intent, Row},
};

/// Which mutation of a row failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
	SetResources,
	PatchRollout,
	PatchHpa,
}

impl fmt::Display for Step {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Step::SetResources => write!(f, "set resources for deployment"),
			Step::PatchRollout => write!(f, "patch rollout strategy for deployment"),
			Step::PatchHpa => write!(f, "patch HPA for"),
		}
	}
}

#[derive(Debug)]
pub struct RowFailure {
	pub row: usize,
	pub deployment: String,
	pub step: Step,
	pub error: MutationError,
}

/// Per-row failures of a patch run. Rows not listed went through.
#[derive(Debug, Default)]
pub struct PatchOutcome {
	pub failures: Vec<RowFailure>,
}

impl PatchOutcome {
	pub fn is_clean(&self) -> bool {
		self.failures.is_empty()
	}
}

/// Apply every row according to its intent flags.
///
/// A failing mutation is reported on `out` and recorded; the remaining
/// mutations and rows still run.
#[instrument(skip_all, fields(rows = rows.len()))]
pub async fn apply_rows<M: ClusterMutator, W: Write>(
	mutator: &M,
	rows: &[Row],
	mut out: W,
) -> io::Result<PatchOutcome> {
	let mut outcome = PatchOutcome::default();

	for row in rows {
		let mut failure = |step: Step, error: MutationError, out: &mut W| -> io::Result<()> {
			writeln!(
				out,
				"\nfailed to {step} {}: {}",
				row.name,
				error_chain(&error)
			)?;
			tracing::warn!(
				row = row.number,
				deployment = %row.name,
				%step,
				error = %error_chain(&error),
				"mutation failed"
			);
			outcome.failures.push(RowFailure {
				row: row.number,
				deployment: row.name.clone(),
				step,
				error,
			});
			Ok(())
		};

		match row.intent() {
			Intent::Skip => {
				tracing::debug!(row = row.number, deployment = %row.name, "no update requested");
				continue;
			}
			Intent::ResourcesAndHpa => {
				let resources = match ResourceUpdate::from_row(row) {
					Ok(update) => mutator.set_resources(&update).await,
					Err(e) => Err(e),
				};
				match resources {
					Ok(()) => {
						writeln!(out, "Resources updated for deployment {}", row.name)?;
						if let Some(update) = RolloutUpdate::from_row(row) {
							match mutator.patch_rollout(&update).await {
								Ok(()) => writeln!(
									out,
									"Rolling update strategy updated for deployment {}",
									row.name
								)?,
								Err(e) => failure(Step::PatchRollout, e, &mut out)?,
							}
						}
					}
					Err(e) => failure(Step::SetResources, e, &mut out)?,
				}
			}
			Intent::HpaOnly => {}
		}

		match mutator.patch_hpa(&HpaUpdate::from_row(row)).await {
			Ok(()) => writeln!(out, "HPA patched for {}", row.name)?,
			Err(e) => failure(Step::PatchHpa, e, &mut out)?,
		}
	}

	Ok(outcome)
}

/// `error: cause: cause` in one line.
fn error_chain(error: &MutationError) -> String {
	let mut message = error.to_string();
	let mut source = error.source();
	while let Some(cause) = source {
		message.push_str(": ");
		message.push_str(&cause.to_string());
		source = cause.source();
	}
	message
}
