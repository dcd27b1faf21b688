//! Patch command handler.

use std::{
	fs::File,
	io::{BufReader, Write},
	path::Path,
};

use anyhow::{Context, Result};
use tracing::instrument;

use super::{mutator, runtime};
use crate::{
	apply::{apply_rows, PatchOutcome},
	codec,
	config::Settings,
	k8s::mutator::ClusterMutator,
};

/// Apply the file and fail if any row failed.
pub fn run<W: Write>(settings: &Settings, writer: W) -> Result<()> {
	let outcome = run_file(settings, writer)?;
	if !outcome.is_clean() {
		anyhow::bail!("{} update(s) failed", outcome.failures.len());
	}
	Ok(())
}

/// Apply the file; row failures are reported but not an error.
pub fn run_file<W: Write>(settings: &Settings, writer: W) -> Result<PatchOutcome> {
	runtime()?.block_on(async {
		let mutator = mutator(settings, None).await?;
		patch_from_file(&mutator, &settings.file, writer).await
	})
}

/// Read every row of `path`, then push them through `mutator`.
#[instrument(skip(mutator, writer))]
pub async fn patch_from_file<M: ClusterMutator, W: Write>(
	mutator: &M,
	path: &Path,
	mut writer: W,
) -> Result<PatchOutcome> {
	let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
	let rows = codec::read_rows(BufReader::new(file))
		.with_context(|| format!("reading {}", path.display()))?;
	tracing::debug!(rows = rows.len(), "file read");

	let outcome = apply_rows(mutator, &rows, &mut writer).await?;
	writeln!(writer, "Kubernetes specs updated successfully!")?;
	Ok(outcome)
}
