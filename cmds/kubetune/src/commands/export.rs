//! Export command handler.
//!
//! Collects every Deployment of the active namespace and writes the
//! pipe-delimited file, replacing any previous export once every row has
//! been written.

use std::{
	io::{BufWriter, Write},
	path::Path,
};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::instrument;

use super::{connect, runtime};
use crate::{
	codec,
	config::Settings,
	k8s::{client::ClusterConnection, inventory},
	progress::ExportProgress,
};

pub fn run<W: Write>(settings: &Settings, writer: W) -> Result<()> {
	runtime()?.block_on(async {
		let connection = connect(settings).await?;
		export(&connection, settings, writer).await
	})?;
	Ok(())
}

/// Collect and write the file. Returns the number of rows written.
#[instrument(skip_all, fields(file = %settings.file.display()))]
pub async fn export<W: Write>(
	connection: &ClusterConnection,
	settings: &Settings,
	mut writer: W,
) -> Result<usize> {
	eprintln!(
		"Collecting Deployments in namespace {}...",
		connection.namespace()
	);
	let records = inventory::collect(connection.client(), connection.namespace())
		.await
		.context("fetching deployment info")?;

	// Written next to the target so the final rename stays on one filesystem.
	let dir = match settings.file.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent,
		_ => Path::new("."),
	};
	let mut staged = NamedTempFile::new_in(dir)
		.with_context(|| format!("creating temporary file in {}", dir.display()))?;
	let progress = ExportProgress::new(records.len(), settings.pace());
	codec::write_records(BufWriter::new(&mut staged), &records, |current, total, name| {
		progress.advance(current, total, name);
	})
	.with_context(|| format!("writing {}", settings.file.display()))?;
	staged
		.persist(&settings.file)
		.with_context(|| format!("replacing {}", settings.file.display()))?;
	progress.finish();

	tracing::info!(rows = records.len(), "export written");
	writeln!(
		writer,
		"File '{}' created successfully.",
		settings.file.display()
	)?;
	Ok(records.len())
}
