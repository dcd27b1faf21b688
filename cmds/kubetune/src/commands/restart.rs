//! Restart command handler.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;

use super::{connect, mutator, runtime};
use crate::{config::Settings, k8s::mutator::ClusterMutator};

#[derive(Debug, Clone, Default, Args)]
pub struct RestartArgs {
	/// Restart only this Deployment instead of all of them
	#[arg(long)]
	pub deployment: Option<String>,
}

pub fn run<W: Write>(settings: &Settings, args: &RestartArgs, writer: W) -> Result<()> {
	runtime()?.block_on(async {
		let connection = connect(settings).await?;
		let mutator = mutator(settings, Some(&connection)).await?;
		restart(
			&mutator,
			connection.namespace(),
			args.deployment.as_deref(),
			writer,
		)
		.await
	})
}

/// Restart one Deployment, or every Deployment when `deployment` is `None`.
pub async fn restart<M: ClusterMutator, W: Write>(
	mutator: &M,
	namespace: &str,
	deployment: Option<&str>,
	mut writer: W,
) -> Result<()> {
	match deployment {
		None => {
			mutator
				.restart_all(namespace)
				.await
				.with_context(|| format!("restarting deployments in namespace {namespace}"))?;
			writeln!(writer, "All deployments restarted in namespace {namespace}")?;
		}
		Some(name) => {
			mutator
				.restart(namespace, name)
				.await
				.with_context(|| format!("restarting deployment {name}"))?;
			writeln!(
				writer,
				"Rollout restarted for deployment {name} in namespace {namespace}"
			)?;
		}
	}
	Ok(())
}
