//! Mutation transport that shells out to the `kubectl` CLI.

use std::process::Stdio;

use serde_json::Value;
use tokio::process::Command;
use tracing::instrument;

use super::{
	mutator::{ClusterMutator, MutationError},
	patch::{HpaUpdate, ResourceUpdate, RolloutUpdate},
};

/// Runs `kubectl` (or a compatible program) once per mutation.
#[derive(Debug, Clone)]
pub struct KubectlMutator {
	program: String,
}

impl Default for KubectlMutator {
	fn default() -> Self {
		Self::new("kubectl")
	}
}

impl KubectlMutator {
	pub fn new(program: impl Into<String>) -> Self {
		Self {
			program: program.into(),
		}
	}

	async fn run(&self, args: Vec<String>) -> Result<(), MutationError> {
		let command = format!("{} {}", self.program, args.join(" "));
		eprintln!("Executing: {command}");
		tracing::info!(command = %command, "running kubectl");

		let output = Command::new(&self.program)
			.args(&args)
			.stdin(Stdio::null())
			.output()
			.await
			.map_err(|source| MutationError::Spawn {
				command: command.clone(),
				source,
			})?;

		let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
		combined.push_str(&String::from_utf8_lossy(&output.stderr));
		let combined = combined.trim().to_string();

		if !output.status.success() {
			tracing::warn!(command = %command, status = %output.status, "kubectl failed");
			return Err(MutationError::CommandFailed {
				command,
				status: output.status,
				output: combined,
			});
		}

		tracing::debug!(output = %combined, "kubectl succeeded");
		Ok(())
	}
}

fn set_resources_args(update: &ResourceUpdate) -> Vec<String> {
	vec![
		"set".to_string(),
		"resources".to_string(),
		"deployment".to_string(),
		update.name.clone(),
		format!("--namespace={}", update.namespace),
		format!(
			"--requests=cpu={},memory={}",
			update.cpu_request, update.memory_request
		),
		format!("--limits=memory={}", update.memory_limit),
	]
}

fn merge_patch_args(kind: &str, namespace: &str, name: &str, patch: &Value) -> Vec<String> {
	vec![
		"patch".to_string(),
		kind.to_string(),
		name.to_string(),
		format!("--namespace={namespace}"),
		"--type=merge".to_string(),
		"-p".to_string(),
		patch.to_string(),
	]
}

fn restart_args(namespace: &str, name: Option<&str>) -> Vec<String> {
	let mut args = vec![
		"rollout".to_string(),
		"restart".to_string(),
		"deployment".to_string(),
	];
	match name {
		Some(name) => args.push(name.to_string()),
		None => args.push("--all".to_string()),
	}
	args.push("-n".to_string());
	args.push(namespace.to_string());
	args
}

impl ClusterMutator for KubectlMutator {
	#[instrument(skip_all, fields(deployment = %update.name))]
	async fn set_resources(&self, update: &ResourceUpdate) -> Result<(), MutationError> {
		self.run(set_resources_args(update)).await
	}

	#[instrument(skip_all, fields(deployment = %update.name))]
	async fn patch_rollout(&self, update: &RolloutUpdate) -> Result<(), MutationError> {
		self.run(merge_patch_args(
			"deployment",
			&update.namespace,
			&update.name,
			&update.merge_patch(),
		))
		.await
	}

	#[instrument(skip_all, fields(hpa = %update.name))]
	async fn patch_hpa(&self, update: &HpaUpdate) -> Result<(), MutationError> {
		self.run(merge_patch_args(
			"hpa",
			&update.namespace,
			&update.name,
			&update.merge_patch(),
		))
		.await
	}

	#[instrument(skip(self))]
	async fn restart_all(&self, namespace: &str) -> Result<(), MutationError> {
		self.run(restart_args(namespace, None)).await
	}

	#[instrument(skip(self))]
	async fn restart(&self, namespace: &str, name: &str) -> Result<(), MutationError> {
		self.run(restart_args(namespace, Some(name))).await
	}
}
