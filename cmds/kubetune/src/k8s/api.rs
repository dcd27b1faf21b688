//! Mutation transport that talks to the API server directly.

use chrono::{SecondsFormat, Utc};
use k8s_openapi::api::{apps::v1::Deployment, autoscaling::v2::HorizontalPodAutoscaler};
use kube::{
	api::{Api, ListParams, Patch, PatchParams},
	Client,
};
use serde_json::Value;
use tracing::instrument;

use super::{
	mutator::{ClusterMutator, MutationError},
	patch::{restart_patch, HpaUpdate, ResourceUpdate, RolloutUpdate},
};

/// Sends patches through the kube client of the active context.
#[derive(Clone)]
pub struct ApiMutator {
	client: Client,
}

impl std::fmt::Debug for ApiMutator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ApiMutator").finish_non_exhaustive()
	}
}

impl ApiMutator {
	pub fn new(client: Client) -> Self {
		Self { client }
	}

	fn deployments(&self, namespace: &str) -> Api<Deployment> {
		Api::namespaced(self.client.clone(), namespace)
	}

	async fn patch_deployment(
		&self,
		action: &'static str,
		namespace: &str,
		name: &str,
		patch: Patch<Value>,
	) -> Result<(), MutationError> {
		self.deployments(namespace)
			.patch(name, &PatchParams::default(), &patch)
			.await
			.map_err(|e| MutationError::Api {
				action,
				kind: "Deployment",
				name: name.to_string(),
				source: Box::new(e),
			})?;
		Ok(())
	}
}

fn restarted_at() -> String {
	Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl ClusterMutator for ApiMutator {
	#[instrument(skip_all, fields(deployment = %update.name))]
	async fn set_resources(&self, update: &ResourceUpdate) -> Result<(), MutationError> {
		let deployment = self
			.deployments(&update.namespace)
			.get(&update.name)
			.await
			.map_err(|e| MutationError::Api {
				action: "get",
				kind: "Deployment",
				name: update.name.clone(),
				source: Box::new(e),
			})?;

		let containers: Vec<String> = deployment
			.spec
			.and_then(|spec| spec.template.spec)
			.map(|pod| pod.containers.into_iter().map(|c| c.name).collect())
			.unwrap_or_default();
		tracing::debug!(containers = containers.len(), "setting container resources");

		self.patch_deployment(
			"set resources on",
			&update.namespace,
			&update.name,
			Patch::Strategic(update.container_patch(&containers)),
		)
		.await
	}

	#[instrument(skip_all, fields(deployment = %update.name))]
	async fn patch_rollout(&self, update: &RolloutUpdate) -> Result<(), MutationError> {
		self.patch_deployment(
			"patch rollout strategy of",
			&update.namespace,
			&update.name,
			Patch::Merge(update.merge_patch()),
		)
		.await
	}

	#[instrument(skip_all, fields(hpa = %update.name))]
	async fn patch_hpa(&self, update: &HpaUpdate) -> Result<(), MutationError> {
		Api::<HorizontalPodAutoscaler>::namespaced(self.client.clone(), &update.namespace)
			.patch(
				&update.name,
				&PatchParams::default(),
				&Patch::Merge(update.merge_patch()),
			)
			.await
			.map_err(|e| MutationError::Api {
				action: "patch",
				kind: "HorizontalPodAutoscaler",
				name: update.name.clone(),
				source: Box::new(e),
			})?;
		Ok(())
	}

	#[instrument(skip(self))]
	async fn restart_all(&self, namespace: &str) -> Result<(), MutationError> {
		let deployments = self
			.deployments(namespace)
			.list(&ListParams::default())
			.await
			.map_err(|e| MutationError::Api {
				action: "list",
				kind: "Deployment",
				name: format!("in namespace {namespace}"),
				source: Box::new(e),
			})?;

		let at = restarted_at();
		for name in deployments.items.into_iter().filter_map(|d| d.metadata.name) {
			self.patch_deployment("restart", namespace, &name, Patch::Merge(restart_patch(&at)))
				.await?;
		}
		Ok(())
	}

	#[instrument(skip(self))]
	async fn restart(&self, namespace: &str, name: &str) -> Result<(), MutationError> {
		self.patch_deployment(
			"restart",
			namespace,
			name,
			Patch::Merge(restart_patch(&restarted_at())),
		)
		.await
	}
}
