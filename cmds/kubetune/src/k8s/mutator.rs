//! The seam through which edited values reach the cluster.

use std::{io, process::ExitStatus};

use thiserror::Error;

use super::{
	api::ApiMutator,
	kubectl::KubectlMutator,
	patch::{HpaUpdate, ResourceUpdate, RolloutUpdate},
};
use crate::quantity::QuantityError;

/// Errors raised while changing cluster objects.
#[derive(Debug, Error)]
pub enum MutationError {
	#[error("invalid {field} `{value}`")]
	InvalidValue {
		field: &'static str,
		value: String,
		#[source]
		source: QuantityError,
	},

	#[error("failed to run `{command}`")]
	Spawn {
		command: String,
		#[source]
		source: io::Error,
	},

	#[error("`{command}` failed ({status}): {output}")]
	CommandFailed {
		command: String,
		status: ExitStatus,
		output: String,
	},

	#[error("failed to {action} {kind} {name}")]
	Api {
		action: &'static str,
		kind: &'static str,
		name: String,
		#[source]
		source: Box<kube::Error>,
	},
}

/// Operations the patch and restart flows need from a transport.
///
/// Implementations send the payloads from [`super::patch`] unchanged.
#[allow(async_fn_in_trait)]
pub trait ClusterMutator {
	/// Set CPU request, memory request and memory limit on every container.
	async fn set_resources(&self, update: &ResourceUpdate) -> Result<(), MutationError>;

	/// Merge-patch the rolling-update bounds of a Deployment.
	async fn patch_rollout(&self, update: &RolloutUpdate) -> Result<(), MutationError>;

	/// Merge-patch the HPA named after the Deployment.
	async fn patch_hpa(&self, update: &HpaUpdate) -> Result<(), MutationError>;

	/// Restart every Deployment in `namespace`.
	async fn restart_all(&self, namespace: &str) -> Result<(), MutationError>;

	/// Restart a single Deployment.
	async fn restart(&self, namespace: &str, name: &str) -> Result<(), MutationError>;
}

/// The transport selected on the command line.
#[derive(Debug, Clone)]
pub enum Mutator {
	Kubectl(KubectlMutator),
	Api(ApiMutator),
}

impl ClusterMutator for Mutator {
	async fn set_resources(&self, update: &ResourceUpdate) -> Result<(), MutationError> {
		match self {
			Self::Kubectl(m) => m.set_resources(update).await,
			Self::Api(m) => m.set_resources(update).await,
		}
	}

	async fn patch_rollout(&self, update: &RolloutUpdate) -> Result<(), MutationError> {
		match self {
			Self::Kubectl(m) => m.patch_rollout(update).await,
			Self::Api(m) => m.patch_rollout(update).await,
		}
	}

	async fn patch_hpa(&self, update: &HpaUpdate) -> Result<(), MutationError> {
		match self {
			Self::Kubectl(m) => m.patch_hpa(update).await,
			Self::Api(m) => m.patch_hpa(update).await,
		}
	}

	async fn restart_all(&self, namespace: &str) -> Result<(), MutationError> {
		match self {
			Self::Kubectl(m) => m.restart_all(namespace).await,
			Self::Api(m) => m.restart_all(namespace).await,
		}
	}

	async fn restart(&self, namespace: &str, name: &str) -> Result<(), MutationError> {
		match self {
			Self::Kubectl(m) => m.restart(namespace, name).await,
			Self::Api(m) => m.restart(namespace, name).await,
		}
	}
}
