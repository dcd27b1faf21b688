//! Command handlers.
//!
//! Each handler builds a current-thread tokio runtime and drives its async
//! counterpart with `block_on`; the async halves take an already resolved
//! connection so tests can point them at a mock API server.

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use crate::{
	config::{Settings, Transport},
	k8s::{
		api::ApiMutator, client::ClusterConnection, kubectl::KubectlMutator, mutator::Mutator,
	},
};

pub mod export;
pub mod interactive;
pub mod patch;
pub mod restart;

pub(crate) fn runtime() -> Result<Runtime> {
	tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.context("creating tokio runtime")
}

/// Resolve the kubeconfig named in `settings`.
pub(crate) async fn connect(settings: &Settings) -> Result<ClusterConnection> {
	let connection = ClusterConnection::resolve(settings.kubeconfig.as_deref())
		.await
		.context("connecting to cluster")?;
	tracing::info!(context = connection.context(), namespace = connection.namespace(), "connected");
	Ok(connection)
}

/// Build the transport selected in `settings`.
///
/// Only the API transport needs a cluster connection.
pub(crate) async fn mutator(
	settings: &Settings,
	connection: Option<&ClusterConnection>,
) -> Result<Mutator> {
	Ok(match settings.transport {
		Transport::Kubectl => Mutator::Kubectl(KubectlMutator::new(settings.kubectl.clone())),
		Transport::Api => {
			let client = match connection {
				Some(connection) => connection.client().clone(),
				None => connect(settings).await?.client().clone(),
			};
			Mutator::Api(ApiMutator::new(client))
		}
	})
}
