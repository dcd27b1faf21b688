//! Kubernetes cluster connection management.

use std::path::{Path, PathBuf};

use kube::{
	config::{KubeConfigOptions, Kubeconfig, KubeconfigError},
	Client, Config,
};
use thiserror::Error;
use tracing::instrument;

/// Namespace used when the active context does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Errors that can occur when connecting to a Kubernetes cluster.
#[derive(Debug, Error)]
pub enum ConnectionError {
	#[error("HOME is not set, cannot locate .kube/config")]
	HomeNotSet,

	#[error("failed to load kubeconfig {path}")]
	Load {
		path: PathBuf,
		#[source]
		source: KubeconfigError,
	},

	#[error("kubeconfig has no current-context")]
	NoCurrentContext,

	#[error("context `{0}` not found in kubeconfig")]
	ContextNotFound(String),

	#[error(transparent)]
	Kubeconfig(#[from] KubeconfigError),

	#[error("failed to create Kubernetes client")]
	Client(#[from] kube::Error),
}

/// A client bound to the namespace of the active kubeconfig context.
///
/// Resolved once per run and passed to every operation.
#[derive(Clone)]
pub struct ClusterConnection {
	client: Client,
	namespace: String,
	context: String,
}

impl std::fmt::Debug for ClusterConnection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ClusterConnection")
			.field("context", &self.context)
			.field("namespace", &self.namespace)
			.finish_non_exhaustive()
	}
}

/// `$HOME/.kube/config`.
pub fn default_kubeconfig_path() -> Result<PathBuf, ConnectionError> {
	let home = std::env::var_os("HOME").ok_or(ConnectionError::HomeNotSet)?;
	Ok(Path::new(&home).join(".kube").join("config"))
}

impl ClusterConnection {
	/// Connect using `path`, or `$HOME/.kube/config` when not given.
	#[instrument(skip_all)]
	pub async fn resolve(path: Option<&Path>) -> Result<Self, ConnectionError> {
		let path = match path {
			Some(path) => path.to_path_buf(),
			None => default_kubeconfig_path()?,
		};
		tracing::debug!(path = %path.display(), "loading kubeconfig");

		let kubeconfig = Kubeconfig::read_from(&path)
			.map_err(|source| ConnectionError::Load { path, source })?;
		Self::from_kubeconfig(kubeconfig).await
	}

	/// Connect using the current context of an already loaded kubeconfig.
	#[instrument(skip_all)]
	pub async fn from_kubeconfig(kubeconfig: Kubeconfig) -> Result<Self, ConnectionError> {
		let (context, namespace) = active_context(&kubeconfig)?;
		tracing::debug!(context = %context, namespace = %namespace, "using current context");

		let config = Config::from_custom_kubeconfig(
			kubeconfig,
			&KubeConfigOptions {
				context: Some(context.clone()),
				..Default::default()
			},
		)
		.await?;
		let client = Client::try_from(config)?;

		Ok(Self {
			client,
			namespace,
			context,
		})
	}

	/// Get a reference to the underlying kube client.
	pub fn client(&self) -> &Client {
		&self.client
	}

	/// Namespace of the active context.
	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	/// Name of the active context.
	pub fn context(&self) -> &str {
		&self.context
	}
}

/// Name and namespace of the kubeconfig's current context.
fn active_context(kubeconfig: &Kubeconfig) -> Result<(String, String), ConnectionError> {
	let current = kubeconfig
		.current_context
		.as_deref()
		.filter(|name| !name.is_empty())
		.ok_or(ConnectionError::NoCurrentContext)?;

	let context = kubeconfig
		.contexts
		.iter()
		.find(|c| c.name == current)
		.ok_or_else(|| ConnectionError::ContextNotFound(current.to_string()))?;

	let namespace = context
		.context
		.as_ref()
		.and_then(|c| c.namespace.clone())
		.filter(|ns| !ns.is_empty())
		.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

	Ok((current.to_string(), namespace))
}
