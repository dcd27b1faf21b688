//! HTTP-based mock Kubernetes server using wiremock.
//!
//! The server answers namespaced LIST, GET and PATCH requests for the kinds in
//! [`crate::resources::KNOWN_KINDS`]. Every PATCH body is recorded so tests can
//! assert on the exact payload a client sent.

use std::{
	collections::BTreeMap,
	io,
	path::Path,
	sync::{Arc, Mutex, RwLock},
};

use bon::Builder;
use kube::config::{
	AuthInfo, Cluster, Context, Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext,
};
use tracing::{debug, trace};
use wiremock::{
	matchers::{method, path_regex},
	Mock, MockServer, Request, ResponseTemplate,
};

use super::{
	helpers::{merge_json, status_body, strip_strategic_merge_directives},
	resources::{api_path_for_manifest, MockResourceKind},
};

/// Stored objects keyed by `(collection path, name)`.
///
/// A `BTreeMap` keeps LIST responses in a stable order (sorted by name).
pub type SharedResources = Arc<RwLock<BTreeMap<(String, String), serde_json::Value>>>;

/// A PATCH request received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPatch {
	/// Collection path, e.g. `/apis/apps/v1/namespaces/shop/deployments`.
	pub path: String,
	/// Object name.
	pub name: String,
	/// Request content type (distinguishes merge and strategic patches).
	pub content_type: Option<String>,
	/// Decoded request body.
	pub body: serde_json::Value,
}

/// A mock Kubernetes server exposed over HTTP.
#[derive(Builder)]
pub struct HttpMockK8sServer {
	/// Objects to serve. Paths are derived from apiVersion/kind/namespace.
	#[builder(default)]
	resources: Vec<serde_json::Value>,
	/// Plural resource names (e.g. `horizontalpodautoscalers`) whose LIST fails.
	#[builder(default)]
	failing_lists: Vec<String>,
	/// Object names whose PATCH fails.
	#[builder(default)]
	failing_patches: Vec<String>,
}

/// A running HTTP mock server instance.
pub struct RunningHttpMockK8sServer {
	server: MockServer,
	resources: SharedResources,
	patches: Arc<Mutex<Vec<RecordedPatch>>>,
}

impl HttpMockK8sServer {
	/// Start the mock server with all configured resources.
	pub async fn start(self) -> RunningHttpMockK8sServer {
		let server = MockServer::start().await;
		debug!(uri = %server.uri(), "started mock K8s server");

		let mut resources = BTreeMap::new();
		for manifest in self.resources {
			if let Some((api_path, name)) = api_path_for_manifest(&manifest) {
				trace!(api_path = %api_path, name = %name, "registered resource");
				resources.insert((api_path, name), manifest);
			}
		}

		let running = RunningHttpMockK8sServer {
			server,
			resources: Arc::new(RwLock::new(resources)),
			patches: Arc::new(Mutex::new(Vec::new())),
		};

		mount_get(&running, self.failing_lists).await;
		mount_patch(&running, self.failing_patches).await;

		running
	}
}

impl RunningHttpMockK8sServer {
	/// Get the server's URI (e.g., "http://127.0.0.1:12345").
	pub fn uri(&self) -> String {
		self.server.uri()
	}

	/// All PATCH requests received so far, in arrival order.
	pub fn patches(&self) -> Vec<RecordedPatch> {
		self.patches.lock().unwrap().clone()
	}

	/// Current state of a stored object.
	pub fn resource(&self, path: &str, name: &str) -> Option<serde_json::Value> {
		self.resources
			.read()
			.unwrap()
			.get(&(path.to_string(), name.to_string()))
			.cloned()
	}

	/// Kubeconfig pointing at this server with the given context namespace.
	pub fn kubeconfig_with_namespace(&self, namespace: Option<&str>) -> Kubeconfig {
		let context_name = "mock-context";
		let cluster_name = "mock-cluster";
		let user_name = "mock-user";

		Kubeconfig {
			clusters: vec![NamedCluster {
				name: cluster_name.to_string(),
				cluster: Some(Cluster {
					server: Some(self.uri()),
					insecure_skip_tls_verify: Some(true),
					..Default::default()
				}),
			}],
			contexts: vec![NamedContext {
				name: context_name.to_string(),
				context: Some(Context {
					cluster: cluster_name.to_string(),
					user: Some(user_name.to_string()),
					namespace: namespace.map(str::to_string),
					..Default::default()
				}),
			}],
			auth_infos: vec![NamedAuthInfo {
				name: user_name.to_string(),
				auth_info: Some(AuthInfo::default()),
			}],
			current_context: Some(context_name.to_string()),
			..Default::default()
		}
	}

	/// Write a kubeconfig for this server to `path` as YAML.
	pub fn write_kubeconfig(&self, path: &Path, namespace: Option<&str>) -> io::Result<()> {
		let yaml = serde_yaml::to_string(&self.kubeconfig_with_namespace(namespace))
			.map_err(io::Error::other)?;
		std::fs::write(path, yaml)
	}
}

async fn mount_get(running: &RunningHttpMockK8sServer, failing_lists: Vec<String>) {
	let resources = Arc::clone(&running.resources);

	Mock::given(method("GET"))
		.and(path_regex(r"^/apis/.*"))
		.respond_with(move |req: &Request| {
			let path_str = req.url.path().trim_end_matches('/');
			let (api_path, name) = parse_resource_path(path_str);

			if MockResourceKind::by_plural(&name).is_some() {
				if failing_lists.contains(&name) {
					return ResponseTemplate::new(500).set_body_json(status_body(
						500,
						"InternalError",
						&format!("listing {} failed", name),
					));
				}

				let items: Vec<_> = resources
					.read()
					.unwrap()
					.iter()
					.filter(|((res_path, _), _)| res_path == path_str)
					.map(|(_, v)| v.clone())
					.collect();

				return ResponseTemplate::new(200).set_body_json(serde_json::json!({
					"kind": "List",
					"apiVersion": "v1",
					"metadata": {"resourceVersion": "1"},
					"items": items
				}));
			}

			match resources.read().unwrap().get(&(api_path, name.clone())) {
				Some(resource) => ResponseTemplate::new(200).set_body_json(resource.clone()),
				None => ResponseTemplate::new(404).set_body_json(status_body(
					404,
					"NotFound",
					&format!("{} not found", name),
				)),
			}
		})
		.mount(&running.server)
		.await;
}

async fn mount_patch(running: &RunningHttpMockK8sServer, failing_patches: Vec<String>) {
	let resources = Arc::clone(&running.resources);
	let patches = Arc::clone(&running.patches);

	Mock::given(method("PATCH"))
		.and(path_regex(r"^/apis/.*"))
		.respond_with(move |req: &Request| {
			let (api_path, name) = parse_resource_path(req.url.path().trim_end_matches('/'));
			let body: serde_json::Value =
				serde_json::from_slice(&req.body).unwrap_or(serde_json::Value::Null);
			let content_type = req
				.headers
				.get("content-type")
				.and_then(|v| v.to_str().ok())
				.map(str::to_string);

			patches.lock().unwrap().push(RecordedPatch {
				path: api_path.clone(),
				name: name.clone(),
				content_type,
				body: body.clone(),
			});

			if failing_patches.contains(&name) {
				return ResponseTemplate::new(500).set_body_json(status_body(
					500,
					"InternalError",
					&format!("patching {} failed", name),
				));
			}

			let mut resources = resources.write().unwrap();
			let key = (api_path, name);
			let Some(existing) = resources.get(&key) else {
				return ResponseTemplate::new(404).set_body_json(status_body(
					404,
					"NotFound",
					&format!("{} not found", key.1),
				));
			};

			let merged = strip_strategic_merge_directives(merge_json(existing.clone(), body));
			resources.insert(key, merged.clone());
			ResponseTemplate::new(200).set_body_json(merged)
		})
		.mount(&running.server)
		.await;
}

/// Split an API path into (collection path, last segment).
///
/// - `/apis/apps/v1/namespaces/shop/deployments/api` -> (`/apis/apps/v1/namespaces/shop/deployments`, `api`)
/// - `/apis/apps/v1/namespaces/shop/deployments` -> (`/apis/apps/v1/namespaces/shop`, `deployments`)
fn parse_resource_path(path: &str) -> (String, String) {
	match path.rfind('/') {
		Some(last_slash) => (
			path[..last_slash].to_string(),
			path[last_slash + 1..].to_string(),
		),
		None => (path.to_string(), String::new()),
	}
}
