//! Resource kinds the mock server knows how to route.

/// A namespaced resource type served by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockResourceKind {
	pub api_version: &'static str,
	pub kind: &'static str,
	pub plural: &'static str,
}

/// Resource types the mock can derive API paths for.
pub const KNOWN_KINDS: &[MockResourceKind] = &[
	MockResourceKind {
		api_version: "apps/v1",
		kind: "Deployment",
		plural: "deployments",
	},
	MockResourceKind {
		api_version: "autoscaling/v2",
		kind: "HorizontalPodAutoscaler",
		plural: "horizontalpodautoscalers",
	},
];

impl MockResourceKind {
	/// Look up a known kind by `apiVersion` and `kind`.
	pub fn lookup(api_version: &str, kind: &str) -> Option<Self> {
		KNOWN_KINDS
			.iter()
			.find(|k| k.api_version == api_version && k.kind == kind)
			.copied()
	}

	/// Look up a known kind by its plural resource name.
	pub fn by_plural(plural: &str) -> Option<Self> {
		KNOWN_KINDS.iter().find(|k| k.plural == plural).copied()
	}
}

/// Collection path of a namespaced resource type in a named API group.
///
/// `("apps/v1", "deployments", "shop")` -> `/apis/apps/v1/namespaces/shop/deployments`
pub fn collection_path(api_version: &str, plural: &str, namespace: &str) -> String {
	format!("/apis/{}/namespaces/{}/{}", api_version, namespace, plural)
}

/// Derive `(collection path, name)` for a manifest.
pub(crate) fn api_path_for_manifest(manifest: &serde_json::Value) -> Option<(String, String)> {
	let api_version = manifest.get("apiVersion")?.as_str()?;
	let kind = manifest.get("kind")?.as_str()?;
	let name = manifest.pointer("/metadata/name")?.as_str()?.to_string();
	let namespace = manifest
		.pointer("/metadata/namespace")
		.and_then(|n| n.as_str())
		.unwrap_or("default");

	let known = MockResourceKind::lookup(api_version, kind)?;
	Some((collection_path(api_version, known.plural, namespace), name))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_collection_path() {
		assert_eq!(
			collection_path("autoscaling/v2", "horizontalpodautoscalers", "shop"),
			"/apis/autoscaling/v2/namespaces/shop/horizontalpodautoscalers"
		);
	}

	#[test]
	fn test_only_served_kinds_are_known() {
		let plurals: Vec<_> = KNOWN_KINDS.iter().map(|k| k.plural).collect();
		assert_eq!(plurals, ["deployments", "horizontalpodautoscalers"]);
		assert_eq!(MockResourceKind::lookup("v1", "ConfigMap"), None);
	}

	#[test]
	fn test_manifest_without_namespace_lands_in_default() {
		let manifest = serde_json::json!({
			"apiVersion": "apps/v1",
			"kind": "Deployment",
			"metadata": {"name": "api"}
		});
		assert_eq!(
			api_path_for_manifest(&manifest),
			Some((
				"/apis/apps/v1/namespaces/default/deployments".to_string(),
				"api".to_string()
			))
		);
	}

	#[test]
	fn test_unknown_kind_is_skipped() {
		let manifest = serde_json::json!({
			"apiVersion": "batch/v1",
			"kind": "Job",
			"metadata": {"name": "nightly"}
		});
		assert_eq!(api_path_for_manifest(&manifest), None);
	}
}
