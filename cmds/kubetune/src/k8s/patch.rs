//! Patch payloads derived from edited rows.
//!
//! Both mutation transports send exactly these bodies, so the cluster sees the
//! same changes whether `kubectl` or the API client delivers them.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde_json::{json, Map, Value};

use super::mutator::MutationError;
use crate::{quantity, record::Row};

/// Pod template annotation `kubectl rollout restart` sets.
pub const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

/// New requests/limits applied to every container of a Deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUpdate {
	pub namespace: String,
	pub name: String,
	pub cpu_request: String,
	pub memory_request: String,
	pub memory_limit: String,
}

impl ResourceUpdate {
	/// Values are checked as quantities before anything is sent.
	pub fn from_row(row: &Row) -> Result<Self, MutationError> {
		for (field, value) in [
			("CPU Request", &row.cpu_request),
			("Memory Request", &row.memory_request),
			("Memory Limit", &row.memory_limit),
		] {
			quantity::whole(value).map_err(|source| MutationError::InvalidValue {
				field,
				value: value.clone(),
				source,
			})?;
		}

		Ok(Self {
			namespace: row.namespace.clone(),
			name: row.name.clone(),
			cpu_request: row.cpu_request.clone(),
			memory_request: row.memory_request.clone(),
			memory_limit: row.memory_limit.clone(),
		})
	}

	/// Strategic merge patch setting these values on the named containers.
	pub fn container_patch(&self, containers: &[String]) -> Value {
		let containers: Vec<Value> = containers
			.iter()
			.map(|name| {
				json!({
					"name": name,
					"resources": {
						"requests": {"cpu": self.cpu_request, "memory": self.memory_request},
						"limits": {"memory": self.memory_limit}
					}
				})
			})
			.collect();

		json!({"spec": {"template": {"spec": {"containers": containers}}}})
	}
}

/// New rolling-update bounds for a Deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutUpdate {
	pub namespace: String,
	pub name: String,
	pub max_unavailable: Option<IntOrString>,
	pub max_surge: Option<IntOrString>,
}

impl RolloutUpdate {
	/// `None` when the row leaves both bounds empty.
	pub fn from_row(row: &Row) -> Option<Self> {
		let max_unavailable = parse_int_or_string(&row.max_unavailable);
		let max_surge = parse_int_or_string(&row.max_surge);
		if max_unavailable.is_none() && max_surge.is_none() {
			return None;
		}

		Some(Self {
			namespace: row.namespace.clone(),
			name: row.name.clone(),
			max_unavailable,
			max_surge,
		})
	}

	pub fn merge_patch(&self) -> Value {
		let mut rolling_update = Map::new();
		if let Some(value) = &self.max_unavailable {
			rolling_update.insert("maxUnavailable".to_string(), int_or_string_value(value));
		}
		if let Some(value) = &self.max_surge {
			rolling_update.insert("maxSurge".to_string(), int_or_string_value(value));
		}

		json!({
			"spec": {
				"strategy": {
					"type": "RollingUpdate",
					"rollingUpdate": rolling_update
				}
			}
		})
	}
}

/// New HPA bounds, CPU target and stabilization windows.
///
/// The HPA is addressed by the Deployment name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HpaUpdate {
	pub namespace: String,
	pub name: String,
	pub min_replicas: i32,
	pub max_replicas: i32,
	pub cpu_target_utilization: i32,
	pub scale_up_stabilization: Option<i32>,
	pub scale_down_stabilization: Option<i32>,
}

impl HpaUpdate {
	pub fn from_row(row: &Row) -> Self {
		Self {
			namespace: row.namespace.clone(),
			name: row.name.clone(),
			min_replicas: row.min_replicas,
			max_replicas: row.max_replicas,
			cpu_target_utilization: row.cpu_target_utilization,
			scale_up_stabilization: row.scale_up_stabilization,
			scale_down_stabilization: row.scale_down_stabilization,
		}
	}

	pub fn merge_patch(&self) -> Value {
		let mut spec = json!({
			"minReplicas": self.min_replicas,
			"maxReplicas": self.max_replicas,
			"metrics": [{
				"type": "Resource",
				"resource": {
					"name": "cpu",
					"target": {
						"type": "Utilization",
						"averageUtilization": self.cpu_target_utilization
					}
				}
			}]
		});

		let mut behavior = Map::new();
		if let Some(seconds) = self.scale_up_stabilization {
			behavior.insert(
				"scaleUp".to_string(),
				json!({"stabilizationWindowSeconds": seconds}),
			);
		}
		if let Some(seconds) = self.scale_down_stabilization {
			behavior.insert(
				"scaleDown".to_string(),
				json!({"stabilizationWindowSeconds": seconds}),
			);
		}
		if !behavior.is_empty() {
			spec["behavior"] = Value::Object(behavior);
		}

		json!({ "spec": spec })
	}
}

/// Merge patch that triggers a rollout by stamping the pod template.
pub fn restart_patch(restarted_at: &str) -> Value {
	json!({
		"spec": {
			"template": {
				"metadata": {
					"annotations": {RESTARTED_AT_ANNOTATION: restarted_at}
				}
			}
		}
	})
}

/// `"1"` is an integer bound, `"25%"` a percentage; empty means unset.
fn parse_int_or_string(value: &str) -> Option<IntOrString> {
	let value = value.trim();
	if value.is_empty() {
		return None;
	}
	Some(
		value
			.parse::<i32>()
			.map(IntOrString::Int)
			.unwrap_or_else(|_| IntOrString::String(value.to_string())),
	)
}

fn int_or_string_value(value: &IntOrString) -> Value {
	match value {
		IntOrString::Int(n) => json!(n),
		IntOrString::String(s) => json!(s),
	}
}
