//! Deployment and HPA inventory.
//!
//! Lists every Deployment and HorizontalPodAutoscaler in a namespace and
//! flattens each Deployment, joined with the first HPA that targets it, into a
//! [`DeploymentRecord`].

use k8s_openapi::{
	api::{
		apps::v1::{Deployment, DeploymentSpec},
		autoscaling::v2::{HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec},
		core::v1::ResourceRequirements,
	},
	apimachinery::pkg::util::intstr::IntOrString,
};
use kube::{
	api::{Api, ListParams},
	Client,
};
use thiserror::Error;
use tracing::instrument;

use crate::{
	quantity::{self, QuantityError, MEBIBYTE},
	record::{Autoscaling, DeploymentRecord, ResourceTotals, RolloutStrategy},
};

/// HPA target kind that joins to a Deployment.
const DEPLOYMENT_KIND: &str = "Deployment";

/// Strategy type whose bounds are exported.
const ROLLING_UPDATE: &str = "RollingUpdate";

/// Errors that abort a collection run.
#[derive(Debug, Error)]
pub enum CollectionError {
	#[error("failed to list deployments in namespace {namespace}")]
	ListDeployments {
		namespace: String,
		#[source]
		source: Box<kube::Error>,
	},

	#[error("failed to list HPAs in namespace {namespace}")]
	ListAutoscalers {
		namespace: String,
		#[source]
		source: Box<kube::Error>,
	},

	#[error("deployment {deployment}, container {container}: invalid {field}")]
	Quantity {
		deployment: String,
		container: String,
		field: &'static str,
		#[source]
		source: QuantityError,
	},
}

/// Collect one record per Deployment in `namespace`, in listing order.
#[instrument(skip(client))]
pub async fn collect(
	client: &Client,
	namespace: &str,
) -> Result<Vec<DeploymentRecord>, CollectionError> {
	let deployments = Api::<Deployment>::namespaced(client.clone(), namespace)
		.list(&ListParams::default())
		.await
		.map_err(|e| CollectionError::ListDeployments {
			namespace: namespace.to_string(),
			source: Box::new(e),
		})?;

	let autoscalers = Api::<HorizontalPodAutoscaler>::namespaced(client.clone(), namespace)
		.list(&ListParams::default())
		.await
		.map_err(|e| CollectionError::ListAutoscalers {
			namespace: namespace.to_string(),
			source: Box::new(e),
		})?;

	tracing::debug!(
		deployments = deployments.items.len(),
		autoscalers = autoscalers.items.len(),
		"listed namespace"
	);

	deployments
		.items
		.iter()
		.map(|deployment| record_for(deployment, namespace, &autoscalers.items))
		.collect()
}

/// Flatten a single Deployment, joined with its HPA if one targets it.
pub fn record_for(
	deployment: &Deployment,
	namespace: &str,
	autoscalers: &[HorizontalPodAutoscaler],
) -> Result<DeploymentRecord, CollectionError> {
	let name = deployment.metadata.name.clone().unwrap_or_default();
	let spec = deployment.spec.as_ref();

	let record = DeploymentRecord {
		namespace: deployment
			.metadata
			.namespace
			.clone()
			.unwrap_or_else(|| namespace.to_string()),
		replicas: spec.and_then(|s| s.replicas).unwrap_or(1),
		resources: spec
			.map(|s| resource_totals(&name, s))
			.transpose()?
			.unwrap_or_default(),
		rollout: spec.map(rollout_strategy).unwrap_or_default(),
		autoscaling: matching_autoscaler(&name, autoscalers).map(autoscaling),
		name,
	};
	Ok(record)
}

fn resource_totals(
	deployment: &str,
	spec: &DeploymentSpec,
) -> Result<ResourceTotals, CollectionError> {
	let mut totals = ResourceTotals::default();
	let Some(pod) = spec.template.spec.as_ref() else {
		return Ok(totals);
	};

	for container in &pod.containers {
		let resources = container.resources.as_ref();
		let quantity_error = |field: &'static str, source: QuantityError| CollectionError::Quantity {
			deployment: deployment.to_string(),
			container: container.name.clone(),
			field,
			source,
		};
		let add = |total: &mut i64,
		           field: &'static str,
		           convert: fn(&str) -> Result<i64, QuantityError>,
		           unit: i64|
		 -> Result<(), CollectionError> {
			let Some(raw) = lookup(resources, field) else {
				return Ok(());
			};
			let value = convert(raw).map_err(|source| quantity_error(field, source))? / unit;
			*total = total.checked_add(value).ok_or_else(|| {
				quantity_error(field, QuantityError::OutOfRange(raw.to_string()))
			})?;
			Ok(())
		};

		add(&mut totals.cpu_request_millis, "requests.cpu", quantity::millis, 1)?;
		add(&mut totals.cpu_limit_millis, "limits.cpu", quantity::millis, 1)?;
		add(
			&mut totals.memory_request_mib,
			"requests.memory",
			quantity::whole,
			MEBIBYTE,
		)?;
		add(
			&mut totals.memory_limit_mib,
			"limits.memory",
			quantity::whole,
			MEBIBYTE,
		)?;
	}
	Ok(totals)
}

/// Look up `requests.cpu`-style paths in a container's resources.
fn lookup<'a>(resources: Option<&'a ResourceRequirements>, field: &str) -> Option<&'a str> {
	let (section, resource) = field.split_once('.')?;
	let resources = resources?;
	let map = match section {
		"requests" => resources.requests.as_ref(),
		_ => resources.limits.as_ref(),
	}?;
	map.get(resource).map(|q| q.0.as_str())
}

fn rollout_strategy(spec: &DeploymentSpec) -> RolloutStrategy {
	let rolling_update = spec
		.strategy
		.as_ref()
		.filter(|s| s.type_.as_deref() == Some(ROLLING_UPDATE))
		.and_then(|s| s.rolling_update.as_ref());

	RolloutStrategy {
		max_unavailable: rolling_update
			.and_then(|r| r.max_unavailable.as_ref())
			.map(int_or_string),
		max_surge: rolling_update
			.and_then(|r| r.max_surge.as_ref())
			.map(int_or_string),
	}
}

fn int_or_string(value: &IntOrString) -> String {
	match value {
		IntOrString::Int(n) => n.to_string(),
		IntOrString::String(s) => s.clone(),
	}
}

/// First HPA whose scale target is this Deployment.
fn matching_autoscaler<'a>(
	deployment: &str,
	autoscalers: &'a [HorizontalPodAutoscaler],
) -> Option<&'a HorizontalPodAutoscalerSpec> {
	autoscalers
		.iter()
		.filter_map(|hpa| hpa.spec.as_ref())
		.find(|spec| {
			spec.scale_target_ref.name == deployment
				&& spec.scale_target_ref.kind == DEPLOYMENT_KIND
		})
}

fn autoscaling(spec: &HorizontalPodAutoscalerSpec) -> Autoscaling {
	let cpu_target_utilization = spec
		.metrics
		.iter()
		.flatten()
		.filter(|metric| metric.type_ == "Resource")
		.filter_map(|metric| metric.resource.as_ref())
		.filter(|resource| resource.name == "cpu")
		.filter_map(|resource| resource.target.average_utilization)
		.last()
		.unwrap_or(0);

	let behavior = spec.behavior.as_ref();

	Autoscaling {
		min_replicas: spec.min_replicas.unwrap_or(1),
		max_replicas: spec.max_replicas,
		cpu_target_utilization,
		scale_up_stabilization: behavior
			.and_then(|b| b.scale_up.as_ref())
			.and_then(|rules| rules.stabilization_window_seconds),
		scale_down_stabilization: behavior
			.and_then(|b| b.scale_down.as_ref())
			.and_then(|rules| rules.stabilization_window_seconds),
	}
}
