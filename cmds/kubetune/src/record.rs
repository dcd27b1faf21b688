//! Flattened Deployment records and file rows.

/// Aggregated Deployment + HPA configuration, as collected from the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRecord {
	pub name: String,
	pub namespace: String,
	pub replicas: i32,
	pub resources: ResourceTotals,
	pub rollout: RolloutStrategy,
	/// Present only when an HPA targets this Deployment.
	pub autoscaling: Option<Autoscaling>,
}

/// Container requests/limits summed over the pod template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceTotals {
	pub cpu_request_millis: i64,
	pub cpu_limit_millis: i64,
	pub memory_request_mib: i64,
	pub memory_limit_mib: i64,
}

impl ResourceTotals {
	pub fn cpu_request(&self) -> String {
		format!("{}m", self.cpu_request_millis)
	}

	pub fn cpu_limit(&self) -> String {
		format!("{}m", self.cpu_limit_millis)
	}

	pub fn memory_request(&self) -> String {
		format!("{}Mi", self.memory_request_mib)
	}

	pub fn memory_limit(&self) -> String {
		format!("{}Mi", self.memory_limit_mib)
	}
}

/// Explicitly set rolling-update bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolloutStrategy {
	pub max_unavailable: Option<String>,
	pub max_surge: Option<String>,
}

/// Settings of the HPA matched to a Deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Autoscaling {
	pub min_replicas: i32,
	pub max_replicas: i32,
	/// Average CPU utilization target, 0 when the HPA has no CPU metric.
	pub cpu_target_utilization: i32,
	pub scale_up_stabilization: Option<i32>,
	pub scale_down_stabilization: Option<i32>,
}

/// What the operator asked for on a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
	/// Set resources, rollout bounds and HPA.
	ResourcesAndHpa,
	/// Patch the HPA only.
	HpaOnly,
	/// Leave the Deployment alone.
	Skip,
}

/// One data line of the exported file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
	/// 1-based position in the file.
	pub number: usize,
	pub name: String,
	pub namespace: String,
	pub replicas: i32,
	pub cpu_request: String,
	pub cpu_limit: String,
	pub memory_request: String,
	pub memory_limit: String,
	pub max_unavailable: String,
	pub max_surge: String,
	pub min_replicas: i32,
	pub max_replicas: i32,
	pub cpu_target_utilization: i32,
	pub scale_up_stabilization: Option<i32>,
	pub scale_down_stabilization: Option<i32>,
	pub update_resource_and_hpa: bool,
	pub update_hpa_only: bool,
}

impl Row {
	/// Flatten a collected record. Intent flags always start out false.
	pub fn from_record(number: usize, record: &DeploymentRecord) -> Self {
		let autoscaling = record.autoscaling.unwrap_or(Autoscaling {
			min_replicas: 0,
			max_replicas: 0,
			cpu_target_utilization: 0,
			scale_up_stabilization: None,
			scale_down_stabilization: None,
		});

		Self {
			number,
			name: record.name.clone(),
			namespace: record.namespace.clone(),
			replicas: record.replicas,
			cpu_request: record.resources.cpu_request(),
			cpu_limit: record.resources.cpu_limit(),
			memory_request: record.resources.memory_request(),
			memory_limit: record.resources.memory_limit(),
			max_unavailable: record.rollout.max_unavailable.clone().unwrap_or_default(),
			max_surge: record.rollout.max_surge.clone().unwrap_or_default(),
			min_replicas: autoscaling.min_replicas,
			max_replicas: autoscaling.max_replicas,
			cpu_target_utilization: autoscaling.cpu_target_utilization,
			scale_up_stabilization: autoscaling.scale_up_stabilization,
			scale_down_stabilization: autoscaling.scale_down_stabilization,
			update_resource_and_hpa: false,
			update_hpa_only: false,
		}
	}

	/// `updateResourceAndHPA` wins over `updateHPAOnly`.
	pub fn intent(&self) -> Intent {
		if self.update_resource_and_hpa {
			Intent::ResourcesAndHpa
		} else if self.update_hpa_only {
			Intent::HpaOnly
		} else {
			Intent::Skip
		}
	}
}
