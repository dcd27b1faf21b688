//! Integration tests for the patch and restart flows through the API transport.

use indoc::indoc;
use k8s_mock::http::{HttpMockK8sServer, RunningHttpMockK8sServer};
use kubetune::{
	apply::Step,
	commands::{patch::patch_from_file, restart::restart},
	k8s::{api::ApiMutator, client::ClusterConnection, patch::RESTARTED_AT_ANNOTATION},
};
use serde_json::{json, Value};

const DEPLOYMENTS: &str = "/apis/apps/v1/namespaces/shop/deployments";
const AUTOSCALERS: &str = "/apis/autoscaling/v2/namespaces/shop/horizontalpodautoscalers";

fn deployment(name: &str, containers: &[&str]) -> Value {
	let containers: Vec<Value> = containers
		.iter()
		.map(|c| json!({"name": c, "image": "registry.local/app:1.0"}))
		.collect();
	json!({
		"apiVersion": "apps/v1",
		"kind": "Deployment",
		"metadata": {"name": name, "namespace": "shop"},
		"spec": {
			"replicas": 1,
			"selector": {"matchLabels": {"app": name}},
			"template": {
				"metadata": {"labels": {"app": name}},
				"spec": {"containers": containers}
			}
		}
	})
}

fn hpa(name: &str) -> Value {
	json!({
		"apiVersion": "autoscaling/v2",
		"kind": "HorizontalPodAutoscaler",
		"metadata": {"name": name, "namespace": "shop"},
		"spec": {
			"scaleTargetRef": {"apiVersion": "apps/v1", "kind": "Deployment", "name": name},
			"minReplicas": 1,
			"maxReplicas": 3
		}
	})
}

const FILE: &str = indoc! {"
	No|Deployment Name|Namespace|Replicas|CPU Request|CPU Limit|Memory Request|Memory Limit|MaxUnavailable|MaxSurge|Min Replicas|Max Replicas|CPU Target Utilization|ScaleUp Stabilization|ScaleDown Stabilization|UpdateResourceAndHPA|UpdateHPAOnly
	1|api|shop|2|250m|500m|256Mi|512Mi|1|25%|2|10|70|N/A|N/A|true|false
	2|web|shop|1|100m|100m|64Mi|128Mi|||1|4|80|0|300|false|true
	3|cron|shop|1|100m|100m|64Mi|128Mi|||0|0|0|N/A|N/A|false|false
"};

async fn setup(
	failing_patches: Vec<String>,
) -> (RunningHttpMockK8sServer, ApiMutator, tempfile::TempDir) {
	let server = HttpMockK8sServer::builder()
		.resources(vec![
			deployment("api", &["app", "proxy"]),
			deployment("web", &["app"]),
			deployment("cron", &["job"]),
			hpa("api"),
			hpa("web"),
		])
		.failing_patches(failing_patches)
		.build()
		.start()
		.await;
	let connection = ClusterConnection::from_kubeconfig(server.kubeconfig_with_namespace(Some("shop")))
		.await
		.expect("connection should succeed");
	let mutator = ApiMutator::new(connection.client().clone());

	let dir = tempfile::tempdir().unwrap();
	std::fs::write(dir.path().join("deployment-info.csv"), FILE).unwrap();
	(server, mutator, dir)
}

#[tokio::test]
async fn test_patch_from_file() {
	let (server, mutator, dir) = setup(vec![]).await;

	let mut out = Vec::new();
	let outcome = patch_from_file(&mutator, &dir.path().join("deployment-info.csv"), &mut out)
		.await
		.unwrap();
	assert!(outcome.is_clean());

	let patches = server.patches();
	let sent: Vec<_> = patches
		.iter()
		.map(|p| (p.path.as_str(), p.name.as_str()))
		.collect();
	assert_eq!(
		sent,
		[
			(DEPLOYMENTS, "api"),
			(DEPLOYMENTS, "api"),
			(AUTOSCALERS, "api"),
			(AUTOSCALERS, "web"),
		]
	);

	assert_eq!(
		patches[0].content_type.as_deref(),
		Some("application/strategic-merge-patch+json")
	);
	let containers = patches[0].body["spec"]["template"]["spec"]["containers"]
		.as_array()
		.unwrap();
	assert_eq!(containers.len(), 2);
	assert_eq!(
		containers[1],
		json!({
			"name": "proxy",
			"resources": {
				"requests": {"cpu": "250m", "memory": "256Mi"},
				"limits": {"memory": "512Mi"}
			}
		})
	);

	assert_eq!(
		patches[1].body,
		json!({"spec": {"strategy": {
			"type": "RollingUpdate",
			"rollingUpdate": {"maxUnavailable": 1, "maxSurge": "25%"}
		}}})
	);

	assert_eq!(
		patches[3].content_type.as_deref(),
		Some("application/merge-patch+json")
	);
	assert_eq!(
		patches[3].body["spec"]["behavior"],
		json!({
			"scaleUp": {"stabilizationWindowSeconds": 0},
			"scaleDown": {"stabilizationWindowSeconds": 300}
		})
	);

	let stored = server.resource(AUTOSCALERS, "web").unwrap();
	assert_eq!(stored["spec"]["maxReplicas"], 4);
	assert_eq!(stored["spec"]["metrics"][0]["resource"]["target"]["averageUtilization"], 80);

	let out = String::from_utf8(out).unwrap();
	assert!(out.contains("Resources updated for deployment api"));
	assert!(out.contains("HPA patched for web"));
	assert!(out.ends_with("Kubernetes specs updated successfully!\n"));
}

#[tokio::test]
async fn test_failing_row_does_not_stop_the_next() {
	let (server, mutator, dir) = setup(vec!["api".to_string()]).await;

	let outcome = patch_from_file(&mutator, &dir.path().join("deployment-info.csv"), Vec::new())
		.await
		.unwrap();

	let failed: Vec<_> = outcome
		.failures
		.iter()
		.map(|f| (f.row, f.deployment.as_str(), f.step))
		.collect();
	assert_eq!(
		failed,
		[(1, "api", Step::SetResources), (1, "api", Step::PatchHpa)]
	);
	assert!(server
		.patches()
		.iter()
		.any(|p| p.path == AUTOSCALERS && p.name == "web"));
}

#[tokio::test]
async fn test_unreadable_file_is_an_error() {
	let (server, mutator, dir) = setup(vec![]).await;
	std::fs::write(
		dir.path().join("legacy.csv"),
		"No|Deployment Name|Namespace|Replicas|CPU Request|CPU Limit|Memory Request|Memory Limit|Min Replicas|Max Replicas|CPU Target Utilization\n",
	)
	.unwrap();

	let result = patch_from_file(&mutator, &dir.path().join("legacy.csv"), Vec::new()).await;
	assert!(result.is_err());
	assert!(server.patches().is_empty());
}

#[tokio::test]
async fn test_restart_all_stamps_every_deployment() {
	let (server, mutator, _dir) = setup(vec![]).await;

	let mut out = Vec::new();
	restart(&mutator, "shop", None, &mut out).await.unwrap();

	for name in ["api", "web", "cron"] {
		let stored = server.resource(DEPLOYMENTS, name).unwrap();
		assert!(
			stored["spec"]["template"]["metadata"]["annotations"][RESTARTED_AT_ANNOTATION]
				.is_string(),
			"{name} was not restarted"
		);
	}
	assert_eq!(
		String::from_utf8(out).unwrap(),
		"All deployments restarted in namespace shop\n"
	);
}

#[tokio::test]
async fn test_restart_single_deployment() {
	let (server, mutator, _dir) = setup(vec![]).await;

	restart(&mutator, "shop", Some("web"), Vec::new())
		.await
		.unwrap();

	let names: Vec<_> = server.patches().into_iter().map(|p| p.name).collect();
	assert_eq!(names, ["web"]);
}

#[tokio::test]
async fn test_restart_missing_deployment_fails() {
	let (_server, mutator, _dir) = setup(vec![]).await;

	assert!(restart(&mutator, "shop", Some("nope"), Vec::new())
		.await
		.is_err());
}
