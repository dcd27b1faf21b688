//! Mock Kubernetes API server for testing.
//!
//! Serves a fixed set of namespaced objects over HTTP so that a real kube
//! `Client` built from a generated kubeconfig can list, get and patch them.

mod helpers;
pub mod http;
pub mod resources;

pub use http::{HttpMockK8sServer, RecordedPatch, RunningHttpMockK8sServer};
pub use resources::{collection_path, MockResourceKind};
