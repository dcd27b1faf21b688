//! Kubernetes access: connection, inventory and mutation transports.
//!
//! Reads always go through kube-rs; writes go through a [`mutator::ClusterMutator`],
//! which either shells out to kubectl or patches through the API.

pub mod api;
pub mod client;
pub mod inventory;
pub mod kubectl;
pub mod mutator;
pub mod patch;
