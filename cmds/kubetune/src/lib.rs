pub mod apply;
pub mod codec;
pub mod commands;
pub mod config;
pub mod k8s;
pub mod progress;
pub mod quantity;
pub mod record;
pub mod shell;
pub mod telemetry;
