//! Run settings shared by every command.

use std::{fmt, path::PathBuf, time::Duration};

use clap::{Args, ValueEnum};

/// Name of the exported file when `--file` is not given.
pub const DEFAULT_FILE: &str = "deployment-info.csv";

/// How mutations reach the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Transport {
	/// Shell out to the kubectl CLI.
	#[default]
	Kubectl,

	/// Patch through the API client.
	Api,
}

impl fmt::Display for Transport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Transport::Kubectl => write!(f, "kubectl"),
			Transport::Api => write!(f, "api"),
		}
	}
}

#[derive(Debug, Clone, Args)]
pub struct Settings {
	/// Path to the kubeconfig file [default: $HOME/.kube/config]
	#[arg(long, global = true)]
	pub kubeconfig: Option<PathBuf>,

	/// File to export to and patch from
	#[arg(long, global = true, default_value = DEFAULT_FILE)]
	pub file: PathBuf,

	/// Mutation transport
	#[arg(long, global = true, value_enum, default_value_t = Transport::Kubectl)]
	pub transport: Transport,

	/// kubectl program used by the kubectl transport
	#[arg(long, global = true, default_value = "kubectl")]
	pub kubectl: String,

	/// Delay between rows while writing the export, in milliseconds
	#[arg(long = "pace-ms", global = true, default_value_t = 100)]
	pub pace_ms: u64,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			kubeconfig: None,
			file: PathBuf::from(DEFAULT_FILE),
			transport: Transport::default(),
			kubectl: "kubectl".to_string(),
			pace_ms: 100,
		}
	}
}

impl Settings {
	pub fn pace(&self) -> Duration {
		Duration::from_millis(self.pace_ms)
	}
}

#[cfg(test)]
mod tests {
	use clap::Parser;

	use super::*;

	#[derive(Parser)]
	struct TestCli {
		#[command(flatten)]
		settings: Settings,
	}

	#[test]
	fn test_defaults_match_flags() {
		let parsed = TestCli::parse_from(["kubetune"]).settings;
		let default = Settings::default();
		assert_eq!(parsed.file, default.file);
		assert_eq!(parsed.transport, default.transport);
		assert_eq!(parsed.kubectl, default.kubectl);
		assert_eq!(parsed.pace(), Duration::from_millis(100));
	}

	#[test]
	fn test_flags() {
		let settings = TestCli::parse_from([
			"kubetune",
			"--file",
			"out.txt",
			"--transport",
			"api",
			"--pace-ms",
			"0",
		])
		.settings;
		assert_eq!(settings.file, PathBuf::from("out.txt"));
		assert_eq!(settings.transport, Transport::Api);
		assert!(settings.pace().is_zero());
	}
}
