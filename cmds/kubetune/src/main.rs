use anyhow::Result;
use clap::{Parser, Subcommand};
use kubetune::{commands, config::Settings, telemetry};
use tracing::Level;

#[cfg(all(
	target_os = "linux",
	feature = "mimalloc",
	not(feature = "system-alloc")
))]
#[global_allocator]
static GLOBAL: mimallocator::Mimalloc = mimallocator::Mimalloc;

#[derive(Parser)]
#[command(name = "kubetune")]
#[command(about = "Export Deployment and HPA settings to a file and patch them back", long_about = None)]
#[command(version = env!("KUBETUNE_VERSION"))]
struct Cli {
	#[command(flatten)]
	settings: Settings,

	/// Log level (trace, debug, info, warn, error) [default: $RUST_LOG, then warn]
	#[arg(long, global = true)]
	log_level: Option<Level>,

	/// Runs the interactive menu when omitted
	#[command(subcommand)]
	command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
	/// Write Deployments of the current namespace to the file
	Export,

	/// Apply the rows of the file that request an update
	Patch,

	/// Trigger a rollout restart
	Restart(commands::restart::RestartArgs),
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	telemetry::init(cli.log_level)?;

	let stdout = std::io::stdout();

	match cli.command {
		None => commands::interactive::run(&cli.settings, std::io::stdin().lock(), stdout),
		Some(Commands::Export) => commands::export::run(&cli.settings, stdout),
		Some(Commands::Patch) => commands::patch::run(&cli.settings, stdout),
		Some(Commands::Restart(args)) => commands::restart::run(&cli.settings, &args, stdout),
	}
}
