mod commands;
mod session;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sandbox")]
#[command(
    about = "Provision sandbox networks and instances on Google Compute Engine",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Settings file (skips discovery)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project to provision in
    #[arg(long, global = true, env = "SANDBOXFLOW_PROJECT")]
    project: Option<String>,

    /// Service account JSON key
    #[arg(long, global = true, env = "SANDBOXFLOW_CREDENTIALS")]
    credentials: Option<PathBuf>,

    #[arg(long, global = true, env = "SANDBOXFLOW_REGION")]
    region: Option<String>,

    #[arg(long, global = true, env = "SANDBOXFLOW_ZONE")]
    zone: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the credentials can reach the Compute API
    Check,
    /// Create the reservation network, access key and subnets
    PrepareInfra {
        /// Reservation id; the network is named netvpc-<id>
        #[arg(long)]
        reservation: String,
        /// Driver request file (stdin when omitted)
        input: Option<PathBuf>,
    },
    /// Delete the reservation network and its subnets
    CleanupInfra {
        #[arg(long)]
        reservation: String,
        /// Driver request file (stdin when omitted)
        input: Option<PathBuf>,
    },
    /// Deploy one app instance and connect it to subnets
    Deploy {
        /// Driver request file (stdin when omitted)
        input: Option<PathBuf>,
    },
    /// Delete an instance in the configured zone
    DeleteInstance {
        name: String,
    },
    /// Describe deployed instances
    VmDetails {
        /// Request file (stdin when omitted)
        input: Option<PathBuf>,
    },
    /// Push changed instance addresses to the platform
    RefreshIp {
        /// Instance name
        name: String,
        /// Private IP currently on record
        #[arg(long)]
        private_ip: String,
        /// Public IP currently on record
        #[arg(long, default_value = "")]
        public_ip: String,
        /// Only accept addresses matching this pattern (from the first character)
        #[arg(long)]
        ip_regex: Option<String>,
    },
    /// Show version information
    Version,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries the driver response
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    if matches!(cli.command, Commands::Version) {
        println!("sandboxflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let service = commands::connect(&cli.global).await?;

    match cli.command {
        Commands::Check => commands::check::handle(&service).await,
        Commands::PrepareInfra { reservation, input } => {
            commands::infra::prepare(&service, &reservation, input.as_deref()).await
        }
        Commands::CleanupInfra { reservation, input } => {
            commands::infra::cleanup(&service, &reservation, input.as_deref()).await
        }
        Commands::Deploy { input } => commands::deploy::deploy(&service, input.as_deref()).await,
        Commands::DeleteInstance { name } => commands::deploy::delete_instance(&service, &name).await,
        Commands::VmDetails { input } => commands::details::vm_details(&service, input.as_deref()).await,
        Commands::RefreshIp {
            name,
            private_ip,
            public_ip,
            ip_regex,
        } => {
            commands::details::refresh_ip(&service, &name, private_ip, public_ip, ip_regex.as_deref())
                .await
        }
        Commands::Version => Ok(()),
    }
}
