use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use lookup_gateway::config::GatewayConfig;
use lookup_gateway::error::Result;
use lookup_gateway::gateway::Gateway;
use lookup_gateway::utils::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "lookup-gateway", version, about = "Subscriber lookup gateway")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "lookup-gateway.toml")]
    config: PathBuf,

    /// Override the configured endpoint (e.g. tcp://0.0.0.0:5555)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Validate configuration and build drivers, then exit
    #[arg(long)]
    check: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_example_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Gateway terminated");
            eprintln!("lookup-gateway: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.print_example_config {
        println!("{}", GatewayConfig::example_config());
        return Ok(());
    }

    let mut config = GatewayConfig::from_file(&cli.config)?;
    config.apply_env();
    if let Some(endpoint) = cli.endpoint {
        config.server.endpoint = endpoint;
    }

    init_logging(&config.logging)?;

    let gateway = Gateway::initialize(config)?;
    gateway.registry().show_info();

    if cli.check {
        info!("Configuration is valid");
        return Ok(());
    }

    let listener = gateway.listen().await?;
    let shutdown = listener.shutdown_handle();
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            shutdown.stop();
        }
    });

    let outcome = listener.run().await;
    gateway.teardown();
    outcome
}
