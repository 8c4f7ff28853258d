use anyhow::Result;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};
use veloride_rentals::config::RentalsConfig;
use veloride_rentals::server::RentalsServer;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "veloride-rentals")]
#[command(about = "Veloride Rentals Service - Rental lifecycle, zoning, and billing")]
struct Args {
    #[arg(short, long, help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Generate sample configuration file")]
    gen_config: bool,

    #[arg(long, help = "Dry run mode (validate config without starting)")]
    dry_run: bool,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    veloride_common::logging::init_logging(&args.verbosity, "veloride_rentals=info")?;

    if args.gen_config {
        let config = RentalsConfig::default();
        let toml = toml::to_string_pretty(&config)?;
        println!("{}", toml);
        return Ok(());
    }

    let config = RentalsConfig::load(args.config)?;

    info!("Starting Veloride Rentals Service");
    info!("Environment: {}", config.service.environment);

    if args.dry_run {
        info!("Configuration validated successfully (dry-run mode)");
        return Ok(());
    }

    info!(
        "Starting HTTP server on {}:{}",
        config.http.listen_address, config.http.port
    );

    let server = RentalsServer::new(config);
    if let Err(e) = server.serve(shutdown_signal()).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    info!("Veloride Rentals Service stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
