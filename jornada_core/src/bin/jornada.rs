use std::path::PathBuf;

use clap::Parser;
use jornada_core::{config, error::StartError, logging, JornadaCore};
use tracing::{error, info};

/// Runs the Jornada server and its local client until Ctrl-C.
#[derive(Parser, Debug)]
#[command(name = "jornada", version, about)]
struct Cli {
    /// Directory holding config.json and the database
    #[arg(long, env = "JORNADA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), StartError> {
    let config = match cli.data_dir {
        Some(dir) => config::get_or_init_in(&dir).await?,
        None => config::get_or_init().await?,
    };

    let core = JornadaCore::start_with(config).await?;
    info!(node_id = %core.server.endpoint.id(), "ready, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    core.shutdown().await
}
