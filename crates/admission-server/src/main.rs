use std::process;

use admission_server::{AdmissionServer, cli, config::Config, tracing::setup_tracing};
use anyhow::Result;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();
    let config = Config::from_args(&matches)?;

    setup_tracing(&config.log_level, &config.log_fmt, config.log_no_color)?;
    debug!(config = ?config, "tracing system ready");

    let result = match AdmissionServer::new_from_config(config).await {
        Ok(server) => server.run().await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!("{e:#}");
        process::exit(1);
    }

    Ok(())
}
