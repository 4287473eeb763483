use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use ward_engine::Database;
use ward_server::{config::ServerConfig, listener, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match ServerConfig::from_args(&args) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "invalid configuration");
            return ExitCode::from(255);
        }
    };

    let db = Database::new(config.admin_password);
    let shutdown = CancellationToken::new();

    let ctrl_c_token = shutdown.clone();
    tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received ctrl-c");
                ctrl_c_token.cancel();
            }
    });

    match listener::serve(config.port, db, config.read_timeout, config.write_timeout, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "server exited with an error");
            ExitCode::FAILURE
        }
    }
}
