use bill_sync_service::config::BillSyncConfig;
use bill_sync_service::startup::Application;
use service_core::observability::{init_tracing, shutdown_tracing};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match BillSyncConfig::load() {
        Ok(config) => config,
        Err(e) => {
            // Tracing is not up yet; configuration carries the log level.
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(
        "bill-sync-service",
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    );

    let code = match sweep(config).await {
        Ok(response) => match serde_json::to_string(&response) {
            Ok(body) => {
                println!("{}", body);
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!("Failed to encode run response: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Bill sync aborted");
            ExitCode::FAILURE
        }
    };

    shutdown_tracing();
    code
}

async fn sweep(
    config: BillSyncConfig,
) -> anyhow::Result<bill_sync_service::models::RunResponse> {
    let app = Application::build(config).await?;
    Ok(app.run().await?)
}
