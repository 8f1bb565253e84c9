use anyhow::{Context, Result};

use endor::config::Config;
use endor::server::api::CannonsResponse;
use endor::service::EndorService;

/// Query every configured cannon once and print the answers
pub async fn status(config: &Config) -> Result<()> {
    let service = EndorService::from_config(config).context("Failed to configure attack service")?;
    let reports = service.fleet_status().await;

    let response = CannonsResponse::from_reports(&reports);
    tracing::info!(
        queried = response.cannons.len(),
        available = response.available,
        "Status round finished"
    );

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
