use anyhow::{Context, Result};
use std::path::Path;

use endor::config::Config;
use endor::server::AttackRequest;
use endor::service::EndorService;

/// Run one attack from a JSON request file and print the report
pub async fn attack(config: &Config, input: &Path) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read attack request: {}", input.display()))?;

    let request: AttackRequest = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse attack request: {}", input.display()))?;
    let radar = request.into_radar()?;

    let service = EndorService::from_config(config).context("Failed to configure attack service")?;
    let report = service.attack(&radar).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
