//! Connectivity check against the configured RS.ge endpoint.
//!
//! Usage: `rs_probe [config.toml]`

use anyhow::{Context, Result};
use rs_waybill_proxy::core::RsService;
use rs_waybill_proxy::{ProxyConfig, SoapClient};
use serde_json::Map;

const PROBES: &[&str] = &["get_server_time", "what_is_my_ip", "chek_service_user"];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config_path = std::env::args().nth(1);
    let config = ProxyConfig::load(config_path.as_deref().map(std::path::Path::new))
        .context("failed to load configuration")?;

    println!("🚀 Probing {}", config.upstream.endpoint);
    let client = SoapClient::new(config.soap_settings()).context("failed to build HTTP client")?;

    let mut failures = 0;
    for operation in PROBES {
        match client.call(operation, Map::new()).await {
            Ok(result) => println!("✅ {}: {}", operation, result),
            Err(e) => {
                failures += 1;
                println!("❌ {}: {}", operation, e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} probes failed", failures, PROBES.len());
    }
    println!("🎉 All probes succeeded");
    Ok(())
}
