//! CDP Node
//!
//! Drives the CDP risk engine one block per tick against in-memory bank,
//! oracle and auction collaborators, halting on the first fatal block error.

mod chain;
mod config;
mod report;

use anyhow::{Context, Result};
use chain::Chain;
use config::Config;
use report::RunReport;
use std::time::Duration;
use tokio::time;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if std::env::args().nth(1).as_deref() == Some("init") {
        return Config::write_default(&Config::path());
    }

    log::info!("Starting CDP node");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({:#}), using default local config", e);
        Config::default_local()
    });

    let mut chain = Chain::genesis(&config).context("Failed to build genesis state")?;
    log::info!(
        "Genesis at {} with {} collateral types",
        config.genesis_time,
        config.params.collateral_params.len()
    );

    // Main block loop
    let mut interval = time::interval(Duration::from_millis(config.tick_millis.max(1)));
    let mut last_block = None;

    loop {
        interval.tick().await;

        match chain.produce_block(&config) {
            Ok(block) => {
                log::debug!("Block {} at {}: {} liquidations", block.height, block.time, block.liquidations());
                for auction in &block.auctions {
                    log::info!("Started auction {}", auction.id);
                }
                last_block = Some(block);
            }
            Err(e) => {
                log::error!("Halting block production: {}", e);
                finish(&chain, last_block, &config, Some(e.to_string()))?;
                return Err(e).context("Fatal block error");
            }
        }

        if config.blocks > 0 && chain.height >= config.blocks {
            break;
        }
    }

    log::info!(
        "Produced {} blocks, {} liquidations",
        chain.height,
        chain.liquidations
    );
    finish(&chain, last_block, &config, None)
}

fn finish(
    chain: &Chain,
    last_block: Option<cdp_engine::BlockReport>,
    config: &Config,
    halted: Option<String>,
) -> Result<()> {
    if let Some(path) = &config.report_path {
        let path = shellexpand::tilde(path);
        RunReport::new(chain, last_block, halted).write(path.as_ref())?;
    }
    Ok(())
}
