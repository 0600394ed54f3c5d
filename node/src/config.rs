//! Node configuration

use anyhow::{Context, Result};
use cdp_engine::{AuctionParams, CollateralTypeConfig, DebtParam, FixedU128, Params};
use serde::{Deserialize, Serialize};

/// Coins credited to an account at genesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub owner: String,
    pub denom: String,
    #[serde(with = "cdp_engine::amount")]
    pub amount: u128,
}

/// Oracle submission, valid for `ttl_secs` after it is posted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSubmission {
    pub market_id: String,
    pub oracle: String,
    pub price: FixedU128,
    pub ttl_secs: u64,
}

/// Oracle submission posted right before block `height`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPrice {
    pub height: u64,
    pub submission: PriceSubmission,
}

/// Position opened at genesis; the owner must be funded by `balances`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisPosition {
    pub owner: String,
    pub collateral_type: String,
    #[serde(with = "cdp_engine::amount")]
    pub collateral: u128,
    #[serde(with = "cdp_engine::amount")]
    pub debt: u128,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Unix time of the genesis state
    pub genesis_time: u64,

    /// Block time advance per block, in seconds
    pub block_time_secs: u64,

    /// Wall-clock delay between produced blocks, in milliseconds
    pub tick_millis: u64,

    /// Number of blocks to produce; 0 runs until halted
    pub blocks: u64,

    /// Where to write the JSON run report, if anywhere
    #[serde(default)]
    pub report_path: Option<String>,

    pub params: Params,

    #[serde(default)]
    pub balances: Vec<GenesisBalance>,

    #[serde(default)]
    pub prices: Vec<PriceSubmission>,

    #[serde(default)]
    pub price_schedule: Vec<ScheduledPrice>,

    #[serde(default)]
    pub positions: Vec<GenesisPosition>,
}

impl Config {
    /// Config file path from `CDP_NODE_CONFIG`, `~` expanded
    pub fn path() -> String {
        let path = std::env::var("CDP_NODE_CONFIG").unwrap_or_else(|_| "cdp-node.toml".to_string());
        shellexpand::tilde(&path).into_owned()
    }

    /// Load configuration from TOML file
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&config_str).context("Failed to parse config TOML")?;
        config.params.validate().context("Invalid params in config")?;

        Ok(config)
    }

    /// Two collateral types, a handful of positions and an xrp crash at
    /// block 5 that pushes the riskiest xrp positions under water
    pub fn default_local() -> Self {
        let submission = |market: &str, price: u128| PriceSubmission {
            market_id: market.to_string(),
            oracle: "oracle1".to_string(),
            price: FixedU128::from_inner(price),
            ttl_secs: 3_600,
        };

        let params = Params {
            collateral_params: vec![
                CollateralTypeConfig {
                    collateral_type: "xrp-a".to_string(),
                    denom: "xrp".to_string(),
                    spot_market_id: "xrp:usd".to_string(),
                    liquidation_market_id: "xrp:usd".to_string(),
                    liquidation_ratio: FixedU128::from_inner(2_000_000_000_000_000_000),
                    stability_fee: FixedU128::from_inner(1_000_000_001_547_125_958),
                    liquidation_penalty: FixedU128::from_inner(50_000_000_000_000_000),
                    auction_size: 7_000_000_000,
                    risk_scan_window: 10,
                    debt_floor: 10_000_000,
                    debt_limit: 500_000_000_000,
                    conversion_factor: 6,
                },
                CollateralTypeConfig {
                    collateral_type: "btc-a".to_string(),
                    denom: "btc".to_string(),
                    spot_market_id: "btc:usd".to_string(),
                    liquidation_market_id: "btc:usd".to_string(),
                    liquidation_ratio: FixedU128::from_inner(1_500_000_000_000_000_000),
                    stability_fee: FixedU128::from_inner(1_000_000_000_782_997_609),
                    liquidation_penalty: FixedU128::from_inner(25_000_000_000_000_000),
                    auction_size: 10_000_000,
                    risk_scan_window: 10,
                    debt_floor: 10_000_000,
                    debt_limit: 500_000_000_000,
                    conversion_factor: 8,
                },
            ],
            debt_param: DebtParam::default(),
            auction: AuctionParams::default(),
            global_debt_limit: 2_000_000_000_000,
            liquidation_block_interval: 1,
        };

        let mut balances = Vec::new();
        let mut positions = Vec::new();
        for (i, debt) in [900_000_000u128, 1_050_000_000, 1_150_000_000, 1_240_000_000].iter().enumerate() {
            let owner = format!("xrp-user{}", i);
            balances.push(GenesisBalance {
                owner: owner.clone(),
                denom: "xrp".to_string(),
                amount: 10_000_000_000,
            });
            positions.push(GenesisPosition {
                owner,
                collateral_type: "xrp-a".to_string(),
                collateral: 10_000_000_000,
                debt: *debt,
            });
        }
        for (i, debt) in [3_000_000_000u128, 4_500_000_000].iter().enumerate() {
            let owner = format!("btc-user{}", i);
            balances.push(GenesisBalance {
                owner: owner.clone(),
                denom: "btc".to_string(),
                amount: 100_000_000,
            });
            positions.push(GenesisPosition {
                owner,
                collateral_type: "btc-a".to_string(),
                collateral: 100_000_000,
                debt: *debt,
            });
        }

        Self {
            genesis_time: 1_700_000_000,
            block_time_secs: 6,
            tick_millis: 1_000,
            blocks: 10,
            report_path: None,
            params,
            balances,
            prices: vec![
                submission("xrp:usd", 250_000_000_000_000_000),
                submission("btc:usd", 8_000_000_000_000_000_000_000),
            ],
            price_schedule: vec![ScheduledPrice {
                height: 5,
                submission: submission("xrp:usd", 200_000_000_000_000_000),
            }],
            positions,
        }
    }

    /// Write default config to file
    pub fn write_default(path: &str) -> Result<()> {
        let config = Self::default_local();
        let toml_str = toml::to_string_pretty(&config).context("Failed to serialize config")?;

        std::fs::write(path, toml_str).context(format!("Failed to write config to {}", path))?;

        log::info!("Created default config at {}", path);
        Ok(())
    }
}
