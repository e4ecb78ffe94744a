//! Configuration schema for deploy.toml
//!
//! Every section is optional; defaults reproduce the reference testnet
//! deployment (mock collateral and oracle, 200% MCR, 1M debt ceiling).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::{Address, Amount, Selector};

const ONE: u128 = 1_000_000_000_000_000_000;

/// Root configuration structure for deploy.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeployConfig {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    #[serde(default)]
    pub collateral: CollateralConfig,

    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Risk parameters of the first trove manager
    #[serde(default)]
    pub trove_manager: TroveManagerParams,
}

/// Target network and principal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub rpc_url: Url,

    /// Account submitting every transaction (must be managed by the node)
    #[serde(default)]
    pub deployer: Option<Address>,

    /// Expected chain id; checked against the node when set
    #[serde(default)]
    pub chain_id: Option<u64>,

    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Explicit gas limit per transaction (node estimate when unset)
    #[serde(default)]
    pub gas_limit: Option<u64>,
}

fn default_rpc_url() -> Url {
    Url::parse("http://127.0.0.1:8545").expect("static URL is valid")
}

fn default_confirm_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            deployer: None,
            chain_id: None,
            confirm_timeout_secs: default_confirm_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            gas_limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Root of the compiled artifacts tree
    #[serde(default = "default_artifacts_dir")]
    pub dir: PathBuf,
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: default_artifacts_dir(),
        }
    }
}

/// Collateral asset of the first trove manager
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CollateralConfig {
    /// Existing token; a mock token is deployed when unset
    #[serde(default)]
    pub token: Option<Address>,
}

/// Price source registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Existing aggregator; a mock aggregator is deployed when unset
    #[serde(default)]
    pub aggregator: Option<Address>,

    /// Maximum price age in seconds before it counts as stale
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Conversion function selector on the collateral; zero means 1:1
    #[serde(default)]
    pub share_price_signature: Selector,

    #[serde(default = "default_share_price_decimals")]
    pub share_price_decimals: u8,

    /// Whether the feed is quoted in the chain's native coin
    #[serde(default)]
    pub is_eth_indexed: bool,
}

fn default_heartbeat_secs() -> u64 {
    80_000
}

fn default_share_price_decimals() -> u8 {
    18
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            aggregator: None,
            heartbeat_secs: default_heartbeat_secs(),
            share_price_signature: Selector::ZERO,
            share_price_decimals: default_share_price_decimals(),
            is_eth_indexed: false,
        }
    }
}

/// Constructor literals shared by the protocol contracts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub debt_token_name: String,
    pub debt_token_symbol: String,
    pub gas_compensation: Amount,
    pub min_net_debt: Amount,
    pub lock_to_token_ratio: Amount,

    /// Token locker manager; defaults to the deployer
    pub locker_manager: Option<Address>,

    /// Cross-chain messaging endpoint for the debt and governance tokens.
    /// Not integrated yet; the zero address is passed when unset.
    pub layer_zero_endpoint: Option<Address>,

    /// Receiver type tag used when registering a trove manager with the vault
    pub receiver_id: u64,

    pub custom_trove_manager_impl: Option<Address>,
    pub custom_sorted_troves_impl: Option<Address>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            debt_token_name: "USDB".to_string(),
            debt_token_symbol: "USDB".to_string(),
            gas_compensation: Amount(200 * ONE),
            min_net_debt: Amount(1_800 * ONE),
            lock_to_token_ratio: Amount(ONE),
            locker_manager: None,
            layer_zero_endpoint: None,
            receiver_id: 2,
            custom_trove_manager_impl: None,
            custom_sorted_troves_impl: None,
        }
    }
}

/// Risk-parameter bundle passed to the factory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TroveManagerParams {
    pub minute_decay_factor: Amount,
    pub redemption_fee_floor: Amount,
    pub max_redemption_fee: Amount,
    pub borrowing_fee_floor: Amount,
    pub max_borrowing_fee: Amount,
    pub interest_rate_in_bps: Amount,
    pub max_debt: Amount,
    pub mcr: Amount,
}

impl Default for TroveManagerParams {
    fn default() -> Self {
        Self {
            minute_decay_factor: Amount(999_037_758_833_783_000),
            redemption_fee_floor: Amount(5_000_000_000_000_000),
            max_redemption_fee: Amount(ONE),
            borrowing_fee_floor: Amount(0),
            max_borrowing_fee: Amount(0),
            interest_rate_in_bps: Amount(0),
            max_debt: Amount(1_000_000 * ONE),
            mcr: Amount(2 * ONE),
        }
    }
}

impl TroveManagerParams {
    /// Values in the factory's struct field order.
    pub fn ordered(&self) -> [u128; 8] {
        [
            self.minute_decay_factor.0,
            self.redemption_fee_floor.0,
            self.max_redemption_fee.0,
            self.borrowing_fee_floor.0,
            self.max_borrowing_fee.0,
            self.interest_rate_in_bps.0,
            self.max_debt.0,
            self.mcr.0,
        ]
    }
}

impl DeployConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate value ranges the contracts' parameter types impose.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.oracle.heartbeat_secs == 0 || self.oracle.heartbeat_secs > u64::from(u32::MAX) {
            anyhow::bail!(
                "oracle.heartbeat_secs must be between 1 and {}, got {}",
                u32::MAX,
                self.oracle.heartbeat_secs
            );
        }
        if self.network.poll_interval_ms == 0 {
            anyhow::bail!("network.poll_interval_ms must be greater than zero");
        }
        if self.protocol.debt_token_name.is_empty() || self.protocol.debt_token_symbol.is_empty() {
            anyhow::bail!("protocol.debt_token_name and debt_token_symbol must not be empty");
        }

        let params = &self.trove_manager;
        if params.interest_rate_in_bps.0 > 10_000 {
            anyhow::bail!(
                "trove_manager.interest_rate_in_bps must not exceed 10000, got {}",
                params.interest_rate_in_bps
            );
        }
        if params.redemption_fee_floor > params.max_redemption_fee {
            anyhow::bail!("trove_manager.redemption_fee_floor exceeds max_redemption_fee");
        }
        if params.borrowing_fee_floor > params.max_borrowing_fee {
            anyhow::bail!("trove_manager.borrowing_fee_floor exceeds max_borrowing_fee");
        }
        Ok(())
    }
}
