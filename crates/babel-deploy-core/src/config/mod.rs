//! Deployment configuration
//!
//! Loaded from `deploy.toml`:
//! - network: RPC endpoint, deployer, confirmation timing
//! - artifacts: compiled contract location
//! - collateral / oracle / protocol / trove_manager: deployment literals

pub mod parser;
pub mod schema;

pub use parser::{parse_deploy_toml, parse_deploy_toml_str, to_toml};
pub use schema::{
    ArtifactsConfig, CollateralConfig, DeployConfig, NetworkConfig, OracleConfig, ProtocolConfig,
    TroveManagerParams,
};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "deploy.toml";
