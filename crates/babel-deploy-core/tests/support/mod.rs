#![allow(dead_code)]

use std::fs;
use std::path::Path;

use babel_deploy_core::artifacts::ArtifactStore;
use babel_deploy_core::config::DeployConfig;
use babel_deploy_core::ledger::{JournalEntry, MemoryLedger};
use babel_deploy_core::plan::DeploymentPlan;
use babel_deploy_core::plan::protocol::{
    MOCK_AGGREGATOR, MOCK_COLLATERAL, PROTOCOL_BATCH, babel_protocol, factory_spawner,
};
use babel_deploy_core::types::Address;

pub const DEPLOYER: Address = Address([0xde; 20]);
pub const CHAIN_ID: u64 = 31337;

/// Every contract the protocol plan needs, in plan order.
pub fn contract_names() -> Vec<&'static str> {
    let mut names = vec![
        MOCK_COLLATERAL,
        MOCK_AGGREGATOR,
        "BabelCore",
        "PriceFeed",
        "FeeReceiver",
        "InterimAdmin",
        "GasPool",
    ];
    names.extend(PROTOCOL_BATCH);
    names
}

/// Fake bytecode: the contract name itself, so init code is easy to split.
pub fn protocol_artifacts() -> ArtifactStore {
    contract_names()
        .into_iter()
        .fold(ArtifactStore::new(), |store, name| {
            store.with(name, name.as_bytes().to_vec())
        })
}

pub fn protocol_config() -> DeployConfig {
    let mut config = DeployConfig::default();
    config.network.deployer = Some(DEPLOYER);
    config
}

pub fn protocol_plan(config: &DeployConfig) -> DeploymentPlan {
    babel_protocol(config, DEPLOYER)
        .build(&protocol_artifacts())
        .unwrap()
}

pub fn simulated_ledger() -> MemoryLedger {
    MemoryLedger::new(CHAIN_ID).with_spawner(factory_spawner())
}

/// Init code submitted for the contract created at `address`.
pub fn init_code_of(ledger: &MemoryLedger, address: Address) -> Vec<u8> {
    ledger
        .journal()
        .into_iter()
        .find_map(|entry| match entry {
            JournalEntry::Create {
                address: created,
                init_code,
                ..
            } if created == address => Some(init_code),
            _ => None,
        })
        .unwrap()
}

/// Write Hardhat-style artifacts for every protocol contract below `dir`.
pub fn write_artifacts_dir(dir: &Path) {
    for name in contract_names() {
        let contract_dir = dir.join("contracts").join(format!("{name}.sol"));
        fs::create_dir_all(&contract_dir).unwrap();
        let hex: String = name.bytes().map(|b| format!("{b:02x}")).collect();
        fs::write(
            contract_dir.join(format!("{name}.json")),
            format!(r#"{{"contractName":"{name}","abi":[],"bytecode":"0x{hex}"}}"#),
        )
        .unwrap();
        fs::write(
            contract_dir.join(format!("{name}.dbg.json")),
            r#"{"buildInfo":"../../build-info/x.json"}"#,
        )
        .unwrap();
    }
}
