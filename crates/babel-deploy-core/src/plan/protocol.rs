//! The Babel protocol deployment graph.
//!
//! Batches, in execution order:
//! - `assets`: mock collateral and aggregator (only when not configured)
//! - `core`: BabelCore and PriceFeed, which reference each other
//! - `periphery`: FeeReceiver, InterimAdmin, GasPool
//! - `protocol`: the eleven mutually referencing protocol contracts
//!
//! Wiring then hands core ownership to the interim admin, registers the
//! collateral price source, spawns the first trove manager and registers it
//! with the vault.

use crate::config::DeployConfig;
use crate::ledger::Spawner;
use crate::types::Address;

use super::{Arg, PlanBuilder};

pub const COMMIT_TRANSFER_OWNERSHIP: &str = "commitTransferOwnership(address)";
pub const SET_ORACLE: &str = "setOracle(address,address,uint32,bytes4,uint8,bool)";
pub const DEPLOY_NEW_INSTANCE: &str = "deployNewInstance(address,address,address,address,(uint256,uint256,uint256,uint256,uint256,uint256,uint256,uint256))";
pub const TROVE_MANAGERS: &str = "troveManagers(uint256)";
pub const REGISTER_RECEIVER: &str = "registerReceiver(address,uint256)";

pub const MOCK_COLLATERAL: &str = "StakedBTC";
pub const MOCK_AGGREGATOR: &str = "MockOracle";

/// Contracts of the `protocol` batch, in submission order.
pub const PROTOCOL_BATCH: [&str; 11] = [
    "Factory",
    "LiquidationManager",
    "DebtToken",
    "BorrowerOperations",
    "StabilityPool",
    "TroveManager",
    "SortedTroves",
    "TokenLocker",
    "IncentiveVoting",
    "BabelToken",
    "BabelVault",
];

/// Simulated factory behaviour matching [`DEPLOY_NEW_INSTANCE`] and
/// [`TROVE_MANAGERS`].
pub fn factory_spawner() -> Spawner {
    Spawner::new(DEPLOY_NEW_INSTANCE, TROVE_MANAGERS)
}

/// Declare the full protocol deployment for `principal`.
pub fn babel_protocol(config: &DeployConfig, principal: Address) -> PlanBuilder {
    let mut b = PlanBuilder::new(principal);
    let protocol = &config.protocol;

    let lz_endpoint = Arg::optional_address(protocol.layer_zero_endpoint);
    if protocol.layer_zero_endpoint.is_none() {
        tracing::warn!("no layer_zero_endpoint configured; DebtToken and BabelToken get the zero address");
    }
    let gas_compensation = Arg::uint(protocol.gas_compensation.0);
    let locker_manager = protocol
        .locker_manager
        .map(Arg::address)
        .unwrap_or(Arg::Principal);

    let (collateral, aggregator) = match (config.collateral.token, config.oracle.aggregator) {
        (Some(token), Some(aggregator)) => (Arg::address(token), Arg::address(aggregator)),
        (token, aggregator) => {
            let assets = b.batch("assets");
            let token = match token {
                Some(addr) => Arg::address(addr),
                None => b.define(assets, MOCK_COLLATERAL, MOCK_COLLATERAL, vec![]).into(),
            };
            let aggregator = match aggregator {
                Some(addr) => Arg::address(addr),
                None => b.define(assets, MOCK_AGGREGATOR, MOCK_AGGREGATOR, vec![]).into(),
            };
            (token, aggregator)
        }
    };

    let core_batch = b.batch("core");
    let core = b.declare(core_batch, "BabelCore", "BabelCore");
    let price_feed = b.declare(core_batch, "PriceFeed", "PriceFeed");
    b.construct(
        core,
        vec![Arg::Principal, Arg::Principal, price_feed.into(), Arg::Principal],
    );
    b.construct(price_feed, vec![core.into(), aggregator.clone()]);

    let periphery = b.batch("periphery");
    b.define(periphery, "FeeReceiver", "FeeReceiver", vec![core.into()]);
    let interim_admin = b.define(periphery, "InterimAdmin", "InterimAdmin", vec![core.into()]);
    let gas_pool = b.define(periphery, "GasPool", "GasPool", vec![]);

    let batch = b.batch("protocol");
    let [
        factory,
        liquidation_manager,
        debt_token,
        borrower_operations,
        stability_pool,
        trove_manager,
        sorted_troves,
        token_locker,
        incentive_voting,
        babel_token,
        vault,
    ] = PROTOCOL_BATCH.map(|name| b.declare(batch, name, name));

    b.construct(
        factory,
        vec![
            core.into(),
            debt_token.into(),
            stability_pool.into(),
            borrower_operations.into(),
            sorted_troves.into(),
            trove_manager.into(),
            liquidation_manager.into(),
        ],
    );
    b.construct(
        liquidation_manager,
        vec![
            stability_pool.into(),
            borrower_operations.into(),
            factory.into(),
            gas_compensation.clone(),
        ],
    );
    b.construct(
        debt_token,
        vec![
            Arg::string(&protocol.debt_token_name),
            Arg::string(&protocol.debt_token_symbol),
            stability_pool.into(),
            borrower_operations.into(),
            core.into(),
            lz_endpoint.clone(),
            factory.into(),
            gas_pool.into(),
            gas_compensation.clone(),
        ],
    );
    b.construct(
        borrower_operations,
        vec![
            core.into(),
            debt_token.into(),
            factory.into(),
            Arg::uint(protocol.min_net_debt.0),
            gas_compensation.clone(),
        ],
    );
    b.construct(
        stability_pool,
        vec![
            core.into(),
            debt_token.into(),
            vault.into(),
            factory.into(),
            liquidation_manager.into(),
        ],
    );
    b.construct(
        trove_manager,
        vec![
            core.into(),
            gas_pool.into(),
            debt_token.into(),
            borrower_operations.into(),
            vault.into(),
            liquidation_manager.into(),
            gas_compensation,
        ],
    );
    b.construct(sorted_troves, vec![]);
    b.construct(
        token_locker,
        vec![
            core.into(),
            babel_token.into(),
            incentive_voting.into(),
            locker_manager,
            Arg::uint(protocol.lock_to_token_ratio.0),
        ],
    );
    b.construct(
        incentive_voting,
        vec![core.into(), token_locker.into(), vault.into()],
    );
    b.construct(
        babel_token,
        vec![vault.into(), lz_endpoint, token_locker.into()],
    );
    b.construct(
        vault,
        vec![
            core.into(),
            babel_token.into(),
            token_locker.into(),
            incentive_voting.into(),
            stability_pool.into(),
            liquidation_manager.into(),
        ],
    );

    let oracle = &config.oracle;
    b.call(
        "transfer core ownership to interim admin",
        core,
        COMMIT_TRANSFER_OWNERSHIP,
        vec![interim_admin.into()],
    );
    b.call(
        "register collateral price source",
        price_feed,
        SET_ORACLE,
        vec![
            collateral.clone(),
            aggregator,
            Arg::uint(u128::from(oracle.heartbeat_secs)),
            Arg::bytes4(oracle.share_price_signature),
            Arg::uint(u128::from(oracle.share_price_decimals)),
            Arg::bool(oracle.is_eth_indexed),
        ],
    );
    b.call(
        "deploy trove manager instance",
        factory,
        DEPLOY_NEW_INSTANCE,
        vec![
            collateral,
            price_feed.into(),
            Arg::optional_address(protocol.custom_trove_manager_impl),
            Arg::optional_address(protocol.custom_sorted_troves_impl),
            Arg::Tuple(config.trove_manager.ordered().map(Arg::uint).to_vec()),
        ],
    );
    let spawned = b.read(
        "read spawned trove manager",
        factory,
        TROVE_MANAGERS,
        vec![Arg::uint(0)],
    );
    b.call(
        "register trove manager with vault",
        vault,
        REGISTER_RECEIVER,
        vec![spawned.into(), Arg::uint(u128::from(protocol.receiver_id))],
    );

    b
}
