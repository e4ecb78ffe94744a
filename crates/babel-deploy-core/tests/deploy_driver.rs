//! Integration tests for the creation path: prediction, resolution and the
//! deployment driver.

mod support;

use std::collections::HashMap;

use babel_deploy_core::abi::{self, AbiError, Token};
use babel_deploy_core::artifacts::ArtifactStore;
use babel_deploy_core::deploy::{
    DeployError, DeploymentDriver, Orchestrator, predict_batch, resolve_constructor, resolve_step,
};
use babel_deploy_core::identity::{SequenceSnapshot, predict};
use babel_deploy_core::ledger::{LedgerClient, LedgerError, MemoryLedger, Receipt};
use babel_deploy_core::plan::{Arg, DeploymentPlan, PlanBuilder};
use babel_deploy_core::types::Address;

use support::{DEPLOYER, init_code_of};

/// Two resources that each take the other's address.
fn mutual_pair() -> DeploymentPlan {
    let mut b = PlanBuilder::new(DEPLOYER);
    let batch = b.batch("pair");
    let core = b.declare(batch, "core", "Core");
    let feed = b.declare(batch, "feed", "Feed");
    b.construct(core, vec![feed.into()]);
    b.construct(feed, vec![core.into()]);
    b.build(
        &ArtifactStore::new()
            .with("Core", vec![0xc0])
            .with("Feed", vec![0xfe]),
    )
    .unwrap()
}

/// Ledger whose deployer sends an unrelated transaction right before the
/// first creation, as another process sharing the key would.
struct InterferingLedger {
    inner: MemoryLedger,
    interfered: std::cell::Cell<bool>,
}

impl LedgerClient for InterferingLedger {
    fn chain_id(&self) -> Result<u64, LedgerError> {
        self.inner.chain_id()
    }

    fn sequence_number(&self, principal: &Address) -> Result<u64, LedgerError> {
        self.inner.sequence_number(principal)
    }

    fn submit_create(&self, principal: &Address, init_code: &[u8]) -> Result<Receipt, LedgerError> {
        if !self.interfered.replace(true) {
            self.inner.submit_create(principal, b"\xff")?;
        }
        self.inner.submit_create(principal, init_code)
    }

    fn submit_call(
        &self,
        principal: &Address,
        target: &Address,
        calldata: &[u8],
    ) -> Result<Receipt, LedgerError> {
        self.inner.submit_call(principal, target, calldata)
    }

    fn read_call(&self, target: &Address, calldata: &[u8]) -> Result<Vec<u8>, LedgerError> {
        self.inner.read_call(target, calldata)
    }
}

/// Mutual pair plus a read of `core` whose answer is then used by a call.
fn pair_with_lookup() -> DeploymentPlan {
    let mut b = PlanBuilder::new(DEPLOYER);
    let batch = b.batch("pair");
    let core = b.declare(batch, "core", "Core");
    let feed = b.declare(batch, "feed", "Feed");
    b.construct(core, vec![feed.into()]);
    b.construct(feed, vec![core.into()]);
    let entry = b.read("read entry", core, "entries(uint256)", vec![Arg::uint(0)]);
    b.call("register", feed, "register(address)", vec![entry.into()]);
    b.build(
        &ArtifactStore::new()
            .with("Core", vec![0xc0])
            .with("Feed", vec![0xfe]),
    )
    .unwrap()
}

/// Ledger whose reads answer with a word that has dirty upper bytes.
struct DirtyReadLedger {
    inner: MemoryLedger,
}

impl LedgerClient for DirtyReadLedger {
    fn chain_id(&self) -> Result<u64, LedgerError> {
        self.inner.chain_id()
    }

    fn sequence_number(&self, principal: &Address) -> Result<u64, LedgerError> {
        self.inner.sequence_number(principal)
    }

    fn submit_create(&self, principal: &Address, init_code: &[u8]) -> Result<Receipt, LedgerError> {
        self.inner.submit_create(principal, init_code)
    }

    fn submit_call(
        &self,
        principal: &Address,
        target: &Address,
        calldata: &[u8],
    ) -> Result<Receipt, LedgerError> {
        self.inner.submit_call(principal, target, calldata)
    }

    fn read_call(&self, _target: &Address, _calldata: &[u8]) -> Result<Vec<u8>, LedgerError> {
        Ok(vec![0xff; 32])
    }
}

#[test]
fn mutual_pair_deploys_at_nonce_zero() {
    let ledger = MemoryLedger::new(1);
    let mut orchestrator = Orchestrator::new(&ledger, mutual_pair());
    orchestrator.run().unwrap();

    let core = predict(&DEPLOYER, 0);
    let feed = predict(&DEPLOYER, 1);
    assert_eq!(ledger.created(), vec![core, feed]);

    // each constructor received the other's final address
    let core_init = init_code_of(&ledger, core);
    assert_eq!(core_init[0], 0xc0);
    assert_eq!(&core_init[1..], abi::encode(&[Token::Address(feed)]).as_slice());
    let feed_init = init_code_of(&ledger, feed);
    assert_eq!(&feed_init[1..], abi::encode(&[Token::Address(core)]).as_slice());

    let plan = orchestrator.plan();
    for descriptor in plan.descriptors() {
        assert_eq!(
            descriptor.realized(),
            descriptor.predicted().map(|p| p.address)
        );
    }
}

#[test]
fn driver_reports_stale_snapshot_as_mismatch() {
    let ledger = MemoryLedger::new(1);
    let mut plan = mutual_pair();
    let batch = plan.batch_ids()[0];
    // snapshot claims nonce 5 while the ledger is at 0
    predict_batch(&mut plan, batch, SequenceSnapshot::at(DEPLOYER, 5)).unwrap();

    let slot = plan.batch(batch).slots()[0];
    let resolved = resolve_constructor(&plan, slot).unwrap();
    let err = DeploymentDriver::new(&ledger, DEPLOYER)
        .deploy(&resolved)
        .unwrap_err();

    match err {
        DeployError::PredictionMismatch {
            name,
            predicted,
            realized,
        } => {
            assert_eq!(name, "core");
            assert_eq!(predicted, predict(&DEPLOYER, 5));
            assert_eq!(realized, predict(&DEPLOYER, 0));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn out_of_band_transaction_halts_the_run() {
    let ledger = InterferingLedger {
        inner: MemoryLedger::new(1),
        interfered: std::cell::Cell::new(false),
    };
    let mut orchestrator = Orchestrator::new(&ledger, mutual_pair());
    let err = orchestrator.run().unwrap_err();

    assert!(matches!(err, DeployError::PredictionMismatch { ref name, .. } if name == "core"));
    assert!(orchestrator.deployed().is_empty());
    // nothing after the mismatch was submitted
    assert_eq!(ledger.inner.created().len(), 2);
}

#[test]
fn snapshot_for_another_principal_is_refused() {
    let mut plan = mutual_pair();
    let batch = plan.batch_ids()[0];
    let err = predict_batch(&mut plan, batch, SequenceSnapshot::at(Address([1; 20]), 0))
        .unwrap_err();
    assert!(matches!(err, DeployError::PrincipalMismatch { .. }));
}

#[test]
fn batch_cannot_be_predicted_twice() {
    let mut plan = mutual_pair();
    let batch = plan.batch_ids()[0];
    predict_batch(&mut plan, batch, SequenceSnapshot::at(DEPLOYER, 0)).unwrap();
    let err = predict_batch(&mut plan, batch, SequenceSnapshot::at(DEPLOYER, 0)).unwrap_err();
    assert!(matches!(err, DeployError::AlreadyAssigned(_)));
}

#[test]
fn rejected_creation_names_batch_and_position() {
    let ledger = MemoryLedger::new(1).fail_nth_create(1);
    let mut orchestrator = Orchestrator::new(&ledger, mutual_pair());
    let err = orchestrator.run().unwrap_err();

    match err {
        DeployError::Creation {
            batch,
            position,
            name,
            source,
        } => {
            assert_eq!(batch, "pair");
            assert_eq!(position, 1);
            assert_eq!(name, "feed");
            assert!(matches!(source, LedgerError::Rejected(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(orchestrator.deployed().len(), 1);
}

// =========================================================================
// Dependencies resolved at run time
// =========================================================================

#[test]
fn unpredicted_slot_cannot_be_resolved() {
    let plan = mutual_pair();
    let slot = plan.batch(plan.batch_ids()[0]).slots()[0];

    match resolve_constructor(&plan, slot).unwrap_err() {
        DeployError::DependencyNotReady { dependent, .. } => assert_eq!(dependent, "core"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn wiring_before_creation_is_not_ready() {
    let mut plan = pair_with_lookup();
    let batch = plan.batch_ids()[0];
    // predicted but never realized
    predict_batch(&mut plan, batch, SequenceSnapshot::at(DEPLOYER, 0)).unwrap();

    match resolve_step(&plan, 0, &HashMap::new()).unwrap_err() {
        DeployError::DependencyNotReady {
            dependent,
            dependency,
        } => {
            assert_eq!(dependent, "read entry");
            assert_eq!(dependency, "core");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        resolve_step(&plan, 7, &HashMap::new()),
        Err(DeployError::UnknownStep { index: 7 })
    ));
}

#[test]
fn malformed_read_result_halts_wiring() {
    let ledger = DirtyReadLedger {
        inner: MemoryLedger::new(1),
    };
    let mut orchestrator = Orchestrator::new(&ledger, pair_with_lookup());
    let err = orchestrator.run().unwrap_err();

    match err {
        DeployError::Decode {
            index,
            label,
            source,
        } => {
            assert_eq!(index, 0);
            assert_eq!(label, "read entry");
            assert_eq!(source, AbiError::NotAnAddress);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(orchestrator.deployed().len(), 2);
    assert!(orchestrator.wiring().is_empty());
    // the dependent call was never sent
    assert!(ledger.inner.calls().is_empty());
}
