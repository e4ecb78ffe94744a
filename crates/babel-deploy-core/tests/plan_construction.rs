//! Integration tests for plan validation.
//!
//! Every error here is raised by `PlanBuilder::build`, before a ledger is
//! involved.

use babel_deploy_core::artifacts::ArtifactStore;
use babel_deploy_core::plan::{Arg, PlanBuilder, PlanError};
use babel_deploy_core::types::Address;

const PRINCIPAL: Address = Address([0x42; 20]);

fn artifacts() -> ArtifactStore {
    ArtifactStore::new()
        .with("Token", vec![0x01])
        .with("Vault", vec![0x02])
        .with("Registry", vec![0x03])
}

// =========================================================================
// Constructor references
// =========================================================================

#[test]
fn forward_batch_reference_is_rejected() {
    let mut b = PlanBuilder::new(PRINCIPAL);
    let first = b.batch("first");
    let second = b.batch("second");
    let vault = b.declare(first, "vault", "Vault");
    let token = b.define(second, "token", "Token", vec![]);
    b.construct(vault, vec![token.into()]);

    assert_eq!(
        b.build(&artifacts()).unwrap_err(),
        PlanError::ForwardBatchReference {
            from: "vault".to_string(),
            from_batch: "first".to_string(),
            to: "token".to_string(),
            to_batch: "second".to_string(),
        }
    );
}

#[test]
fn backward_batch_reference_is_accepted() {
    let mut b = PlanBuilder::new(PRINCIPAL);
    let first = b.batch("first");
    let second = b.batch("second");
    let token = b.define(first, "token", "Token", vec![]);
    b.define(second, "vault", "Vault", vec![token.into(), Arg::Principal]);

    let plan = b.build(&artifacts()).unwrap();
    assert_eq!(plan.batches().len(), 2);
}

#[test]
fn unknown_slot_is_rejected() {
    // A slot id minted by a larger builder does not exist in a smaller one.
    let mut other = PlanBuilder::new(PRINCIPAL);
    let batch = other.batch("x");
    other.declare(batch, "a", "Token");
    let foreign = other.declare(batch, "b", "Token");

    let mut b = PlanBuilder::new(PRINCIPAL);
    let batch = b.batch("solo");
    b.define(batch, "vault", "Vault", vec![foreign.into()]);

    assert_eq!(
        b.build(&artifacts()).unwrap_err(),
        PlanError::UnknownSlot {
            from: "vault".to_string(),
            slot: 1,
        }
    );
}

#[test]
fn slot_in_foreign_batch_is_rejected() {
    // A batch id minted by another builder names no batch here, so the slot
    // would never be deployed while wiring still targets it.
    let mut other = PlanBuilder::new(PRINCIPAL);
    other.batch("a");
    let foreign = other.batch("b");

    let mut b = PlanBuilder::new(PRINCIPAL);
    let batch = b.batch("solo");
    b.define(batch, "vault", "Vault", vec![]);
    let orphan = b.define(foreign, "orphan", "Token", vec![]);
    b.call("poke", orphan, "poke()", vec![]);

    assert_eq!(
        b.build(&artifacts()).unwrap_err(),
        PlanError::UnknownBatch {
            name: "orphan".to_string(),
            batch: 1,
        }
    );
}

#[test]
fn constructing_an_undeclared_slot_is_rejected() {
    let mut other = PlanBuilder::new(PRINCIPAL);
    let batch = other.batch("x");
    other.declare(batch, "a", "Token");
    let foreign = other.declare(batch, "b", "Token");

    let mut b = PlanBuilder::new(PRINCIPAL);
    let batch = b.batch("solo");
    b.define(batch, "vault", "Vault", vec![]);
    b.construct(foreign, vec![Arg::Principal]);

    assert_eq!(
        b.build(&artifacts()).unwrap_err(),
        PlanError::UnknownSlot {
            from: "constructor".to_string(),
            slot: 1,
        }
    );
}

#[test]
fn wiring_output_in_constructor_is_rejected() {
    let mut b = PlanBuilder::new(PRINCIPAL);
    let batch = b.batch("solo");
    let registry = b.define(batch, "registry", "Registry", vec![]);
    let out = b.read("read entry", registry, "entries(uint256)", vec![Arg::uint(0)]);
    b.define(batch, "vault", "Vault", vec![Arg::Tuple(vec![out.into()])]);

    assert_eq!(
        b.build(&artifacts()).unwrap_err(),
        PlanError::InvalidOutputReference {
            from: "vault".to_string(),
            step: 0,
        }
    );
}

#[test]
fn missing_artifact_is_rejected() {
    let mut b = PlanBuilder::new(PRINCIPAL);
    let batch = b.batch("solo");
    b.define(batch, "oracle", "Oracle", vec![]);

    assert_eq!(
        b.build(&artifacts()).unwrap_err(),
        PlanError::MissingArtifact {
            name: "oracle".to_string(),
            contract: "Oracle".to_string(),
        }
    );
}

#[test]
fn duplicate_names_and_empty_batches_are_rejected() {
    let mut b = PlanBuilder::new(PRINCIPAL);
    let batch = b.batch("solo");
    b.define(batch, "token", "Token", vec![]);
    b.define(batch, "token", "Token", vec![]);
    assert_eq!(
        b.build(&artifacts()).unwrap_err(),
        PlanError::DuplicateName("token".to_string())
    );

    let mut b = PlanBuilder::new(PRINCIPAL);
    let batch = b.batch("solo");
    b.batch("empty");
    b.define(batch, "token", "Token", vec![]);
    assert_eq!(
        b.build(&artifacts()).unwrap_err(),
        PlanError::EmptyBatch("empty".to_string())
    );
}

// =========================================================================
// Wiring steps
// =========================================================================

#[test]
fn wiring_arity_is_checked_against_signature() {
    let mut b = PlanBuilder::new(PRINCIPAL);
    let batch = b.batch("solo");
    let vault = b.define(batch, "vault", "Vault", vec![]);
    b.call(
        "register",
        vault,
        "registerReceiver(address,uint256)",
        vec![Arg::Principal],
    );

    assert_eq!(
        b.build(&artifacts()).unwrap_err(),
        PlanError::ArityMismatch {
            label: "register".to_string(),
            method: "registerReceiver(address,uint256)".to_string(),
            expected: 2,
            actual: 1,
        }
    );
}

#[test]
fn tuple_parameters_count_once() {
    let mut b = PlanBuilder::new(PRINCIPAL);
    let batch = b.batch("solo");
    let vault = b.define(batch, "vault", "Vault", vec![]);
    b.call(
        "configure",
        vault,
        "configure(address,(uint256,uint256))",
        vec![
            Arg::Principal,
            Arg::Tuple(vec![Arg::uint(1), Arg::uint(2)]),
        ],
    );
    assert!(b.build(&artifacts()).is_ok());
}

#[test]
fn malformed_signature_is_rejected() {
    let mut b = PlanBuilder::new(PRINCIPAL);
    let batch = b.batch("solo");
    let vault = b.define(batch, "vault", "Vault", vec![]);
    b.call("broken", vault, "register(address", vec![Arg::Principal]);

    assert!(matches!(
        b.build(&artifacts()).unwrap_err(),
        PlanError::Signature { label, .. } if label == "broken"
    ));
}

#[test]
fn output_must_come_from_an_earlier_read() {
    let mut b = PlanBuilder::new(PRINCIPAL);
    let batch = b.batch("solo");
    let vault = b.define(batch, "vault", "Vault", vec![]);
    let call = b.call("poke", vault, "poke()", vec![]);
    b.call("use", vault, "use(address)", vec![call.into()]);

    assert_eq!(
        b.build(&artifacts()).unwrap_err(),
        PlanError::InvalidOutputReference {
            from: "use".to_string(),
            step: 0,
        }
    );
}

#[test]
fn read_output_can_target_later_steps() {
    let mut b = PlanBuilder::new(PRINCIPAL);
    let batch = b.batch("solo");
    let registry = b.define(batch, "registry", "Registry", vec![]);
    let entry = b.read("read entry", registry, "entries(uint256)", vec![Arg::uint(0)]);
    b.call("init entry", entry, "initialize(address)", vec![Arg::Principal]);

    let plan = b.build(&artifacts()).unwrap();
    assert_eq!(plan.steps().len(), 2);
}
