//! ABI identity envelope.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use matrix_verify_core::abi::{capabilities_hash, AbiEnvelope};
use matrix_verify_core::policy::Policy;
use matrix_verify_core::program::Program;

const PROGRAM: &[u8] = br#"{"format":"matrix.program.v1","abi_version":"v2","symbols":[{"name":"event.reply","signature":"()"}]}"#;

fn envelope(policy: &Policy, plugins: &[&str]) -> AbiEnvelope {
    AbiEnvelope::new(&Program::load(PROGRAM).unwrap(), policy, plugins)
}

#[test]
fn components_come_from_inputs() {
    let program = Program::load(PROGRAM).unwrap();
    let policy = Policy::empty();
    let env = AbiEnvelope::new(&program, &policy, &["idb"]);
    assert_eq!(env.abi, "matrix");
    assert_eq!(env.surface, "matrix.v1");
    assert_eq!(env.program_hash, program.fingerprint());
    assert_eq!(env.policy_hash, policy.fingerprint());
    assert_eq!(env.capabilities_hash, capabilities_hash(&["idb"]));
    assert_eq!(env.abi_hash().len(), 64);
}

#[test]
fn capabilities_hash_is_a_set_hash() {
    assert_eq!(capabilities_hash(&["kql", "idb"]), capabilities_hash(&["idb", "kql"]));
    assert_eq!(capabilities_hash(&["idb", "idb"]), capabilities_hash(&["idb"]));
    assert_ne!(capabilities_hash(&["idb"]), capabilities_hash(&["kql"]));
    assert_ne!(capabilities_hash::<&str>(&[]), capabilities_hash(&["idb"]));
}

#[test]
fn abi_hash_tracks_policy_and_plugins() {
    let empty = Policy::empty();
    let strict = Policy::load_from_str(
        "format: matrix.policy.v1\nrules:\n  - { id: abi, kind: allowed_abi, values: [v2] }\n",
    )
    .unwrap();

    let base = envelope(&empty, &["idb", "kql"]).abi_hash();
    assert_eq!(base, envelope(&empty, &["kql", "idb"]).abi_hash());
    assert_ne!(base, envelope(&strict, &["idb", "kql"]).abi_hash());
    assert_ne!(base, envelope(&empty, &["idb"]).abi_hash());
}
