//! ABI compatibility relation tests.

use matrix_verify_core::abi::AbiCompat;

#[test]
fn exact_requires_identical_strings() {
    assert!(AbiCompat::Exact.is_compatible("v2", "v2"));
    assert!(!AbiCompat::Exact.is_compatible("v2.1", "v2"));
    assert!(!AbiCompat::Exact.is_compatible("V2", "v2"));
}

#[test]
fn same_major_compares_leading_component() {
    let c = AbiCompat::SameMajor;
    assert!(c.is_compatible("v2.1", "v2"));
    assert!(c.is_compatible("2.0.7", "v2.3"));
    assert!(!c.is_compatible("v1.9", "v2"));
}

#[test]
fn same_major_falls_back_to_exact_for_opaque_ids() {
    let c = AbiCompat::SameMajor;
    assert!(c.is_compatible("3f9a", "3f9a"));
    assert!(!c.is_compatible("3f9a", "3f9b"));
    assert!(!c.is_compatible("v2", "matrix"));
}

#[test]
fn default_is_exact() {
    assert_eq!(AbiCompat::default(), AbiCompat::Exact);
}
