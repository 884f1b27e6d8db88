//! Policy loader tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use matrix_verify_core::policy::{is_valid_plugin_name, Policy, RuleCheck};

const FULL: &str = r#"
format: matrix.policy.v1
name: default
rules:
  - { id: abi-allow, kind: allowed_abi, values: [v1, v2] }
  - { id: need-reply, kind: require_capability, name: event.reply }
  - { id: no-exec, kind: forbid_capability, name: sys.exec }
  - { id: ops, kind: allowed_ops, values: [idb.query, event.reply] }
  - { id: depth, kind: max_depth, depth: 32 }
  - { id: owner, kind: require_metadata, name: owner }
plugins:
  kql:
    forbidden_patterns: [DROP]
  idb: { stores: [orders], read_only: true }
"#;

#[test]
fn rules_keep_declaration_order() {
    let p = Policy::load_from_str(FULL).expect("must parse");
    assert_eq!(p.name(), Some("default"));
    let ids: Vec<_> = p.rules().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["abi-allow", "need-reply", "no-exec", "ops", "depth", "owner"]);
    assert_eq!(p.rules()[4].check, RuleCheck::MaxDepth(32));
    assert_eq!(
        p.rules()[0].check,
        RuleCheck::AllowedAbi(vec!["v1".into(), "v2".into()])
    );
}

#[test]
fn sub_policies_are_opaque_values() {
    let p = Policy::load_from_str(FULL).unwrap();
    let names: Vec<_> = p.plugin_names().collect();
    assert_eq!(names, ["idb", "kql"]);
    assert_eq!(p.sub_policy("kql")["forbidden_patterns"][0], "DROP");
    assert!(p.sub_policy("missing").is_null());
}

#[test]
fn same_source_yields_equal_policy() {
    let a = Policy::load_from_str(FULL).unwrap();
    let b = Policy::load_from_slice(FULL.as_bytes()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn json_documents_are_accepted() {
    let s = r#"{"format":"matrix.policy.v1","rules":[{"id":"r","kind":"forbid_capability","name":"x"}]}"#;
    let p = Policy::load_from_str(s).unwrap();
    assert_eq!(p.rules().len(), 1);
}

#[test]
fn missing_rule_parameter_is_schema_error() {
    let s = "format: matrix.policy.v1\nrules:\n  - { id: r1, kind: require_capability }\n";
    let e = Policy::load_from_str(s).expect_err("must fail");
    assert_eq!(e.code().as_str(), "SCHEMA_ERROR");
    assert!(e.to_string().contains("`name` is required"));
}

#[test]
fn duplicate_rule_id_is_schema_error() {
    let s = r#"
format: matrix.policy.v1
rules:
  - { id: r1, kind: forbid_capability, name: a }
  - { id: r1, kind: forbid_capability, name: b }
"#;
    let e = Policy::load_from_str(s).expect_err("must fail");
    assert_eq!(e.code().as_str(), "SCHEMA_ERROR");
}

#[test]
fn unknown_rule_kind_is_schema_error() {
    let s = "format: matrix.policy.v1\nrules:\n  - { id: r1, kind: allow_everything }\n";
    let e = Policy::load_from_str(s).expect_err("must fail");
    assert_eq!(e.code().as_str(), "SCHEMA_ERROR");
}

#[test]
fn depth_bounds_are_enforced() {
    let s = "format: matrix.policy.v1\nrules:\n  - { id: d, kind: max_depth, depth: 0 }\n";
    assert!(Policy::load_from_str(s).is_err());
    let s = "format: matrix.policy.v1\nrules:\n  - { id: d, kind: max_depth, depth: 5000 }\n";
    assert!(Policy::load_from_str(s).is_err());
}

#[test]
fn malformed_plugin_name_is_config_error() {
    let s = "format: matrix.policy.v1\nplugins:\n  \"Bad Name\": {}\n";
    let e = Policy::load_from_str(s).expect_err("must fail");
    assert_eq!(e.code().as_str(), "CONFIG_ERROR");
    assert!(e.is_config());
}

#[test]
fn unregistered_but_well_formed_plugin_name_loads() {
    let s = "format: matrix.policy.v1\nplugins:\n  unknown-plugin: {}\n";
    let p = Policy::load_from_str(s).expect("existence is checked by the engine");
    assert_eq!(p.plugin_names().collect::<Vec<_>>(), ["unknown-plugin"]);
}

#[test]
fn plugin_name_syntax() {
    assert!(is_valid_plugin_name("idb"));
    assert!(is_valid_plugin_name("symbol_index-2"));
    assert!(!is_valid_plugin_name(""));
    assert!(!is_valid_plugin_name("2idb"));
    assert!(!is_valid_plugin_name("Idb"));
    assert!(!is_valid_plugin_name("a.b"));
    assert!(!is_valid_plugin_name(&"a".repeat(65)));
}

#[test]
fn wrong_format_is_schema_error() {
    let e = Policy::load_from_str("format: matrix.policy.v2\n").expect_err("must fail");
    assert_eq!(e.code().as_str(), "SCHEMA_ERROR");
}

#[test]
fn allowed_plugins_rule_compiles() {
    let s = "format: matrix.policy.v1\nrules:\n  - { id: plug, kind: allowed_plugins, values: [kql] }\n";
    let p = Policy::load_from_str(s).unwrap();
    assert_eq!(p.rules()[0].check, RuleCheck::AllowedPlugins(vec!["kql".into()]));
    assert_eq!(p.rules()[0].check.kind(), "allowed_plugins");
}

#[test]
fn allowed_plugins_rejects_malformed_names() {
    let s = "format: matrix.policy.v1\nrules:\n  - { id: plug, kind: allowed_plugins, values: [KQL] }\n";
    let e = Policy::load_from_str(s).expect_err("must fail");
    assert_eq!(e.code().as_str(), "CONFIG_ERROR");
}

#[test]
fn fingerprint_ignores_layout_and_value_order() {
    let yaml = "format: matrix.policy.v1\nrules:\n  - { id: ops, kind: allowed_ops, values: [b, a] }\n";
    let json = r#"{"rules":[{"values":["a","b"],"kind":"allowed_ops","id":"ops"}],"format":"matrix.policy.v1"}"#;
    let a = Policy::load_from_str(yaml).unwrap();
    let b = Policy::load_from_str(json).unwrap();
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.fingerprint().len(), 64);
}

#[test]
fn fingerprint_tracks_rules_and_their_order() {
    let one = "format: matrix.policy.v1\nrules:\n  - { id: abi, kind: allowed_abi, values: [v1] }\n";
    let nine = "format: matrix.policy.v1\nrules:\n  - { id: abi, kind: allowed_abi, values: [v9] }\n";
    let ab = "format: matrix.policy.v1\nrules:\n  - { id: a, kind: require_metadata, name: x }\n  - { id: b, kind: require_metadata, name: y }\n";
    let ba = "format: matrix.policy.v1\nrules:\n  - { id: b, kind: require_metadata, name: y }\n  - { id: a, kind: require_metadata, name: x }\n";
    let fp = |s: &str| Policy::load_from_str(s).unwrap().fingerprint().to_string();
    assert_ne!(fp(one), fp(nine));
    assert_ne!(fp(ab), fp(ba));
    assert_ne!(fp(one), Policy::empty().fingerprint());
}
