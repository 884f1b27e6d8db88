//! Global policy rule evaluation.
//!
//! Each failing rule yields exactly one violation, sourced by its rule id,
//! in rule-declaration order. `plugins` is the normalized requested plugin
//! list, checked by `allowed_plugins`.

use matrix_verify_core::policy::{Rule, RuleCheck};
use matrix_verify_core::program::Program;
use matrix_verify_core::report::Violation;

pub fn evaluate(rules: &[Rule], program: &Program, plugins: &[String]) -> Vec<Violation> {
    rules
        .iter()
        .filter_map(|r| {
            check(&r.check, program, plugins).map(|detail| Violation::policy(&r.id, detail))
        })
        .collect()
}

/// `Some(detail)` when the rule fails.
fn check(rule: &RuleCheck, program: &Program, plugins: &[String]) -> Option<String> {
    match rule {
        RuleCheck::AllowedAbi(allowed) => {
            let abi = program.abi_version();
            (!allowed.iter().any(|a| a == abi))
                .then(|| format!("abi {abi} not in allow-list [{}]", allowed.join(", ")))
        }
        RuleCheck::RequireCapability(name) => (!program.has_symbol(name))
            .then(|| format!("required capability {name} is not exported")),
        RuleCheck::ForbidCapability(name) => program
            .has_symbol(name)
            .then(|| format!("forbidden capability {name} is exported")),
        RuleCheck::AllowedOps(allowed) => {
            let mut denied: Vec<&str> = Vec::new();
            for b in program.blocks() {
                let op = b.op.as_str();
                if !allowed.iter().any(|a| a == op) && !denied.contains(&op) {
                    denied.push(op);
                }
            }
            (!denied.is_empty()).then(|| format!("ops not allowed: {}", denied.join(", ")))
        }
        RuleCheck::MaxDepth(max) => program
            .blocks()
            .iter()
            .enumerate()
            .map(|(i, b)| (i, b.args_depth()))
            .find(|(_, depth)| depth > max)
            .map(|(i, depth)| format!("blocks[{i}] args depth {depth} exceeds {max}")),
        RuleCheck::RequireMetadata(key) => (!program.metadata().contains_key(key))
            .then(|| format!("metadata key {key} is missing")),
        RuleCheck::AllowedPlugins(allowed) => {
            let denied: Vec<&str> = plugins
                .iter()
                .map(String::as_str)
                .filter(|p| !allowed.iter().any(|a| a == p))
                .collect();
            (!denied.is_empty()).then(|| format!("plugins not allowed: {}", denied.join(", ")))
        }
    }
}
