//! `kql`: query validator over the `args.kql` object of `idb.query` and
//! `kql.compile` blocks.
//!
//! Pattern matching runs over the canonical JSON text of the query and is
//! case-insensitive.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use matrix_verify_core::program::Program;
use matrix_verify_core::report::{PluginResult, PluginViolation};

use super::{blocks_with, location, parse_sub_policy, Plugin, PluginFailure};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct KqlPolicy {
    #[serde(default)]
    forbidden_patterns: Vec<String>,
    #[serde(default)]
    max_limit: Option<u64>,
}

#[derive(Debug, Default)]
pub struct KqlPlugin;

impl KqlPlugin {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Plugin for KqlPlugin {
    fn name(&self) -> &'static str {
        "kql"
    }

    async fn validate(
        &self,
        program: &Program,
        sub_policy: &Value,
    ) -> Result<PluginResult, PluginFailure> {
        let policy: KqlPolicy = parse_sub_policy(sub_policy)?;
        if policy.forbidden_patterns.iter().any(String::is_empty) {
            return Err(PluginFailure::SubPolicy(
                "forbidden_patterns must not contain empty strings".into(),
            ));
        }
        let patterns: Vec<(String, &str)> = policy
            .forbidden_patterns
            .iter()
            .map(|p| (p.to_uppercase(), p.as_str()))
            .collect();

        let mut out = Vec::new();

        for (i, block) in blocks_with(program, |op| op == "idb.query" || op == "kql.compile") {
            let at = location(i);
            let Some(query) = block.args.get("kql").and_then(Value::as_object) else {
                out.push(
                    PluginViolation::new(
                        "kql.missing_query",
                        format!("{} requires an args.kql object", block.op),
                    )
                    .at(at),
                );
                continue;
            };

            if let (Some(store), Some(source)) = (block.arg_str("store"), first_source(query)) {
                if store != source {
                    out.push(
                        PluginViolation::new(
                            "kql.source_mismatch",
                            format!("query source '{source}' does not match store '{store}'"),
                        )
                        .at(at.clone()),
                    );
                }
            }

            if let Some(max) = policy.max_limit {
                match query.get("LIMIT") {
                    None => out.push(
                        PluginViolation::new(
                            "kql.unbounded",
                            format!("query has no LIMIT (max {max})"),
                        )
                        .at(at.clone()),
                    ),
                    Some(v) => match v.as_u64() {
                        Some(n) if n > max => out.push(
                            PluginViolation::new(
                                "kql.limit_exceeded",
                                format!("LIMIT {n} exceeds {max}"),
                            )
                            .at(at.clone()),
                        ),
                        Some(_) => {}
                        None => out.push(
                            PluginViolation::new(
                                "kql.invalid_limit",
                                "LIMIT must be a non-negative integer",
                            )
                            .at(at.clone()),
                        ),
                    },
                }
            }

            let text = Value::Object(query.clone()).to_string().to_uppercase();
            for (upper, original) in &patterns {
                if text.contains(upper.as_str()) {
                    out.push(
                        PluginViolation::new(
                            "kql.forbidden_pattern",
                            format!("forbidden pattern '{original}'"),
                        )
                        .at(at.clone()),
                    );
                }
            }
        }

        Ok(PluginResult::from_violations(self.name(), out))
    }
}

fn first_source(query: &serde_json::Map<String, Value>) -> Option<&str> {
    query.get("FROM")?.get("sources")?.get(0)?.as_str()
}
