//! `idb`: storage-access validator over `idb.*` blocks.
//!
//! Sub-policy:
//! ```yaml
//! idb:
//!   stores: [orders, users]   # omitted => any store
//!   read_only: true
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use matrix_verify_core::program::Program;
use matrix_verify_core::report::{PluginResult, PluginViolation};

use super::{blocks_with, location, parse_sub_policy, Plugin, PluginFailure};

const KNOWN_OPS: [&str; 3] = ["idb.get", "idb.put", "idb.query"];

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdbPolicy {
    #[serde(default)]
    stores: Option<Vec<String>>,
    #[serde(default)]
    read_only: bool,
}

#[derive(Debug, Default)]
pub struct IdbPlugin;

impl IdbPlugin {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Plugin for IdbPlugin {
    fn name(&self) -> &'static str {
        "idb"
    }

    async fn validate(
        &self,
        program: &Program,
        sub_policy: &Value,
    ) -> Result<PluginResult, PluginFailure> {
        let policy: IdbPolicy = parse_sub_policy(sub_policy)?;
        let mut out = Vec::new();

        for (i, block) in blocks_with(program, |op| op.starts_with("idb.")) {
            if !KNOWN_OPS.contains(&block.op.as_str()) {
                out.push(
                    PluginViolation::new(
                        "idb.unknown_op",
                        format!("unsupported idb op '{}'", block.op),
                    )
                    .at(location(i)),
                );
                continue;
            }

            let Some(store) = block.arg_str("store") else {
                out.push(
                    PluginViolation::new(
                        "idb.missing_store",
                        format!("{} requires args.store", block.op),
                    )
                    .at(location(i)),
                );
                continue;
            };

            if let Some(allowed) = &policy.stores {
                if !allowed.iter().any(|s| s == store) {
                    out.push(
                        PluginViolation::new(
                            "idb.store_denied",
                            format!("store '{store}' is not allowed"),
                        )
                        .at(location(i)),
                    );
                }
            }

            if policy.read_only && block.op == "idb.put" {
                out.push(
                    PluginViolation::new(
                        "idb.write_denied",
                        format!("write to store '{store}' under read-only policy"),
                    )
                    .at(location(i)),
                );
            }
        }

        Ok(PluginResult::from_violations(self.name(), out))
    }
}
