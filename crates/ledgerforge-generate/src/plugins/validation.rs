use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::warn;

use ledgerforge_core::{EntityKind, rule_set};

use crate::plugins::{EntityEvent, HookPoint, Plugin, PluginError};

/// Built-in plugin running the declarative field rules against every payload
/// before creation. Violations are advisory: logged and counted, never fatal
/// (the remote API is the authority on what it accepts).
#[derive(Debug, Default)]
pub struct ValidationPlugin {
    violations: Mutex<BTreeMap<EntityKind, u64>>,
}

impl ValidationPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn violations_for(&self, kind: EntityKind) -> u64 {
        self.violations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_violations(&self) -> u64 {
        self.violations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .sum()
    }
}

#[async_trait]
impl Plugin for ValidationPlugin {
    fn name(&self) -> &str {
        "validation"
    }

    // Runs ahead of the other built-ins.
    fn priority(&self) -> i32 {
        10
    }

    fn capabilities(&self) -> &'static [HookPoint] {
        &[HookPoint::BeforeEntity]
    }

    async fn on_before_entity(&self, event: &EntityEvent<'_>) -> Result<(), PluginError> {
        let violations = rule_set(event.kind).check(event.payload);
        if violations.is_empty() {
            return Ok(());
        }
        for violation in &violations {
            warn!(
                entity = %violation.entity,
                field = %violation.field,
                message = %violation.message,
                "payload failed validation rule"
            );
        }
        *self
            .violations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(event.kind)
            .or_insert(0) += violations.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn invalid_asset_code_is_counted_not_fatal() {
        let plugin = ValidationPlugin::new();
        let payload = json!({"name": "Bad Coin", "code": "bc"});
        let result = plugin
            .on_before_entity(&EntityEvent {
                kind: EntityKind::Asset,
                id: None,
                payload: &payload,
            })
            .await;
        assert!(result.is_ok());
        assert_eq!(plugin.violations_for(EntityKind::Asset), 1);
    }

    #[tokio::test]
    async fn balanced_transaction_passes() {
        let plugin = ValidationPlugin::new();
        let payload = json!({
            "operations": [
                {"type": "DEBIT", "amount": {"value": 50, "scale": 2}},
                {"type": "CREDIT", "amount": {"value": 50, "scale": 2}},
            ]
        });
        plugin
            .on_before_entity(&EntityEvent {
                kind: EntityKind::Transaction,
                id: None,
                payload: &payload,
            })
            .await
            .ok();
        assert_eq!(plugin.total_violations(), 0);
    }
}
