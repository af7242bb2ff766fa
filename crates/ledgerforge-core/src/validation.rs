use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::entity::EntityKind;
use crate::error::{Error, Result};

/// One declarative check applied to a request payload field.
#[derive(Debug, Clone, Copy)]
enum Check {
    /// Field must be a non-empty string.
    NonEmptyString,
    /// Field must match the asset-code pattern `^[A-Z]{3,10}$`.
    AssetCode,
    /// Array field must contain at least this many items.
    MinItems(usize),
    /// Operations array must have matching CREDIT and DEBIT value sums.
    BalancedOperations,
}

/// Declarative field rule for one entity type.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    field: &'static str,
    check: Check,
}

/// A rule violation. Advisory by default: the remote API is the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub entity: EntityKind,
    pub field: String,
    pub message: String,
}

/// The rules applicable to one entity type.
#[derive(Debug, Clone)]
pub struct RuleSet {
    entity: EntityKind,
    rules: &'static [FieldRule],
}

/// Look up the rule set for an entity type.
pub fn rule_set(entity: EntityKind) -> RuleSet {
    let rules: &'static [FieldRule] = match entity {
        EntityKind::Organization => &[FieldRule {
            field: "legalName",
            check: Check::NonEmptyString,
        }],
        EntityKind::Ledger | EntityKind::Portfolio | EntityKind::Segment => &[FieldRule {
            field: "name",
            check: Check::NonEmptyString,
        }],
        EntityKind::Asset => &[
            FieldRule {
                field: "name",
                check: Check::NonEmptyString,
            },
            FieldRule {
                field: "code",
                check: Check::AssetCode,
            },
        ],
        EntityKind::Account => &[
            FieldRule {
                field: "alias",
                check: Check::NonEmptyString,
            },
            FieldRule {
                field: "assetCode",
                check: Check::AssetCode,
            },
        ],
        EntityKind::Transaction => &[
            FieldRule {
                field: "operations",
                check: Check::MinItems(2),
            },
            FieldRule {
                field: "operations",
                check: Check::BalancedOperations,
            },
        ],
    };
    RuleSet { entity, rules }
}

impl RuleSet {
    /// Run every rule against a serialized request payload.
    pub fn check(&self, payload: &Value) -> Vec<Violation> {
        let mut violations = Vec::new();
        for rule in self.rules {
            if let Some(message) = check_field(rule, payload) {
                violations.push(Violation {
                    entity: self.entity,
                    field: rule.field.to_string(),
                    message,
                });
            }
        }
        violations
    }

    /// Fatal variant of [`check`](Self::check): any violation becomes an
    /// error. For call sites where an invalid payload should fail that
    /// single item instead of being logged and sent anyway.
    pub fn validate(&self, payload: &Value) -> Result<()> {
        let violations = self.check(payload);
        if violations.is_empty() {
            return Ok(());
        }
        let detail = violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(Error::Validation(format!("{} payload: {detail}", self.entity)))
    }
}

fn asset_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[A-Z]{3,10}$").expect("static pattern is valid"))
}

fn check_field(rule: &FieldRule, payload: &Value) -> Option<String> {
    let value = payload.get(rule.field);
    match rule.check {
        Check::NonEmptyString => match value.and_then(Value::as_str) {
            Some(s) if !s.trim().is_empty() => None,
            Some(_) => Some("must not be empty".to_string()),
            None => Some("missing or not a string".to_string()),
        },
        Check::AssetCode => match value.and_then(Value::as_str) {
            Some(code) if asset_code_pattern().is_match(code) => None,
            Some(code) => Some(format!("'{code}' does not match ^[A-Z]{{3,10}}$")),
            None => Some("missing or not a string".to_string()),
        },
        Check::MinItems(min) => match value.and_then(Value::as_array) {
            Some(items) if items.len() >= min => None,
            Some(items) => Some(format!("has {} items, expected at least {min}", items.len())),
            None => Some("missing or not an array".to_string()),
        },
        Check::BalancedOperations => {
            let Some(items) = value.and_then(Value::as_array) else {
                return Some("missing or not an array".to_string());
            };
            let mut credit = 0_i64;
            let mut debit = 0_i64;
            for op in items {
                let amount = op
                    .get("amount")
                    .and_then(|a| a.get("value"))
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                match op.get("type").and_then(Value::as_str) {
                    Some("CREDIT") => credit += amount,
                    Some("DEBIT") => debit += amount,
                    _ => return Some("operation has unknown type".to_string()),
                }
            }
            if credit == debit {
                None
            } else {
                Some(format!("credit total {credit} != debit total {debit}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn asset_code_rule_flags_lowercase() {
        let rules = rule_set(EntityKind::Asset);
        let violations = rules.check(&json!({"name": "Bitcoin", "code": "btc"}));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "code");
    }

    #[test]
    fn asset_code_rule_passes_valid_code() {
        let rules = rule_set(EntityKind::Asset);
        assert!(rules.check(&json!({"name": "Bitcoin", "code": "BTC"})).is_empty());
    }

    #[test]
    fn transaction_requires_two_balanced_operations() {
        let rules = rule_set(EntityKind::Transaction);
        let unbalanced = json!({
            "operations": [
                {"type": "DEBIT", "amount": {"value": 100, "scale": 2}},
                {"type": "CREDIT", "amount": {"value": 90, "scale": 2}},
            ]
        });
        let violations = rules.check(&unbalanced);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("credit total"));

        let single = json!({
            "operations": [
                {"type": "DEBIT", "amount": {"value": 100, "scale": 2}},
            ]
        });
        // One violation for the missing leg, one for the imbalance.
        assert_eq!(rules.check(&single).len(), 2);
    }

    #[test]
    fn validate_turns_violations_into_an_error() {
        let rules = rule_set(EntityKind::Asset);
        let err = rules
            .validate(&json!({"name": "Bitcoin", "code": "btc"}))
            .unwrap_err();
        assert!(err.to_string().contains("code"));
        assert!(rules.validate(&json!({"name": "Bitcoin", "code": "BTC"})).is_ok());
    }

    #[test]
    fn organization_requires_legal_name() {
        let rules = rule_set(EntityKind::Organization);
        assert_eq!(rules.check(&json!({"legalName": "  "})).len(), 1);
        assert!(rules.check(&json!({"legalName": "Acme Corp"})).is_empty());
    }
}
