use std::collections::HashMap;
use std::sync::Mutex;

use ledgerforge_core::{DEFAULT_ASSET_CODE, EntityKind};

use crate::metrics::GenerationMetrics;

/// IDs, aliases, and relationships produced during one generation run.
///
/// Referential integrity is caller-enforced: child maps are keyed by parent
/// IDs the callers previously registered, but the registry does not verify
/// that. Insertion order within a map value reflects completion order, which
/// is not deterministic across concurrent batches.
#[derive(Debug, Default)]
struct GeneratorState {
    organization_ids: Vec<String>,
    /// organization ID → ledger IDs.
    ledger_ids: HashMap<String, Vec<String>>,
    /// ledger ID → asset IDs / codes.
    asset_ids: HashMap<String, Vec<String>>,
    asset_codes: HashMap<String, Vec<String>>,
    /// ledger ID → portfolio / segment IDs.
    portfolio_ids: HashMap<String, Vec<String>>,
    segment_ids: HashMap<String, Vec<String>>,
    /// ledger ID → account IDs / aliases (parallel, same insertion order).
    account_ids: HashMap<String, Vec<String>>,
    account_aliases: HashMap<String, Vec<String>>,
    /// ledger ID → transaction IDs.
    transaction_ids: HashMap<String, Vec<String>>,
    /// ledger ID → account ID → asset code.
    account_assets: HashMap<String, HashMap<String, String>>,
}

/// Run-scoped store of everything generated so far, plus run metrics.
///
/// Explicitly constructed and passed by `Arc` into every generator; call
/// [`StateRegistry::reset`] before reusing a process for a second run.
#[derive(Debug, Default)]
pub struct StateRegistry {
    state: Mutex<GeneratorState>,
    metrics: Mutex<GenerationMetrics>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, GeneratorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn metrics(&self) -> std::sync::MutexGuard<'_, GenerationMetrics> {
        self.metrics.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Clear all maps and metrics. Required between runs to avoid ID leakage.
    pub fn reset(&self) {
        *self.state() = GeneratorState::default();
        *self.metrics() = GenerationMetrics::new();
    }

    pub fn add_organization(&self, id: impl Into<String>) {
        self.state().organization_ids.push(id.into());
        self.metrics().record_created(EntityKind::Organization);
    }

    pub fn add_ledger(&self, org_id: &str, id: impl Into<String>) {
        self.state()
            .ledger_ids
            .entry(org_id.to_string())
            .or_default()
            .push(id.into());
        self.metrics().record_created(EntityKind::Ledger);
    }

    pub fn add_asset(&self, ledger_id: &str, id: impl Into<String>, code: impl Into<String>) {
        {
            let mut state = self.state();
            state
                .asset_ids
                .entry(ledger_id.to_string())
                .or_default()
                .push(id.into());
            state
                .asset_codes
                .entry(ledger_id.to_string())
                .or_default()
                .push(code.into());
        }
        self.metrics().record_created(EntityKind::Asset);
    }

    pub fn add_portfolio(&self, ledger_id: &str, id: impl Into<String>) {
        self.state()
            .portfolio_ids
            .entry(ledger_id.to_string())
            .or_default()
            .push(id.into());
        self.metrics().record_created(EntityKind::Portfolio);
    }

    pub fn add_segment(&self, ledger_id: &str, id: impl Into<String>) {
        self.state()
            .segment_ids
            .entry(ledger_id.to_string())
            .or_default()
            .push(id.into());
        self.metrics().record_created(EntityKind::Segment);
    }

    pub fn add_account(&self, ledger_id: &str, id: impl Into<String>, alias: Option<&str>) {
        {
            let id = id.into();
            let mut state = self.state();
            state
                .account_aliases
                .entry(ledger_id.to_string())
                .or_default()
                .push(alias.map(str::to_string).unwrap_or_else(|| id.clone()));
            state
                .account_ids
                .entry(ledger_id.to_string())
                .or_default()
                .push(id);
        }
        self.metrics().record_created(EntityKind::Account);
    }

    pub fn add_transaction(&self, ledger_id: &str, id: impl Into<String>) {
        self.state()
            .transaction_ids
            .entry(ledger_id.to_string())
            .or_default()
            .push(id.into());
        self.metrics().record_created(EntityKind::Transaction);
    }

    pub fn organization_ids(&self) -> Vec<String> {
        self.state().organization_ids.clone()
    }

    pub fn first_organization(&self) -> Option<String> {
        self.state().organization_ids.first().cloned()
    }

    pub fn ledger_ids(&self, org_id: &str) -> Vec<String> {
        self.state().ledger_ids.get(org_id).cloned().unwrap_or_default()
    }

    pub fn first_ledger(&self, org_id: &str) -> Option<String> {
        self.state()
            .ledger_ids
            .get(org_id)
            .and_then(|ids| ids.first().cloned())
    }

    pub fn asset_ids(&self, ledger_id: &str) -> Vec<String> {
        self.state().asset_ids.get(ledger_id).cloned().unwrap_or_default()
    }

    pub fn asset_codes(&self, ledger_id: &str) -> Vec<String> {
        self.state()
            .asset_codes
            .get(ledger_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn portfolio_ids(&self, ledger_id: &str) -> Vec<String> {
        self.state()
            .portfolio_ids
            .get(ledger_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn segment_ids(&self, ledger_id: &str) -> Vec<String> {
        self.state()
            .segment_ids
            .get(ledger_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn account_ids(&self, ledger_id: &str) -> Vec<String> {
        self.state()
            .account_ids
            .get(ledger_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn account_aliases(&self, ledger_id: &str) -> Vec<String> {
        self.state()
            .account_aliases
            .get(ledger_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn transaction_ids(&self, ledger_id: &str) -> Vec<String> {
        self.state()
            .transaction_ids
            .get(ledger_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_account_asset(&self, ledger_id: &str, account_id: &str, code: impl Into<String>) {
        self.state()
            .account_assets
            .entry(ledger_id.to_string())
            .or_default()
            .insert(account_id.to_string(), code.into());
    }

    /// Asset held by an account. Falls back to the default currency so
    /// downstream consumers never observe "no asset".
    pub fn account_asset(&self, ledger_id: &str, account_id: &str) -> String {
        self.state()
            .account_assets
            .get(ledger_id)
            .and_then(|accounts| accounts.get(account_id))
            .cloned()
            .unwrap_or_else(|| DEFAULT_ASSET_CODE.to_string())
    }

    /// Whether the account's asset has been explicitly registered.
    pub fn has_account_asset(&self, ledger_id: &str, account_id: &str) -> bool {
        self.state()
            .account_assets
            .get(ledger_id)
            .is_some_and(|accounts| accounts.contains_key(account_id))
    }

    pub fn record_error(&self, kind: Option<EntityKind>) {
        self.metrics().record_error(kind);
    }

    pub fn record_retries(&self, retries: u64) {
        if retries > 0 {
            self.metrics().record_retries(retries);
        }
    }

    pub fn finish_metrics(&self) {
        self.metrics().finish();
    }

    pub fn metrics_snapshot(&self) -> GenerationMetrics {
        self.metrics().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_parent_returns_empty() {
        let registry = StateRegistry::new();
        assert!(registry.ledger_ids("nope").is_empty());
        assert!(registry.account_ids("nope").is_empty());
    }

    #[test]
    fn add_auto_initializes_and_counts() {
        let registry = StateRegistry::new();
        registry.add_organization("org-1");
        registry.add_ledger("org-1", "led-1");
        registry.add_asset("led-1", "ast-1", "USD");
        registry.add_account("led-1", "acc-1", Some("alias-1"));

        assert_eq!(registry.ledger_ids("org-1"), vec!["led-1"]);
        assert_eq!(registry.asset_codes("led-1"), vec!["USD"]);
        assert_eq!(registry.account_aliases("led-1"), vec!["alias-1"]);

        let metrics = registry.metrics_snapshot();
        assert_eq!(metrics.created_count(EntityKind::Organization), 1);
        assert_eq!(metrics.created_count(EntityKind::Account), 1);
    }

    #[test]
    fn account_asset_defaults_to_usd() {
        let registry = StateRegistry::new();
        assert_eq!(registry.account_asset("led-1", "acc-1"), "USD");
        registry.set_account_asset("led-1", "acc-1", "BTC");
        assert_eq!(registry.account_asset("led-1", "acc-1"), "BTC");
        assert!(registry.has_account_asset("led-1", "acc-1"));
    }

    #[test]
    fn reset_clears_state_and_metrics() {
        let registry = StateRegistry::new();
        registry.add_organization("org-1");
        registry.record_error(Some(EntityKind::Ledger));
        registry.reset();
        assert!(registry.organization_ids().is_empty());
        assert_eq!(registry.metrics_snapshot().total_errors, 0);
    }

    #[test]
    fn alias_falls_back_to_account_id() {
        let registry = StateRegistry::new();
        registry.add_account("led-1", "acc-9", None);
        assert_eq!(registry.account_aliases("led-1"), vec!["acc-9"]);
    }
}
