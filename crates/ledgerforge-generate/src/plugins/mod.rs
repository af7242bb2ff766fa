//! Ordered hook pipeline invoked around generation lifecycle events.
//!
//! Plugins declare which hooks they implement at registration time; dispatch
//! walks a pre-resolved, priority-ordered list per hook, so no per-call
//! capability probing happens. A failing plugin is logged and skipped, never
//! allowed to halt generation or the other plugins.

pub mod cache;
pub mod metrics;
pub mod validation;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use ledgerforge_core::EntityKind;

use crate::metrics::GenerationMetrics;

pub use cache::CachePlugin;
pub use metrics::MetricsPlugin;
pub use validation::ValidationPlugin;

/// Lifecycle points a plugin can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    BeforeGeneration,
    AfterGeneration,
    BeforeEntity,
    AfterEntity,
    EntityError,
    StateChange,
    Checkpoint,
    Restore,
    MetricsUpdate,
    MemoryWarning,
    CustomEvent,
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct PluginError(pub String);

/// Payload passed to the entity hooks.
#[derive(Debug)]
pub struct EntityEvent<'a> {
    pub kind: EntityKind,
    pub id: Option<&'a str>,
    pub payload: &'a Value,
}

/// A generation-lifecycle plugin.
///
/// Only `name` and `capabilities` are required; every hook defaults to a
/// no-op so plugins implement just the subset they declare.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.1.0"
    }

    fn enabled(&self) -> bool {
        true
    }

    /// Lower priority runs first.
    fn priority(&self) -> i32 {
        100
    }

    /// Hooks this plugin implements; resolved once at registration.
    fn capabilities(&self) -> &'static [HookPoint];

    async fn on_before_generation(&self, _run_id: &str) -> Result<(), PluginError> {
        Ok(())
    }

    async fn on_after_generation(
        &self,
        _run_id: &str,
        _metrics: &GenerationMetrics,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    async fn on_before_entity(&self, _event: &EntityEvent<'_>) -> Result<(), PluginError> {
        Ok(())
    }

    async fn on_after_entity(&self, _event: &EntityEvent<'_>) -> Result<(), PluginError> {
        Ok(())
    }

    async fn on_entity_error(
        &self,
        _kind: EntityKind,
        _message: &str,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    async fn on_state_change(&self, _from: &str, _to: &str) -> Result<(), PluginError> {
        Ok(())
    }

    async fn on_checkpoint(&self, _snapshot: &Value) -> Result<(), PluginError> {
        Ok(())
    }

    async fn on_restore(&self, _snapshot: &Value) -> Result<(), PluginError> {
        Ok(())
    }

    async fn on_metrics_update(&self, _metrics: &GenerationMetrics) -> Result<(), PluginError> {
        Ok(())
    }

    async fn on_memory_warning(&self, _bytes_used: u64) -> Result<(), PluginError> {
        Ok(())
    }

    async fn on_custom_event(&self, _name: &str, _payload: &Value) -> Result<(), PluginError> {
        Ok(())
    }

    /// Explicit teardown at the end of the process's use of the manager.
    async fn teardown(&self) {}
}

/// Priority-ordered plugin pipeline with per-hook dispatch lists.
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
    dispatch: HashMap<HookPoint, Vec<Arc<dyn Plugin>>>,
    cache: Option<Arc<CachePlugin>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the cache plugin, keeping a typed handle so the generators
    /// can consult it when resolving conflicts.
    pub fn register_cache(&mut self, cache: Arc<CachePlugin>) {
        self.cache = Some(Arc::clone(&cache));
        self.register(cache);
    }

    pub fn cache(&self) -> Option<&Arc<CachePlugin>> {
        self.cache.as_ref()
    }

    /// Register a plugin; disabled plugins are recorded but never dispatched.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        if !plugin.enabled() {
            info!(plugin = plugin.name(), "plugin disabled, skipping registration");
            self.plugins.push(plugin);
            return;
        }
        info!(
            plugin = plugin.name(),
            version = plugin.version(),
            priority = plugin.priority(),
            "plugin registered"
        );
        for hook in plugin.capabilities() {
            let list = self.dispatch.entry(*hook).or_default();
            list.push(Arc::clone(&plugin));
            list.sort_by_key(|p| p.priority());
        }
        self.plugins.push(plugin);
    }

    pub fn registered(&self) -> usize {
        self.plugins.len()
    }

    fn list(&self, hook: HookPoint) -> &[Arc<dyn Plugin>] {
        self.dispatch.get(&hook).map(Vec::as_slice).unwrap_or(&[])
    }

    pub async fn before_generation(&self, run_id: &str) {
        for plugin in self.list(HookPoint::BeforeGeneration) {
            if let Err(err) = plugin.on_before_generation(run_id).await {
                warn!(plugin = plugin.name(), error = %err, "before_generation hook failed");
            }
        }
    }

    pub async fn after_generation(&self, run_id: &str, metrics: &GenerationMetrics) {
        for plugin in self.list(HookPoint::AfterGeneration) {
            if let Err(err) = plugin.on_after_generation(run_id, metrics).await {
                warn!(plugin = plugin.name(), error = %err, "after_generation hook failed");
            }
        }
    }

    pub async fn before_entity(&self, event: &EntityEvent<'_>) {
        for plugin in self.list(HookPoint::BeforeEntity) {
            if let Err(err) = plugin.on_before_entity(event).await {
                warn!(plugin = plugin.name(), error = %err, "before_entity hook failed");
            }
        }
    }

    pub async fn after_entity(&self, event: &EntityEvent<'_>) {
        for plugin in self.list(HookPoint::AfterEntity) {
            if let Err(err) = plugin.on_after_entity(event).await {
                warn!(plugin = plugin.name(), error = %err, "after_entity hook failed");
            }
        }
    }

    pub async fn entity_error(&self, kind: EntityKind, message: &str) {
        for plugin in self.list(HookPoint::EntityError) {
            if let Err(err) = plugin.on_entity_error(kind, message).await {
                warn!(plugin = plugin.name(), error = %err, "entity_error hook failed");
            }
        }
    }

    pub async fn state_change(&self, from: &str, to: &str) {
        for plugin in self.list(HookPoint::StateChange) {
            if let Err(err) = plugin.on_state_change(from, to).await {
                warn!(plugin = plugin.name(), error = %err, "state_change hook failed");
            }
        }
    }

    pub async fn checkpoint(&self, snapshot: &Value) {
        for plugin in self.list(HookPoint::Checkpoint) {
            if let Err(err) = plugin.on_checkpoint(snapshot).await {
                warn!(plugin = plugin.name(), error = %err, "checkpoint hook failed");
            }
        }
    }

    pub async fn restore(&self, snapshot: &Value) {
        for plugin in self.list(HookPoint::Restore) {
            if let Err(err) = plugin.on_restore(snapshot).await {
                warn!(plugin = plugin.name(), error = %err, "restore hook failed");
            }
        }
    }

    pub async fn metrics_update(&self, metrics: &GenerationMetrics) {
        for plugin in self.list(HookPoint::MetricsUpdate) {
            if let Err(err) = plugin.on_metrics_update(metrics).await {
                warn!(plugin = plugin.name(), error = %err, "metrics_update hook failed");
            }
        }
    }

    pub async fn memory_warning(&self, bytes_used: u64) {
        for plugin in self.list(HookPoint::MemoryWarning) {
            if let Err(err) = plugin.on_memory_warning(bytes_used).await {
                warn!(plugin = plugin.name(), error = %err, "memory_warning hook failed");
            }
        }
    }

    pub async fn custom_event(&self, name: &str, payload: &Value) {
        for plugin in self.list(HookPoint::CustomEvent) {
            if let Err(err) = plugin.on_custom_event(name, payload).await {
                warn!(plugin = plugin.name(), error = %err, "custom event hook failed");
            }
        }
    }

    pub async fn shutdown(&self) {
        for plugin in &self.plugins {
            plugin.teardown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recorder {
        name: &'static str,
        priority: i32,
        enabled: bool,
        fail: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Plugin for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn enabled(&self) -> bool {
            self.enabled
        }

        fn capabilities(&self) -> &'static [HookPoint] {
            &[HookPoint::BeforeEntity]
        }

        async fn on_before_entity(&self, _event: &EntityEvent<'_>) -> Result<(), PluginError> {
            self.log
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(self.name.to_string());
            if self.fail {
                Err(PluginError("synthetic failure".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn event(payload: &Value) -> EntityEvent<'_> {
        EntityEvent {
            kind: EntityKind::Asset,
            id: None,
            payload,
        }
    }

    #[tokio::test]
    async fn hooks_run_in_priority_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = PluginManager::new();
        manager.register(Arc::new(Recorder {
            name: "late",
            priority: 200,
            enabled: true,
            fail: false,
            log: Arc::clone(&log),
        }));
        manager.register(Arc::new(Recorder {
            name: "early",
            priority: 1,
            enabled: true,
            fail: false,
            log: Arc::clone(&log),
        }));

        let payload = serde_json::json!({});
        manager.before_entity(&event(&payload)).await;
        let seen = log.lock().unwrap_or_else(|e| e.into_inner()).clone();
        assert_eq!(seen, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn failing_plugin_does_not_block_others() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = PluginManager::new();
        manager.register(Arc::new(Recorder {
            name: "bad",
            priority: 1,
            enabled: true,
            fail: true,
            log: Arc::clone(&log),
        }));
        manager.register(Arc::new(Recorder {
            name: "good",
            priority: 2,
            enabled: true,
            fail: false,
            log: Arc::clone(&log),
        }));

        let payload = serde_json::json!({});
        manager.before_entity(&event(&payload)).await;
        let seen = log.lock().unwrap_or_else(|e| e.into_inner()).clone();
        assert_eq!(seen, vec!["bad", "good"]);
    }

    #[tokio::test]
    async fn disabled_plugin_is_never_dispatched() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = PluginManager::new();
        manager.register(Arc::new(Recorder {
            name: "off",
            priority: 1,
            enabled: false,
            fail: false,
            log: Arc::clone(&log),
        }));

        let payload = serde_json::json!({});
        manager.before_entity(&event(&payload)).await;
        assert!(log.lock().unwrap_or_else(|e| e.into_inner()).is_empty());
        assert_eq!(manager.registered(), 1);
    }
}
