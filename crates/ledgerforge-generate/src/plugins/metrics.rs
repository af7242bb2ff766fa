use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use ledgerforge_core::EntityKind;

use crate::metrics::GenerationMetrics;
use crate::plugins::{EntityEvent, HookPoint, Plugin, PluginError};

#[derive(Debug, Default)]
struct Aggregation {
    run_started: Option<Instant>,
    entity_counts: BTreeMap<EntityKind, u64>,
    metrics_updates: u64,
}

/// Built-in plugin aggregating timing and per-entity counts across a run.
#[derive(Debug, Default)]
pub struct MetricsPlugin {
    agg: Mutex<Aggregation>,
}

impl MetricsPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    fn agg(&self) -> std::sync::MutexGuard<'_, Aggregation> {
        self.agg.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn entity_count(&self, kind: EntityKind) -> u64 {
        self.agg().entity_counts.get(&kind).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Plugin for MetricsPlugin {
    fn name(&self) -> &str {
        "metrics"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn capabilities(&self) -> &'static [HookPoint] {
        &[
            HookPoint::BeforeGeneration,
            HookPoint::AfterEntity,
            HookPoint::AfterGeneration,
            HookPoint::MetricsUpdate,
        ]
    }

    async fn on_before_generation(&self, _run_id: &str) -> Result<(), PluginError> {
        let mut agg = self.agg();
        *agg = Aggregation {
            run_started: Some(Instant::now()),
            ..Aggregation::default()
        };
        Ok(())
    }

    async fn on_after_entity(&self, event: &EntityEvent<'_>) -> Result<(), PluginError> {
        *self.agg().entity_counts.entry(event.kind).or_insert(0) += 1;
        Ok(())
    }

    async fn on_metrics_update(&self, _metrics: &GenerationMetrics) -> Result<(), PluginError> {
        self.agg().metrics_updates += 1;
        Ok(())
    }

    async fn on_after_generation(
        &self,
        run_id: &str,
        metrics: &GenerationMetrics,
    ) -> Result<(), PluginError> {
        let agg = self.agg();
        let elapsed_ms = agg
            .run_started
            .map(|at| at.elapsed().as_millis() as u64)
            .unwrap_or(0);
        info!(
            run_id,
            elapsed_ms,
            entities = agg.entity_counts.values().sum::<u64>(),
            errors = metrics.total_errors,
            retries = metrics.total_retries,
            "metrics plugin summary"
        );
        Ok(())
    }
}
