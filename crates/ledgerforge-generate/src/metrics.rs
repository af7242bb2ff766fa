use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use ledgerforge_core::EntityKind;

/// Counters for one generation run. Owned by the state registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMetrics {
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Successful creations per entity type.
    pub created: BTreeMap<EntityKind, u64>,
    /// Failed creations per entity type.
    pub errors: BTreeMap<EntityKind, u64>,
    pub total_errors: u64,
    pub total_retries: u64,
}

impl Default for GenerationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            ended_at: None,
            created: BTreeMap::new(),
            errors: BTreeMap::new(),
            total_errors: 0,
            total_retries: 0,
        }
    }

    pub fn record_created(&mut self, kind: EntityKind) {
        *self.created.entry(kind).or_insert(0) += 1;
    }

    /// Always bumps the total; bumps the per-type counter only when the
    /// entity type is known.
    pub fn record_error(&mut self, kind: Option<EntityKind>) {
        self.total_errors += 1;
        if let Some(kind) = kind {
            *self.errors.entry(kind).or_insert(0) += 1;
        }
    }

    pub fn record_retries(&mut self, retries: u64) {
        self.total_retries += retries;
    }

    pub fn finish(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    /// Elapsed time; open-ended until `finish` is called.
    pub fn duration(&self) -> Duration {
        self.ended_at.unwrap_or_else(Utc::now) - self.started_at
    }

    pub fn created_count(&self, kind: EntityKind) -> u64 {
        self.created.get(&kind).copied().unwrap_or(0)
    }

    pub fn error_count(&self, kind: EntityKind) -> u64 {
        self.errors.get(&kind).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_entity_type_counts_only_total() {
        let mut metrics = GenerationMetrics::new();
        metrics.record_error(None);
        metrics.record_error(Some(EntityKind::Account));
        assert_eq!(metrics.total_errors, 2);
        assert_eq!(metrics.error_count(EntityKind::Account), 1);
        assert_eq!(metrics.errors.len(), 1);
    }

    #[test]
    fn duration_is_open_until_finished() {
        let mut metrics = GenerationMetrics::new();
        assert!(metrics.ended_at.is_none());
        assert!(metrics.duration() >= Duration::zero());
        metrics.finish();
        assert!(metrics.ended_at.is_some());
    }
}
