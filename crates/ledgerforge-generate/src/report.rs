use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use ledgerforge_core::EntityKind;

use crate::metrics::GenerationMetrics;

/// Created/error counts for one entity type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityReport {
    pub entity: String,
    pub created: u64,
    pub errors: u64,
}

/// Final report of a generation run, serializable for machine consumption
/// and renderable as a fixed-width summary table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub run_id: String,
    pub volume: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: i64,
    pub entities: Vec<EntityReport>,
    pub total_created: u64,
    pub total_errors: u64,
    pub total_retries: u64,
}

impl GenerationReport {
    pub fn from_metrics(run_id: &str, volume: &str, metrics: &GenerationMetrics) -> Self {
        let entities: Vec<EntityReport> = EntityKind::ALL
            .iter()
            .map(|kind| EntityReport {
                entity: kind.as_str().to_string(),
                created: metrics.created_count(*kind),
                errors: metrics.error_count(*kind),
            })
            .collect();
        let total_created = entities.iter().map(|e| e.created).sum();
        Self {
            run_id: run_id.to_string(),
            volume: volume.to_string(),
            started_at: metrics.started_at,
            ended_at: metrics.ended_at,
            duration_ms: metrics.duration().num_milliseconds(),
            entities,
            total_created,
            total_errors: metrics.total_errors,
            total_retries: metrics.total_retries,
        }
    }

    /// Human-readable summary table for terminal output.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{:<16}{:>10}{:>10}", "Entity", "Created", "Errors");
        let _ = writeln!(out, "{:<16}{:>10}{:>10}", "------", "-------", "------");
        for entity in &self.entities {
            let _ = writeln!(
                out,
                "{:<16}{:>10}{:>10}",
                entity.entity, entity.created, entity.errors
            );
        }
        let _ = writeln!(
            out,
            "{:<16}{:>10}{:>10}",
            "total", self.total_created, self.total_errors
        );
        let _ = writeln!(
            out,
            "retries: {}  duration: {}ms",
            self.total_retries, self.duration_ms
        );
        out
    }
}
