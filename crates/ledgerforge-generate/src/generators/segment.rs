use std::sync::Arc;

use tracing::info;

use ledgerforge_core::{EntityKind, Segment, SegmentRequest, Status};

use crate::batch::run_sequential;
use crate::errors::GenerationError;
use crate::generators::{GeneratorCtx, resolve_conflict};
use crate::guard::ExecutionGuard;
use crate::retry::RetryPolicy;

pub struct SegmentGenerator {
    ctx: GeneratorCtx,
    guard: Arc<ExecutionGuard>,
}

impl SegmentGenerator {
    pub fn new(ctx: GeneratorCtx) -> Self {
        let guard = Arc::new(ExecutionGuard::new(
            "segment",
            RetryPolicy::default(),
            Arc::clone(&ctx.registry),
        ));
        Self { ctx, guard }
    }

    pub async fn generate(&self, count: usize, org_id: &str, ledger_id: &str) -> Vec<Segment> {
        let outcome =
            run_sequential("segments", count, |_| self.generate_one(org_id, ledger_id)).await;
        outcome.results
    }

    pub async fn generate_one(
        &self,
        org_id: &str,
        ledger_id: &str,
    ) -> Result<Segment, GenerationError> {
        let request = SegmentRequest {
            name: self.ctx.names.segment_name(),
            status: Status::active(),
            metadata: self.ctx.fingerprint(),
        };
        let payload = self.ctx.payload_json(&request);
        self.ctx.fire_before_entity(EntityKind::Segment, &payload).await;

        let api = &self.ctx.api;
        let created = self
            .guard
            .execute("create segment", || {
                api.create_segment(org_id, ledger_id, &request)
            })
            .await;

        let segment = match created {
            Ok(segment) => segment,
            Err(err) => {
                let existing = resolve_conflict(err, "segment", || async {
                    if let Some(found) = self
                        .ctx
                        .cached_entity::<Segment>(EntityKind::Segment, &request.name)
                        .filter(|s| s.ledger_id == ledger_id)
                    {
                        return Ok(Some(found));
                    }
                    let segments = api.list_segments(org_id, ledger_id).await?;
                    Ok(segments.into_iter().find(|s| s.name == request.name))
                })
                .await;
                match existing {
                    Ok(Some(segment)) => segment,
                    Ok(None) => {
                        let err = GenerationError::ConflictUnresolved("segment".to_string());
                        self.ctx.report_entity_error(EntityKind::Segment, &err).await;
                        return Err(err);
                    }
                    Err(err) => {
                        self.ctx.report_entity_error(EntityKind::Segment, &err).await;
                        return Err(err);
                    }
                }
            }
        };

        self.ctx.registry.add_segment(ledger_id, &segment.id);
        let created_payload = self.ctx.payload_json(&segment);
        self.ctx
            .fire_after_entity(EntityKind::Segment, &segment.id, &created_payload)
            .await;
        info!(segment_id = %segment.id, ledger_id = %ledger_id, "segment ready");
        Ok(segment)
    }
}
