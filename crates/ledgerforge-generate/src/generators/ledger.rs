use std::sync::Arc;

use tracing::info;

use ledgerforge_core::{EntityKind, Ledger, LedgerRequest, Status};

use crate::batch::run_sequential;
use crate::errors::GenerationError;
use crate::generators::{GeneratorCtx, resolve_conflict};
use crate::guard::ExecutionGuard;
use crate::retry::RetryPolicy;

pub struct LedgerGenerator {
    ctx: GeneratorCtx,
    guard: Arc<ExecutionGuard>,
}

impl LedgerGenerator {
    pub fn new(ctx: GeneratorCtx) -> Self {
        let guard = Arc::new(ExecutionGuard::new(
            "ledger",
            RetryPolicy::default(),
            Arc::clone(&ctx.registry),
        ));
        Self { ctx, guard }
    }

    /// Resolve the owning organization: explicit argument, else the first
    /// registered one.
    fn resolve_org(&self, org_id: Option<&str>) -> Result<String, GenerationError> {
        org_id
            .map(str::to_string)
            .or_else(|| self.ctx.registry.first_organization())
            .ok_or_else(|| {
                GenerationError::MissingDependency(
                    "no organization available for ledger generation".to_string(),
                )
            })
    }

    pub async fn generate(&self, count: usize, org_id: Option<&str>) -> Vec<Ledger> {
        let org_id = match self.resolve_org(org_id) {
            Ok(org_id) => org_id,
            Err(err) => {
                self.ctx.report_entity_error(EntityKind::Ledger, &err).await;
                return Vec::new();
            }
        };
        let outcome =
            run_sequential("ledgers", count, |_| self.generate_one(Some(org_id.as_str()))).await;
        outcome.results
    }

    pub async fn generate_one(&self, org_id: Option<&str>) -> Result<Ledger, GenerationError> {
        let org_id = self.resolve_org(org_id)?;
        let request = LedgerRequest {
            name: self.ctx.names.ledger_name(),
            status: Status::active(),
            metadata: self.ctx.fingerprint(),
        };
        let payload = self.ctx.payload_json(&request);
        self.ctx.fire_before_entity(EntityKind::Ledger, &payload).await;

        let api = &self.ctx.api;
        let created = self
            .guard
            .execute("create ledger", || api.create_ledger(&org_id, &request))
            .await;

        let ledger = match created {
            Ok(ledger) => ledger,
            Err(err) => {
                let existing = resolve_conflict(err, "ledger", || async {
                    if let Some(found) = self
                        .ctx
                        .cached_entity::<Ledger>(EntityKind::Ledger, &request.name)
                        .filter(|l| l.organization_id == org_id)
                    {
                        return Ok(Some(found));
                    }
                    let ledgers = api.list_ledgers(&org_id).await?;
                    Ok(ledgers.into_iter().find(|l| l.name == request.name))
                })
                .await;
                match existing {
                    Ok(Some(ledger)) => ledger,
                    Ok(None) => {
                        let err = GenerationError::ConflictUnresolved("ledger".to_string());
                        self.ctx.report_entity_error(EntityKind::Ledger, &err).await;
                        return Err(err);
                    }
                    Err(err) => {
                        self.ctx.report_entity_error(EntityKind::Ledger, &err).await;
                        return Err(err);
                    }
                }
            }
        };

        self.ctx.registry.add_ledger(&org_id, &ledger.id);
        let created_payload = self.ctx.payload_json(&ledger);
        self.ctx
            .fire_after_entity(EntityKind::Ledger, &ledger.id, &created_payload)
            .await;
        info!(ledger_id = %ledger.id, organization_id = %org_id, "ledger ready");
        Ok(ledger)
    }
}
