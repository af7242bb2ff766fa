use std::sync::Arc;

use tracing::info;

use ledgerforge_core::{Asset, EntityKind, Status};

use crate::batch::run_sequential;
use crate::errors::GenerationError;
use crate::generators::{AssetSpec, GeneratorCtx, resolve_conflict};
use crate::guard::ExecutionGuard;
use crate::retry::RetryPolicy;

/// Creates the asset set for a ledger from the curated asset pool; the
/// default currency is always the first asset created.
pub struct AssetGenerator {
    ctx: GeneratorCtx,
    guard: Arc<ExecutionGuard>,
}

impl AssetGenerator {
    pub fn new(ctx: GeneratorCtx) -> Self {
        let guard = Arc::new(ExecutionGuard::new(
            "asset",
            RetryPolicy::default(),
            Arc::clone(&ctx.registry),
        ));
        Self { ctx, guard }
    }

    pub async fn generate(&self, count: usize, org_id: &str, ledger_id: &str) -> Vec<Asset> {
        let specs = self.ctx.names.asset_specs(count);
        let outcome = run_sequential("assets", specs.len(), |index| {
            self.generate_one(org_id, ledger_id, specs[index])
        })
        .await;
        outcome.results
    }

    pub async fn generate_one(
        &self,
        org_id: &str,
        ledger_id: &str,
        spec: AssetSpec,
    ) -> Result<Asset, GenerationError> {
        let request = ledgerforge_core::AssetRequest {
            name: spec.name.to_string(),
            code: spec.code.to_string(),
            asset_type: spec.class.as_str().to_string(),
            status: Status::active(),
            metadata: self.ctx.fingerprint(),
        };
        let payload = self.ctx.payload_json(&request);
        self.ctx.fire_before_entity(EntityKind::Asset, &payload).await;

        let api = &self.ctx.api;
        let created = self
            .guard
            .execute("create asset", || {
                api.create_asset(org_id, ledger_id, &request)
            })
            .await;

        let asset = match created {
            Ok(asset) => asset,
            Err(err) => {
                let existing = resolve_conflict(err, "asset", || async {
                    // Codes are only unique per ledger, so a cached hit from
                    // another ledger must fall through to the listing.
                    if let Some(found) = self
                        .ctx
                        .cached_entity::<Asset>(EntityKind::Asset, &request.code)
                        .filter(|a| a.ledger_id == ledger_id)
                    {
                        return Ok(Some(found));
                    }
                    let assets = api.list_assets(org_id, ledger_id).await?;
                    Ok(assets.into_iter().find(|a| a.code == request.code))
                })
                .await;
                match existing {
                    Ok(Some(asset)) => asset,
                    Ok(None) => {
                        let err = GenerationError::ConflictUnresolved("asset".to_string());
                        self.ctx.report_entity_error(EntityKind::Asset, &err).await;
                        return Err(err);
                    }
                    Err(err) => {
                        self.ctx.report_entity_error(EntityKind::Asset, &err).await;
                        return Err(err);
                    }
                }
            }
        };

        self.ctx.registry.add_asset(ledger_id, &asset.id, &asset.code);
        let created_payload = self.ctx.payload_json(&asset);
        self.ctx
            .fire_after_entity(EntityKind::Asset, &asset.id, &created_payload)
            .await;
        info!(asset_id = %asset.id, code = %asset.code, ledger_id = %ledger_id, "asset ready");
        Ok(asset)
    }
}
