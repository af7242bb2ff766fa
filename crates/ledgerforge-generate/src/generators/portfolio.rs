use std::sync::Arc;

use tracing::info;

use ledgerforge_core::{EntityKind, Portfolio, PortfolioRequest, Status};

use crate::batch::run_sequential;
use crate::errors::GenerationError;
use crate::generators::{GeneratorCtx, resolve_conflict};
use crate::guard::ExecutionGuard;
use crate::retry::RetryPolicy;

pub struct PortfolioGenerator {
    ctx: GeneratorCtx,
    guard: Arc<ExecutionGuard>,
}

impl PortfolioGenerator {
    pub fn new(ctx: GeneratorCtx) -> Self {
        let guard = Arc::new(ExecutionGuard::new(
            "portfolio",
            RetryPolicy::default(),
            Arc::clone(&ctx.registry),
        ));
        Self { ctx, guard }
    }

    pub async fn generate(&self, count: usize, org_id: &str, ledger_id: &str) -> Vec<Portfolio> {
        let outcome = run_sequential("portfolios", count, |_| {
            self.generate_one(org_id, ledger_id)
        })
        .await;
        outcome.results
    }

    pub async fn generate_one(
        &self,
        org_id: &str,
        ledger_id: &str,
    ) -> Result<Portfolio, GenerationError> {
        let request = PortfolioRequest {
            name: self.ctx.names.portfolio_name(),
            status: Status::active(),
            metadata: self.ctx.fingerprint(),
        };
        let payload = self.ctx.payload_json(&request);
        self.ctx
            .fire_before_entity(EntityKind::Portfolio, &payload)
            .await;

        let api = &self.ctx.api;
        let created = self
            .guard
            .execute("create portfolio", || {
                api.create_portfolio(org_id, ledger_id, &request)
            })
            .await;

        let portfolio = match created {
            Ok(portfolio) => portfolio,
            Err(err) => {
                let existing = resolve_conflict(err, "portfolio", || async {
                    if let Some(found) = self
                        .ctx
                        .cached_entity::<Portfolio>(EntityKind::Portfolio, &request.name)
                        .filter(|p| p.ledger_id == ledger_id)
                    {
                        return Ok(Some(found));
                    }
                    let portfolios = api.list_portfolios(org_id, ledger_id).await?;
                    Ok(portfolios.into_iter().find(|p| p.name == request.name))
                })
                .await;
                match existing {
                    Ok(Some(portfolio)) => portfolio,
                    Ok(None) => {
                        let err = GenerationError::ConflictUnresolved("portfolio".to_string());
                        self.ctx
                            .report_entity_error(EntityKind::Portfolio, &err)
                            .await;
                        return Err(err);
                    }
                    Err(err) => {
                        self.ctx
                            .report_entity_error(EntityKind::Portfolio, &err)
                            .await;
                        return Err(err);
                    }
                }
            }
        };

        self.ctx.registry.add_portfolio(ledger_id, &portfolio.id);
        let created_payload = self.ctx.payload_json(&portfolio);
        self.ctx
            .fire_after_entity(EntityKind::Portfolio, &portfolio.id, &created_payload)
            .await;
        info!(portfolio_id = %portfolio.id, ledger_id = %ledger_id, "portfolio ready");
        Ok(portfolio)
    }
}
