use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use ledgerforge_client::LedgerApi;
use ledgerforge_core::GeneratorConfig;

use crate::errors::GenerationError;
use crate::generators::{
    AccountGenerator, AssetGenerator, GeneratorCtx, LedgerGenerator, NameFactory,
    OrganizationGenerator, PortfolioGenerator, SegmentGenerator,
};
use crate::plugins::PluginManager;
use crate::registry::StateRegistry;
use crate::report::GenerationReport;
use crate::transactions::TransactionOrchestrator;

/// Top-level generator: walks the entity hierarchy for the configured
/// volume and always produces a report, however much failed along the way.
pub struct GenerationEngine {
    ctx: GeneratorCtx,
    run_id: String,
}

impl GenerationEngine {
    pub fn new(
        api: Arc<dyn LedgerApi>,
        registry: Arc<StateRegistry>,
        plugins: Arc<PluginManager>,
        config: GeneratorConfig,
    ) -> Result<Self, GenerationError> {
        config.validate()?;
        let names = Arc::new(NameFactory::new(config.seed));
        let ctx = GeneratorCtx {
            api,
            registry,
            plugins,
            names,
            config: Arc::new(config),
        };
        Ok(Self {
            ctx,
            run_id: Uuid::new_v4().to_string(),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run the full hierarchy: organizations → ledgers → (assets,
    /// portfolios, segments) → accounts → transactions. Per-entity failures
    /// are reflected in the report, never propagated out of the run.
    pub async fn run(&self) -> GenerationReport {
        let config = &self.ctx.config;
        let counts = config.volume.counts();
        info!(
            run_id = %self.run_id,
            volume = config.volume.as_str(),
            max_concurrency = config.max_concurrency,
            "generation run started"
        );
        self.ctx.plugins.before_generation(&self.run_id).await;

        let organizations = OrganizationGenerator::new(self.ctx.clone());
        let ledgers = LedgerGenerator::new(self.ctx.clone());
        let assets = AssetGenerator::new(self.ctx.clone());
        let portfolios = PortfolioGenerator::new(self.ctx.clone());
        let segments = SegmentGenerator::new(self.ctx.clone());
        let accounts = AccountGenerator::new(self.ctx.clone());
        let transactions = TransactionOrchestrator::new(self.ctx.clone());

        for org in organizations.generate(counts.organizations).await {
            for ledger in ledgers
                .generate(counts.ledgers_per_org, Some(org.id.as_str()))
                .await
            {
                // Assets, portfolios, and segments have no ordering
                // constraints among themselves; accounts need the assets.
                tokio::join!(
                    assets.generate(counts.assets_per_ledger, &org.id, &ledger.id),
                    portfolios.generate(counts.portfolios_per_ledger, &org.id, &ledger.id),
                    segments.generate(counts.segments_per_ledger, &org.id, &ledger.id),
                );
                accounts
                    .generate(counts.accounts_per_ledger, &org.id, &ledger.id)
                    .await;
                transactions.run_ledger(&org.id, &ledger.id).await;

                self.ctx
                    .plugins
                    .metrics_update(&self.ctx.registry.metrics_snapshot())
                    .await;
            }
        }

        self.ctx.registry.finish_metrics();
        let metrics = self.ctx.registry.metrics_snapshot();
        self.ctx
            .plugins
            .after_generation(&self.run_id, &metrics)
            .await;

        let report =
            GenerationReport::from_metrics(&self.run_id, config.volume.as_str(), &metrics);
        info!(
            run_id = %self.run_id,
            created = report.total_created,
            errors = report.total_errors,
            retries = report.total_retries,
            duration_ms = report.duration_ms,
            "generation run finished"
        );
        report
    }
}
