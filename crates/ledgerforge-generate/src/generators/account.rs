use std::sync::Arc;

use tracing::{info, warn};

use ledgerforge_core::{Account, AccountRequest, EntityKind, Status};

use crate::batch::{BatchOptions, run_concurrent};
use crate::errors::GenerationError;
use crate::generators::{GeneratorCtx, batch_concurrency, resolve_conflict};
use crate::guard::ExecutionGuard;
use crate::retry::RetryPolicy;

/// Creates deposit accounts for a ledger, each holding one of the ledger's
/// registered asset codes. Accounts are the highest-volume entity, so this
/// generator runs its creations through the concurrent batch runner.
pub struct AccountGenerator {
    ctx: GeneratorCtx,
    guard: Arc<ExecutionGuard>,
}

impl AccountGenerator {
    pub fn new(ctx: GeneratorCtx) -> Self {
        let guard = Arc::new(ExecutionGuard::new(
            "account",
            RetryPolicy::default(),
            Arc::clone(&ctx.registry),
        ));
        Self { ctx, guard }
    }

    pub async fn generate(&self, count: usize, org_id: &str, ledger_id: &str) -> Vec<Account> {
        let asset_codes = self.ctx.registry.asset_codes(ledger_id);
        if asset_codes.is_empty() {
            warn!(ledger_id = %ledger_id, "ledger has no assets, skipping account generation");
            return Vec::new();
        }

        let concurrency = batch_concurrency(self.ctx.config.max_concurrency, count);
        let ctx = self.ctx.clone();
        let guard = Arc::clone(&self.guard);
        let org_id = org_id.to_string();
        let ledger_id = ledger_id.to_string();
        let asset_codes = Arc::new(asset_codes);

        let outcome = run_concurrent(
            "accounts",
            (0..count).collect::<Vec<usize>>(),
            BatchOptions {
                concurrency,
                preserve_order: true,
                ..BatchOptions::default()
            },
            move |_| {
                let ctx = ctx.clone();
                let guard = Arc::clone(&guard);
                let org_id = org_id.clone();
                let ledger_id = ledger_id.clone();
                let asset_codes = Arc::clone(&asset_codes);
                async move {
                    let code = ctx
                        .names
                        .pick(&asset_codes)
                        .cloned()
                        .unwrap_or_else(|| ledgerforge_core::DEFAULT_ASSET_CODE.to_string());
                    generate_account(&ctx, &guard, &org_id, &ledger_id, &code).await
                }
            },
        )
        .await;
        outcome.results
    }

    pub async fn generate_one(
        &self,
        org_id: &str,
        ledger_id: &str,
        asset_code: &str,
    ) -> Result<Account, GenerationError> {
        generate_account(&self.ctx, &self.guard, org_id, ledger_id, asset_code).await
    }
}

async fn generate_account(
    ctx: &GeneratorCtx,
    guard: &ExecutionGuard,
    org_id: &str,
    ledger_id: &str,
    asset_code: &str,
) -> Result<Account, GenerationError> {
    let alias = ctx.names.account_alias();
    let request = AccountRequest {
        name: ctx.names.person_name(),
        alias: alias.clone(),
        asset_code: asset_code.to_string(),
        account_type: "deposit".to_string(),
        status: Status::active(),
        metadata: ctx.fingerprint(),
    };
    let payload = ctx.payload_json(&request);
    ctx.fire_before_entity(EntityKind::Account, &payload).await;

    let api = &ctx.api;
    let created = guard
        .execute("create account", || {
            api.create_account(org_id, ledger_id, &request)
        })
        .await;

    let account = match created {
        Ok(account) => account,
        Err(err) => {
            let existing = resolve_conflict(err, "account", || async {
                if let Some(found) = ctx
                    .cached_entity::<Account>(EntityKind::Account, &request.alias)
                    .filter(|a| a.ledger_id == ledger_id)
                {
                    return Ok(Some(found));
                }
                let accounts = api.list_accounts(org_id, ledger_id).await?;
                Ok(accounts
                    .into_iter()
                    .find(|a| a.alias.as_deref() == Some(request.alias.as_str())))
            })
            .await;
            match existing {
                Ok(Some(account)) => account,
                Ok(None) => {
                    let err = GenerationError::ConflictUnresolved("account".to_string());
                    ctx.report_entity_error(EntityKind::Account, &err).await;
                    return Err(err);
                }
                Err(err) => {
                    ctx.report_entity_error(EntityKind::Account, &err).await;
                    return Err(err);
                }
            }
        }
    };

    ctx.registry
        .add_account(ledger_id, &account.id, account.alias.as_deref());
    ctx.registry
        .set_account_asset(ledger_id, &account.id, &account.asset_code);
    let created_payload = ctx.payload_json(&account);
    ctx.fire_after_entity(EntityKind::Account, &account.id, &created_payload)
        .await;
    info!(
        account_id = %account.id,
        alias = account.alias.as_deref().unwrap_or(""),
        asset_code = %account.asset_code,
        "account ready"
    );
    Ok(account)
}
