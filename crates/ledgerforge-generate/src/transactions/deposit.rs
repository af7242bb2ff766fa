use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use ledgerforge_core::{
    AssetClass, EntityKind, Operation, OperationKind, TransactionRequest, external_account,
};

use crate::batch::{BatchOptions, run_concurrent};
use crate::generators::{GeneratorCtx, batch_concurrency};
use crate::guard::ExecutionGuard;
use crate::transactions::FundedAccount;

const DEPOSIT_ITEM_DELAY: Duration = Duration::from_millis(100);

/// Which asset an account holds: the registry knows for accounts we created
/// this run; otherwise ask the remote, then fall back to any ledger asset,
/// then the default currency.
async fn resolve_asset(
    ctx: &GeneratorCtx,
    org_id: &str,
    ledger_id: &str,
    account_id: &str,
) -> String {
    if ctx.registry.has_account_asset(ledger_id, account_id) {
        return ctx.registry.account_asset(ledger_id, account_id);
    }
    match ctx.api.get_account(org_id, ledger_id, account_id).await {
        Ok(account) if !account.asset_code.is_empty() => return account.asset_code,
        Ok(_) => {}
        Err(err) => {
            debug!(account_id = %account_id, error = %err, "account lookup failed, using ledger assets");
        }
    }
    let codes = ctx.registry.asset_codes(ledger_id);
    ctx.names
        .pick(&codes)
        .cloned()
        .unwrap_or_else(|| ledgerforge_core::DEFAULT_ASSET_CODE.to_string())
}

fn deposit_request(
    alias: &str,
    asset_code: &str,
    metadata: ledgerforge_core::Metadata,
) -> TransactionRequest {
    let amount = AssetClass::of_code(asset_code).deposit_amount();
    TransactionRequest {
        description: format!("Initial deposit ({asset_code})"),
        operations: vec![
            Operation {
                kind: OperationKind::Debit,
                account_alias: external_account(asset_code),
                amount,
            },
            Operation {
                kind: OperationKind::Credit,
                account_alias: alias.to_string(),
                amount,
            },
        ],
        metadata,
    }
}

/// Phase 1: one balanced external deposit per account. Returns the accounts
/// that were actually funded; failures are counted and left out.
pub(super) async fn fund_accounts(
    ctx: &GeneratorCtx,
    guard: &Arc<ExecutionGuard>,
    org_id: &str,
    ledger_id: &str,
    account_ids: &[String],
) -> Vec<FundedAccount> {
    let aliases = ctx.registry.account_aliases(ledger_id);
    let targets: Vec<(String, String)> = account_ids
        .iter()
        .zip(aliases)
        .map(|(id, alias)| (id.clone(), alias))
        .collect();

    let concurrency = batch_concurrency(ctx.config.max_concurrency, targets.len());
    let ctx = ctx.clone();
    let guard = Arc::clone(guard);
    let org_id = org_id.to_string();
    let ledger_id = ledger_id.to_string();

    let outcome = run_concurrent(
        "deposits",
        targets,
        BatchOptions {
            concurrency,
            item_delay: Some(DEPOSIT_ITEM_DELAY),
            ..BatchOptions::default()
        },
        move |(account_id, alias)| {
            let ctx = ctx.clone();
            let guard = Arc::clone(&guard);
            let org_id = org_id.clone();
            let ledger_id = ledger_id.clone();
            async move {
                let asset_code = resolve_asset(&ctx, &org_id, &ledger_id, &account_id).await;
                let request = deposit_request(&alias, &asset_code, ctx.fingerprint());
                let payload = ctx.payload_json(&request);
                // A malformed transaction would be rejected remotely anyway;
                // fail it locally instead of spending retries on it.
                if let Err(err) = ctx.ensure_valid(EntityKind::Transaction, &payload) {
                    ctx.report_entity_error(EntityKind::Transaction, &err).await;
                    return Err(err);
                }
                ctx.fire_before_entity(EntityKind::Transaction, &payload).await;

                let api = &ctx.api;
                let created = guard
                    .execute("create deposit", || {
                        api.create_transaction(&org_id, &ledger_id, &request)
                    })
                    .await;
                match created {
                    Ok(transaction) => {
                        ctx.registry.add_transaction(&ledger_id, &transaction.id);
                        let created_payload = ctx.payload_json(&transaction);
                        ctx.fire_after_entity(
                            EntityKind::Transaction,
                            &transaction.id,
                            &created_payload,
                        )
                        .await;
                        let deposit_amount = AssetClass::of_code(&asset_code).deposit_amount();
                        Ok(FundedAccount {
                            account_id,
                            account_alias: alias,
                            asset_code,
                            deposit_amount,
                        })
                    }
                    Err(err) => {
                        ctx.report_entity_error(EntityKind::Transaction, &err).await;
                        Err(err)
                    }
                }
            }
        },
    )
    .await;
    outcome.results
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerforge_core::Metadata;

    #[test]
    fn deposit_is_balanced_and_externally_funded() {
        let request = deposit_request("alias-1", "BTC", Metadata::new());
        assert!(request.is_balanced());
        assert_eq!(request.operations.len(), 2);
        assert_eq!(request.operations[0].kind, OperationKind::Debit);
        assert_eq!(request.operations[0].account_alias, "@external/BTC");
        assert_eq!(request.operations[1].account_alias, "alias-1");
    }

    #[test]
    fn deposit_amount_follows_asset_class() {
        let crypto = deposit_request("a", "ETH", Metadata::new());
        let currency = deposit_request("a", "USD", Metadata::new());
        assert!(currency.operations[0].amount.value > crypto.operations[0].amount.value);
    }
}
