use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use ledgerforge_core::{
    Amount, AssetClass, EntityKind, Operation, OperationKind, TransactionRequest,
};

use crate::batch::{BatchOptions, run_concurrent};
use crate::generators::{GeneratorCtx, NameFactory};
use crate::guard::ExecutionGuard;
use crate::transactions::FundedAccount;

const TRANSFER_ITEM_DELAY: Duration = Duration::from_millis(150);
const TRANSFER_MAX_CONCURRENCY: usize = 5;

/// One planned account-to-account transfer.
#[derive(Debug, Clone)]
struct TransferJob {
    source_alias: String,
    target_alias: String,
    asset_code: String,
    amount: Amount,
}

fn transfer_request(job: &TransferJob, metadata: ledgerforge_core::Metadata) -> TransactionRequest {
    TransactionRequest {
        description: format!(
            "Transfer {} {} -> {}",
            job.asset_code, job.source_alias, job.target_alias
        ),
        operations: vec![
            Operation {
                kind: OperationKind::Debit,
                account_alias: job.source_alias.clone(),
                amount: job.amount,
            },
            Operation {
                kind: OperationKind::Credit,
                account_alias: job.target_alias.clone(),
                amount: job.amount,
            },
        ],
        metadata,
    }
}

/// Plan `per_account` transfers from every funded account to random distinct
/// counterparties holding the same asset. Groups with fewer than two
/// accounts produce no jobs.
fn plan_transfers(
    names: &NameFactory,
    funded: Vec<FundedAccount>,
    per_account: usize,
) -> Vec<TransferJob> {
    let mut groups: BTreeMap<String, Vec<FundedAccount>> = BTreeMap::new();
    for account in funded {
        groups.entry(account.asset_code.clone()).or_default().push(account);
    }

    let mut jobs = Vec::new();
    for (asset_code, group) in groups {
        if group.len() < 2 {
            warn!(
                asset_code = %asset_code,
                accounts = group.len(),
                "single account holds this asset, skipping its transfers"
            );
            continue;
        }
        let (min, max) = AssetClass::of_code(&asset_code).transfer_bounds();
        for (index, source) in group.iter().enumerate() {
            for _ in 0..per_account {
                let Some(target_index) = names.pick_other(group.len(), index) else {
                    continue;
                };
                jobs.push(TransferJob {
                    source_alias: source.account_alias.clone(),
                    target_alias: group[target_index].account_alias.clone(),
                    asset_code: asset_code.clone(),
                    amount: Amount::new(names.amount_in(min, max), 2),
                });
            }
        }
    }
    jobs
}

/// Phase 2: run the planned transfers in small staggered batches. Returns
/// the number of transfers that succeeded.
pub(super) async fn run_transfers(
    ctx: &GeneratorCtx,
    guard: &Arc<ExecutionGuard>,
    org_id: &str,
    ledger_id: &str,
    funded: Vec<FundedAccount>,
    per_account: usize,
) -> usize {
    let jobs = plan_transfers(&ctx.names, funded, per_account);
    if jobs.is_empty() {
        return 0;
    }

    let concurrency = TRANSFER_MAX_CONCURRENCY.min(jobs.len());
    let ctx = ctx.clone();
    let guard = Arc::clone(guard);
    let org_id = org_id.to_string();
    let ledger_id = ledger_id.to_string();

    let outcome = run_concurrent(
        "transfers",
        jobs,
        BatchOptions {
            concurrency,
            item_delay: Some(TRANSFER_ITEM_DELAY),
            ..BatchOptions::default()
        },
        move |job| {
            let ctx = ctx.clone();
            let guard = Arc::clone(&guard);
            let org_id = org_id.clone();
            let ledger_id = ledger_id.clone();
            async move {
                let request = transfer_request(&job, ctx.fingerprint());
                let payload = ctx.payload_json(&request);
                if let Err(err) = ctx.ensure_valid(EntityKind::Transaction, &payload) {
                    ctx.report_entity_error(EntityKind::Transaction, &err).await;
                    return Err(err);
                }
                ctx.fire_before_entity(EntityKind::Transaction, &payload).await;

                let api = &ctx.api;
                let created = guard
                    .execute("create transfer", || {
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
                        Ok(transaction)
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
    outcome.results.len()
}
