//! Transaction generation: per ledger, a deposit phase that funds every
//! account from an external source, a settlement pause, then a transfer
//! phase moving funds between same-asset accounts.

mod deposit;
mod transfer;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use ledgerforge_core::Amount;

use crate::generators::GeneratorCtx;
use crate::guard::ExecutionGuard;
use crate::retry::RetryPolicy;

/// Pause between funding and transfers so deposits settle remotely.
const SETTLEMENT_WAIT: Duration = Duration::from_millis(1000);

/// An account the deposit phase successfully funded, carrying everything
/// the transfer phase needs without further lookups.
#[derive(Debug, Clone)]
pub struct FundedAccount {
    pub account_id: String,
    pub account_alias: String,
    pub asset_code: String,
    pub deposit_amount: Amount,
}

pub struct TransactionOrchestrator {
    ctx: GeneratorCtx,
    deposit_guard: Arc<ExecutionGuard>,
    transfer_guard: Arc<ExecutionGuard>,
}

impl TransactionOrchestrator {
    pub fn new(ctx: GeneratorCtx) -> Self {
        let deposit_guard = Arc::new(ExecutionGuard::new(
            "deposit",
            RetryPolicy::with_max_retries(3),
            Arc::clone(&ctx.registry),
        ));
        let transfer_guard = Arc::new(ExecutionGuard::new(
            "transfer",
            RetryPolicy::with_max_retries(2),
            Arc::clone(&ctx.registry),
        ));
        Self {
            ctx,
            deposit_guard,
            transfer_guard,
        }
    }

    /// Fund and then cross-transfer every account in one ledger. Returns the
    /// number of transactions created.
    pub async fn run_ledger(&self, org_id: &str, ledger_id: &str) -> usize {
        let account_ids = self.ctx.registry.account_ids(ledger_id);
        if account_ids.len() < 2 {
            warn!(
                ledger_id = %ledger_id,
                accounts = account_ids.len(),
                "fewer than two accounts, skipping transactions"
            );
            return 0;
        }

        let funded = deposit::fund_accounts(
            &self.ctx,
            &self.deposit_guard,
            org_id,
            ledger_id,
            &account_ids,
        )
        .await;
        let deposits = funded.len();
        if deposits == 0 {
            warn!(ledger_id = %ledger_id, "no accounts funded, skipping transfers");
            return 0;
        }

        tokio::time::sleep(SETTLEMENT_WAIT).await;

        let transfers = transfer::run_transfers(
            &self.ctx,
            &self.transfer_guard,
            org_id,
            ledger_id,
            funded,
            self.ctx.config.volume.counts().transfers_per_account,
        )
        .await;

        info!(
            ledger_id = %ledger_id,
            deposits,
            transfers,
            "transaction generation for ledger complete"
        );
        deposits + transfers
    }
}
