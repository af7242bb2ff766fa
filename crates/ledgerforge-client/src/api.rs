use async_trait::async_trait;

use ledgerforge_core::{
    Account, AccountRequest, Asset, AssetRequest, Ledger, LedgerRequest, Organization,
    OrganizationRequest, Portfolio, PortfolioRequest, Segment, SegmentRequest, Transaction,
    TransactionRequest,
};

use crate::error::ClientError;

pub type ApiResult<T> = Result<T, ClientError>;

/// Remote ledger API surface consumed by the generators.
///
/// Paths follow `organizations/{org}/ledgers/{ledger}/...`; organizations
/// through accounts live on the onboarding service, transactions on the
/// transaction service.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    async fn create_organization(&self, req: &OrganizationRequest) -> ApiResult<Organization>;
    async fn list_organizations(&self) -> ApiResult<Vec<Organization>>;

    async fn create_ledger(&self, org_id: &str, req: &LedgerRequest) -> ApiResult<Ledger>;
    async fn list_ledgers(&self, org_id: &str) -> ApiResult<Vec<Ledger>>;

    async fn create_asset(&self, org_id: &str, ledger_id: &str, req: &AssetRequest)
    -> ApiResult<Asset>;
    async fn list_assets(&self, org_id: &str, ledger_id: &str) -> ApiResult<Vec<Asset>>;

    async fn create_portfolio(
        &self,
        org_id: &str,
        ledger_id: &str,
        req: &PortfolioRequest,
    ) -> ApiResult<Portfolio>;
    async fn list_portfolios(&self, org_id: &str, ledger_id: &str) -> ApiResult<Vec<Portfolio>>;

    async fn create_segment(
        &self,
        org_id: &str,
        ledger_id: &str,
        req: &SegmentRequest,
    ) -> ApiResult<Segment>;
    async fn list_segments(&self, org_id: &str, ledger_id: &str) -> ApiResult<Vec<Segment>>;

    async fn create_account(
        &self,
        org_id: &str,
        ledger_id: &str,
        req: &AccountRequest,
    ) -> ApiResult<Account>;
    async fn list_accounts(&self, org_id: &str, ledger_id: &str) -> ApiResult<Vec<Account>>;
    async fn get_account(
        &self,
        org_id: &str,
        ledger_id: &str,
        account_id: &str,
    ) -> ApiResult<Account>;

    async fn create_transaction(
        &self,
        org_id: &str,
        ledger_id: &str,
        req: &TransactionRequest,
    ) -> ApiResult<Transaction>;
}
