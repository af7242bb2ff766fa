use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use ledgerforge_client::{ApiResult, ClientError, LedgerApi};
use ledgerforge_core::{
    Account, AccountRequest, Asset, AssetRequest, Ledger, LedgerRequest, Organization,
    OrganizationRequest, Portfolio, PortfolioRequest, Segment, SegmentRequest, Transaction,
    TransactionRequest,
};

/// Everything the mock has created, inspectable from tests.
#[derive(Debug, Default)]
pub struct MockState {
    pub organizations: Vec<Organization>,
    pub ledgers: Vec<Ledger>,
    pub assets: Vec<Asset>,
    pub portfolios: Vec<Portfolio>,
    pub segments: Vec<Segment>,
    pub accounts: Vec<Account>,
    pub transactions: Vec<TransactionRequest>,
}

/// In-memory [`LedgerApi`] that fabricates sequential IDs. Creating an
/// organization whose legal name already exists answers 409, like the real
/// service; the existing record stays retrievable via list.
pub struct MockLedgerApi {
    pub state: Mutex<MockState>,
    seq: AtomicU64,
    organization_list_calls: AtomicU64,
}

impl MockLedgerApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            seq: AtomicU64::new(0),
            organization_list_calls: AtomicU64::new(0),
        }
    }

    pub fn organization_list_calls(&self) -> u64 {
        self.organization_list_calls.load(Ordering::SeqCst)
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}-{n}")
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl LedgerApi for MockLedgerApi {
    async fn create_organization(&self, req: &OrganizationRequest) -> ApiResult<Organization> {
        let organization = Organization {
            id: self.next_id("org"),
            legal_name: req.legal_name.clone(),
            doing_business_as: req.doing_business_as.clone(),
            legal_document: req.legal_document.clone(),
            status: req.status.clone(),
            metadata: req.metadata.clone(),
        };
        let mut state = self.state();
        if state
            .organizations
            .iter()
            .any(|o| o.legal_name == req.legal_name)
        {
            return Err(ClientError::from_status(409, "organization already exists"));
        }
        state.organizations.push(organization.clone());
        Ok(organization)
    }

    async fn list_organizations(&self) -> ApiResult<Vec<Organization>> {
        self.organization_list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state().organizations.clone())
    }

    async fn create_ledger(&self, org_id: &str, req: &LedgerRequest) -> ApiResult<Ledger> {
        let ledger = Ledger {
            id: self.next_id("led"),
            name: req.name.clone(),
            organization_id: org_id.to_string(),
            status: req.status.clone(),
            metadata: req.metadata.clone(),
        };
        self.state().ledgers.push(ledger.clone());
        Ok(ledger)
    }

    async fn list_ledgers(&self, org_id: &str) -> ApiResult<Vec<Ledger>> {
        Ok(self
            .state()
            .ledgers
            .iter()
            .filter(|l| l.organization_id == org_id)
            .cloned()
            .collect())
    }

    async fn create_asset(
        &self,
        _org_id: &str,
        ledger_id: &str,
        req: &AssetRequest,
    ) -> ApiResult<Asset> {
        let asset = Asset {
            id: self.next_id("ast"),
            name: req.name.clone(),
            code: req.code.clone(),
            asset_type: req.asset_type.clone(),
            ledger_id: ledger_id.to_string(),
            status: req.status.clone(),
            metadata: req.metadata.clone(),
        };
        self.state().assets.push(asset.clone());
        Ok(asset)
    }

    async fn list_assets(&self, _org_id: &str, ledger_id: &str) -> ApiResult<Vec<Asset>> {
        Ok(self
            .state()
            .assets
            .iter()
            .filter(|a| a.ledger_id == ledger_id)
            .cloned()
            .collect())
    }

    async fn create_portfolio(
        &self,
        _org_id: &str,
        ledger_id: &str,
        req: &PortfolioRequest,
    ) -> ApiResult<Portfolio> {
        let portfolio = Portfolio {
            id: self.next_id("pfl"),
            name: req.name.clone(),
            ledger_id: ledger_id.to_string(),
            status: req.status.clone(),
            metadata: req.metadata.clone(),
        };
        self.state().portfolios.push(portfolio.clone());
        Ok(portfolio)
    }

    async fn list_portfolios(&self, _org_id: &str, ledger_id: &str) -> ApiResult<Vec<Portfolio>> {
        Ok(self
            .state()
            .portfolios
            .iter()
            .filter(|p| p.ledger_id == ledger_id)
            .cloned()
            .collect())
    }

    async fn create_segment(
        &self,
        _org_id: &str,
        ledger_id: &str,
        req: &SegmentRequest,
    ) -> ApiResult<Segment> {
        let segment = Segment {
            id: self.next_id("seg"),
            name: req.name.clone(),
            ledger_id: ledger_id.to_string(),
            status: req.status.clone(),
            metadata: req.metadata.clone(),
        };
        self.state().segments.push(segment.clone());
        Ok(segment)
    }

    async fn list_segments(&self, _org_id: &str, ledger_id: &str) -> ApiResult<Vec<Segment>> {
        Ok(self
            .state()
            .segments
            .iter()
            .filter(|s| s.ledger_id == ledger_id)
            .cloned()
            .collect())
    }

    async fn create_account(
        &self,
        _org_id: &str,
        ledger_id: &str,
        req: &AccountRequest,
    ) -> ApiResult<Account> {
        let account = Account {
            id: self.next_id("acc"),
            name: req.name.clone(),
            alias: Some(req.alias.clone()),
            asset_code: req.asset_code.clone(),
            ledger_id: ledger_id.to_string(),
            account_type: req.account_type.clone(),
            status: req.status.clone(),
            metadata: req.metadata.clone(),
        };
        self.state().accounts.push(account.clone());
        Ok(account)
    }

    async fn list_accounts(&self, _org_id: &str, ledger_id: &str) -> ApiResult<Vec<Account>> {
        Ok(self
            .state()
            .accounts
            .iter()
            .filter(|a| a.ledger_id == ledger_id)
            .cloned()
            .collect())
    }

    async fn get_account(
        &self,
        _org_id: &str,
        _ledger_id: &str,
        account_id: &str,
    ) -> ApiResult<Account> {
        self.state()
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
            .ok_or_else(|| ClientError::from_status(404, "account not found"))
    }

    async fn create_transaction(
        &self,
        _org_id: &str,
        _ledger_id: &str,
        req: &TransactionRequest,
    ) -> ApiResult<Transaction> {
        let transaction = Transaction {
            id: self.next_id("txn"),
            description: req.description.clone(),
            operations: req.operations.clone(),
            metadata: req.metadata.clone(),
        };
        self.state().transactions.push(req.clone());
        Ok(transaction)
    }
}
