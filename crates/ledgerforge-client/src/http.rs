use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use ledgerforge_core::{
    Account, AccountRequest, Asset, AssetRequest, Ledger, LedgerRequest, Organization,
    OrganizationRequest, Portfolio, PortfolioRequest, Segment, SegmentRequest, Transaction,
    TransactionRequest,
};

use crate::api::{ApiResult, LedgerApi};
use crate::error::ClientError;

/// List envelope used by the remote API.
#[derive(Debug, serde::Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// HTTP implementation of [`LedgerApi`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    http: Client,
    onboarding_url: String,
    transaction_url: String,
    auth_token: Option<String>,
}

impl HttpLedgerClient {
    pub fn new(
        onboarding_url: impl Into<String>,
        transaction_url: impl Into<String>,
        auth_token: Option<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            onboarding_url: trim_slash(onboarding_url.into()),
            transaction_url: trim_slash(transaction_url.into()),
            auth_token,
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, url: String, body: &B) -> ApiResult<T> {
        debug!(url = %url, "POST");
        let response = self
            .authorized(self.http.post(&url).json(body))
            .send()
            .await?;
        decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> ApiResult<T> {
        debug!(url = %url, "GET");
        let response = self.authorized(self.http.get(&url)).send().await?;
        decode(response).await
    }

    async fn list<T: DeserializeOwned>(&self, url: String) -> ApiResult<Vec<T>> {
        let page: Page<T> = self.get(url).await?;
        Ok(page.items)
    }

    fn ledger_path(&self, org_id: &str, ledger_id: &str, suffix: &str) -> String {
        format!(
            "{}/v1/organizations/{org_id}/ledgers/{ledger_id}/{suffix}",
            self.onboarding_url
        )
    }
}

fn trim_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(ClientError::from);
    }
    Err(error_from_response(status, response.text().await.ok()))
}

fn error_from_response(status: StatusCode, body: Option<String>) -> ClientError {
    // The API wraps errors as {"code": ..., "message": ...}; fall back to the
    // raw body when that shape does not hold.
    let message = body
        .as_deref()
        .and_then(|text| serde_json::from_str::<Value>(text).ok())
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .or(body)
        .unwrap_or_else(|| status.to_string());
    ClientError::from_status(status.as_u16(), message)
}

#[async_trait]
impl LedgerApi for HttpLedgerClient {
    async fn create_organization(&self, req: &OrganizationRequest) -> ApiResult<Organization> {
        self.post(format!("{}/v1/organizations", self.onboarding_url), req)
            .await
    }

    async fn list_organizations(&self) -> ApiResult<Vec<Organization>> {
        self.list(format!("{}/v1/organizations", self.onboarding_url))
            .await
    }

    async fn create_ledger(&self, org_id: &str, req: &LedgerRequest) -> ApiResult<Ledger> {
        self.post(
            format!("{}/v1/organizations/{org_id}/ledgers", self.onboarding_url),
            req,
        )
        .await
    }

    async fn list_ledgers(&self, org_id: &str) -> ApiResult<Vec<Ledger>> {
        self.list(format!(
            "{}/v1/organizations/{org_id}/ledgers",
            self.onboarding_url
        ))
        .await
    }

    async fn create_asset(
        &self,
        org_id: &str,
        ledger_id: &str,
        req: &AssetRequest,
    ) -> ApiResult<Asset> {
        self.post(self.ledger_path(org_id, ledger_id, "assets"), req)
            .await
    }

    async fn list_assets(&self, org_id: &str, ledger_id: &str) -> ApiResult<Vec<Asset>> {
        self.list(self.ledger_path(org_id, ledger_id, "assets")).await
    }

    async fn create_portfolio(
        &self,
        org_id: &str,
        ledger_id: &str,
        req: &PortfolioRequest,
    ) -> ApiResult<Portfolio> {
        self.post(self.ledger_path(org_id, ledger_id, "portfolios"), req)
            .await
    }

    async fn list_portfolios(&self, org_id: &str, ledger_id: &str) -> ApiResult<Vec<Portfolio>> {
        self.list(self.ledger_path(org_id, ledger_id, "portfolios"))
            .await
    }

    async fn create_segment(
        &self,
        org_id: &str,
        ledger_id: &str,
        req: &SegmentRequest,
    ) -> ApiResult<Segment> {
        self.post(self.ledger_path(org_id, ledger_id, "segments"), req)
            .await
    }

    async fn list_segments(&self, org_id: &str, ledger_id: &str) -> ApiResult<Vec<Segment>> {
        self.list(self.ledger_path(org_id, ledger_id, "segments"))
            .await
    }

    async fn create_account(
        &self,
        org_id: &str,
        ledger_id: &str,
        req: &AccountRequest,
    ) -> ApiResult<Account> {
        self.post(self.ledger_path(org_id, ledger_id, "accounts"), req)
            .await
    }

    async fn list_accounts(&self, org_id: &str, ledger_id: &str) -> ApiResult<Vec<Account>> {
        self.list(self.ledger_path(org_id, ledger_id, "accounts"))
            .await
    }

    async fn get_account(
        &self,
        org_id: &str,
        ledger_id: &str,
        account_id: &str,
    ) -> ApiResult<Account> {
        self.get(self.ledger_path(org_id, ledger_id, &format!("accounts/{account_id}")))
            .await
    }

    async fn create_transaction(
        &self,
        org_id: &str,
        ledger_id: &str,
        req: &TransactionRequest,
    ) -> ApiResult<Transaction> {
        self.post(
            format!(
                "{}/v1/organizations/{org_id}/ledgers/{ledger_id}/transactions",
                self.transaction_url
            ),
            req,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn error_message_extracted_from_json_body() {
        let err = error_from_response(
            StatusCode::CONFLICT,
            Some(r#"{"code":"0007","message":"alias already exists"}"#.to_string()),
        );
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(err.message, "alias already exists");
    }

    #[test]
    fn error_falls_back_to_raw_body() {
        let err = error_from_response(StatusCode::BAD_GATEWAY, Some("upstream down".to_string()));
        assert_eq!(err.kind, ErrorKind::Server);
        assert_eq!(err.message, "upstream down");
    }

    #[test]
    fn base_urls_are_normalized() {
        let client = HttpLedgerClient::new("http://localhost:3000///", "http://localhost:3001", None);
        assert_eq!(
            client.ledger_path("o1", "l1", "assets"),
            "http://localhost:3000/v1/organizations/o1/ledgers/l1/assets"
        );
    }
}
