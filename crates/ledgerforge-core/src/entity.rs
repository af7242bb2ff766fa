use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form metadata attached to every entity.
pub type Metadata = BTreeMap<String, Value>;

/// Entity types produced during a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Organization,
    Ledger,
    Asset,
    Portfolio,
    Segment,
    Account,
    Transaction,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Organization,
        EntityKind::Ledger,
        EntityKind::Asset,
        EntityKind::Portfolio,
        EntityKind::Segment,
        EntityKind::Account,
        EntityKind::Transaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Organization => "organization",
            EntityKind::Ledger => "ledger",
            EntityKind::Asset => "asset",
            EntityKind::Portfolio => "portfolio",
            EntityKind::Segment => "segment",
            EntityKind::Account => "account",
            EntityKind::Transaction => "transaction",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status reported by the remote API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Status {
    pub fn active() -> Self {
        Self {
            code: "ACTIVE".to_string(),
            description: None,
        }
    }
}

/// Classification of an asset, used to pick deposit/transfer magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    Crypto,
    Commodity,
    Currency,
}

impl AssetClass {
    /// Classify a code against the known crypto/commodity pools; anything
    /// else is treated as a currency.
    pub fn of_code(code: &str) -> AssetClass {
        const CRYPTO: [&str; 4] = ["BTC", "ETH", "SOL", "USDT"];
        const COMMODITY: [&str; 3] = ["XAU", "XAG", "OIL"];
        if CRYPTO.contains(&code) {
            AssetClass::Crypto
        } else if COMMODITY.contains(&code) {
            AssetClass::Commodity
        } else {
            AssetClass::Currency
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Crypto => "crypto",
            AssetClass::Commodity => "commodity",
            AssetClass::Currency => "currency",
        }
    }

    /// Fixed funding amount for the initial deposit, per asset class.
    pub fn deposit_amount(&self) -> Amount {
        match self {
            AssetClass::Crypto => Amount::new(1_000, 2),
            AssetClass::Commodity => Amount::new(50_000, 2),
            AssetClass::Currency => Amount::new(1_000_000, 2),
        }
    }

    /// Inclusive `(min, max)` bounds for a single transfer, at scale 2.
    pub fn transfer_bounds(&self) -> (i64, i64) {
        match self {
            AssetClass::Crypto => (1, 100),
            AssetClass::Commodity => (100, 2_000),
            AssetClass::Currency => (1_000, 50_000),
        }
    }
}

/// Fixed-point monetary amount as the remote API represents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: i64,
    pub scale: u32,
}

impl Amount {
    pub fn new(value: i64, scale: u32) -> Self {
        Self { value, scale }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.value);
        }
        let divisor = 10_i64.pow(self.scale);
        write!(
            f,
            "{}.{:0width$}",
            self.value / divisor,
            (self.value % divisor).abs(),
            width = self.scale as usize
        )
    }
}

/// Direction of a double-entry operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Credit,
    Debit,
}

/// One leg of a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub account_alias: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub legal_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doing_business_as: Option<String>,
    pub legal_document: String,
    pub status: Status,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRequest {
    pub legal_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doing_business_as: Option<String>,
    pub legal_document: String,
    pub status: Status,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    pub id: String,
    pub name: String,
    pub organization_id: String,
    pub status: Status,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRequest {
    pub name: String,
    pub status: Status,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub ledger_id: String,
    pub status: Status,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRequest {
    pub name: String,
    pub code: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub status: Status,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    pub name: String,
    pub ledger_id: String,
    pub status: Status,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioRequest {
    pub name: String,
    pub status: Status,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: String,
    pub name: String,
    pub ledger_id: String,
    pub status: Status,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRequest {
    pub name: String,
    pub status: Status,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub asset_code: String,
    pub ledger_id: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub status: Status,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequest {
    pub name: String,
    pub alias: String,
    pub asset_code: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub status: Status,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub description: String,
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub description: String,
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl TransactionRequest {
    /// Sum of operation values for one direction, assuming a uniform scale.
    pub fn sum(&self, kind: OperationKind) -> i64 {
        self.operations
            .iter()
            .filter(|op| op.kind == kind)
            .map(|op| op.amount.value)
            .sum()
    }

    /// Double-entry law: credit and debit totals must match.
    pub fn is_balanced(&self) -> bool {
        self.sum(OperationKind::Credit) == self.sum(OperationKind::Debit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_class_of_code() {
        assert_eq!(AssetClass::of_code("BTC"), AssetClass::Crypto);
        assert_eq!(AssetClass::of_code("XAU"), AssetClass::Commodity);
        assert_eq!(AssetClass::of_code("BRL"), AssetClass::Currency);
    }

    #[test]
    fn amount_display_uses_scale() {
        assert_eq!(Amount::new(1_234, 2).to_string(), "12.34");
        assert_eq!(Amount::new(7, 0).to_string(), "7");
    }

    #[test]
    fn balanced_transaction() {
        let tx = TransactionRequest {
            description: "funding".to_string(),
            operations: vec![
                Operation {
                    kind: OperationKind::Debit,
                    account_alias: "@external/USD".to_string(),
                    amount: Amount::new(100, 2),
                },
                Operation {
                    kind: OperationKind::Credit,
                    account_alias: "acct-1".to_string(),
                    amount: Amount::new(100, 2),
                },
            ],
            metadata: Metadata::new(),
        };
        assert!(tx.is_balanced());
    }

    #[test]
    fn operation_serializes_with_wire_names() {
        let op = Operation {
            kind: OperationKind::Credit,
            account_alias: "acct-1".to_string(),
            amount: Amount::new(100, 2),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "CREDIT");
        assert_eq!(json["accountAlias"], "acct-1");
    }
}
