//! Core contracts and helpers for Ledgerforge.
//!
//! This crate defines the canonical entity models exchanged with the remote
//! ledger API, the volume/config types consumed by the generation engine,
//! and the declarative validation rules shared by the engine and plugins.

pub mod config;
pub mod entity;
pub mod error;
pub mod validation;

pub use config::{GeneratorConfig, Volume, VolumeCounts};
pub use entity::{
    Account, AccountRequest, Amount, Asset, AssetClass, AssetRequest, EntityKind, Ledger,
    LedgerRequest, Metadata, Operation, OperationKind, Organization, OrganizationRequest,
    Portfolio, PortfolioRequest, Segment, SegmentRequest, Status, Transaction, TransactionRequest,
};
pub use error::{Error, Result};
pub use validation::{RuleSet, Violation, rule_set};

/// Alias prefix for the synthetic counterparty that funds generated accounts.
pub const EXTERNAL_ACCOUNT_PREFIX: &str = "@external/";

/// Fallback asset code used when an account's asset cannot be resolved.
pub const DEFAULT_ASSET_CODE: &str = "USD";

/// Build the external-account alias for an asset code.
pub fn external_account(asset_code: &str) -> String {
    format!("{EXTERNAL_ACCOUNT_PREFIX}{asset_code}")
}
