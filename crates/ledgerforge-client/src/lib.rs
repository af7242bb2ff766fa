//! Typed async client for the remote ledger API.
//!
//! The generation engine talks to the API exclusively through the
//! [`LedgerApi`] trait so tests can substitute an in-memory stub.

pub mod api;
pub mod error;
pub mod http;

pub use api::{ApiResult, LedgerApi};
pub use error::{ClientError, ErrorKind};
pub use http::HttpLedgerClient;
