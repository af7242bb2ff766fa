//! Entity generators: one per entity type, each composing the shared
//! execution guard, batch helpers, and plugin hooks around the remote API.

pub mod account;
pub mod asset;
pub mod ledger;
pub mod names;
pub mod organization;
pub mod portfolio;
pub mod segment;

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use ledgerforge_client::LedgerApi;
use ledgerforge_core::{rule_set, EntityKind, GeneratorConfig, Metadata};

use crate::errors::GenerationError;
use crate::plugins::{EntityEvent, PluginManager};
use crate::registry::StateRegistry;

pub use account::AccountGenerator;
pub use asset::AssetGenerator;
pub use ledger::LedgerGenerator;
pub use names::{AssetSpec, NameFactory};
pub use organization::OrganizationGenerator;
pub use portfolio::PortfolioGenerator;
pub use segment::SegmentGenerator;

/// Shared dependencies handed to every generator.
#[derive(Clone)]
pub struct GeneratorCtx {
    pub api: Arc<dyn LedgerApi>,
    pub registry: Arc<StateRegistry>,
    pub plugins: Arc<PluginManager>,
    pub names: Arc<NameFactory>,
    pub config: Arc<GeneratorConfig>,
}

impl GeneratorCtx {
    /// Metadata fingerprint stamped onto every generated entity.
    pub fn fingerprint(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), Value::from("ledgerforge"));
        metadata.insert(
            "generatorVersion".to_string(),
            Value::from(env!("CARGO_PKG_VERSION")),
        );
        metadata
    }

    /// Serialize a request payload for the plugin hooks. Serialization of
    /// our own request types cannot fail; fall back to null defensively.
    pub fn payload_json<T: Serialize>(&self, request: &T) -> Value {
        serde_json::to_value(request).unwrap_or(Value::Null)
    }

    /// Fatal counterpart of the advisory `ValidationPlugin` checks: any rule
    /// violation fails this one item instead of being logged and sent anyway.
    pub fn ensure_valid(&self, kind: EntityKind, payload: &Value) -> Result<(), GenerationError> {
        Ok(rule_set(kind).validate(payload)?)
    }

    /// Look up a previously created entity in the cache plugin, if one is
    /// registered. Keys are `{kind}:{unique field}` as written on
    /// after-entity hooks.
    pub fn cached_entity<T: DeserializeOwned>(&self, kind: EntityKind, key: &str) -> Option<T> {
        let cache = self.plugins.cache()?;
        let value = cache.get(&format!("{kind}:{key}"))?;
        debug!(kind = %kind, key, "entity resolved from cache");
        serde_json::from_value(value).ok()
    }

    /// Record a failed creation in metrics and fan out the error hook.
    pub async fn report_entity_error(&self, kind: EntityKind, err: &GenerationError) {
        self.registry.record_error(Some(kind));
        self.plugins.entity_error(kind, &err.to_string()).await;
    }

    pub async fn fire_before_entity(&self, kind: EntityKind, payload: &Value) {
        self.plugins
            .before_entity(&EntityEvent {
                kind,
                id: None,
                payload,
            })
            .await;
    }

    pub async fn fire_after_entity(&self, kind: EntityKind, id: &str, payload: &Value) {
        self.plugins
            .after_entity(&EntityEvent {
                kind,
                id: Some(id),
                payload,
            })
            .await;
    }
}

/// Recover from an already-exists conflict by retrieving the existing
/// entity.
///
/// Conflicts resolve to `Ok(Some(entity))` when retrieval finds the
/// counterpart, `Ok(None)` when retrieval fails too (the retrieval-failure
/// path never re-throws, to keep the run going). Non-conflict errors
/// propagate unchanged.
pub async fn resolve_conflict<T, F, Fut>(
    err: GenerationError,
    entity_name: &str,
    retriever: F,
) -> Result<Option<T>, GenerationError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<T>, GenerationError>>,
{
    if !err.is_conflict() {
        return Err(err);
    }
    warn!(entity = entity_name, error = %err, "conflict, adopting existing entity");
    match retriever().await {
        Ok(found) => Ok(found),
        Err(retrieve_err) => {
            warn!(
                entity = entity_name,
                error = %retrieve_err,
                "conflict retrieval failed"
            );
            Ok(None)
        }
    }
}

/// Concurrency cap for high-volume entity batches: conservative so the
/// generator itself doesn't rate-limit the remote API.
pub fn batch_concurrency(max_concurrency: usize, item_count: usize) -> usize {
    (max_concurrency / 2).clamp(1, 10).min(item_count.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerforge_client::{ClientError, ErrorKind};

    #[tokio::test]
    async fn non_conflict_error_propagates() {
        let err = GenerationError::Client(ClientError::from_status(500, "boom"));
        let result = resolve_conflict(err, "asset", || async { Ok(Some(1)) }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn conflict_resolves_via_retriever() {
        let err = GenerationError::Client(ClientError::from_status(409, "already exists"));
        let result = resolve_conflict(err, "asset", || async { Ok(Some(42)) }).await;
        assert_eq!(result.ok().flatten(), Some(42));
    }

    #[tokio::test]
    async fn conflict_with_failed_retrieval_yields_none() {
        let err = GenerationError::Client(ClientError::new(
            ErrorKind::Other,
            None,
            "entity already exists",
        ));
        let result: Result<Option<i32>, _> = resolve_conflict(err, "asset", || async {
            Err(GenerationError::Client(ClientError::from_status(500, "down")))
        })
        .await;
        assert_eq!(result.ok(), Some(None));
    }

    #[test]
    fn batch_concurrency_is_conservative() {
        assert_eq!(batch_concurrency(10, 100), 5);
        assert_eq!(batch_concurrency(100, 100), 10);
        assert_eq!(batch_concurrency(10, 2), 2);
        assert_eq!(batch_concurrency(1, 100), 1);
    }
}
