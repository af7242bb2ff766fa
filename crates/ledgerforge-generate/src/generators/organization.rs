use std::sync::Arc;

use tracing::info;

use ledgerforge_core::{EntityKind, Organization, OrganizationRequest, Status};

use crate::batch::run_sequential;
use crate::errors::GenerationError;
use crate::generators::{GeneratorCtx, resolve_conflict};
use crate::guard::ExecutionGuard;
use crate::retry::RetryPolicy;

pub struct OrganizationGenerator {
    ctx: GeneratorCtx,
    guard: Arc<ExecutionGuard>,
}

impl OrganizationGenerator {
    pub fn new(ctx: GeneratorCtx) -> Self {
        let guard = Arc::new(ExecutionGuard::new(
            "organization",
            RetryPolicy::default(),
            Arc::clone(&ctx.registry),
        ));
        Self { ctx, guard }
    }

    pub async fn generate(&self, count: usize) -> Vec<Organization> {
        let outcome = run_sequential("organizations", count, |_| self.generate_one()).await;
        outcome.results
    }

    pub async fn generate_one(&self) -> Result<Organization, GenerationError> {
        let legal_name = self.ctx.names.company_name();
        let request = OrganizationRequest {
            legal_name: legal_name.clone(),
            doing_business_as: Some(legal_name.clone()),
            legal_document: self.ctx.names.legal_document(),
            status: Status::active(),
            metadata: self.ctx.fingerprint(),
        };
        let payload = self.ctx.payload_json(&request);
        self.ctx
            .fire_before_entity(EntityKind::Organization, &payload)
            .await;

        let api = &self.ctx.api;
        let created = self
            .guard
            .execute("create organization", || api.create_organization(&request))
            .await;

        let organization = match created {
            Ok(organization) => organization,
            Err(err) => {
                let existing = resolve_conflict(err, "organization", || async {
                    if let Some(found) = self
                        .ctx
                        .cached_entity(EntityKind::Organization, &request.legal_name)
                    {
                        return Ok(Some(found));
                    }
                    let organizations = api.list_organizations().await?;
                    Ok(organizations
                        .into_iter()
                        .find(|org| org.legal_name == request.legal_name))
                })
                .await;
                match existing {
                    Ok(Some(organization)) => organization,
                    Ok(None) => {
                        let err = GenerationError::ConflictUnresolved("organization".to_string());
                        self.ctx
                            .report_entity_error(EntityKind::Organization, &err)
                            .await;
                        return Err(err);
                    }
                    Err(err) => {
                        self.ctx
                            .report_entity_error(EntityKind::Organization, &err)
                            .await;
                        return Err(err);
                    }
                }
            }
        };

        self.ctx.registry.add_organization(&organization.id);
        let created_payload = self.ctx.payload_json(&organization);
        self.ctx
            .fire_after_entity(EntityKind::Organization, &organization.id, &created_payload)
            .await;
        info!(organization_id = %organization.id, legal_name = %organization.legal_name, "organization ready");
        Ok(organization)
    }
}
