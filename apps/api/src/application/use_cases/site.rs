use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::helpers::site_ref::normalize_site_ref;
use crate::application::use_cases::user::Principal;
use crate::application::validators::{
    MIN_SITE_PASSWORD_LEN, is_valid_domain, is_valid_site_password,
};
use crate::domain::entities::site::{DEFAULT_PRODUCT_TYPE, SiteStatus};

#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub domain: String,
    pub name: String,
    pub product_type: String,
    pub status: SiteStatus,
    pub order_count: i64,
    pub revenue_cents: i64,
    pub currency: String,
    pub admin_url: Option<String>,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub provisioning_task_id: Option<String>,
    pub last_order_at: Option<DateTime<Utc>>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSite {
    pub user_id: Uuid,
    pub domain: String,
    pub name: String,
    pub product_type: String,
}

/// REST API credentials of a provisioned storefront.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub admin_url: Option<String>,
}

#[async_trait]
pub trait SiteRepoTrait: Send + Sync {
    /// Insert a site in `creating` state. Fails with `InvalidInput` if the domain is taken.
    async fn create(&self, site: &NewSite) -> AppResult<SiteProfile>;
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SiteProfile>>;
    async fn get_by_domain(&self, domain: &str) -> AppResult<Option<SiteProfile>>;
    async fn get_by_task_id(&self, task_id: &str) -> AppResult<Option<SiteProfile>>;
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<SiteProfile>>;
    async fn list_all(&self) -> AppResult<Vec<SiteProfile>>;
    async fn set_pending_task(&self, id: Uuid, task_id: &str) -> AppResult<SiteProfile>;
    async fn activate(&self, id: Uuid, credentials: &SiteCredentials) -> AppResult<SiteProfile>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[derive(Debug)]
pub struct ProvisionRequest {
    pub domain: String,
    pub name: String,
    pub password: SecretString,
    pub user_id: Uuid,
    pub product_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Ready(SiteCredentials),
    Pending { task_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionStatus {
    Pending,
    Completed(SiteCredentials),
    Failed(String),
}

/// External service that builds storefront instances.
#[async_trait]
pub trait SiteProvisioner: Send + Sync {
    async fn create_site(&self, request: &ProvisionRequest) -> AppResult<ProvisionOutcome>;
    async fn task_status(&self, task_id: &str) -> AppResult<ProvisionStatus>;
}

#[derive(Debug)]
pub struct CreateSiteInput {
    pub domain: String,
    pub name: String,
    pub password: SecretString,
    pub product_type: Option<String>,
}

#[derive(Clone)]
pub struct SiteUseCases {
    repo: Arc<dyn SiteRepoTrait>,
    provisioner: Arc<dyn SiteProvisioner>,
}

impl SiteUseCases {
    pub fn new(repo: Arc<dyn SiteRepoTrait>, provisioner: Arc<dyn SiteProvisioner>) -> Self {
        Self { repo, provisioner }
    }

    /// Claim the domain, then ask the provisioner to build the storefront.
    ///
    /// The placeholder row is removed again if provisioning fails so the
    /// domain can be retried.
    #[instrument(skip(self, input), fields(domain = %input.domain))]
    pub async fn create_site(
        &self,
        principal: &Principal,
        input: CreateSiteInput,
    ) -> AppResult<SiteProfile> {
        use secrecy::ExposeSecret;

        let domain = normalize_site_ref(&input.domain)
            .filter(|d| is_valid_domain(d))
            .ok_or_else(|| AppError::InvalidInput("Invalid domain".into()))?;
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::InvalidInput("Site name is required".into()));
        }
        if !is_valid_site_password(input.password.expose_secret()) {
            return Err(AppError::InvalidInput(format!(
                "Password must be at least {MIN_SITE_PASSWORD_LEN} characters"
            )));
        }
        let product_type = input
            .product_type
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PRODUCT_TYPE.to_string());

        if self.repo.get_by_domain(&domain).await?.is_some() {
            return Err(AppError::InvalidInput("Domain is already in use".into()));
        }

        let site = self
            .repo
            .create(&NewSite {
                user_id: principal.user_id,
                domain: domain.clone(),
                name: name.clone(),
                product_type: product_type.clone(),
            })
            .await?;

        let request = ProvisionRequest {
            domain,
            name,
            password: input.password,
            user_id: principal.user_id,
            product_type,
        };

        match self.provisioner.create_site(&request).await {
            Ok(ProvisionOutcome::Ready(credentials)) => {
                tracing::info!(site_id = %site.id, "Site provisioned synchronously");
                self.repo.activate(site.id, &credentials).await
            }
            Ok(ProvisionOutcome::Pending { task_id }) => {
                tracing::info!(site_id = %site.id, task_id = %task_id, "Site provisioning queued");
                self.repo.set_pending_task(site.id, &task_id).await
            }
            Err(e) => {
                tracing::error!(site_id = %site.id, error = %e, "Provisioning failed, releasing domain");
                if let Err(cleanup) = self.repo.delete(site.id).await {
                    tracing::error!(site_id = %site.id, error = %cleanup, "Failed to remove placeholder site");
                }
                Err(match e {
                    AppError::UpstreamProvisioning(msg) => AppError::UpstreamProvisioning(msg),
                    other => AppError::UpstreamProvisioning(other.to_string()),
                })
            }
        }
    }

    /// Poll a queued provisioning task and activate the site once it completes.
    #[instrument(skip(self))]
    pub async fn provisioning_status(
        &self,
        principal: &Principal,
        task_id: &str,
    ) -> AppResult<SiteProfile> {
        let site = self
            .repo
            .get_by_task_id(task_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !principal.can_access(site.user_id) {
            return Err(AppError::NotFound);
        }
        if site.status != SiteStatus::Creating {
            return Ok(site);
        }

        match self.provisioner.task_status(task_id).await? {
            ProvisionStatus::Pending => Ok(site),
            ProvisionStatus::Completed(credentials) => {
                tracing::info!(site_id = %site.id, "Site provisioning completed");
                self.repo.activate(site.id, &credentials).await
            }
            ProvisionStatus::Failed(reason) => {
                tracing::error!(site_id = %site.id, reason = %reason, "Site provisioning failed");
                self.repo.delete(site.id).await?;
                Err(AppError::UpstreamProvisioning(reason))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn list_sites(&self, principal: &Principal) -> AppResult<Vec<SiteProfile>> {
        if principal.is_admin() {
            self.repo.list_all().await
        } else {
            self.repo.list_by_user(principal.user_id).await
        }
    }

    /// Sites of other users are reported as missing rather than forbidden.
    #[instrument(skip(self))]
    pub async fn get_site(&self, principal: &Principal, site_id: Uuid) -> AppResult<SiteProfile> {
        let site = self
            .repo
            .get_by_id(site_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !principal.can_access(site.user_id) {
            return Err(AppError::NotFound);
        }
        Ok(site)
    }

    /// Hard delete; orders go with the site.
    #[instrument(skip(self))]
    pub async fn delete_site(&self, principal: &Principal, site_id: Uuid) -> AppResult<()> {
        let site = self.get_site(principal, site_id).await?;
        self.repo.delete(site.id).await?;
        tracing::info!(site_id = %site.id, domain = %site.domain, "Site deleted");
        Ok(())
    }
}
