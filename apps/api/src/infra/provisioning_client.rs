//! HTTP client for the service that builds storefront instances.

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::use_cases::site::{
    ProvisionOutcome, ProvisionRequest, ProvisionStatus, SiteCredentials, SiteProvisioner,
};

#[derive(Clone)]
pub struct ProvisioningClient {
    client: Client,
    base_url: Url,
    key: String,
    secret: SecretString,
}

impl ProvisioningClient {
    /// `client` should carry the long provisioning timeout.
    pub fn new(client: Client, base_url: Url, key: String, secret: SecretString) -> Self {
        Self {
            client,
            base_url,
            key,
            secret,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    async fn read<T: for<'de> Deserialize<'de>>(response: Response) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::UpstreamProvisioning(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Provisioning service error");
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.or(b.message))
                .unwrap_or_else(|| format!("status {status}"));
            return Err(AppError::UpstreamProvisioning(message));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse provisioning response");
            AppError::UpstreamProvisioning(format!("Unexpected response: {e}"))
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSiteBody<'a> {
    domain: &'a str,
    name: &'a str,
    password: &'a str,
    user_id: Uuid,
    product_type: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSiteResponse {
    task_id: Option<String>,
    #[serde(flatten)]
    credentials: CredentialFields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskStatusResponse {
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    failed: bool,
    error: Option<String>,
    #[serde(flatten)]
    credentials: CredentialFields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialFields {
    consumer_key: Option<String>,
    consumer_secret: Option<String>,
    admin_url: Option<String>,
}

impl CredentialFields {
    fn into_credentials(self) -> Option<SiteCredentials> {
        Some(SiteCredentials {
            consumer_key: self.consumer_key.filter(|k| !k.is_empty())?,
            consumer_secret: self.consumer_secret.filter(|s| !s.is_empty())?,
            admin_url: self.admin_url,
        })
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[async_trait]
impl SiteProvisioner for ProvisioningClient {
    async fn create_site(&self, request: &ProvisionRequest) -> AppResult<ProvisionOutcome> {
        let body = CreateSiteBody {
            domain: &request.domain,
            name: &request.name,
            password: request.password.expose_secret(),
            user_id: request.user_id,
            product_type: &request.product_type,
        };

        let response = self
            .client
            .post(self.endpoint("sites"))
            .basic_auth(&self.key, Some(self.secret.expose_secret()))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::UpstreamProvisioning(format!("Request failed: {e}")))?;

        let parsed: CreateSiteResponse = Self::read(response).await?;
        if let Some(task_id) = parsed.task_id.filter(|t| !t.is_empty()) {
            return Ok(ProvisionOutcome::Pending { task_id });
        }
        parsed
            .credentials
            .into_credentials()
            .map(ProvisionOutcome::Ready)
            .ok_or_else(|| {
                AppError::UpstreamProvisioning("Response had neither task id nor credentials".into())
            })
    }

    async fn task_status(&self, task_id: &str) -> AppResult<ProvisionStatus> {
        let mut url = Url::parse(&self.endpoint("sites/status/"))
            .map_err(|e| AppError::Configuration(format!("Invalid provisioning URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Configuration("Provisioning URL cannot be a base".into()))?
            .pop_if_empty()
            .push(task_id);

        let response = self
            .client
            .get(url)
            .basic_auth(&self.key, Some(self.secret.expose_secret()))
            .send()
            .await
            .map_err(|e| AppError::UpstreamProvisioning(format!("Request failed: {e}")))?;

        let parsed: TaskStatusResponse = Self::read(response).await?;
        if parsed.failed {
            return Ok(ProvisionStatus::Failed(
                parsed.error.unwrap_or_else(|| "Provisioning failed".into()),
            ));
        }
        if !parsed.completed {
            return Ok(ProvisionStatus::Pending);
        }
        match parsed.credentials.into_credentials() {
            Some(credentials) => Ok(ProvisionStatus::Completed(credentials)),
            None => Ok(ProvisionStatus::Failed(
                "Completed without credentials".into(),
            )),
        }
    }
}
