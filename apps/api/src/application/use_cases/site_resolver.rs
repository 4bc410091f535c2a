use std::sync::Arc;

use tracing::instrument;

use crate::app_error::{AppError, AppResult};
use crate::application::helpers::site_ref::{as_site_id, normalize_site_ref};
use crate::application::use_cases::site::{SiteProfile, SiteRepoTrait};

/// Maps the site reference carried by a webhook to a known site.
///
/// A reference that is a UUID is looked up by id, anything else by
/// normalized domain. Sites are never created here.
#[derive(Clone)]
pub struct SiteResolver {
    sites: Arc<dyn SiteRepoTrait>,
}

impl SiteResolver {
    pub fn new(sites: Arc<dyn SiteRepoTrait>) -> Self {
        Self { sites }
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, site_ref: &str) -> AppResult<SiteProfile> {
        let normalized = normalize_site_ref(site_ref)
            .ok_or_else(|| AppError::SiteNotFound(site_ref.to_string()))?;

        let site = match as_site_id(&normalized) {
            Some(id) => self.sites.get_by_id(id).await?,
            None => self.sites.get_by_domain(&normalized).await?,
        };

        site.ok_or(AppError::SiteNotFound(normalized))
    }
}
