use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::jwt::IdentityClaims;
use crate::domain::entities::user::Role;

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: Uuid,
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub stripe_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

#[async_trait]
pub trait UserRepoTrait: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>>;
    async fn get_by_subject(&self, subject: &str) -> AppResult<Option<UserProfile>>;
    /// Insert, or return the existing row if another request created it first.
    async fn create(&self, user: &NewUser) -> AppResult<UserProfile>;
    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<UserProfile>;
    async fn set_stripe_customer_id(&self, id: Uuid, customer_id: &str) -> AppResult<()>;
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub subject: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn require(&self, role: Role) -> AppResult<()> {
        if self.role.satisfies(role) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.satisfies(Role::Admin)
    }

    /// Owners see their own resources, admins see everything.
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

impl From<&UserProfile> for Principal {
    fn from(user: &UserProfile) -> Self {
        Principal {
            user_id: user.id,
            subject: user.subject.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Clone)]
pub struct UserUseCases {
    repo: Arc<dyn UserRepoTrait>,
}

impl UserUseCases {
    pub fn new(repo: Arc<dyn UserRepoTrait>) -> Self {
        Self { repo }
    }

    /// Resolve the principal for verified claims, creating the user on first sight.
    ///
    /// The role is only seeded from the claims at creation. Afterwards the
    /// stored role wins and changes go through `set_role`.
    #[instrument(skip(self, claims), fields(subject = %claims.sub))]
    pub async fn ensure_user(&self, claims: &IdentityClaims) -> AppResult<Principal> {
        if let Some(user) = self.repo.get_by_subject(&claims.sub).await? {
            return Ok(Principal::from(&user));
        }

        let email = claims
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or(AppError::InvalidCredentials)?;

        let user = self
            .repo
            .create(&NewUser {
                subject: claims.sub.clone(),
                email,
                name: claims.display_name().map(str::to_string),
                role: claims.role(),
            })
            .await?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "Created user on first sign-in");
        Ok(Principal::from(&user))
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, principal: &Principal, user_id: Uuid) -> AppResult<UserProfile> {
        if !principal.can_access(user_id) {
            return Err(AppError::Forbidden);
        }
        self.repo.get_by_id(user_id).await?.ok_or(AppError::NotFound)
    }

    #[instrument(skip(self))]
    pub async fn set_role(
        &self,
        principal: &Principal,
        user_id: Uuid,
        role: Role,
    ) -> AppResult<UserProfile> {
        principal.require(Role::Admin)?;
        if principal.user_id == user_id && role != Role::Admin {
            return Err(AppError::InvalidInput("Admins cannot demote themselves".into()));
        }
        self.repo.get_by_id(user_id).await?.ok_or(AppError::NotFound)?;
        self.repo.set_role(user_id, role).await
    }
}
