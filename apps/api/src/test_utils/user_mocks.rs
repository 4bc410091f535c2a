//! In-memory mocks for users and notifications.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        notification::{NewNotification, NotificationProfile, NotificationRepoTrait},
        user::{NewUser, UserProfile, UserRepoTrait},
    },
    domain::entities::{notification::Recipient, user::Role},
};

// ============================================================================
// Users
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepo {
    pub users: Mutex<HashMap<Uuid, UserProfile>>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserProfile>) -> Self {
        Self {
            users: Mutex::new(users.into_iter().map(|u| (u.id, u)).collect()),
        }
    }

    pub fn get_all(&self) -> Vec<UserProfile> {
        self.users.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl UserRepoTrait for InMemoryUserRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_subject(&self, subject: &str) -> AppResult<Option<UserProfile>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.subject == subject)
            .cloned())
    }

    async fn create(&self, user: &NewUser) -> AppResult<UserProfile> {
        let mut users = self.users.lock().unwrap();
        if let Some(existing) = users.values().find(|u| u.subject == user.subject) {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let profile = UserProfile {
            id: Uuid::new_v4(),
            subject: user.subject.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            stripe_customer_id: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<UserProfile> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(AppError::NotFound)?;
        user.role = role;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_stripe_customer_id(&self, id: Uuid, customer_id: &str) -> AppResult<()> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(AppError::NotFound)?;
        user.stripe_customer_id = Some(customer_id.to_string());
        Ok(())
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Default)]
pub struct InMemoryNotificationRepo {
    pub notifications: Mutex<Vec<NotificationProfile>>,
}

impl InMemoryNotificationRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications in insertion order.
    pub fn get_all(&self) -> Vec<NotificationProfile> {
        self.notifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationRepoTrait for InMemoryNotificationRepo {
    async fn create(&self, notification: &NewNotification) -> AppResult<NotificationProfile> {
        let profile = NotificationProfile {
            id: Uuid::new_v4(),
            recipient: notification.recipient,
            message: notification.message.clone(),
            kind: notification.kind,
            read: false,
            metadata: notification.metadata.clone(),
            created_at: Utc::now(),
        };
        self.notifications.lock().unwrap().push(profile.clone());
        Ok(profile)
    }

    async fn list_unread(
        &self,
        recipients: &[Recipient],
        limit: i64,
    ) -> AppResult<Vec<NotificationProfile>> {
        Ok(self
            .notifications
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|n| !n.read && recipients.contains(&n.recipient))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, id: Uuid, recipients: &[Recipient]) -> AppResult<bool> {
        let mut notifications = self.notifications.lock().unwrap();
        match notifications
            .iter_mut()
            .find(|n| n.id == id && recipients.contains(&n.recipient))
        {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_all(&self) -> AppResult<u64> {
        let mut notifications = self.notifications.lock().unwrap();
        let count = notifications.len() as u64;
        notifications.clear();
        Ok(count)
    }
}

/// Notification store whose every call fails.
pub struct FailingNotificationRepo;

#[async_trait]
impl NotificationRepoTrait for FailingNotificationRepo {
    async fn create(&self, _notification: &NewNotification) -> AppResult<NotificationProfile> {
        Err(AppError::Database("notifications unavailable".into()))
    }

    async fn list_unread(
        &self,
        _recipients: &[Recipient],
        _limit: i64,
    ) -> AppResult<Vec<NotificationProfile>> {
        Err(AppError::Database("notifications unavailable".into()))
    }

    async fn mark_read(&self, _id: Uuid, _recipients: &[Recipient]) -> AppResult<bool> {
        Err(AppError::Database("notifications unavailable".into()))
    }

    async fn delete_all(&self) -> AppResult<u64> {
        Err(AppError::Database("notifications unavailable".into()))
    }
}
