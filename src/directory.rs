//! Lookups into account and project records owned by other services.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::user::{Project, User};

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find the account registered under `email`, compared case-insensitively.
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    async fn get_user(&self, user_id: Uuid) -> anyhow::Result<Option<User>>;
}

#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Fetch the project. A missing project is an error.
    async fn get_project(&self, project_id: Uuid) -> anyhow::Result<Project>;
}
