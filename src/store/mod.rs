pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::invite::{Invite, NewInvite};

/// Persistence for pending invites.
/// Implementations: PgStore (Postgres), MemoryStore (DashMap, dev/tests).
///
/// Absence is reported as `None`/`false`, never as an error.
#[async_trait]
pub trait InviteStore: Send + Sync {
    /// Number of pending invites on the project.
    async fn count(&self, project_id: Uuid) -> Result<i64, StoreError>;

    /// All pending invites on the project, in no particular order.
    async fn list_all(&self, project_id: Uuid) -> Result<Vec<Invite>, StoreError>;

    /// Persist a new invite. Fails with `StoreError::Conflict` if the token
    /// is already taken.
    async fn create(&self, invite: NewInvite) -> Result<Invite, StoreError>;

    async fn find_by_id(&self, project_id: Uuid, invite_id: Uuid)
        -> Result<Option<Invite>, StoreError>;

    async fn find_by_token(&self, project_id: Uuid, token: &str)
        -> Result<Option<Invite>, StoreError>;

    /// Remove the invite if it belongs to the project. Returns whether a
    /// record was removed.
    async fn delete_by_id(&self, project_id: Uuid, invite_id: Uuid) -> Result<bool, StoreError>;

    /// Remove the invite by id alone. Returns whether a record was removed.
    async fn delete_by_id_only(&self, invite_id: Uuid) -> Result<bool, StoreError>;
}
