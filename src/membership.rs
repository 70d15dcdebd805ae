use async_trait::async_trait;
use uuid::Uuid;

use crate::models::invite::PrivilegeLevel;

/// Grants collaborator access on a project.
///
/// Any failure (already a member, storage down) is opaque to callers.
#[async_trait]
pub trait MembershipService: Send + Sync {
    async fn add_user(
        &self,
        project_id: Uuid,
        granting_user_id: Uuid,
        grantee_user_id: Uuid,
        privileges: PrivilegeLevel,
    ) -> anyhow::Result<()>;
}
