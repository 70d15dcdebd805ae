use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::InviteStore;
use crate::directory::{ProjectDirectory, UserDirectory};
use crate::errors::StoreError;
use crate::membership::MembershipService;
use crate::models::invite::{Invite, NewInvite, PrivilegeLevel};
use crate::models::notification::{NewNotification, Notification};
use crate::models::user::{Project, ProjectMember, User};
use crate::notification::NotificationStore;

/// In-process store backed by DashMaps.
///
/// Used when no database is configured and by tests. Cloning shares the
/// underlying maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    invites: Arc<DashMap<Uuid, Invite>>,
    /// token → invite id; enforces token uniqueness.
    tokens: Arc<DashMap<String, Uuid>>,
    notifications: Arc<DashMap<(Uuid, String), Notification>>,
    users: Arc<DashMap<Uuid, User>>,
    projects: Arc<DashMap<Uuid, Project>>,
    members: Arc<DashMap<(Uuid, Uuid), ProjectMember>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn insert_project(&self, project: Project) {
        self.projects.insert(project.id, project);
    }

    pub fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        self.notifications
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn members_of(&self, project_id: Uuid) -> Vec<ProjectMember> {
        self.members
            .iter()
            .filter(|e| e.key().0 == project_id)
            .map(|e| e.value().clone())
            .collect()
    }

    fn remove_invite(&self, invite_id: Uuid) -> bool {
        match self.invites.remove(&invite_id) {
            Some((_, invite)) => {
                self.tokens.remove(&invite.token);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl InviteStore for MemoryStore {
    async fn count(&self, project_id: Uuid) -> Result<i64, StoreError> {
        let n = self
            .invites
            .iter()
            .filter(|e| e.value().project_id == project_id)
            .count();
        Ok(n as i64)
    }

    async fn list_all(&self, project_id: Uuid) -> Result<Vec<Invite>, StoreError> {
        Ok(self
            .invites
            .iter()
            .filter(|e| e.value().project_id == project_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn create(&self, invite: NewInvite) -> Result<Invite, StoreError> {
        let id = Uuid::new_v4();
        match self.tokens.entry(invite.token.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict("invite token already exists".into())),
            Entry::Vacant(slot) => {
                slot.insert(id);
                let invite = invite.into_invite(id);
                self.invites.insert(id, invite.clone());
                Ok(invite)
            }
        }
    }

    async fn find_by_id(
        &self,
        project_id: Uuid,
        invite_id: Uuid,
    ) -> Result<Option<Invite>, StoreError> {
        Ok(self
            .invites
            .get(&invite_id)
            .filter(|i| i.project_id == project_id)
            .map(|i| i.clone()))
    }

    async fn find_by_token(
        &self,
        project_id: Uuid,
        token: &str,
    ) -> Result<Option<Invite>, StoreError> {
        let id = match self.tokens.get(token) {
            Some(id) => *id,
            None => return Ok(None),
        };
        self.find_by_id(project_id, id).await
    }

    async fn delete_by_id(&self, project_id: Uuid, invite_id: Uuid) -> Result<bool, StoreError> {
        let belongs = self
            .invites
            .get(&invite_id)
            .map(|i| i.project_id == project_id)
            .unwrap_or(false);
        Ok(belongs && self.remove_invite(invite_id))
    }

    async fn delete_by_id_only(&self, invite_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.remove_invite(invite_id))
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn upsert_notification(&self, n: &NewNotification) -> Result<(), StoreError> {
        self.notifications.insert(
            (n.user_id, n.key.clone()),
            Notification {
                id: Uuid::new_v4(),
                user_id: n.user_id,
                key: n.key.clone(),
                template_key: n.template_key.clone(),
                message_opts: n.message_opts.clone(),
                is_read: false,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn mark_read_by_key(&self, key: &str) -> Result<bool, StoreError> {
        let mut changed = false;
        for mut entry in self.notifications.iter_mut() {
            if entry.key().1 == key && !entry.is_read {
                entry.is_read = true;
                changed = true;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|e| e.value().email.eq_ignore_ascii_case(email))
            .map(|e| e.value().clone()))
    }

    async fn get_user(&self, user_id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }
}

#[async_trait]
impl ProjectDirectory for MemoryStore {
    async fn get_project(&self, project_id: Uuid) -> anyhow::Result<Project> {
        self.projects
            .get(&project_id)
            .map(|p| p.clone())
            .ok_or_else(|| anyhow::anyhow!("project {} not found", project_id))
    }
}

#[async_trait]
impl MembershipService for MemoryStore {
    async fn add_user(
        &self,
        project_id: Uuid,
        granting_user_id: Uuid,
        grantee_user_id: Uuid,
        privileges: PrivilegeLevel,
    ) -> anyhow::Result<()> {
        match self.members.entry((project_id, grantee_user_id)) {
            Entry::Occupied(_) => anyhow::bail!(
                "user {} is already a member of project {}",
                grantee_user_id,
                project_id
            ),
            Entry::Vacant(slot) => {
                slot.insert(ProjectMember {
                    project_id,
                    user_id: grantee_user_id,
                    privileges,
                    added_by: granting_user_id,
                    created_at: Utc::now(),
                });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_invite(project_id: Uuid, token: &str) -> NewInvite {
        NewInvite {
            project_id,
            email: "user@example.com".into(),
            token: token.into(),
            sending_user_id: Uuid::new_v4(),
            privileges: PrivilegeLevel::ReadOnly,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_token_is_conflict() {
        let store = MemoryStore::new();
        let project = Uuid::new_v4();
        store.create(new_invite(project, "same")).await.unwrap();
        let err = store.create(new_invite(project, "same")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.count(project).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lookups_are_scoped_to_project() {
        let store = MemoryStore::new();
        let project = Uuid::new_v4();
        let other = Uuid::new_v4();
        let invite = store.create(new_invite(project, "tok")).await.unwrap();

        assert!(store.find_by_token(project, "tok").await.unwrap().is_some());
        assert!(store.find_by_token(other, "tok").await.unwrap().is_none());
        assert!(store.find_by_id(other, invite.id).await.unwrap().is_none());
        assert_eq!(store.count(other).await.unwrap(), 0);

        // Deleting under the wrong project leaves the invite alone.
        assert!(!store.delete_by_id(other, invite.id).await.unwrap());
        assert_eq!(store.list_all(project).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_and_frees_token() {
        let store = MemoryStore::new();
        let project = Uuid::new_v4();
        let invite = store.create(new_invite(project, "tok")).await.unwrap();

        assert!(store.delete_by_id_only(invite.id).await.unwrap());
        assert!(!store.delete_by_id_only(invite.id).await.unwrap());
        assert!(store.find_by_token(project, "tok").await.unwrap().is_none());
        store.create(new_invite(project, "tok")).await.unwrap();
    }

    #[tokio::test]
    async fn test_find_user_by_email_ignores_case() {
        let store = MemoryStore::new();
        let user = User {
            id: Uuid::new_v4(),
            email: "Someone@Example.com".into(),
            first_name: "Sam".into(),
        };
        store.insert_user(user.clone());
        let found = store.find_user_by_email("someone@example.com").await.unwrap();
        assert_eq!(found, Some(user));
        assert!(store.find_user_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_user_twice_fails() {
        let store = MemoryStore::new();
        let (project, owner, user) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store
            .add_user(project, owner, user, PrivilegeLevel::ReadAndWrite)
            .await
            .unwrap();
        assert!(store
            .add_user(project, owner, user, PrivilegeLevel::ReadOnly)
            .await
            .is_err());
        let members = store.members_of(project);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].privileges, PrivilegeLevel::ReadAndWrite);
        assert_eq!(members[0].added_by, owner);
    }
}
