use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::InviteStore;
use crate::directory::{ProjectDirectory, UserDirectory};
use crate::errors::StoreError;
use crate::membership::MembershipService;
use crate::models::invite::{Invite, NewInvite, PrivilegeLevel};
use crate::models::notification::NewNotification;
use crate::models::user::{Project, User};
use crate::notification::NotificationStore;

const INVITE_COLUMNS: &str =
    "id, project_id, email, token, sending_user_id, privileges, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    StoreError::Database(e)
}

// -- Invite Operations --

#[async_trait]
impl InviteStore for PgStore {
    async fn count(&self, project_id: Uuid) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM project_invites WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_all(&self, project_id: Uuid) -> Result<Vec<Invite>, StoreError> {
        let rows = sqlx::query_as::<_, Invite>(&format!(
            "SELECT {} FROM project_invites WHERE project_id = $1",
            INVITE_COLUMNS
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create(&self, invite: NewInvite) -> Result<Invite, StoreError> {
        let row = sqlx::query_as::<_, Invite>(&format!(
            r#"INSERT INTO project_invites (project_id, email, token, sending_user_id, privileges, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {}"#,
            INVITE_COLUMNS
        ))
        .bind(invite.project_id)
        .bind(&invite.email)
        .bind(&invite.token)
        .bind(invite.sending_user_id)
        .bind(invite.privileges)
        .bind(invite.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)?;
        Ok(row)
    }

    async fn find_by_id(
        &self,
        project_id: Uuid,
        invite_id: Uuid,
    ) -> Result<Option<Invite>, StoreError> {
        let row = sqlx::query_as::<_, Invite>(&format!(
            "SELECT {} FROM project_invites WHERE id = $1 AND project_id = $2",
            INVITE_COLUMNS
        ))
        .bind(invite_id)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_token(
        &self,
        project_id: Uuid,
        token: &str,
    ) -> Result<Option<Invite>, StoreError> {
        let row = sqlx::query_as::<_, Invite>(&format!(
            "SELECT {} FROM project_invites WHERE project_id = $1 AND token = $2",
            INVITE_COLUMNS
        ))
        .bind(project_id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_by_id(&self, project_id: Uuid, invite_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM project_invites WHERE id = $1 AND project_id = $2")
            .bind(invite_id)
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id_only(&self, invite_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM project_invites WHERE id = $1")
            .bind(invite_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// -- Notification Operations --

#[async_trait]
impl NotificationStore for PgStore {
    async fn upsert_notification(&self, n: &NewNotification) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO notifications (user_id, key, template_key, message_opts)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (user_id, key) DO UPDATE
               SET template_key = EXCLUDED.template_key,
                   message_opts = EXCLUDED.message_opts,
                   is_read = false,
                   created_at = NOW()"#,
        )
        .bind(n.user_id)
        .bind(&n.key)
        .bind(&n.template_key)
        .bind(&n.message_opts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_read_by_key(&self, key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true WHERE key = $1 AND is_read = false",
        )
        .bind(key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

// -- User / Project Lookups --

#[async_trait]
impl UserDirectory for PgStore {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            "SELECT id, email, first_name FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_user(&self, user_id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, User>("SELECT id, email, first_name FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl ProjectDirectory for PgStore {
    async fn get_project(&self, project_id: Uuid) -> anyhow::Result<Project> {
        sqlx::query_as::<_, Project>("SELECT id, name, owner_id FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| anyhow::anyhow!("project {} not found", project_id))
    }
}

// -- Membership Operations --

#[async_trait]
impl MembershipService for PgStore {
    async fn add_user(
        &self,
        project_id: Uuid,
        granting_user_id: Uuid,
        grantee_user_id: Uuid,
        privileges: PrivilegeLevel,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO project_members (project_id, user_id, privileges, added_by)
               VALUES ($1, $2, $3, $4)"#,
        )
        .bind(project_id)
        .bind(grantee_user_id)
        .bind(privileges)
        .bind(granting_user_id)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;
        Ok(())
    }
}
