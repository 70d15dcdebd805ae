use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pending offer of access to a project, addressed to an email.
///
/// Invites are never updated in place. They are created once, read by
/// resend/accept, and removed by revoke or accept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub id: Uuid,
    pub project_id: Uuid,
    pub email: String,
    pub token: String,
    pub sending_user_id: Uuid,
    pub privileges: PrivilegeLevel,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when persisting a new invite. The store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvite {
    pub project_id: Uuid,
    pub email: String,
    pub token: String,
    pub sending_user_id: Uuid,
    pub privileges: PrivilegeLevel,
    pub created_at: DateTime<Utc>,
}

impl NewInvite {
    pub fn into_invite(self, id: Uuid) -> Invite {
        Invite {
            id,
            project_id: self.project_id,
            email: self.email,
            token: self.token,
            sending_user_id: self.sending_user_id,
            privileges: self.privileges,
            created_at: self.created_at,
        }
    }
}

/// Access tier granted on acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "camelCase")]
#[sqlx(type_name = "varchar", rename_all = "camelCase")]
pub enum PrivilegeLevel {
    ReadOnly,
    ReadAndWrite,
}

impl PrivilegeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivilegeLevel::ReadOnly => "readOnly",
            PrivilegeLevel::ReadAndWrite => "readAndWrite",
        }
    }
}

impl std::fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PrivilegeLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "readOnly" => Ok(PrivilegeLevel::ReadOnly),
            "readAndWrite" => Ok(PrivilegeLevel::ReadAndWrite),
            other => anyhow::bail!("unknown privilege level '{}'", other),
        }
    }
}
