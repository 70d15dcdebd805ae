use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::{debug, info};
use uuid::Uuid;

use crate::directory::ProjectDirectory;
use crate::models::invite::Invite;
use crate::models::user::User;

/// Delivers the "you have been invited" email.
#[async_trait]
pub trait InviteMailer: Send + Sync {
    async fn notify_user_of_project_invite(
        &self,
        project_id: Uuid,
        email: &str,
        invite: &Invite,
        sending_user: &User,
    ) -> anyhow::Result<()>;
}

// ── Email Payload ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct InviteEmail {
    pub to: String,
    pub template: String,
    pub subject: String,
    pub invite_url: String,
    pub inviter_name: String,
    pub project_name: String,
}

/// Link the invitee follows to accept.
pub fn invite_url(site_url: &str, invite: &Invite, project_name: &str, inviter_name: &str) -> String {
    format!(
        "{}/project/{}/invite/token/{}?project_name={}&user_first_name={}",
        site_url.trim_end_matches('/'),
        invite.project_id,
        invite.token,
        urlencoding::encode(project_name),
        urlencoding::encode(inviter_name),
    )
}

/// Compute HMAC-SHA256 of `payload` using `secret`, as "sha256=<hex>".
pub fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

// ── Mail Relay ────────────────────────────────────────────────

/// Posts invite emails to an HTTP mail relay.
///
/// With no relay configured, sends are logged and skipped. A non-2xx reply
/// is an error; there is no retry.
#[derive(Clone)]
pub struct MailRelayMailer {
    client: reqwest::Client,
    relay_url: Option<String>,
    signing_secret: Option<String>,
    site_url: String,
    projects: Arc<dyn ProjectDirectory>,
}

impl MailRelayMailer {
    pub fn new(
        relay_url: Option<String>,
        signing_secret: Option<String>,
        site_url: String,
        projects: Arc<dyn ProjectDirectory>,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .user_agent("collab-invites/1.0")
                .build()
                .expect("failed to build mail relay HTTP client"),
            relay_url,
            signing_secret,
            site_url,
            projects,
        }
    }
}

#[async_trait]
impl InviteMailer for MailRelayMailer {
    async fn notify_user_of_project_invite(
        &self,
        project_id: Uuid,
        email: &str,
        invite: &Invite,
        sending_user: &User,
    ) -> anyhow::Result<()> {
        let url = match &self.relay_url {
            Some(u) => u,
            None => {
                debug!(invite_id = %invite.id, "No mail relay configured, skipping invite email");
                return Ok(());
            }
        };

        let project = self.projects.get_project(project_id).await?;
        let message = InviteEmail {
            to: email.to_string(),
            template: "projectInvite".to_string(),
            subject: format!(
                "{} wants to share '{}' with you",
                sending_user.first_name, project.name
            ),
            invite_url: invite_url(&self.site_url, invite, &project.name, &sending_user.first_name),
            inviter_name: sending_user.first_name.clone(),
            project_name: project.name,
        };

        let payload = serde_json::to_vec(&message).context("failed to serialize invite email")?;
        let mut req = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .header("x-collab-delivery-id", Uuid::new_v4().to_string())
            .header("x-collab-timestamp", chrono::Utc::now().timestamp().to_string());

        if let Some(secret) = &self.signing_secret {
            req = req.header("x-collab-signature", hmac_sha256_hex(secret, &payload));
        }

        let resp = req
            .body(payload)
            .send()
            .await
            .context("failed to reach mail relay")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("mail relay returned error: status={}, body={}", status, body);
        }

        info!(invite_id = %invite.id, %project_id, "Sent invite email");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invite::{NewInvite, PrivilegeLevel};

    #[test]
    fn test_invite_url_encodes_query() {
        let invite = NewInvite {
            project_id: Uuid::nil(),
            email: "user@example.com".into(),
            token: "abc123".into(),
            sending_user_id: Uuid::nil(),
            privileges: PrivilegeLevel::ReadOnly,
            created_at: chrono::Utc::now(),
        }
        .into_invite(Uuid::new_v4());

        let url = invite_url("https://docs.example.com/", &invite, "My Thesis & Notes", "Bob");
        assert_eq!(
            url,
            "https://docs.example.com/project/00000000-0000-0000-0000-000000000000/invite/token/abc123\
             ?project_name=My%20Thesis%20%26%20Notes&user_first_name=Bob"
        );
    }

    #[test]
    fn test_hmac_signature_deterministic() {
        let sig1 = hmac_sha256_hex("secret123", b"payload");
        let sig2 = hmac_sha256_hex("secret123", b"payload");
        assert_eq!(sig1, sig2);
        assert!(sig1.starts_with("sha256="));
        assert_ne!(sig1, hmac_sha256_hex("other", b"payload"));
    }
}
