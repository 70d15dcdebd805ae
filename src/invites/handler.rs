//! Invite lifecycle: send, resend, revoke, accept.
//!
//! An invite is *pending* while its record exists. It ends either
//! *accepted* (membership granted, record deleted) or *revoked* (record
//! deleted, nothing granted). The handler keeps no state between calls and
//! takes no locks; callers serialise work on a single invite.
//!
//! Failure policy per operation. "Commit point" is the step after which
//! nothing is rolled back.
//!
//! | operation      | commit point       | after commit point                                   |
//! |----------------|--------------------|------------------------------------------------------|
//! | send_invite    | invite persisted   | email / notification failure is returned; invite stays |
//! | resend_invite  | none               | missing invite is a silent no-op                     |
//! | revoke_invite  | invite deleted     | notification cancel failure is returned              |
//! | accept_invite  | membership granted | delete or cancel failure is returned; grant stays    |
//!
//! Email failure always stops the in-app notification from being attempted.
//! Nothing here retries.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::token::TokenGenerator;
use crate::directory::{ProjectDirectory, UserDirectory};
use crate::errors::InviteError;
use crate::membership::MembershipService;
use crate::models::invite::{Invite, NewInvite, PrivilegeLevel};
use crate::models::user::User;
use crate::notification::email::InviteMailer;
use crate::notification::{InviteNotificationPayload, NotificationsBuilder};
use crate::store::InviteStore;

/// Everything the handler talks to.
#[derive(Clone)]
pub struct InviteDeps {
    pub store: Arc<dyn InviteStore>,
    pub tokens: Arc<dyn TokenGenerator>,
    pub notifications: NotificationsBuilder,
    pub mailer: Arc<dyn InviteMailer>,
    pub users: Arc<dyn UserDirectory>,
    pub projects: Arc<dyn ProjectDirectory>,
    pub membership: Arc<dyn MembershipService>,
}

#[derive(Clone)]
pub struct InviteHandler {
    deps: InviteDeps,
}

impl InviteHandler {
    pub fn new(deps: InviteDeps) -> Self {
        Self { deps }
    }

    pub async fn get_invite_count(&self, project_id: Uuid) -> Result<i64, InviteError> {
        Ok(self.deps.store.count(project_id).await?)
    }

    pub async fn get_all_invites(&self, project_id: Uuid) -> Result<Vec<Invite>, InviteError> {
        Ok(self.deps.store.list_all(project_id).await?)
    }

    /// Create an invite and tell the invitee about it.
    ///
    /// If messaging fails the error is returned but the invite has already
    /// been stored and stays pending.
    #[tracing::instrument(skip(self, sending_user, email), fields(sending_user_id = %sending_user.id))]
    pub async fn send_invite(
        &self,
        project_id: Uuid,
        sending_user: &User,
        email: &str,
        privileges: PrivilegeLevel,
    ) -> Result<Invite, InviteError> {
        let token = self.deps.tokens.generate();

        let invite = self
            .deps
            .store
            .create(NewInvite {
                project_id,
                email: email.to_string(),
                token,
                sending_user_id: sending_user.id,
                privileges,
                created_at: Utc::now(),
            })
            .await?;

        info!(invite_id = %invite.id, %privileges, "invite created");

        if let Err(e) = self.send_messages(project_id, sending_user, &invite).await {
            warn!(invite_id = %invite.id, error = %e, "invite stored but messaging failed");
            return Err(e);
        }

        Ok(invite)
    }

    /// Email the invitee, then try the in-app notification. The email gates
    /// the notification.
    pub async fn send_messages(
        &self,
        project_id: Uuid,
        sending_user: &User,
        invite: &Invite,
    ) -> Result<(), InviteError> {
        self.deps
            .mailer
            .notify_user_of_project_invite(project_id, &invite.email, invite, sending_user)
            .await?;
        self.try_send_invite_notification(project_id, sending_user, invite)
            .await
    }

    /// Show the invite in-app if the email belongs to a registered account.
    /// No account means nothing to do.
    pub async fn try_send_invite_notification(
        &self,
        project_id: Uuid,
        sending_user: &User,
        invite: &Invite,
    ) -> Result<(), InviteError> {
        let existing = match self.deps.users.find_user_by_email(&invite.email).await? {
            Some(user) => user,
            None => {
                debug!(invite_id = %invite.id, "no account for invite email, skipping notification");
                return Ok(());
            }
        };

        let project = self.deps.projects.get_project(project_id).await?;

        self.deps
            .notifications
            .project_invite(existing.id, project_id, invite)
            .create(&InviteNotificationPayload {
                user_name: sending_user.first_name.clone(),
                project_name: project.name,
            })
            .await?;

        debug!(invite_id = %invite.id, user_id = %existing.id, "invite notification sent");
        Ok(())
    }

    #[tracing::instrument(skip(self, sending_user), fields(sending_user_id = %sending_user.id))]
    pub async fn resend_invite(
        &self,
        project_id: Uuid,
        sending_user: &User,
        invite_id: Uuid,
    ) -> Result<(), InviteError> {
        let invite = match self.deps.store.find_by_id(project_id, invite_id).await? {
            Some(invite) => invite,
            None => {
                debug!("resend requested for missing invite");
                return Ok(());
            }
        };

        self.send_messages(project_id, sending_user, &invite).await?;
        info!("invite resent");
        Ok(())
    }

    /// Delete the invite and dismiss its notification.
    ///
    /// A cancel failure is returned even though the delete already happened.
    #[tracing::instrument(skip(self))]
    pub async fn revoke_invite(&self, project_id: Uuid, invite_id: Uuid) -> Result<(), InviteError> {
        let removed = self.deps.store.delete_by_id(project_id, invite_id).await?;
        self.try_cancel_invite_notification(invite_id).await?;
        info!(removed, "invite revoked");
        Ok(())
    }

    pub async fn get_invite_by_token(
        &self,
        project_id: Uuid,
        token: &str,
    ) -> Result<Option<Invite>, InviteError> {
        Ok(self.deps.store.find_by_token(project_id, token).await?)
    }

    /// Turn a pending invite into project membership.
    ///
    /// The invite survives a failed grant so the accept can be retried. Once
    /// the grant succeeds it is not undone, even if cleanup fails.
    #[tracing::instrument(skip(self, token, accepting_user), fields(user_id = %accepting_user.id))]
    pub async fn accept_invite(
        &self,
        project_id: Uuid,
        token: &str,
        accepting_user: &User,
    ) -> Result<(), InviteError> {
        let invite = self
            .get_invite_by_token(project_id, token)
            .await?
            .ok_or(InviteError::NotFound)?;

        self.deps
            .membership
            .add_user(
                project_id,
                invite.sending_user_id,
                accepting_user.id,
                invite.privileges,
            )
            .await?;

        info!(invite_id = %invite.id, privileges = %invite.privileges, "membership granted");

        let removed = match self.deps.store.delete_by_id_only(invite.id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(invite_id = %invite.id, error = %e, "membership granted but invite not deleted");
                return Err(e.into());
            }
        };
        if !removed {
            // Another accept or a revoke got there first.
            debug!(invite_id = %invite.id, "invite already gone at delete");
        }

        self.try_cancel_invite_notification(invite.id).await
    }

    /// Dismiss the invite's notification, addressed by invite id alone.
    pub async fn try_cancel_invite_notification(&self, invite_id: Uuid) -> Result<(), InviteError> {
        self.deps
            .notifications
            .project_invite_by_id(invite_id)
            .read()
            .await?;
        Ok(())
    }
}
