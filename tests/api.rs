//! HTTP surface of the invite API, driven over the in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use collab_invites::api::{api_router, AppState};
use collab_invites::config::Config;
use collab_invites::models::invite::PrivilegeLevel;
use collab_invites::models::user::{Project, User};
use collab_invites::store::memory::MemoryStore;
use collab_invites::store::InviteStore;

struct TestApp {
    app: Router,
    store: Arc<MemoryStore>,
    owner: User,
    invitee: User,
    project: Project,
}

fn setup() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let owner = User {
        id: Uuid::new_v4(),
        email: "bob@example.com".into(),
        first_name: "Bob".into(),
    };
    let invitee = User {
        id: Uuid::new_v4(),
        email: "user@example.com".into(),
        first_name: "Ursula".into(),
    };
    let project = Project {
        id: Uuid::new_v4(),
        name: "Thesis".into(),
        owner_id: owner.id,
    };
    store.insert_user(owner.clone());
    store.insert_user(invitee.clone());
    store.insert_project(project.clone());

    let cfg = Config {
        port: 0,
        database_url: None,
        site_url: "http://localhost:3000".into(),
        mail_relay_url: None,
        mail_relay_secret: None,
    };
    let state = Arc::new(AppState::from_backend(store.clone(), &cfg));

    TestApp {
        app: api_router(state),
        store,
        owner,
        invitee,
        project,
    }
}

async fn send(app: &Router, method: &str, uri: &str, user: Option<Uuid>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(id) = user {
        req = req.header("x-user-id", id.to_string());
    }
    let req = match body {
        Some(b) => req
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_invite_lifecycle_over_http() {
    let t = setup();
    let base = format!("/projects/{}/invites", t.project.id);

    let (status, body) = send(
        &t.app,
        "POST",
        &base,
        Some(t.owner.id),
        Some(json!({ "email": " User@Example.com ", "privileges": "readAndWrite" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "user@example.com");
    assert_eq!(body["privileges"], "readAndWrite");
    assert_eq!(body["sendingUserId"], t.owner.id.to_string());
    assert!(body.get("token").is_none(), "token must not be listed");

    let (status, body) = send(&t.app, "GET", &format!("{}/count", base), Some(t.owner.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, body) = send(&t.app, "GET", &base, Some(t.owner.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // The invitee already has an account, so they were notified in-app.
    let notes = t.store.notifications_for(t.invitee.id);
    assert_eq!(notes.len(), 1);
    assert!(!notes[0].is_read);

    let token = t.store.list_all(t.project.id).await.unwrap()[0].token.clone();

    let (status, _) = send(
        &t.app,
        "GET",
        &format!("{}/token/{}", base, token),
        Some(t.invitee.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &t.app,
        "POST",
        &format!("{}/token/{}/accept", base, token),
        Some(t.invitee.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let members = t.store.members_of(t.project.id);
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, t.invitee.id);
    assert_eq!(members[0].added_by, t.owner.id);
    assert_eq!(members[0].privileges, PrivilegeLevel::ReadAndWrite);
    assert!(t.store.notifications_for(t.invitee.id)[0].is_read);

    // Accepting again finds nothing.
    let (status, body) = send(
        &t.app,
        "POST",
        &format!("{}/token/{}/accept", base, token),
        Some(t.invitee.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "invite_not_found");
}

#[tokio::test]
async fn test_revoke_and_resend_over_http() {
    let t = setup();
    let base = format!("/projects/{}/invites", t.project.id);

    let (_, body) = send(
        &t.app,
        "POST",
        &base,
        Some(t.owner.id),
        Some(json!({ "email": "new@example.com", "privileges": "readOnly" })),
    )
    .await;
    let invite_id = body["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &t.app,
        "POST",
        &format!("{}/{}/resend", base, invite_id),
        Some(t.owner.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Resending something that does not exist is not an error.
    let (status, _) = send(
        &t.app,
        "POST",
        &format!("{}/{}/resend", base, Uuid::new_v4()),
        Some(t.owner.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&t.app, "DELETE", &format!("{}/{}", base, invite_id), Some(t.owner.id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&t.app, "GET", &format!("{}/count", base), Some(t.owner.id), None).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_unknown_token_is_404() {
    let t = setup();
    let (status, _) = send(
        &t.app,
        "GET",
        &format!("/projects/{}/invites/token/nope", t.project.id),
        Some(t.invitee.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_or_unknown_user_is_401() {
    let t = setup();
    let uri = format!("/projects/{}/invites", t.project.id);

    let (status, _) = send(&t.app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&t.app, "GET", &uri, Some(Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["type"], "authentication_error");
}

#[tokio::test]
async fn test_invalid_email_is_400() {
    let t = setup();
    let (status, body) = send(
        &t.app,
        "POST",
        &format!("/projects/{}/invites", t.project.id),
        Some(t.owner.id),
        Some(json!({ "email": "not-an-email", "privileges": "readOnly" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
    assert_eq!(t.store.count(t.project.id).await.unwrap(), 0);
}
