use super::*;
use crate::identity::MemoryStorage;
use crate::test_support::{MockServer, Reply};

const ANON: &str = "anon-key";

fn token_body(token: &str) -> Value {
    json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": format!("refresh-{token}"),
        "user": { "id": "u1", "email": "a@b.c", "user_metadata": {} },
    })
}

fn stored(token: &str, expires_at: Option<i64>, refresh: Option<&str>) -> Session {
    Session {
        access_token: token.into(),
        expires_at,
        refresh_token: refresh.map(str::to_owned),
        user: User { id: "u1".into(), email: Some("a@b.c".into()), ..User::default() },
        ..Session::default()
    }
}

fn provider(server: &MockServer, storage: Arc<MemoryStorage>) -> SupabaseAuth {
    SupabaseAuth::new(&server.url, ANON, storage)
}

// =========================================================================
// error_message
// =========================================================================

#[test]
fn error_message_field_precedence() {
    assert_eq!(
        error_message(400, r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
        "Invalid login credentials"
    );
    assert_eq!(error_message(422, r#"{"msg":"Password should be at least 6 characters"}"#), "Password should be at least 6 characters");
    assert_eq!(error_message(429, r#"{"message":"rate limited"}"#), "rate limited");
    assert_eq!(error_message(500, "<html>"), "HTTP 500");
    assert_eq!(error_message(500, r#"{"error":""}"#), "HTTP 500");
}

// =========================================================================
// sign in / sign up
// =========================================================================

#[tokio::test]
async fn sign_in_stores_session_and_emits() {
    let server = MockServer::start(vec![("POST /auth/v1/token?grant_type=password", Reply::json(200, token_body("t1")))]).await;
    let storage = Arc::new(MemoryStorage::new());
    let auth = provider(&server, storage.clone());
    let mut sub = auth.subscribe();

    let session = auth.sign_in_with_password("a@b.c", "pw").await.unwrap();
    assert_eq!(session.access_token, "t1");
    assert!(session.expires_at.is_some());
    assert_eq!(storage.load().await.unwrap().unwrap().access_token, "t1");
    assert_eq!(sub.recv().await.unwrap().event, AuthEvent::SignedIn);

    let req = server.last_request();
    assert_eq!(req.apikey.as_deref(), Some(ANON));
    assert_eq!(req.authorization.as_deref(), Some("Bearer anon-key"));
    assert_eq!(req.body, Some(json!({ "email": "a@b.c", "password": "pw" })));
}

#[tokio::test]
async fn sign_in_rejection_carries_provider_text() {
    let server = MockServer::always(Reply::json(
        400,
        json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" }),
    ))
    .await;
    let storage = Arc::new(MemoryStorage::new());
    let err = provider(&server, storage.clone())
        .sign_in_with_password("a@b.c", "bad")
        .await
        .unwrap_err();
    assert_eq!(err, ProviderError::Api { status: 400, message: "Invalid login credentials".into() });
    assert!(storage.load().await.unwrap().is_none());
}

#[tokio::test]
async fn sign_up_pending_confirmation_has_no_session() {
    let server = MockServer::start(vec![(
        "POST /auth/v1/signup",
        Reply::json(200, json!({ "id": "u2", "email": "new@b.c", "confirmation_sent_at": "now" })),
    )])
    .await;
    let storage = Arc::new(MemoryStorage::new());
    let outcome = provider(&server, storage.clone()).sign_up("new@b.c", "pw123456").await.unwrap();
    assert!(outcome.session.is_none());
    assert_eq!(outcome.user.unwrap().id, "u2");
    assert!(storage.load().await.unwrap().is_none());
}

#[tokio::test]
async fn sign_up_auto_confirm_returns_session() {
    let server = MockServer::start(vec![("POST /auth/v1/signup", Reply::json(200, token_body("t2")))]).await;
    let storage = Arc::new(MemoryStorage::new());
    let outcome = provider(&server, storage.clone()).sign_up("a@b.c", "pw123456").await.unwrap();
    assert_eq!(outcome.session.unwrap().access_token, "t2");
    assert!(storage.load().await.unwrap().is_some());
}

// =========================================================================
// get_session
// =========================================================================

#[tokio::test]
async fn get_session_returns_fresh_session_without_network() {
    let server = MockServer::always(Reply::json(500, json!({}))).await;
    let far_future = now_unix() + 3600;
    let storage = Arc::new(MemoryStorage::with_session(stored("live", Some(far_future), Some("r"))));
    let session = provider(&server, storage).get_session().await.unwrap().unwrap();
    assert_eq!(session.access_token, "live");
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn get_session_refreshes_near_expiry() {
    let server = MockServer::start(vec![(
        "POST /auth/v1/token?grant_type=refresh_token",
        Reply::json(200, token_body("fresh")),
    )])
    .await;
    let storage = Arc::new(MemoryStorage::with_session(stored("old", Some(now_unix() + 10), Some("r-old"))));
    let auth = provider(&server, storage.clone());
    let mut sub = auth.subscribe();

    let session = auth.get_session().await.unwrap().unwrap();
    assert_eq!(session.access_token, "fresh");
    assert_eq!(storage.load().await.unwrap().unwrap().access_token, "fresh");
    assert_eq!(sub.recv().await.unwrap().event, AuthEvent::TokenRefreshed);
    assert_eq!(server.last_request().body, Some(json!({ "refresh_token": "r-old" })));
}

#[tokio::test]
async fn failed_refresh_clears_and_signs_out() {
    let server = MockServer::always(Reply::json(400, json!({ "error_description": "Invalid Refresh Token" }))).await;
    let storage = Arc::new(MemoryStorage::with_session(stored("old", Some(now_unix() - 10), Some("r-old"))));
    let auth = provider(&server, storage.clone());
    let mut sub = auth.subscribe();

    let err = auth.get_session().await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid Refresh Token");
    assert!(storage.load().await.unwrap().is_none());
    assert_eq!(sub.recv().await.unwrap().event, AuthEvent::SignedOut);
}

#[tokio::test]
async fn expired_without_refresh_token_is_no_session() {
    let server = MockServer::always(Reply::json(500, json!({}))).await;
    let storage = Arc::new(MemoryStorage::with_session(stored("old", Some(now_unix() - 10), None)));
    assert!(provider(&server, storage.clone()).get_session().await.unwrap().is_none());
    assert!(storage.load().await.unwrap().is_none());
}

// =========================================================================
// sign out / recover / update
// =========================================================================

#[tokio::test]
async fn sign_out_revokes_with_access_token() {
    let server = MockServer::start(vec![("POST /auth/v1/logout", Reply::empty(204))]).await;
    let storage = Arc::new(MemoryStorage::with_session(stored("live", None, None)));
    provider(&server, storage.clone()).sign_out().await.unwrap();
    assert_eq!(server.last_request().authorization.as_deref(), Some("Bearer live"));
    assert!(storage.load().await.unwrap().is_none());
}

#[tokio::test]
async fn sign_out_clears_locally_when_remote_fails() {
    let server = MockServer::always(Reply::json(500, json!({ "msg": "boom" }))).await;
    let storage = Arc::new(MemoryStorage::with_session(stored("live", None, None)));
    let auth = provider(&server, storage.clone());
    let mut sub = auth.subscribe();

    assert!(auth.sign_out().await.is_err());
    assert!(storage.load().await.unwrap().is_none());
    assert_eq!(sub.recv().await.unwrap().event, AuthEvent::SignedOut);
}

#[tokio::test]
async fn reset_password_sends_redirect() {
    let server = MockServer::start(vec![("POST /auth/v1/recover", Reply::json(200, json!({})))]).await;
    let auth = provider(&server, Arc::new(MemoryStorage::new()));
    auth.reset_password_for_email("a@b.c", Some("http://app/auth/login?mode=reset"))
        .await
        .unwrap();
    let req = server.last_request();
    assert_eq!(req.body, Some(json!({ "email": "a@b.c" })));
    assert_eq!(
        req.query.as_deref(),
        Some("redirect_to=http%3A%2F%2Fapp%2Fauth%2Flogin%3Fmode%3Dreset")
    );
}

#[tokio::test]
async fn update_user_requires_session() {
    let server = MockServer::always(Reply::json(200, json!({}))).await;
    let err = provider(&server, Arc::new(MemoryStorage::new()))
        .update_user(&UserAttributes::default())
        .await
        .unwrap_err();
    assert_eq!(err, ProviderError::MissingSession);
}

#[tokio::test]
async fn update_user_persists_new_metadata() {
    let server = MockServer::start(vec![(
        "PUT /auth/v1/user",
        Reply::json(200, json!({ "id": "u1", "email": "a@b.c", "user_metadata": { "name": "Ada" } })),
    )])
    .await;
    let storage = Arc::new(MemoryStorage::with_session(stored("live", None, None)));
    let auth = provider(&server, storage.clone());
    let mut sub = auth.subscribe();

    let attrs = UserAttributes { data: Some(json!({ "name": "Ada" })), ..UserAttributes::default() };
    let user = auth.update_user(&attrs).await.unwrap();
    assert_eq!(user.display_name(), Some("Ada"));
    assert_eq!(storage.load().await.unwrap().unwrap().user.display_name(), Some("Ada"));
    assert_eq!(server.last_request().authorization.as_deref(), Some("Bearer live"));
    assert_eq!(sub.recv().await.unwrap().event, AuthEvent::UserUpdated);
}
