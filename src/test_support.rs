//! Shared test fixtures: a scripted in-process HTTP server and a scripted
//! identity provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::extract::Request;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tokio::sync::Notify;

use crate::identity::{
    AuthChange, AuthEvent, AuthEvents, AuthSubscription, IdentityProvider, ProviderError, Session, SignUpOutcome,
    User, UserAttributes,
};

// =========================================================================
// Mock HTTP server
// =========================================================================

#[derive(Clone, Debug)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub apikey: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone, Debug)]
pub struct Reply {
    status: StatusCode,
    content_type: Option<&'static str>,
    body: String,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            content_type: Some("application/json"),
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            content_type: Some("text/plain; charset=utf-8"),
            body: body.to_owned(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self { status: StatusCode::from_u16(status).unwrap(), content_type: None, body: String::new() }
    }

    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        response.headers_mut().remove(header::CONTENT_TYPE);
        if let Some(ct) = self.content_type {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, header::HeaderValue::from_static(ct));
        }
        response
    }
}

/// Server answering `"METHOD /path"` (or `"METHOD /path?query"`) keys with
/// canned replies and recording every request it sees. Unmatched requests
/// get a JSON 404.
pub struct MockServer {
    pub url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockServer {
    pub async fn start(routes: Vec<(&'static str, Reply)>) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);
        let seen = requests.clone();

        let router = Router::new().fallback(move |req: Request| {
            let seen = seen.clone();
            let routes = routes.clone();
            async move {
                let captured = capture(req).await;
                let key = format!("{} {}", captured.method, captured.path);
                let full_key = match &captured.query {
                    Some(q) => format!("{key}?{q}"),
                    None => key.clone(),
                };
                seen.lock().unwrap().push(captured);
                routes
                    .iter()
                    .find(|(route, _)| if route.contains('?') { *route == full_key } else { *route == key })
                    .map(|(_, reply)| reply.clone())
                    .unwrap_or_else(|| Reply::json(404, json!({ "detail": "Not Found" })))
                    .into_response()
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Self { url: format!("http://{addr}"), requests }
    }

    /// Server answering every request with the same reply.
    pub async fn always(reply: Reply) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        let router = Router::new().fallback(move |req: Request| {
            let seen = seen.clone();
            let reply = reply.clone();
            async move {
                let captured = capture(req).await;
                seen.lock().unwrap().push(captured);
                reply.into_response()
            }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Self { url: format!("http://{addr}"), requests }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> CapturedRequest {
        self.requests().pop().expect("no request recorded")
    }
}

async fn capture(req: Request) -> CapturedRequest {
    let (parts, body) = req.into_parts();
    let header_text = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
    };
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    CapturedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_owned(),
        query: parts.uri.query().map(ToOwned::to_owned),
        authorization: header_text("authorization"),
        apikey: header_text("apikey"),
        content_type: header_text("content-type"),
        body: serde_json::from_slice(&bytes).ok(),
    }
}

// =========================================================================
// Sessions
// =========================================================================

pub fn user(email: &str) -> User {
    User {
        id: format!("id-{email}"),
        email: Some(email.to_owned()),
        user_metadata: json!({}),
        created_at: Some("2025-01-01T00:00:00Z".to_owned()),
    }
}

pub fn session(token: &str, email: &str) -> Session {
    Session {
        access_token: token.to_owned(),
        token_type: "bearer".to_owned(),
        expires_in: Some(3600),
        expires_at: None,
        refresh_token: Some(format!("refresh-{token}")),
        user: user(email),
    }
}

// =========================================================================
// MockIdentity
// =========================================================================

/// Scripted identity provider. Every operation succeeds by default; the
/// `with_*`/`failing_*` builders script other outcomes.
#[derive(Default)]
pub struct MockIdentity {
    pub events: AuthEvents,
    initial: Mutex<Option<Result<Option<Session>, ProviderError>>>,
    sign_in: Mutex<Option<Result<Session, ProviderError>>>,
    sign_up: Mutex<Option<Result<SignUpOutcome, ProviderError>>>,
    sign_out_error: Mutex<Option<ProviderError>>,
    reset_error: Mutex<Option<ProviderError>>,
    update_error: Mutex<Option<ProviderError>>,
    hold_initial: Option<Arc<Notify>>,
    session_checks: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(self, session: Session) -> Self {
        *self.initial.lock().unwrap() = Some(Ok(Some(session)));
        self
    }

    pub fn failing_initial(self, err: ProviderError) -> Self {
        *self.initial.lock().unwrap() = Some(Err(err));
        self
    }

    pub fn with_sign_in(self, result: Result<Session, ProviderError>) -> Self {
        *self.sign_in.lock().unwrap() = Some(result);
        self
    }

    pub fn with_sign_up(self, result: Result<SignUpOutcome, ProviderError>) -> Self {
        *self.sign_up.lock().unwrap() = Some(result);
        self
    }

    pub fn failing_sign_out(self, err: ProviderError) -> Self {
        *self.sign_out_error.lock().unwrap() = Some(err);
        self
    }

    pub fn failing_reset(self, err: ProviderError) -> Self {
        *self.reset_error.lock().unwrap() = Some(err);
        self
    }

    pub fn failing_update(self, err: ProviderError) -> Self {
        *self.update_error.lock().unwrap() = Some(err);
        self
    }

    /// Make the initial `get_session` wait until the returned handle is
    /// notified.
    pub fn hold_initial(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.hold_initial = Some(gate.clone());
        (self, gate)
    }

    pub fn session_checks(&self) -> usize {
        self.session_checks.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        self.session_checks.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.hold_initial {
            gate.notified().await;
        }
        self.initial.lock().unwrap().clone().unwrap_or(Ok(None))
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<Session, ProviderError> {
        self.record(format!("sign_in {email}"));
        let result = self
            .sign_in
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(session("signed-in-token", email)));
        if let Ok(s) = &result {
            self.events
                .emit(AuthChange::new(AuthEvent::SignedIn, Some(s.clone())));
        }
        result
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<SignUpOutcome, ProviderError> {
        self.record(format!("sign_up {email}"));
        self.sign_up
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(SignUpOutcome { user: Some(user(email)), session: None }))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.record("sign_out".to_owned());
        self.events.emit(AuthChange::new(AuthEvent::SignedOut, None));
        match self.sign_out_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn reset_password_for_email(&self, email: &str, redirect_to: Option<&str>) -> Result<(), ProviderError> {
        self.record(format!("reset {email} {}", redirect_to.unwrap_or("-")));
        match self.reset_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn update_user(&self, attributes: &UserAttributes) -> Result<User, ProviderError> {
        self.record(format!("update {}", serde_json::to_string(attributes).unwrap()));
        if let Some(err) = self.update_error.lock().unwrap().clone() {
            return Err(err);
        }
        let mut updated = user("a@b.c");
        if let Some(email) = &attributes.email {
            updated.email = Some(email.clone());
        }
        if let Some(data) = &attributes.data {
            updated.user_metadata = data.clone();
        }
        Ok(updated)
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}
