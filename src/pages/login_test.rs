use super::*;
use crate::identity::SignUpOutcome;
use crate::state::auth::SessionStore;
use crate::test_support::{MockIdentity, session, user};
use std::sync::Arc;

async fn mounted(mock: MockIdentity) -> (Arc<MockIdentity>, SessionManager) {
    let mock = Arc::new(mock);
    let manager = SessionManager::mount(mock.clone(), SessionStore::new());
    manager.settled().await;
    (mock, manager)
}

fn page(email: &str, password: &str) -> LoginPage {
    LoginPage { email: email.into(), password: password.into(), ..LoginPage::default() }
}

// =========================================================================
// validation / helpers
// =========================================================================

#[test]
fn validate_credentials_trims_email_only() {
    assert_eq!(validate_credentials(" a@b.c ", " pw "), Ok(("a@b.c".into(), " pw ".into())));
    assert_eq!(validate_credentials("", "pw"), Err(CREDENTIALS_REQUIRED));
    assert_eq!(validate_credentials("a@b.c", ""), Err(CREDENTIALS_REQUIRED));
}

#[test]
fn provider_message_passes_provider_text_through() {
    let err = ProviderError::Api { status: 400, message: "Invalid login credentials".into() };
    assert_eq!(provider_message(&err), "Invalid login credentials");
    assert_eq!(provider_message(&ProviderError::Transport("dns".into())), UNEXPECTED_ERROR);
}

#[test]
fn signed_in_visitors_are_redirected() {
    let signed_in = AuthState { session: Some(session("t", "a@b.c")), loading: false };
    assert_eq!(redirect_if_signed_in(&signed_in), Some(Route::Dashboard));
    assert_eq!(redirect_if_signed_in(&AuthState::default()), None);
}

// =========================================================================
// sign in / sign up
// =========================================================================

#[tokio::test]
async fn sign_in_success_navigates_to_dashboard() {
    let (_mock, manager) = mounted(MockIdentity::new()).await;
    let mut login = page("a@b.c", "pw");
    assert_eq!(login.submit(&manager).await, Some(Route::Dashboard));
    assert!(login.password.is_empty());
    assert!(manager.state().session.is_some());
}

#[tokio::test]
async fn sign_in_failure_shows_provider_error() {
    let err = ProviderError::Api { status: 400, message: "Invalid login credentials".into() };
    let (_mock, manager) = mounted(MockIdentity::new().with_sign_in(Err(err))).await;
    let mut login = page("a@b.c", "bad");
    assert_eq!(login.submit(&manager).await, None);
    assert_eq!(login.request.error.as_deref(), Some("Invalid login credentials"));
    assert!(!login.request.is_busy());
}

#[tokio::test]
async fn sign_in_network_failure_is_unexpected() {
    let (_mock, manager) =
        mounted(MockIdentity::new().with_sign_in(Err(ProviderError::Transport("reset".into())))).await;
    let mut login = page("a@b.c", "pw");
    login.submit(&manager).await;
    assert_eq!(login.request.error.as_deref(), Some(UNEXPECTED_ERROR));
}

#[tokio::test]
async fn blank_credentials_never_reach_provider() {
    let (mock, manager) = mounted(MockIdentity::new()).await;
    let mut login = page("  ", "pw");
    login.submit(&manager).await;
    assert_eq!(login.request.error.as_deref(), Some(CREDENTIALS_REQUIRED));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn sign_up_pending_confirmation_stays_on_page() {
    let (_mock, manager) = mounted(MockIdentity::new()).await;
    let mut login = LoginPage { mode: LoginMode::SignUp, ..page("new@b.c", "pw123456") };
    assert_eq!(login.submit(&manager).await, None);
    assert_eq!(login.request.notice.as_deref(), Some(CONFIRM_EMAIL));
}

#[tokio::test]
async fn sign_up_with_session_navigates() {
    let outcome = SignUpOutcome { user: Some(user("new@b.c")), session: Some(session("t", "new@b.c")) };
    let (_mock, manager) = mounted(MockIdentity::new().with_sign_up(Ok(outcome))).await;
    let mut login = LoginPage { mode: LoginMode::SignUp, ..page("new@b.c", "pw123456") };
    assert_eq!(login.submit(&manager).await, Some(Route::Dashboard));
}

// =========================================================================
// reset mode
// =========================================================================

#[tokio::test]
async fn reset_sends_email_and_confirms() {
    let (mock, manager) = mounted(MockIdentity::new()).await;
    let mut login = LoginPage::default();
    login.set_mode(LoginMode::Reset);
    login.reset_email = " a@b.c ".into();

    assert_eq!(login.submit(&manager).await, None);
    assert!(login.reset_sent());
    assert_eq!(login.request.notice.as_deref(), Some(RESET_SENT));
    assert_eq!(mock.calls(), vec!["reset a@b.c -"]);

    login.back_to_login();
    assert_eq!(login.mode, LoginMode::SignIn);
    assert!(login.reset_email.is_empty());
    assert!(!login.reset_sent());
}

#[tokio::test]
async fn reset_failure_shows_provider_error() {
    let err = ProviderError::Api { status: 429, message: "For security purposes, you can only request this once every 60 seconds".into() };
    let (_mock, manager) = mounted(MockIdentity::new().failing_reset(err)).await;
    let mut login = LoginPage { mode: LoginMode::Reset, reset_email: "a@b.c".into(), ..LoginPage::default() };
    login.submit(&manager).await;
    assert!(login.request.error.as_deref().unwrap().starts_with("For security purposes"));
}

#[tokio::test]
async fn reset_requires_email() {
    let (mock, manager) = mounted(MockIdentity::new()).await;
    let mut login = LoginPage { mode: LoginMode::Reset, ..LoginPage::default() };
    login.submit(&manager).await;
    assert_eq!(login.request.error.as_deref(), Some(EMAIL_REQUIRED));
    assert!(mock.calls().is_empty());
}
