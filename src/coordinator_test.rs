use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::*;
use crate::gateway::Account;

// =============================================================================
// MockGateway
// =============================================================================

#[derive(Default)]
struct MockGateway {
    sign_in_result: Mutex<Option<Result<Account, GatewayError>>>,
    create_user_result: Mutex<Option<Result<Account, GatewayError>>>,
    verification_result: Mutex<Option<Result<(), GatewayError>>>,
    reset_result: Mutex<Option<Result<(), GatewayError>>>,
    idp_result: Mutex<Option<Result<Account, GatewayError>>>,
    sign_in_calls: AtomicUsize,
    create_user_calls: AtomicUsize,
    verification_calls: AtomicUsize,
    reset_calls: AtomicUsize,
    idp_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

fn take(slot: &Mutex<Option<Result<Account, GatewayError>>>) -> Result<Account, GatewayError> {
    slot.lock().unwrap().take().unwrap_or(Err(GatewayError::Unknown))
}

fn take_unit(slot: &Mutex<Option<Result<(), GatewayError>>>) -> Result<(), GatewayError> {
    slot.lock().unwrap().take().unwrap_or(Ok(()))
}

#[async_trait::async_trait]
impl AuthGateway for MockGateway {
    async fn create_user(&self, _email: &str, _password: &str) -> Result<Account, GatewayError> {
        self.create_user_calls.fetch_add(1, Ordering::SeqCst);
        take(&self.create_user_result)
    }

    async fn send_verification_email(&self, _account: &Account) -> Result<(), GatewayError> {
        self.verification_calls.fetch_add(1, Ordering::SeqCst);
        take_unit(&self.verification_result)
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> Result<Account, GatewayError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        take(&self.sign_in_result)
    }

    async fn sign_in_with_credential(
        &self,
        _credential: &FederatedCredential,
    ) -> Result<Account, GatewayError> {
        self.idp_calls.fetch_add(1, Ordering::SeqCst);
        take(&self.idp_result)
    }

    async fn send_password_reset(&self, _email: &str) -> Result<(), GatewayError> {
        self.reset_calls.fetch_add(1, Ordering::SeqCst);
        take_unit(&self.reset_result)
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn account(verified: bool) -> Account {
    Account {
        uid: "uid-1".into(),
        email: "a@b.co".into(),
        email_verified: verified,
        id_token: "tok-1".into(),
    }
}

fn filled_login(coordinator: &mut AuthCoordinator) {
    coordinator.set_email("a@b.co");
    coordinator.set_password("hunter2");
}

fn filled_register(coordinator: &mut AuthCoordinator) {
    coordinator.set_register_email("a@b.co");
    coordinator.set_register_password("hunter2");
    coordinator.set_register_confirm_password("hunter2");
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn login_verified_account_succeeds_and_proceeds() {
    let mock = Arc::new(MockGateway::default());
    *mock.sign_in_result.lock().unwrap() = Some(Ok(account(true)));
    let mut coordinator = AuthCoordinator::new(mock.clone());
    filled_login(&mut coordinator);

    assert!(coordinator.submit_login());
    assert_eq!(coordinator.session_state(), SessionState::Loading);

    let descriptor = coordinator.resolve_next().await.unwrap();
    assert_eq!(coordinator.session_state(), SessionState::Succeeded);
    assert_eq!(descriptor.followup, FollowupAction::Proceed);
    assert!(coordinator.proceed_to_next_screen());
}

#[tokio::test]
async fn login_unverified_account_fails_with_unverified_descriptor() {
    let mock = Arc::new(MockGateway::default());
    *mock.sign_in_result.lock().unwrap() = Some(Ok(account(false)));
    let mut coordinator = AuthCoordinator::new(mock.clone());
    filled_login(&mut coordinator);

    assert!(coordinator.submit_login());
    let descriptor = coordinator.resolve_next().await.unwrap();
    assert_eq!(coordinator.session_state(), SessionState::Failed);
    assert_eq!(descriptor.message, "email not verified");
    assert_eq!(descriptor.followup, FollowupAction::Close);
    assert!(!coordinator.proceed_to_next_screen());
}

#[tokio::test]
async fn login_gateway_rejection_surfaces_message_verbatim() {
    let mock = Arc::new(MockGateway::default());
    *mock.sign_in_result.lock().unwrap() =
        Some(Err(GatewayError::Provider("invalid email or password".into())));
    let mut coordinator = AuthCoordinator::new(mock.clone());
    filled_login(&mut coordinator);

    assert!(coordinator.submit_login());
    let descriptor = coordinator.resolve_next().await.unwrap();
    assert_eq!(coordinator.session_state(), SessionState::Failed);
    assert_eq!(descriptor.message, "invalid email or password");
}

#[tokio::test]
async fn login_with_incomplete_form_is_a_no_op() {
    let mock = Arc::new(MockGateway::default());
    let mut coordinator = AuthCoordinator::new(mock.clone());
    coordinator.set_email("a@b.co");

    assert!(!coordinator.submit_login());
    assert_eq!(coordinator.session_state(), SessionState::Idle);
    assert_eq!(mock.sign_in_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_attempt_accepts_a_resubmit() {
    let mock = Arc::new(MockGateway::default());
    *mock.sign_in_result.lock().unwrap() = Some(Err(GatewayError::Provider("nope".into())));
    let mut coordinator = AuthCoordinator::new(mock.clone());
    filled_login(&mut coordinator);

    assert!(coordinator.submit_login());
    coordinator.resolve_next().await.unwrap();
    assert_eq!(coordinator.session_state(), SessionState::Failed);

    *mock.sign_in_result.lock().unwrap() = Some(Ok(account(true)));
    assert!(coordinator.submit_login());
    // A fresh submit clears the previous attempt's descriptor.
    assert!(coordinator.descriptor().is_none());
    coordinator.resolve_next().await.unwrap();
    assert_eq!(coordinator.session_state(), SessionState::Succeeded);
    assert_eq!(mock.sign_in_calls.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Single flight
// =============================================================================

#[tokio::test]
async fn submit_while_loading_never_issues_a_second_call() {
    let mock = Arc::new(MockGateway::default());
    *mock.sign_in_result.lock().unwrap() = Some(Ok(account(true)));
    let mut coordinator = AuthCoordinator::new(mock.clone());
    filled_login(&mut coordinator);
    filled_register(&mut coordinator);

    assert!(coordinator.submit_login());
    // Loading gates every action family, not just the submitted one.
    assert!(!coordinator.submit_login());
    assert!(!coordinator.submit_register());
    assert!(!coordinator.submit_password_recovery("a@b.co"));
    assert!(!coordinator.submit_google_login(FederatedCredential::google("t")));

    coordinator.resolve_next().await.unwrap();
    assert_eq!(mock.sign_in_calls.load(Ordering::SeqCst), 1);
    assert_eq!(mock.create_user_calls.load(Ordering::SeqCst), 0);
    assert_eq!(mock.reset_calls.load(Ordering::SeqCst), 0);
    assert_eq!(mock.idp_calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn register_success_requires_verification_before_sign_in() {
    let mock = Arc::new(MockGateway::default());
    *mock.create_user_result.lock().unwrap() = Some(Ok(account(false)));
    let mut coordinator = AuthCoordinator::new(mock.clone());
    coordinator.switch_to_sign_up();
    filled_register(&mut coordinator);

    assert!(coordinator.submit_register());
    let descriptor = coordinator.resolve_next().await.unwrap();
    assert_eq!(coordinator.session_state(), SessionState::Succeeded);
    assert_eq!(descriptor.followup, FollowupAction::Close);
    assert!(descriptor.message.contains("Verify"));
    // Success does not auto-authenticate and does not flip the section.
    assert!(!coordinator.proceed_to_next_screen());
    assert_eq!(coordinator.auth_mode(), AuthMode::SignUp);
    assert_eq!(mock.verification_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn register_fails_when_verification_send_fails() {
    let mock = Arc::new(MockGateway::default());
    *mock.create_user_result.lock().unwrap() = Some(Ok(account(false)));
    *mock.verification_result.lock().unwrap() =
        Some(Err(GatewayError::Transport("connection reset".into())));
    let mut coordinator = AuthCoordinator::new(mock.clone());
    filled_register(&mut coordinator);

    assert!(coordinator.submit_register());
    let descriptor = coordinator.resolve_next().await.unwrap();
    assert_eq!(coordinator.session_state(), SessionState::Failed);
    assert_eq!(descriptor.message, "network error: connection reset");
}

#[tokio::test]
async fn register_with_mismatched_passwords_is_a_no_op() {
    let mock = Arc::new(MockGateway::default());
    let mut coordinator = AuthCoordinator::new(mock.clone());
    coordinator.set_register_email("a@b.co");
    coordinator.set_register_password("p");
    coordinator.set_register_confirm_password("q");

    assert!(!coordinator.submit_register());
    assert_eq!(coordinator.session_state(), SessionState::Idle);
    assert_eq!(mock.create_user_calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Google login
// =============================================================================

#[tokio::test]
async fn google_login_proceeds_without_verification_check() {
    let mock = Arc::new(MockGateway::default());
    // Deliberately unverified: the federated path has no verification gate.
    *mock.idp_result.lock().unwrap() = Some(Ok(account(false)));
    let mut coordinator = AuthCoordinator::new(mock.clone());

    assert!(coordinator.submit_google_login(FederatedCredential::google("id-token")));
    let descriptor = coordinator.resolve_next().await.unwrap();
    assert_eq!(coordinator.session_state(), SessionState::Succeeded);
    assert_eq!(descriptor.followup, FollowupAction::Proceed);
    assert!(coordinator.proceed_to_next_screen());
}

#[tokio::test]
async fn google_login_failure_produces_standard_descriptor() {
    let mock = Arc::new(MockGateway::default());
    *mock.idp_result.lock().unwrap() =
        Some(Err(GatewayError::Provider("the federated credential was rejected".into())));
    let mut coordinator = AuthCoordinator::new(mock.clone());

    assert!(coordinator.submit_google_login(FederatedCredential::google("bad")));
    let descriptor = coordinator.resolve_next().await.unwrap();
    assert_eq!(coordinator.session_state(), SessionState::Failed);
    assert_eq!(descriptor.title, "Google sign-in failed");
    assert_eq!(descriptor.followup, FollowupAction::Close);
}

// =============================================================================
// Password recovery
// =============================================================================

#[tokio::test]
async fn recovery_success_never_proceeds() {
    let mock = Arc::new(MockGateway::default());
    let mut coordinator = AuthCoordinator::new(mock.clone());

    assert!(coordinator.submit_password_recovery("a@b.co"));
    let descriptor = coordinator.resolve_next().await.unwrap();
    assert_eq!(coordinator.session_state(), SessionState::Succeeded);
    assert_eq!(descriptor.followup, FollowupAction::Close);
    assert!(!coordinator.proceed_to_next_screen());
}

#[tokio::test]
async fn recovery_for_unknown_email_carries_provider_message() {
    let mock = Arc::new(MockGateway::default());
    *mock.reset_result.lock().unwrap() =
        Some(Err(GatewayError::Provider("no account exists with this email".into())));
    let mut coordinator = AuthCoordinator::new(mock.clone());

    assert!(coordinator.submit_password_recovery("ghost@b.co"));
    let descriptor = coordinator.resolve_next().await.unwrap();
    assert_eq!(coordinator.session_state(), SessionState::Failed);
    assert_eq!(descriptor.message, "no account exists with this email");
}

#[tokio::test]
async fn recovery_with_empty_email_is_a_no_op() {
    let mock = Arc::new(MockGateway::default());
    let mut coordinator = AuthCoordinator::new(mock.clone());

    assert!(!coordinator.submit_password_recovery(""));
    assert_eq!(mock.reset_calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Mode switches
// =============================================================================

#[tokio::test]
async fn switch_is_idempotent_and_publishes_once() {
    let mock = Arc::new(MockGateway::default());
    let mut coordinator = AuthCoordinator::new(mock.clone());
    let mut rx = coordinator.subscribe();
    let _ = rx.borrow_and_update();

    coordinator.switch_to_sign_up();
    assert!(rx.has_changed().unwrap());
    let _ = rx.borrow_and_update();

    coordinator.switch_to_sign_in();
    assert!(rx.has_changed().unwrap());
    let _ = rx.borrow_and_update();

    // Second switch to the same mode is a no-op: nothing published.
    coordinator.switch_to_sign_in();
    assert!(!rx.has_changed().unwrap());
    assert_eq!(coordinator.auth_mode(), AuthMode::SignIn);
}

#[tokio::test]
async fn switch_never_touches_session_state() {
    let mock = Arc::new(MockGateway::default());
    *mock.sign_in_result.lock().unwrap() = Some(Err(GatewayError::Unknown));
    let mut coordinator = AuthCoordinator::new(mock.clone());
    filled_login(&mut coordinator);
    coordinator.submit_login();
    coordinator.resolve_next().await.unwrap();
    assert_eq!(coordinator.session_state(), SessionState::Failed);

    coordinator.switch_to_sign_up();
    assert_eq!(coordinator.session_state(), SessionState::Failed);
}

// =============================================================================
// Snapshots and edits
// =============================================================================

#[tokio::test]
async fn field_edits_drive_enablement_flags() {
    let mock = Arc::new(MockGateway::default());
    let mut coordinator = AuthCoordinator::new(mock.clone());

    assert!(!coordinator.snapshot().login_enabled);
    coordinator.apply_edit(FieldEdit::Email("a@b.co".into()));
    coordinator.apply_edit(FieldEdit::Password("x".into()));
    assert!(coordinator.snapshot().login_enabled);

    coordinator.apply_edit(FieldEdit::RegisterEmail("a@b.co".into()));
    coordinator.apply_edit(FieldEdit::RegisterPassword("p".into()));
    coordinator.apply_edit(FieldEdit::RegisterConfirmPassword("p".into()));
    assert!(coordinator.snapshot().register_enabled);

    coordinator.apply_edit(FieldEdit::RegisterConfirmPassword("q".into()));
    assert!(!coordinator.snapshot().register_enabled);
}

#[tokio::test]
async fn watch_subscribers_see_loading_then_resolution() {
    let mock = Arc::new(MockGateway::default());
    *mock.sign_in_result.lock().unwrap() = Some(Ok(account(true)));
    let mut coordinator = AuthCoordinator::new(mock.clone());
    filled_login(&mut coordinator);
    let mut rx = coordinator.subscribe();

    coordinator.submit_login();
    assert_eq!(rx.borrow_and_update().session_state, SessionState::Loading);

    coordinator.resolve_next().await.unwrap();
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.session_state, SessionState::Succeeded);
    assert!(snapshot.proceed_to_next_screen);
}

// =============================================================================
// Error normalization
// =============================================================================

#[test]
fn empty_provider_message_normalizes_to_unknown() {
    assert_eq!(AuthError::from(GatewayError::Provider(String::new())), AuthError::Unknown);
    assert_eq!(AuthError::from(GatewayError::Unknown), AuthError::Unknown);
    assert_eq!(AuthError::Unknown.to_string(), "unknown error");
}

#[test]
fn transport_errors_keep_their_prefix() {
    let err = AuthError::from(GatewayError::Transport("timed out".into()));
    assert_eq!(err, AuthError::Gateway("network error: timed out".into()));
}

// =============================================================================
// Sign-out
// =============================================================================

#[tokio::test]
async fn sign_out_delegates_to_gateway() {
    let mock = Arc::new(MockGateway::default());
    let coordinator = AuthCoordinator::new(mock.clone());
    coordinator.sign_out().await.unwrap();
    assert_eq!(mock.sign_out_calls.load(Ordering::SeqCst), 1);
}
