//! Authentication flow coordinator.
//!
//! ARCHITECTURE
//! ============
//! The coordinator owns all form state and the per-screen state machine. A
//! submit validates its precondition, flips the session state to `Loading`
//! synchronously, and spawns the gateway call; the task reports back over an
//! mpsc channel owned by the coordinator, and `resolve_next` folds the
//! outcome into state on the caller's context. Spawned tasks never touch
//! coordinator state directly, so the Presentation Adapter only ever sees
//! transitions on its own sequencing context.
//!
//! TRADE-OFFS
//! ==========
//! Single flight is coordinator-wide, not per action family: the screen
//! exposes one action at a time, so one `Loading` gate covers them all.
//! There is no cancellation; an in-flight call runs to completion and only
//! new submits are suppressed.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::gateway::{AuthGateway, FederatedCredential, GatewayError};
use crate::validators;

// =============================================================================
// STATES
// =============================================================================

/// Lifecycle of the most recently submitted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing submitted yet.
    #[default]
    Idle,
    /// A gateway call is in flight; new submits are no-ops.
    Loading,
    /// The last submitted action resolved successfully.
    Succeeded,
    /// The last submitted action resolved with a failure.
    Failed,
}

/// Which form section the screen shows. Independent of [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

/// What the Presentation Adapter should do once the result modal closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowupAction {
    /// Dismiss the modal and stay on the auth screen.
    Close,
    /// Dismiss the modal and move to the main screen.
    Proceed,
}

/// User-facing result of a resolved action, rendered as a modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultDescriptor {
    pub title: String,
    pub message: String,
    pub followup: FollowupAction,
}

/// Terminal failure of one submitted action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Transport-level sign-in succeeded but the account's email is not
    /// confirmed yet.
    #[error("email not verified")]
    UnverifiedAccount,
    /// The gateway failed with a usable message, surfaced verbatim.
    #[error("{0}")]
    Gateway(String),
    /// The gateway produced neither success nor a usable error.
    #[error("unknown error")]
    Unknown,
}

impl From<GatewayError> for AuthError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unknown => AuthError::Unknown,
            GatewayError::Provider(m) if m.trim().is_empty() => AuthError::Unknown,
            other => AuthError::Gateway(other.to_string()),
        }
    }
}

/// Typed field-changed event from the Presentation Adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit {
    Email(String),
    Password(String),
    RegisterEmail(String),
    RegisterPassword(String),
    RegisterConfirmPassword(String),
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Observable state bundle published to the Presentation Adapter after
/// every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub session_state: SessionState,
    pub auth_mode: AuthMode,
    pub login_enabled: bool,
    pub register_enabled: bool,
    pub descriptor: Option<ResultDescriptor>,
    pub proceed_to_next_screen: bool,
}

// =============================================================================
// FORMS
// =============================================================================

#[derive(Debug, Clone, Default)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Debug, Clone, Default)]
struct RegistrationForm {
    email: String,
    password: String,
    confirm_password: String,
}

// =============================================================================
// ACTIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Login,
    Register,
    GoogleLogin,
    PasswordRecovery,
}

struct ActionOutcome {
    action: Action,
    result: Result<(), AuthError>,
}

// =============================================================================
// COORDINATOR
// =============================================================================

/// The screen-scoped auth core: form fields, enablement flags, the
/// single-flight state machine, and descriptor production.
pub struct AuthCoordinator {
    gateway: Arc<dyn AuthGateway>,
    login: Credentials,
    register: RegistrationForm,
    session_state: SessionState,
    auth_mode: AuthMode,
    descriptor: Option<ResultDescriptor>,
    outcome_tx: mpsc::UnboundedSender<ActionOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<ActionOutcome>,
    snapshot_tx: watch::Sender<AuthSnapshot>,
}

impl AuthCoordinator {
    /// Build a coordinator over an injected gateway. All state starts at
    /// its default: empty fields, `Idle`, sign-in mode, no descriptor.
    #[must_use]
    pub fn new(gateway: Arc<dyn AuthGateway>) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let mut coordinator = Self {
            gateway,
            login: Credentials::default(),
            register: RegistrationForm::default(),
            session_state: SessionState::default(),
            auth_mode: AuthMode::default(),
            descriptor: None,
            outcome_tx,
            outcome_rx,
            snapshot_tx: watch::Sender::new(AuthSnapshot {
                session_state: SessionState::Idle,
                auth_mode: AuthMode::SignIn,
                login_enabled: false,
                register_enabled: false,
                descriptor: None,
                proceed_to_next_screen: false,
            }),
        };
        coordinator.publish();
        coordinator
    }

    // -------------------------------------------------------------------------
    // Observable state
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    #[must_use]
    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    #[must_use]
    pub fn descriptor(&self) -> Option<&ResultDescriptor> {
        self.descriptor.as_ref()
    }

    #[must_use]
    pub fn login_enabled(&self) -> bool {
        validators::is_login_enabled(&self.login.email, &self.login.password)
    }

    #[must_use]
    pub fn register_enabled(&self) -> bool {
        validators::is_register_enabled(
            &self.register.email,
            &self.register.password,
            &self.register.confirm_password,
        )
    }

    /// Whether the last resolution authorizes leaving the auth screen.
    #[must_use]
    pub fn proceed_to_next_screen(&self) -> bool {
        self.session_state == SessionState::Succeeded
            && self
                .descriptor
                .as_ref()
                .is_some_and(|d| d.followup == FollowupAction::Proceed)
    }

    /// Subscribe to state snapshots. A fresh value is published after every
    /// observable mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshot_tx.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            session_state: self.session_state,
            auth_mode: self.auth_mode,
            login_enabled: self.login_enabled(),
            register_enabled: self.register_enabled(),
            descriptor: self.descriptor.clone(),
            proceed_to_next_screen: self.proceed_to_next_screen(),
        }
    }

    fn publish(&mut self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    // -------------------------------------------------------------------------
    // Field edits
    // -------------------------------------------------------------------------

    pub fn set_email(&mut self, value: impl Into<String>) {
        self.login.email = value.into();
        self.publish();
    }

    pub fn set_password(&mut self, value: impl Into<String>) {
        self.login.password = value.into();
        self.publish();
    }

    pub fn set_register_email(&mut self, value: impl Into<String>) {
        self.register.email = value.into();
        self.publish();
    }

    pub fn set_register_password(&mut self, value: impl Into<String>) {
        self.register.password = value.into();
        self.publish();
    }

    pub fn set_register_confirm_password(&mut self, value: impl Into<String>) {
        self.register.confirm_password = value.into();
        self.publish();
    }

    /// Apply a typed field-changed event from the Presentation Adapter.
    pub fn apply_edit(&mut self, edit: FieldEdit) {
        match edit {
            FieldEdit::Email(v) => self.set_email(v),
            FieldEdit::Password(v) => self.set_password(v),
            FieldEdit::RegisterEmail(v) => self.set_register_email(v),
            FieldEdit::RegisterPassword(v) => self.set_register_password(v),
            FieldEdit::RegisterConfirmPassword(v) => self.set_register_confirm_password(v),
        }
    }

    // -------------------------------------------------------------------------
    // Mode switches
    // -------------------------------------------------------------------------

    /// Show the sign-in section. Idempotent; never touches session state.
    pub fn switch_to_sign_in(&mut self) {
        if self.auth_mode != AuthMode::SignIn {
            self.auth_mode = AuthMode::SignIn;
            self.publish();
        }
    }

    /// Show the sign-up section. Idempotent; never touches session state.
    pub fn switch_to_sign_up(&mut self) {
        if self.auth_mode != AuthMode::SignUp {
            self.auth_mode = AuthMode::SignUp;
            self.publish();
        }
    }

    // -------------------------------------------------------------------------
    // Submits
    // -------------------------------------------------------------------------

    /// Submit the sign-in form. Returns `false` (and does nothing) when the
    /// form is incomplete or another action is already in flight.
    ///
    /// Transport success alone is not login success: an account whose email
    /// the provider has not verified resolves as a failure.
    pub fn submit_login(&mut self) -> bool {
        if !self.ready_to_submit() || !self.login_enabled() {
            return false;
        }
        self.begin(Action::Login);
        let gateway = Arc::clone(&self.gateway);
        let tx = self.outcome_tx.clone();
        let Credentials { email, password } = self.login.clone();
        tokio::spawn(async move {
            let result = run_login(gateway.as_ref(), &email, &password).await;
            let _ = tx.send(ActionOutcome { action: Action::Login, result });
        });
        true
    }

    /// Submit the registration form. Creating the account and sending the
    /// verification email are one logical operation: if either step fails,
    /// the whole submit fails with that step's error. Success does not
    /// authenticate; the user must verify their email and sign in.
    pub fn submit_register(&mut self) -> bool {
        if !self.ready_to_submit() || !self.register_enabled() {
            return false;
        }
        self.begin(Action::Register);
        let gateway = Arc::clone(&self.gateway);
        let tx = self.outcome_tx.clone();
        let RegistrationForm { email, password, .. } = self.register.clone();
        tokio::spawn(async move {
            let result = run_register(gateway.as_ref(), &email, &password).await;
            let _ = tx.send(ActionOutcome { action: Action::Register, result });
        });
        true
    }

    /// Submit a federated sign-in with a credential minted by the external
    /// Google flow. No verification gate: the federated provider asserts
    /// email ownership itself.
    pub fn submit_google_login(&mut self, credential: FederatedCredential) -> bool {
        if !self.ready_to_submit() {
            return false;
        }
        self.begin(Action::GoogleLogin);
        let gateway = Arc::clone(&self.gateway);
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = gateway
                .sign_in_with_credential(&credential)
                .await
                .map(|_| ())
                .map_err(AuthError::from);
            let _ = tx.send(ActionOutcome { action: Action::GoogleLogin, result });
        });
        true
    }

    /// Request a password-reset email. Only guarded by a non-empty email;
    /// the provider decides whether the address is known. Never proceeds
    /// to the main screen.
    pub fn submit_password_recovery(&mut self, email: &str) -> bool {
        if !self.ready_to_submit() || email.is_empty() {
            return false;
        }
        self.begin(Action::PasswordRecovery);
        let gateway = Arc::clone(&self.gateway);
        let tx = self.outcome_tx.clone();
        let email = email.to_owned();
        tokio::spawn(async move {
            let result = gateway
                .send_password_reset(&email)
                .await
                .map_err(AuthError::from);
            let _ = tx.send(ActionOutcome { action: Action::PasswordRecovery, result });
        });
        true
    }

    /// Delegate provider sign-out. Not part of the submit state machine:
    /// the screen this coordinator backs is gone once the user proceeds.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the provider rejects the teardown.
    pub async fn sign_out(&self) -> Result<(), GatewayError> {
        self.gateway.sign_out().await
    }

    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------

    /// Await the next gateway resolution and fold it into coordinator
    /// state, producing the descriptor for display. Call after a submit has
    /// been accepted; outcomes are applied here, on the caller's context,
    /// never on the spawned task.
    pub async fn resolve_next(&mut self) -> Option<ResultDescriptor> {
        let outcome = self.outcome_rx.recv().await?;
        Some(self.apply(outcome))
    }

    fn ready_to_submit(&self) -> bool {
        // Idle, Succeeded and Failed all accept a new submit.
        self.session_state != SessionState::Loading
    }

    fn begin(&mut self, action: Action) {
        self.session_state = SessionState::Loading;
        self.descriptor = None;
        tracing::info!(action = ?action, "gateway call dispatched");
        self.publish();
    }

    fn apply(&mut self, outcome: ActionOutcome) -> ResultDescriptor {
        let descriptor = match outcome.result {
            Ok(()) => {
                self.session_state = SessionState::Succeeded;
                tracing::info!(action = ?outcome.action, "action resolved successfully");
                success_descriptor(outcome.action)
            }
            Err(e) => {
                self.session_state = SessionState::Failed;
                tracing::warn!(action = ?outcome.action, error = %e, "action failed");
                failure_descriptor(outcome.action, &e)
            }
        };
        self.descriptor = Some(descriptor.clone());
        self.publish();
        descriptor
    }
}

// =============================================================================
// GATEWAY SEQUENCES
// =============================================================================

async fn run_login(gateway: &dyn AuthGateway, email: &str, password: &str) -> Result<(), AuthError> {
    let account = gateway.sign_in(email, password).await?;
    if account.email_verified {
        Ok(())
    } else {
        Err(AuthError::UnverifiedAccount)
    }
}

async fn run_register(
    gateway: &dyn AuthGateway,
    email: &str,
    password: &str,
) -> Result<(), AuthError> {
    let account = gateway.create_user(email, password).await?;
    gateway.send_verification_email(&account).await?;
    Ok(())
}

// =============================================================================
// DESCRIPTORS
// =============================================================================

fn success_descriptor(action: Action) -> ResultDescriptor {
    match action {
        Action::Login => ResultDescriptor {
            title: "Signed in".into(),
            message: "You have signed in successfully.".into(),
            followup: FollowupAction::Proceed,
        },
        Action::Register => ResultDescriptor {
            title: "Registration complete".into(),
            message: "A confirmation link has been sent to your email address. \
                      Verify it before signing in."
                .into(),
            followup: FollowupAction::Close,
        },
        Action::GoogleLogin => ResultDescriptor {
            title: "Signed in".into(),
            message: "Your Google account is connected.".into(),
            followup: FollowupAction::Proceed,
        },
        Action::PasswordRecovery => ResultDescriptor {
            title: "Check your inbox".into(),
            message: "A password-reset link has been sent to your email address.".into(),
            followup: FollowupAction::Close,
        },
    }
}

fn failure_descriptor(action: Action, error: &AuthError) -> ResultDescriptor {
    let title = match action {
        Action::Login => "Sign-in failed",
        Action::Register => "Registration failed",
        Action::GoogleLogin => "Google sign-in failed",
        Action::PasswordRecovery => "Password reset failed",
    };
    ResultDescriptor {
        title: title.into(),
        message: error.to_string(),
        followup: FollowupAction::Close,
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
