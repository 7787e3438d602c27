//! Auth gateway contract.
//!
//! ARCHITECTURE
//! ============
//! The coordinator never talks to a provider directly; it goes through this
//! trait. The real implementation lives in [`crate::firebase`]; tests swap
//! in a scripted mock. All security-sensitive work (hashing, token issuance,
//! session persistence) happens on the provider's side of this boundary.

/// Provider account snapshot returned by sign-in and sign-up calls.
#[derive(Debug, Clone)]
pub struct Account {
    /// Provider-assigned opaque user id.
    pub uid: String,
    /// Email the account was created with.
    pub email: String,
    /// Whether the provider has confirmed ownership of the email.
    pub email_verified: bool,
    /// Short-lived ID token issued with this snapshot. Needed to drive
    /// follow-up calls such as the verification-email send.
    pub id_token: String,
}

/// Credential minted by an external federated-auth flow (e.g. Google
/// sign-in). Obtaining one is the platform UI's job, not this crate's.
#[derive(Debug, Clone)]
pub struct FederatedCredential {
    /// Provider identifier, e.g. `"google.com"`.
    pub provider: String,
    /// The OpenID Connect token the federated flow produced.
    pub id_token: String,
}

impl FederatedCredential {
    /// Credential for a completed Google sign-in flow.
    #[must_use]
    pub fn google(id_token: impl Into<String>) -> Self {
        Self { provider: "google.com".into(), id_token: id_token.into() }
    }
}

/// Gateway-level failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The provider processed the request and rejected it.
    #[error("{0}")]
    Provider(String),
    /// The request never completed: connection, TLS, timeout, bad body.
    #[error("network error: {0}")]
    Transport(String),
    /// The provider returned neither success nor a usable error.
    #[error("unknown error")]
    Unknown,
}

/// Provider-neutral async interface to the hosted auth backend. Enables
/// mocking in tests.
#[async_trait::async_trait]
pub trait AuthGateway: Send + Sync {
    /// Create a new email/password account.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the provider rejects the request (for
    /// example a duplicate email) or the call fails in transit.
    async fn create_user(&self, email: &str, password: &str) -> Result<Account, GatewayError>;

    /// Ask the provider to send a verify-your-email message for `account`.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if delivery could not be requested.
    async fn send_verification_email(&self, account: &Account) -> Result<(), GatewayError>;

    /// Sign in with email and password. Success here is transport success
    /// only; the caller still inspects [`Account::email_verified`].
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] on bad credentials, a disabled account,
    /// or a failed call.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Account, GatewayError>;

    /// Sign in with a credential minted by an external federated flow.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the provider rejects the credential or
    /// the call fails in transit.
    async fn sign_in_with_credential(
        &self,
        credential: &FederatedCredential,
    ) -> Result<Account, GatewayError>;

    /// Ask the provider to email a password-reset link to `email`.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the provider rejects the request (for
    /// example an unknown email) or the call fails in transit.
    async fn send_password_reset(&self, email: &str) -> Result<(), GatewayError>;

    /// Tear down any provider-side session state.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if teardown fails.
    async fn sign_out(&self) -> Result<(), GatewayError>;
}
