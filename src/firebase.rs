//! Firebase Identity Toolkit gateway.
//!
//! Thin HTTP wrapper over the provider's v1 REST endpoints
//! (`accounts:signUp`, `accounts:signInWithPassword`, `accounts:signInWithIdp`,
//! `accounts:sendOobCode`, `accounts:lookup`). Pure parsing lives in
//! `parse_success` / `parse_error_body` for testability.

use std::time::Duration;

use crate::gateway::{Account, AuthGateway, FederatedCredential, GatewayError};

const API_BASE: &str = "https://identitytoolkit.googleapis.com/v1/accounts";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// CONFIG
// =============================================================================

/// Firebase project configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Web API key of the Firebase project.
    pub api_key: String,
}

impl FirebaseConfig {
    /// Load from `FIREBASE_API_KEY`. Returns `None` if it is missing.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("FIREBASE_API_KEY").ok()?;
        Some(Self { api_key })
    }
}

// =============================================================================
// GATEWAY
// =============================================================================

/// [`AuthGateway`] implementation backed by the Identity Toolkit REST API.
pub struct FirebaseGateway {
    http: reqwest::Client,
    config: FirebaseConfig,
}

impl FirebaseGateway {
    /// Build a gateway with request and connect deadlines on the HTTP
    /// client, so a hung provider resolves to a transport failure instead
    /// of an open-ended wait.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: FirebaseConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{API_BASE}:{name}?key={}", self.config.api_key)
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
        body: &impl serde::Serialize,
    ) -> Result<T, GatewayError> {
        let response = self
            .http
            .post(self.endpoint(name))
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if status != 200 {
            let err = parse_error_body(&text);
            tracing::warn!(endpoint = name, status, error = %err, "identity toolkit call rejected");
            return Err(err);
        }

        parse_success(&text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct OobRequest<'a> {
    request_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    id_token: String,
    local_id: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

// sendOobCode replies with the target email; nothing in it is needed.
#[derive(serde::Deserialize)]
struct OobResponse {}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    email_verified: bool,
}

#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_success<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, GatewayError> {
    serde_json::from_str(json).map_err(|e| GatewayError::Transport(format!("malformed response: {e}")))
}

/// Map a non-200 body to a [`GatewayError`]. A readable
/// `{"error": {"message": "..."}}` envelope becomes a provider rejection;
/// anything else is the unknown-error kind.
fn parse_error_body(body: &str) -> GatewayError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => {
            GatewayError::Provider(describe_error_code(&envelope.error.message))
        }
        _ => GatewayError::Unknown,
    }
}

/// Translate an Identity Toolkit error code into a user-presentable
/// message. Unrecognized codes pass through verbatim so nothing is lost.
fn describe_error_code(code: &str) -> String {
    // Codes may carry a detail suffix, e.g. "WEAK_PASSWORD : Password
    // should be at least 6 characters".
    let key = code.split(':').next().unwrap_or(code).trim();
    match key {
        "EMAIL_EXISTS" => "an account with this email already exists".into(),
        "EMAIL_NOT_FOUND" => "no account exists with this email".into(),
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => "invalid email or password".into(),
        "USER_DISABLED" => "this account has been disabled".into(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "too many attempts, try again later".into(),
        "WEAK_PASSWORD" => "password is too weak".into(),
        "OPERATION_NOT_ALLOWED" => "this sign-in method is disabled".into(),
        "INVALID_IDP_RESPONSE" => "the federated credential was rejected".into(),
        _ => code.to_owned(),
    }
}

fn account_from_token(resp: TokenResponse, fallback_email: &str) -> Account {
    Account {
        uid: resp.local_id,
        email: resp.email.unwrap_or_else(|| fallback_email.to_owned()),
        email_verified: resp.email_verified,
        id_token: resp.id_token,
    }
}

// =============================================================================
// TRAIT IMPL
// =============================================================================

#[async_trait::async_trait]
impl AuthGateway for FirebaseGateway {
    async fn create_user(&self, email: &str, password: &str) -> Result<Account, GatewayError> {
        let body = PasswordRequest { email, password, return_secure_token: true };
        let resp: TokenResponse = self.post_json("signUp", &body).await?;
        Ok(account_from_token(resp, email))
    }

    async fn send_verification_email(&self, account: &Account) -> Result<(), GatewayError> {
        let body = OobRequest {
            request_type: "VERIFY_EMAIL",
            id_token: Some(&account.id_token),
            email: None,
        };
        let _: OobResponse = self.post_json("sendOobCode", &body).await?;
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Account, GatewayError> {
        let body = PasswordRequest { email, password, return_secure_token: true };
        let resp: TokenResponse = self.post_json("signInWithPassword", &body).await?;
        let mut account = account_from_token(resp, email);

        // signInWithPassword does not report verification status; a lookup
        // with the issued token does.
        let lookup: LookupResponse = self
            .post_json("lookup", &LookupRequest { id_token: &account.id_token })
            .await?;
        let user = lookup.users.into_iter().next().ok_or(GatewayError::Unknown)?;
        account.email_verified = user.email_verified;
        Ok(account)
    }

    async fn sign_in_with_credential(
        &self,
        credential: &FederatedCredential,
    ) -> Result<Account, GatewayError> {
        let body = IdpRequest {
            post_body: format!(
                "id_token={}&providerId={}",
                credential.id_token, credential.provider
            ),
            request_uri: "http://localhost",
            return_secure_token: true,
            return_idp_credential: true,
        };
        let resp: TokenResponse = self.post_json("signInWithIdp", &body).await?;
        Ok(account_from_token(resp, ""))
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), GatewayError> {
        let body = OobRequest { request_type: "PASSWORD_RESET", id_token: None, email: Some(email) };
        let _: OobResponse = self.post_json("sendOobCode", &body).await?;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        // The REST API holds no session to tear down; the SDK's signOut()
        // only clears local state, which this crate never persists.
        Ok(())
    }
}

#[cfg(test)]
#[path = "firebase_test.rs"]
mod tests;
