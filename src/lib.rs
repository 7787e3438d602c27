//! Client-side authentication coordinator over a hosted auth backend.
//!
//! The [`coordinator::AuthCoordinator`] sequences login, registration,
//! password-recovery and federated (Google) sign-in against an injected
//! [`gateway::AuthGateway`], enforces the single-flight invariant, and maps
//! provider results to user-facing [`coordinator::ResultDescriptor`]s for a
//! Presentation Adapter to render. [`firebase::FirebaseGateway`] is the real
//! gateway over the Identity Toolkit REST API.

pub mod coordinator;
pub mod firebase;
pub mod gateway;
pub mod validators;

pub use coordinator::{
    AuthCoordinator, AuthError, AuthMode, AuthSnapshot, FieldEdit, FollowupAction,
    ResultDescriptor, SessionState,
};
pub use gateway::{Account, AuthGateway, FederatedCredential, GatewayError};
