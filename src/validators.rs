//! Form enablement predicates.
//!
//! Pure functions re-evaluated on every field edit. The coordinator derives
//! its button-enable flags from these; a submit whose predicate is false is
//! simply ignored, never surfaced as an error.

/// True iff `s` has a conventional `local@domain.tld` shape: exactly one
/// `@`, a non-empty local part, and a domain with an interior dot.
#[must_use]
pub fn is_valid_email(s: &str) -> bool {
    let parts = s.split('@').collect::<Vec<_>>();
    if parts.len() != 2 {
        return false;
    }
    let (local, domain) = (parts[0], parts[1]);
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// True iff the password field holds anything at all. Strength rules are
/// the provider's call, not ours.
#[must_use]
pub fn is_non_empty_password(s: &str) -> bool {
    !s.is_empty()
}

/// Whether the sign-in action may be submitted.
#[must_use]
pub fn is_login_enabled(email: &str, password: &str) -> bool {
    is_valid_email(email) && is_non_empty_password(password)
}

/// Whether the registration action may be submitted: valid email, non-empty
/// password, and both password entries agree.
#[must_use]
pub fn is_register_enabled(email: &str, password: &str, confirm: &str) -> bool {
    is_valid_email(email) && is_non_empty_password(password) && password == confirm
}

#[cfg(test)]
#[path = "validators_test.rs"]
mod tests;
