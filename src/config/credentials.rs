//! Credential handling for the appliance API.

use super::types::ApplianceConfig;

/// Wrapper for sensitive strings that prevents accidental logging.
///
/// The inner value is never exposed via Debug or Display traits.
/// Use `expose()` to access the actual value when building requests.
#[derive(Clone)]
pub struct SecureString(String);

impl SecureString {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Expose the inner value.
    ///
    /// Use sparingly and only when actually sending to the appliance.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(••••••••)")
    }
}

impl std::fmt::Display for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "••••••••")
    }
}

/// Username and password sent with every appliance request.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecureString,
}

impl ApplianceConfig {
    /// Resolve credentials; a missing password is sent as empty.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: SecureString::new(self.password.clone().unwrap_or_default()),
        }
    }
}
