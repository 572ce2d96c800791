//! Session collaborator seam.
//!
//! The client never mints or refreshes tokens. It asks a `TokenProvider` at
//! every connect attempt, so a token refreshed by the session layer is picked
//! up on the next reconnect.

use eventlink_core::error::{EventLinkError, Result};

pub trait TokenProvider: Send + Sync {
    /// Current bearer token.
    fn token(&self) -> Result<String>;
}

/// Fixed token (tests, service accounts).
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Result<String> {
        if self.0.is_empty() {
            return Err(EventLinkError::AuthUnavailable("empty token".into()));
        }
        Ok(self.0.clone())
    }
}

/// Token read from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenProvider for EnvToken {
    fn token(&self) -> Result<String> {
        match std::env::var(&self.var) {
            Ok(t) if !t.is_empty() => Ok(t),
            Ok(_) => Err(EventLinkError::AuthUnavailable(format!("{} is empty", self.var))),
            Err(e) => Err(EventLinkError::AuthUnavailable(format!("{}: {e}", self.var))),
        }
    }
}

impl<F> TokenProvider for F
where
    F: Fn() -> Result<String> + Send + Sync,
{
    fn token(&self) -> Result<String> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_static_token_is_unavailable() {
        let err = StaticToken::new("").token().unwrap_err();
        assert_eq!(err.code().as_str(), "AUTH_UNAVAILABLE");
    }

    #[test]
    fn missing_env_var_is_unavailable() {
        let p = EnvToken::new("EVENTLINK_TEST_TOKEN_THAT_IS_NEVER_SET");
        assert!(p.token().is_err());
    }

    #[test]
    fn closures_are_providers() {
        let p = || Ok::<_, EventLinkError>("abc".to_string());
        assert_eq!(p.token().unwrap(), "abc");
    }
}
