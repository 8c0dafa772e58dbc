//! API key handling for the completion backend.
//!
//! A key is wrapped in [`SecretString`] as soon as it is resolved and only
//! leaves it through [`ApiCredential::expose`], when the `Authorization`
//! header is built. Keys are trimmed, and a blank key counts as missing, so
//! an exported-but-empty `GROQ_API_KEY` fails at setup instead of as a 401
//! on every agent call.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;

/// Where a credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Config,
    Environment,
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CredentialSource::Config => "config",
            CredentialSource::Environment => "environment",
            CredentialSource::Programmatic => "code",
        })
    }
}

/// An API key that prints as `[REDACTED]`.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, source: CredentialSource) -> Self {
        let value = value.into();
        Self {
            value: SecretString::from(value.trim().to_string()),
            source,
        }
    }

    /// Resolve `config[config_key]`, then `env_var`. Blank values are skipped.
    pub fn resolve(config: &JsonValue, config_key: &str, env_var: &str) -> Option<Self> {
        let from_config = config[config_key]
            .as_str()
            .filter(|v| !v.trim().is_empty())
            .map(|v| Self::new(v, CredentialSource::Config));

        from_config.or_else(|| {
            std::env::var(env_var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| Self::new(v, CredentialSource::Environment))
        })
    }

    /// The raw key. Read it where the request is built, never store it.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API key from {} [REDACTED]", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "gsk_live_0123456789abcdef";

    #[test]
    fn test_debug_and_display_redact() {
        let cred = ApiCredential::new(SECRET, CredentialSource::Config);

        let debug = format!("{:?}", cred);
        let display = format!("{}", cred);
        for rendered in [&debug, &display] {
            assert!(!rendered.contains(SECRET), "secret leaked: {}", rendered);
            assert!(rendered.contains("[REDACTED]"));
        }
        assert!(display.contains("API key from config"));
    }

    #[test]
    fn test_key_is_trimmed() {
        let cred = ApiCredential::new(format!("  {}\n", SECRET), CredentialSource::Programmatic);
        assert_eq!(cred.expose(), SECRET);
        assert!(ApiCredential::new(" \n", CredentialSource::Programmatic).is_empty());
    }

    #[test]
    fn test_config_wins_over_environment() {
        std::env::set_var("REALITYCHECK_TEST_KEY_PRIORITY", "env-key");
        let config = serde_json::json!({ "api_key": "config-key" });

        let cred =
            ApiCredential::resolve(&config, "api_key", "REALITYCHECK_TEST_KEY_PRIORITY").unwrap();

        assert_eq!(cred.expose(), "config-key");
        assert_eq!(cred.source(), CredentialSource::Config);
        std::env::remove_var("REALITYCHECK_TEST_KEY_PRIORITY");
    }

    #[test]
    fn test_blank_config_key_falls_back_to_environment() {
        std::env::set_var("REALITYCHECK_TEST_KEY_FALLBACK", "env-key");
        let config = serde_json::json!({ "api_key": "   " });

        let cred =
            ApiCredential::resolve(&config, "api_key", "REALITYCHECK_TEST_KEY_FALLBACK").unwrap();

        assert_eq!(cred.expose(), "env-key");
        assert_eq!(cred.source(), CredentialSource::Environment);
        std::env::remove_var("REALITYCHECK_TEST_KEY_FALLBACK");
    }

    #[test]
    fn test_blank_environment_key_is_missing() {
        std::env::set_var("REALITYCHECK_TEST_KEY_BLANK", "");
        assert!(ApiCredential::resolve(
            &serde_json::json!({}),
            "api_key",
            "REALITYCHECK_TEST_KEY_BLANK"
        )
        .is_none());
        std::env::remove_var("REALITYCHECK_TEST_KEY_BLANK");
    }
}
