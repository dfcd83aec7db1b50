//! Credential Capability
//!
//! Metered features (video generation) need a paid API key. Surfaces only see
//! the [`CredentialProvider`] trait, so hosts and tests decide where keys come
//! from.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::Result;

/// An API key. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, ignoring blank values
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.0.chars().count();
        let tail: String = self.0.chars().skip(count.saturating_sub(4)).collect();
        write!(f, "ApiKey(…{})", tail)
    }
}

/// Host capability for checking and acquiring a usable credential
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Whether a usable credential is currently selected
    async fn has_credential(&self) -> Result<bool>;

    /// Ask the host to select or authorize a credential.
    ///
    /// Completion does not imply success; callers re-check afterwards.
    async fn prompt_for_credential(&self) -> Result<()>;
}

/// Process-wide key holder shared by the provider and the surfaces
#[derive(Debug, Default)]
pub struct KeyRing {
    key: RwLock<Option<ApiKey>>,
    env_vars: Vec<String>,
}

impl KeyRing {
    pub fn new(key: Option<ApiKey>) -> Self {
        Self {
            key: RwLock::new(key),
            env_vars: Vec::new(),
        }
    }

    /// Load from the first set variable in `vars`; prompting re-reads them
    pub fn from_env(vars: &[&str]) -> Self {
        let ring = Self {
            key: RwLock::new(None),
            env_vars: vars.iter().map(|v| (*v).to_string()).collect(),
        };
        ring.reload();
        ring
    }

    pub fn current(&self) -> Option<ApiKey> {
        self.key.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the key (e.g. chosen by an operator at runtime)
    pub fn set(&self, key: Option<ApiKey>) {
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = key;
    }

    /// Re-read the configured environment variables
    pub fn reload(&self) -> bool {
        let key = self
            .env_vars
            .iter()
            .find_map(|var| std::env::var(var).ok().and_then(ApiKey::new));
        let found = key.is_some();
        if found {
            self.set(key);
        }
        found
    }
}

#[async_trait]
impl CredentialProvider for KeyRing {
    async fn has_credential(&self) -> Result<bool> {
        Ok(self.current().is_some())
    }

    async fn prompt_for_credential(&self) -> Result<()> {
        if !self.reload() {
            tracing::warn!(vars = ?self.env_vars, "No API key found while re-checking credentials");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_key_rejected() {
        assert!(ApiKey::new("   ").is_none());
        assert_eq!(ApiKey::new(" abc ").unwrap().expose(), "abc");
    }

    #[test]
    fn test_debug_redacts() {
        let key = ApiKey::new("AIzaSySECRETwxyz").unwrap();
        let printed = format!("{:?}", key);
        assert!(printed.contains("wxyz"));
        assert!(!printed.contains("SECRET"));
    }

    #[tokio::test]
    async fn test_key_ring_set_and_check() {
        let ring = KeyRing::new(None);
        assert!(!ring.has_credential().await.unwrap());

        ring.set(ApiKey::new("key-1"));
        assert!(ring.has_credential().await.unwrap());
        assert_eq!(ring.current().unwrap().expose(), "key-1");
    }

    #[tokio::test]
    async fn test_prompt_without_env_keeps_existing_key() {
        let ring = KeyRing::from_env(&["FASTPOS_TEST_UNSET_KEY_VAR"]);
        ring.set(ApiKey::new("manual"));
        ring.prompt_for_credential().await.unwrap();
        assert_eq!(ring.current().unwrap().expose(), "manual");
    }
}
