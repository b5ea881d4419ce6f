use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::data_models::Platform;

/// Named secrets for one platform.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PlatformCredentials {
    secrets: BTreeMap<String, String>,
}

impl PlatformCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }

    /// Returns the secret only when it is present and non-empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.secrets
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn missing_for(&self, platform: Platform) -> Vec<&'static str> {
        platform
            .required_secrets()
            .iter()
            .copied()
            .filter(|name| self.get(name).is_none())
            .collect()
    }

    pub fn is_complete_for(&self, platform: Platform) -> bool {
        self.missing_for(platform).is_empty()
    }
}

impl fmt::Debug for PlatformCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.secrets {
            let shown = if value.trim().is_empty() { "<empty>" } else { "<redacted>" };
            map.entry(name, &shown);
        }
        map.finish()
    }
}

/// Credentials for every platform, loaded once and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    by_platform: HashMap<Platform, PlatformCredentials>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_platform(mut self, platform: Platform, credentials: PlatformCredentials) -> Self {
        self.by_platform.insert(platform, credentials);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<&PlatformCredentials> {
        self.by_platform.get(&platform)
    }

    /// Secrets the platform needs but does not have. Platforms without any
    /// requirements always return an empty list.
    pub fn missing_for(&self, platform: Platform) -> Vec<&'static str> {
        match self.get(platform) {
            Some(credentials) => credentials.missing_for(platform),
            None => platform.required_secrets().to_vec(),
        }
    }

    pub fn is_complete_for(&self, platform: Platform) -> bool {
        self.missing_for(platform).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amazon(access: &str, secret: &str, tag: &str) -> PlatformCredentials {
        PlatformCredentials::new()
            .with_secret("access_key", access)
            .with_secret("secret_key", secret)
            .with_secret("partner_tag", tag)
    }

    #[test]
    fn complete_only_when_every_required_secret_is_non_empty() {
        assert!(amazon("AK", "SK", "tag-20").is_complete_for(Platform::Amazon));
        assert_eq!(
            amazon("AK", "  ", "tag-20").missing_for(Platform::Amazon),
            vec!["secret_key"]
        );
        assert_eq!(
            PlatformCredentials::new().missing_for(Platform::Amazon),
            vec!["access_key", "secret_key", "partner_tag"]
        );
    }

    #[test]
    fn ebay_needs_nothing() {
        let store = CredentialStore::new();
        assert!(store.is_complete_for(Platform::Ebay));
        assert!(!store.is_complete_for(Platform::Amazon));
    }

    #[test]
    fn debug_never_prints_secret_values() {
        let rendered = format!("{:?}", amazon("AKIDEXAMPLE", "very-secret", ""));
        assert!(!rendered.contains("AKIDEXAMPLE"));
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("<empty>"));
    }
}
