use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Per-destination secret bundle backed by a map.
///
/// Adapters consume well-known keys (`pixel_id`, `access_token`,
/// `measurement_id`, ...); the bag itself stays platform-agnostic so one
/// resolver can feed every destination.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DestinationCredentials {
    inner: BTreeMap<String, String>,
}

impl DestinationCredentials {
    pub fn new<K, V, I>(iter: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let inner = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { inner }
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(|s| s.as_str())
    }

    /// Fetch a mandatory credential; the error names the missing key.
    pub fn required(&self, key: &str) -> Result<String> {
        self.get(key)
            .map(|v| v.to_owned())
            .with_context(|| format!("missing credential `{key}`"))
    }

    /// Fetch a credential value, falling back to the provided environment
    /// variable.
    pub fn required_with_env(&self, key: &str, env_var: &str) -> Result<String> {
        self.get(key)
            .map(|v| v.to_owned())
            .or_else(|| std::env::var(env_var).ok())
            .with_context(|| {
                format!("missing credential `{key}` (expected in credentials or `{env_var}` env var)")
            })
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_names_the_missing_key() {
        let credentials = DestinationCredentials::new([("pixel_id", "12345")]);
        assert_eq!(credentials.required("pixel_id").unwrap(), "12345");
        let err = credentials.required("access_token").unwrap_err();
        assert!(err.to_string().contains("access_token"));
    }
}
