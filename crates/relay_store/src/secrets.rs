use std::path::PathBuf;

use anyhow::Result;
use chrono::{Duration, Utc};
use core_model::secrets::ShopSecrets;

use crate::jsonl::{append_jsonl, ensure_dir, jsonl_name, read_last_snapshot};

const SECRETS_DIR: &str = "secrets";

/// Read/rotate contract for per-shop ingestion secrets.
pub trait SecretStore: Send + Sync {
    fn load(&self, shop_id: &str) -> Result<Option<ShopSecrets>>;

    /// Install `new_secret`, keeping the superseded secret acceptable for the
    /// given grace period.
    fn rotate(&self, shop_id: &str, new_secret: &str, grace: Duration) -> Result<ShopSecrets>;
}

pub struct JsonlSecretStore {
    root: PathBuf,
}

impl JsonlSecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, shop_id: &str) -> PathBuf {
        self.root.join(SECRETS_DIR).join(jsonl_name(shop_id))
    }
}

impl SecretStore for JsonlSecretStore {
    fn load(&self, shop_id: &str) -> Result<Option<ShopSecrets>> {
        read_last_snapshot(&self.path_for(shop_id))
    }

    fn rotate(&self, shop_id: &str, new_secret: &str, grace: Duration) -> Result<ShopSecrets> {
        let path = self.path_for(shop_id);
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let now = Utc::now();
        let previous = read_last_snapshot::<ShopSecrets>(&path)?;
        let next = match previous {
            Some(current) => ShopSecrets {
                shop_id: shop_id.to_string(),
                current_secret: new_secret.to_string(),
                rotated_at: Some(now),
                previous_secret: Some(current.current_secret),
                previous_secret_expires_at: Some(now + grace),
            },
            None => ShopSecrets {
                shop_id: shop_id.to_string(),
                current_secret: new_secret.to_string(),
                rotated_at: None,
                previous_secret: None,
                previous_secret_expires_at: None,
            },
        };
        append_jsonl(&path, std::slice::from_ref(&next))?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_install_then_rotation_with_grace() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlSecretStore::new(dir.path());

        let installed = store.rotate("shop_1", "secret-a", Duration::hours(2)).unwrap();
        assert!(!installed.has_rotated());
        assert!(installed.rotated_at.is_none());

        let rotated = store.rotate("shop_1", "secret-b", Duration::hours(2)).unwrap();
        assert!(rotated.has_rotated());
        assert_eq!(rotated.previous_secret.as_deref(), Some("secret-a"));
        assert!(rotated.grace_window_active(Utc::now()));

        let loaded = store.load("shop_1").unwrap().unwrap();
        assert_eq!(loaded.current_secret, "secret-b");
    }
}
