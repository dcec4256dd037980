use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ingestion-HMAC secret state for one shop.
///
/// Only the immediately previous secret is retained, so the presence of
/// `previous_secret` means exactly one recorded rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopSecrets {
    pub shop_id: String,
    pub current_secret: String,
    pub rotated_at: Option<DateTime<Utc>>,
    pub previous_secret: Option<String>,
    /// End of the window during which the previous secret is still accepted.
    pub previous_secret_expires_at: Option<DateTime<Utc>>,
}

impl ShopSecrets {
    pub fn has_rotated(&self) -> bool {
        self.previous_secret.is_some()
    }

    /// Whether the previous secret is still inside its acceptance window.
    pub fn grace_window_active(&self, now: DateTime<Utc>) -> bool {
        self.previous_secret_expires_at
            .map(|expires| expires > now)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn grace_window_tracks_expiry() {
        let now = Utc::now();
        let mut secrets = ShopSecrets {
            shop_id: "shop_1".to_string(),
            current_secret: "new".to_string(),
            rotated_at: Some(now),
            previous_secret: Some("old".to_string()),
            previous_secret_expires_at: Some(now + Duration::hours(1)),
        };
        assert!(secrets.has_rotated());
        assert!(secrets.grace_window_active(now));
        assert!(!secrets.grace_window_active(now + Duration::hours(2)));

        secrets.previous_secret_expires_at = None;
        assert!(!secrets.grace_window_active(now));
    }
}
