use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical identifier of a delivery destination (Meta, Google, TikTok, etc.)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Meta,
    Google,
    Tiktok,
    Pinterest,
    Snapchat,
    Other(String),
}

impl Destination {
    /// Stable string key used in storage paths and CLI arguments.
    pub fn as_key(&self) -> &str {
        match self {
            Destination::Meta => "meta",
            Destination::Google => "google",
            Destination::Tiktok => "tiktok",
            Destination::Pinterest => "pinterest",
            Destination::Snapchat => "snapchat",
            Destination::Other(key) => key.as_str(),
        }
    }

    pub fn from_key(key: &str) -> Destination {
        match key {
            "meta" => Destination::Meta,
            "google" => Destination::Google,
            "tiktok" => Destination::Tiktok,
            "pinterest" => Destination::Pinterest,
            "snapchat" => Destination::Snapchat,
            other => Destination::Other(other.to_string()),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Destination::Meta => "Meta",
            Destination::Google => "Google",
            Destination::Tiktok => "TikTok",
            Destination::Pinterest => "Pinterest",
            Destination::Snapchat => "Snapchat",
            Destination::Other(key) => key.as_str(),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trips() {
        for key in ["meta", "google", "tiktok", "pinterest", "snapchat"] {
            assert_eq!(Destination::from_key(key).as_key(), key);
        }
        assert_eq!(
            Destination::from_key("unknown_platform").as_key(),
            "unknown_platform"
        );
    }
}
