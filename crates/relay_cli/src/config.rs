use std::env;
use std::path::PathBuf;

use anyhow::Result;
use core_model::credentials::DestinationCredentials;
use core_types::Destination;

const DATA_DIR_VAR: &str = "RELAY_DATA_DIR";
const DEFAULT_DATA_DIR: &str = "./relay_data";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_config()
    }
}

pub fn load_config() -> Result<Config> {
    dotenvy::dotenv().ok();

    let data_dir = env::var(DATA_DIR_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

    Ok(Config { data_dir })
}

/// Credential key -> environment variable, per destination. Credentials are
/// supplied pre-resolved; nothing here refreshes or exchanges tokens.
fn env_keys(destination: &Destination) -> &'static [(&'static str, &'static str)] {
    match destination {
        Destination::Meta => &[
            ("pixel_id", "META_PIXEL_ID"),
            ("access_token", "META_ACCESS_TOKEN"),
            ("test_event_code", "META_TEST_EVENT_CODE"),
        ],
        Destination::Google => &[
            ("measurement_id", "GOOGLE_MEASUREMENT_ID"),
            ("api_secret", "GOOGLE_API_SECRET"),
        ],
        Destination::Tiktok => &[
            ("pixel_code", "TIKTOK_PIXEL_CODE"),
            ("access_token", "TIKTOK_ACCESS_TOKEN"),
            ("test_event_code", "TIKTOK_TEST_EVENT_CODE"),
        ],
        Destination::Pinterest => &[
            ("ad_account_id", "PINTEREST_AD_ACCOUNT_ID"),
            ("access_token", "PINTEREST_ACCESS_TOKEN"),
        ],
        Destination::Snapchat => &[
            ("pixel_id", "SNAP_PIXEL_ID"),
            ("access_token", "SNAP_ACCESS_TOKEN"),
        ],
        Destination::Other(_) => &[],
    }
}

/// Build the credential bag for a destination from the environment. Missing
/// variables are simply absent; the adapter reports which key it needed.
pub fn destination_credentials(destination: &Destination) -> DestinationCredentials {
    let mut credentials = DestinationCredentials::default();
    for (key, var) in env_keys(destination) {
        if let Ok(value) = env::var(var) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                credentials.insert(*key, trimmed);
            }
        }
    }
    credentials
}
