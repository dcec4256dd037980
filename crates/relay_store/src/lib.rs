pub mod configs;
pub mod conversions;
pub mod jsonl;
pub mod receipts;
pub mod secrets;

pub use configs::{ConfigStore, JsonlConfigStore};
pub use conversions::{ConversionLogStore, JsonlConversionLogStore};
pub use receipts::{JsonlReceiptStore, ReceiptStore};
pub use secrets::{JsonlSecretStore, SecretStore};
