use std::sync::Arc;

use async_trait::async_trait;
use core_model::credentials::DestinationCredentials;
use core_model::delivery::DeliveryResult;
use core_model::event::ConversionEvent;
use core_model::pii::FieldDecryptor;
use core_types::Destination;

pub mod google;
pub(crate) mod http;
pub mod items;
pub mod meta;
pub mod pinterest;
pub mod resolve;
pub mod snapchat;
pub mod tiktok;

pub use google::GoogleAdapter;
pub use meta::MetaAdapter;
pub use pinterest::PinterestAdapter;
pub use snapchat::SnapchatAdapter;
pub use tiktok::TiktokAdapter;

/// A server-side delivery channel for one advertising platform.
#[async_trait]
pub trait DestinationAdapter: Send + Sync {
    fn destination(&self) -> Destination;

    /// Build the platform payload for `event` and submit it.
    ///
    /// Never returns an error: validation, transport, and destination
    /// application failures are all folded into the `DeliveryResult`.
    /// Persistence of the outcome is the caller's responsibility.
    async fn send_event(
        &self,
        event: &ConversionEvent,
        credentials: &DestinationCredentials,
    ) -> DeliveryResult;
}

/// Look up the adapter for a destination tag. `Other` destinations have no
/// server-side channel.
pub fn adapter_for(
    destination: &Destination,
    decryptor: Arc<dyn FieldDecryptor>,
) -> Option<Arc<dyn DestinationAdapter>> {
    match destination {
        Destination::Meta => Some(Arc::new(MetaAdapter::new(decryptor))),
        Destination::Google => Some(Arc::new(GoogleAdapter::new(decryptor))),
        Destination::Tiktok => Some(Arc::new(TiktokAdapter::new(decryptor))),
        Destination::Pinterest => Some(Arc::new(PinterestAdapter::new(decryptor))),
        Destination::Snapchat => Some(Arc::new(SnapchatAdapter::new(decryptor))),
        Destination::Other(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::pii::Base64Decryptor;

    #[test]
    fn registry_covers_every_builtin_destination() {
        let decryptor: Arc<dyn FieldDecryptor> = Arc::new(Base64Decryptor);
        for destination in [
            Destination::Meta,
            Destination::Google,
            Destination::Tiktok,
            Destination::Pinterest,
            Destination::Snapchat,
        ] {
            let adapter = adapter_for(&destination, decryptor.clone())
                .expect("builtin destination should have an adapter");
            assert_eq!(adapter.destination(), destination);
        }
        assert!(adapter_for(
            &Destination::Other("affiliate_network".to_string()),
            decryptor
        )
        .is_none());
    }
}
