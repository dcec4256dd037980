//! Resolution of sealed network context before external transmission.

use core_model::event::ConversionEvent;
use core_model::pii::FieldDecryptor;

/// Network context with any at-rest encryption already unwrapped.
#[derive(Debug, Clone, Default)]
pub struct NetworkContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Resolve the event's sealed IP and user agent. Decryption failures fall
/// back to any plaintext copy on the event; a field that cannot be recovered
/// is simply absent.
pub fn network_context(event: &ConversionEvent, decryptor: &dyn FieldDecryptor) -> NetworkContext {
    NetworkContext {
        ip: event.ip.resolve(decryptor),
        user_agent: event.user_agent.resolve(decryptor),
    }
}
