//! Google Analytics 4 Measurement Protocol adapter.

use std::sync::Arc;

use async_trait::async_trait;
use core_model::coerce;
use core_model::credentials::DestinationCredentials;
use core_model::delivery::DeliveryResult;
use core_model::event::ConversionEvent;
use core_model::pii::FieldDecryptor;
use core_types::Destination;
use serde_json::{json, Map, Value};

use crate::http::{submit_json, AuthStyle};
use crate::items::normalize_items;
use crate::DestinationAdapter;

const MEASUREMENT_API_BASE: &str = "https://www.google-analytics.com";

/// Storefront vocabulary -> GA4 recommended event names.
fn ga4_event_name(internal: &str) -> &str {
    match internal {
        "checkout_completed" => "purchase",
        "checkout_started" => "begin_checkout",
        "payment_info_submitted" => "add_payment_info",
        "product_added_to_cart" => "add_to_cart",
        "product_viewed" => "view_item",
        "collection_viewed" => "view_item_list",
        "page_viewed" => "page_view",
        "search_submitted" => "search",
        other => other,
    }
}

pub struct GoogleAdapter {
    // Kept for contract parity; the Measurement Protocol carries no network
    // context, so nothing is decrypted here.
    _decryptor: Arc<dyn FieldDecryptor>,
    api_base: String,
}

impl GoogleAdapter {
    pub fn new(decryptor: Arc<dyn FieldDecryptor>) -> Self {
        Self {
            _decryptor: decryptor,
            api_base: MEASUREMENT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(decryptor: Arc<dyn FieldDecryptor>, api_base: impl Into<String>) -> Self {
        Self {
            _decryptor: decryptor,
            api_base: api_base.into(),
        }
    }
}

#[async_trait]
impl DestinationAdapter for GoogleAdapter {
    fn destination(&self) -> Destination {
        Destination::Google
    }

    async fn send_event(
        &self,
        event: &ConversionEvent,
        credentials: &DestinationCredentials,
    ) -> DeliveryResult {
        if !event.consent.analytics {
            return DeliveryResult::invalid("analytics consent not granted for this event");
        }
        let measurement_id = match credentials.required("measurement_id") {
            Ok(value) => value,
            Err(err) => return DeliveryResult::invalid(err.to_string()),
        };
        let api_secret = match credentials.required("api_secret") {
            Ok(value) => value,
            Err(err) => return DeliveryResult::invalid(err.to_string()),
        };
        let Some(client_id) = event
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        else {
            return DeliveryResult::invalid(
                "missing client id: the Measurement Protocol requires client_id",
            );
        };

        let payload = build_payload(event, client_id);
        let url = format!("{}/mp/collect", self.api_base);
        submit_json(
            &url,
            AuthStyle {
                token: &api_secret,
                fallback_query_param: "api_secret",
            },
            &[("measurement_id", measurement_id.as_str())],
            &payload,
            google_error_message,
        )
        .await
    }
}

fn build_payload(event: &ConversionEvent, client_id: &str) -> Value {
    let mut params = Map::new();
    params.insert("value".into(), json!(coerce::money(&event.value)));
    if let Some(currency) = &event.currency {
        params.insert("currency".into(), json!(currency));
    }
    if let Some(transaction_id) = &event.transaction_id {
        params.insert("transaction_id".into(), json!(transaction_id));
    }
    if let Some(page_url) = &event.page_url {
        params.insert("page_location".into(), json!(page_url));
    }
    let items = normalize_items(&event.items);
    if !items.is_empty() {
        params.insert(
            "items".into(),
            Value::Array(
                items
                    .iter()
                    .map(|item| {
                        json!({
                            "item_id": item.id,
                            "quantity": item.quantity,
                            "price": item.unit_price,
                        })
                    })
                    .collect(),
            ),
        );
    }

    json!({
        "client_id": client_id,
        "timestamp_micros": event.epoch_millis() * 1000,
        "events": [{
            "name": ga4_event_name(&event.event_name),
            "params": Value::Object(params),
        }]
    })
}

/// The Measurement Protocol answers 2xx even for dropped events; validation
/// failures only surface through `validationMessages`.
fn google_error_message(body: &Value) -> Option<String> {
    let messages = body.get("validationMessages")?.as_array()?;
    let first = messages.first()?;
    Some(
        first
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| first.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_model::event::ConsentFlags;
    use core_model::pii::Base64Decryptor;
    use httpmock::prelude::*;

    fn adapter(base: String) -> GoogleAdapter {
        GoogleAdapter::with_api_base(Arc::new(Base64Decryptor), base)
    }

    fn event() -> ConversionEvent {
        ConversionEvent {
            id: "evt_1".to_string(),
            shop_id: "shop_1".to_string(),
            event_name: "checkout_completed".to_string(),
            event_id: "dedupe_1".to_string(),
            client_id: Some("GA1.1.1234".to_string()),
            occurred_at: Utc::now(),
            timestamp_ms: 1_714_567_890_123,
            ip: Default::default(),
            user_agent: Default::default(),
            page_url: Some("https://shop.example/checkout".to_string()),
            referrer: None,
            query_string: None,
            currency: Some("EUR".to_string()),
            value: json!(80),
            transaction_id: Some("order_7".to_string()),
            items: vec![json!({"id": "sku-7", "quantity": 4, "price": 20.0})],
            email_sha256: None,
            phone_sha256: None,
            first_name_sha256: None,
            last_name_sha256: None,
            consent: ConsentFlags {
                marketing: true,
                analytics: true,
                sale_of_data: false,
            },
        }
    }

    fn credentials() -> DestinationCredentials {
        DestinationCredentials::new([("measurement_id", "G-ABC123"), ("api_secret", "s3cret")])
    }

    #[tokio::test]
    async fn missing_client_id_short_circuits() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(204);
            })
            .await;

        let mut event = event();
        event.client_id = None;
        let result = adapter(server.base_url()).send_event(&event, &credentials()).await;

        assert!(!result.ok);
        assert!(result.error.unwrap().contains("client id"));
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn collect_call_carries_measurement_id_and_micros() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/mp/collect")
                    .query_param("measurement_id", "G-ABC123")
                    .json_body_partial(
                        json!({
                            "client_id": "GA1.1.1234",
                            "timestamp_micros": 1_714_567_890_123_000i64,
                            "events": [{"name": "purchase"}]
                        })
                        .to_string(),
                    );
                then.status(204);
            })
            .await;

        let result = adapter(server.base_url()).send_event(&event(), &credentials()).await;

        assert!(result.ok, "unexpected failure: {:?}", result.error);
        assert_eq!(result.status_code, Some(204));
        assert_eq!(mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn validation_messages_surface_as_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/mp/collect");
                then.status(200).json_body(json!({
                    "validationMessages": [{"description": "Measurement ID is invalid"}]
                }));
            })
            .await;

        let result = adapter(server.base_url()).send_event(&event(), &credentials()).await;

        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("Measurement ID is invalid"));
    }
}
