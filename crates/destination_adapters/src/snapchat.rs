//! Snapchat Conversions API adapter.

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
use crate::resolve::network_context;
use crate::DestinationAdapter;

const API_BASE: &str = "https://tr.snapchat.com";
const CONVERSION_PATH: &str = "/v2/conversion";

/// Storefront vocabulary -> Snapchat event types.
fn snapchat_event_type(internal: &str) -> &str {
    match internal {
        "checkout_completed" => "PURCHASE",
        "checkout_started" => "START_CHECKOUT",
        "payment_info_submitted" => "ADD_BILLING",
        "product_added_to_cart" => "ADD_CART",
        "product_viewed" => "VIEW_CONTENT",
        "page_viewed" => "PAGE_VIEW",
        "search_submitted" => "SEARCH",
        other => other,
    }
}

pub struct SnapchatAdapter {
    decryptor: Arc<dyn FieldDecryptor>,
    api_base: String,
}

impl SnapchatAdapter {
    pub fn new(decryptor: Arc<dyn FieldDecryptor>) -> Self {
        Self {
            decryptor,
            api_base: API_BASE.to_string(),
        }
    }

    pub fn with_api_base(decryptor: Arc<dyn FieldDecryptor>, api_base: impl Into<String>) -> Self {
        Self {
            decryptor,
            api_base: api_base.into(),
        }
    }
}

#[async_trait]
impl DestinationAdapter for SnapchatAdapter {
    fn destination(&self) -> Destination {
        Destination::Snapchat
    }

    async fn send_event(
        &self,
        event: &ConversionEvent,
        credentials: &DestinationCredentials,
    ) -> DeliveryResult {
        if !event.consent.marketing {
            return DeliveryResult::invalid("marketing consent not granted for this event");
        }
        let pixel_id = match credentials.required("pixel_id") {
            Ok(value) => value,
            Err(err) => return DeliveryResult::invalid(err.to_string()),
        };
        let access_token = match credentials.required("access_token") {
            Ok(value) => value,
            Err(err) => return DeliveryResult::invalid(err.to_string()),
        };

        let network = network_context(event, self.decryptor.as_ref());

        let mut payload = Map::new();
        payload.insert("pixel_id".into(), json!(pixel_id));
        payload.insert(
            "event_type".into(),
            json!(snapchat_event_type(&event.event_name)),
        );
        payload.insert("event_conversion_type".into(), json!("WEB"));
        payload.insert("timestamp".into(), json!(event.epoch_millis()));
        payload.insert(
            "client_dedup_id".into(),
            json!(event.event_id),
        );
        if let Some(page_url) = &event.page_url {
            payload.insert("page_url".into(), json!(page_url));
        }
        if let Some(email) = &event.email_sha256 {
            payload.insert("hashed_email".into(), json!(email));
        }
        if let Some(phone) = &event.phone_sha256 {
            payload.insert("hashed_phone_number".into(), json!(phone));
        }
        if let Some(ip) = network.ip {
            payload.insert("ip_address".into(), json!(ip));
        }
        if let Some(user_agent) = network.user_agent {
            payload.insert("user_agent".into(), json!(user_agent));
        }
        payload.insert("price".into(), json!(coerce::money(&event.value)));
        if let Some(currency) = &event.currency {
            payload.insert("currency".into(), json!(currency));
        }
        if let Some(transaction_id) = &event.transaction_id {
            payload.insert("transaction_id".into(), json!(transaction_id));
        }
        let items = normalize_items(&event.items);
        if !items.is_empty() {
            payload.insert(
                "item_ids".into(),
                Value::Array(items.iter().map(|item| json!(item.id)).collect()),
            );
        }

        let url = format!("{}{}", self.api_base, CONVERSION_PATH);
        submit_json(
            &url,
            AuthStyle {
                token: &access_token,
                fallback_query_param: "access_token",
            },
            &[],
            &Value::Object(payload),
            snapchat_error_message,
        )
        .await
    }
}

fn snapchat_error_message(body: &Value) -> Option<String> {
    let status = body.get("status").and_then(Value::as_str)?;
    if status.eq_ignore_ascii_case("success") {
        return None;
    }
    Some(
        body.get("reason")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("status {status}")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_model::event::ConsentFlags;
    use core_model::pii::Base64Decryptor;
    use httpmock::prelude::*;

    fn event() -> ConversionEvent {
        ConversionEvent {
            id: "evt_1".to_string(),
            shop_id: "shop_1".to_string(),
            event_name: "checkout_started".to_string(),
            event_id: "dedupe_4".to_string(),
            client_id: None,
            occurred_at: Utc::now(),
            timestamp_ms: 1_714_567_890_123,
            ip: Default::default(),
            user_agent: Default::default(),
            page_url: Some("https://shop.example/cart".to_string()),
            referrer: None,
            query_string: None,
            currency: Some("GBP".to_string()),
            value: json!("15.00"),
            transaction_id: None,
            items: vec![json!({"id": "sku-2"})],
            email_sha256: None,
            phone_sha256: None,
            first_name_sha256: None,
            last_name_sha256: None,
            consent: ConsentFlags {
                marketing: true,
                analytics: false,
                sale_of_data: false,
            },
        }
    }

    #[tokio::test]
    async fn failed_status_surfaces_the_reason() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(CONVERSION_PATH);
                then.status(200)
                    .json_body(json!({"status": "FAILED", "reason": "pixel not found"}));
            })
            .await;

        let adapter =
            SnapchatAdapter::with_api_base(Arc::new(Base64Decryptor), server.base_url());
        let credentials =
            DestinationCredentials::new([("pixel_id", "PX2"), ("access_token", "tok")]);
        let result = adapter.send_event(&event(), &credentials).await;

        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("pixel not found"));
    }

    #[tokio::test]
    async fn success_status_with_mapped_event_type() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(CONVERSION_PATH)
                    .json_body_partial(
                        json!({
                            "pixel_id": "PX2",
                            "event_type": "START_CHECKOUT",
                            "event_conversion_type": "WEB",
                            "timestamp": 1_714_567_890_123i64,
                            "price": 15.0
                        })
                        .to_string(),
                    );
                then.status(200).json_body(json!({"status": "SUCCESS"}));
            })
            .await;

        let adapter =
            SnapchatAdapter::with_api_base(Arc::new(Base64Decryptor), server.base_url());
        let credentials =
            DestinationCredentials::new([("pixel_id", "PX2"), ("access_token", "tok")]);
        let result = adapter.send_event(&event(), &credentials).await;

        assert!(result.ok, "unexpected failure: {:?}", result.error);
        assert_eq!(mock.hits_async().await, 1);
    }
}
