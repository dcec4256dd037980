//! TikTok Events API adapter.

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

const EVENTS_API_BASE: &str = "https://business-api.tiktok.com";
const TRACK_PATH: &str = "/open_api/v1.3/event/track/";

/// Storefront vocabulary -> TikTok standard event names.
fn tiktok_event_name(internal: &str) -> &str {
    match internal {
        "checkout_completed" => "CompletePayment",
        "checkout_started" => "InitiateCheckout",
        "payment_info_submitted" => "AddPaymentInfo",
        "product_added_to_cart" => "AddToCart",
        "product_viewed" => "ViewContent",
        "page_viewed" => "Pageview",
        "search_submitted" => "Search",
        other => other,
    }
}

pub struct TiktokAdapter {
    decryptor: Arc<dyn FieldDecryptor>,
    api_base: String,
}

impl TiktokAdapter {
    pub fn new(decryptor: Arc<dyn FieldDecryptor>) -> Self {
        Self {
            decryptor,
            api_base: EVENTS_API_BASE.to_string(),
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
impl DestinationAdapter for TiktokAdapter {
    fn destination(&self) -> Destination {
        Destination::Tiktok
    }

    async fn send_event(
        &self,
        event: &ConversionEvent,
        credentials: &DestinationCredentials,
    ) -> DeliveryResult {
        if !event.consent.marketing {
            return DeliveryResult::invalid("marketing consent not granted for this event");
        }
        let pixel_code = match credentials.required("pixel_code") {
            Ok(value) => value,
            Err(err) => return DeliveryResult::invalid(err.to_string()),
        };
        let access_token = match credentials.required("access_token") {
            Ok(value) => value,
            Err(err) => return DeliveryResult::invalid(err.to_string()),
        };

        let payload = self.build_payload(event, &pixel_code, credentials.get("test_event_code"));
        let url = format!("{}{}", self.api_base, TRACK_PATH);
        submit_json(
            &url,
            AuthStyle {
                token: &access_token,
                fallback_query_param: "access_token",
            },
            &[],
            &payload,
            tiktok_error_message,
        )
        .await
    }
}

impl TiktokAdapter {
    fn build_payload(
        &self,
        event: &ConversionEvent,
        pixel_code: &str,
        test_event_code: Option<&str>,
    ) -> Value {
        let network = network_context(event, self.decryptor.as_ref());

        let mut user = Map::new();
        if let Some(email) = &event.email_sha256 {
            user.insert("email".into(), json!(email));
        }
        if let Some(phone) = &event.phone_sha256 {
            user.insert("phone".into(), json!(phone));
        }
        if let Some(external_id) = &event.client_id {
            user.insert("external_id".into(), json!(external_id));
        }
        if let Some(ip) = network.ip {
            user.insert("ip".into(), json!(ip));
        }
        if let Some(user_agent) = network.user_agent {
            user.insert("user_agent".into(), json!(user_agent));
        }

        let mut properties = Map::new();
        properties.insert("value".into(), json!(coerce::money(&event.value)));
        if let Some(currency) = &event.currency {
            properties.insert("currency".into(), json!(currency));
        }
        if let Some(order_id) = &event.transaction_id {
            properties.insert("order_id".into(), json!(order_id));
        }
        let contents = normalize_items(&event.items);
        if !contents.is_empty() {
            properties.insert(
                "contents".into(),
                Value::Array(
                    contents
                        .iter()
                        .map(|item| {
                            json!({
                                "content_id": item.id,
                                "quantity": item.quantity,
                                "price": item.unit_price,
                            })
                        })
                        .collect(),
                ),
            );
        }

        let mut page = Map::new();
        if let Some(url) = &event.page_url {
            page.insert("url".into(), json!(url));
        }
        if let Some(referrer) = &event.referrer {
            page.insert("referrer".into(), json!(referrer));
        }

        let mut payload = Map::new();
        payload.insert("event_source".into(), json!("web"));
        payload.insert("pixel_code".into(), json!(pixel_code));
        payload.insert("event".into(), json!(tiktok_event_name(&event.event_name)));
        payload.insert("event_id".into(), json!(event.event_id));
        payload.insert("timestamp".into(), json!(event.epoch_seconds()));
        payload.insert(
            "context".into(),
            json!({"user": Value::Object(user), "page": Value::Object(page)}),
        );
        payload.insert("properties".into(), Value::Object(properties));
        if let Some(code) = test_event_code {
            payload.insert("test_event_code".into(), json!(code));
        }
        Value::Object(payload)
    }
}

/// The Events API wraps everything in `{"code": 0, "message": "OK"}`; any
/// non-zero code is an application error even on a 2xx status.
fn tiktok_error_message(body: &Value) -> Option<String> {
    match body.get("code").and_then(Value::as_i64) {
        Some(0) | None => None,
        Some(code) => Some(
            body.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("code {code}")),
        ),
    }
}
