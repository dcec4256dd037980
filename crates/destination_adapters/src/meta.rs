//! Meta Conversions API adapter.
//!
//! The most demanding destination: Meta rejects website events without a
//! client user agent and source URL, so both are validated before any network
//! call is made.

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

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v18.0";
const ACTION_SOURCE: &str = "website";

/// Storefront vocabulary -> Meta standard event names. Unmapped names pass
/// through unchanged.
fn meta_event_name(internal: &str) -> &str {
    match internal {
        "checkout_completed" => "Purchase",
        "checkout_started" => "InitiateCheckout",
        "payment_info_submitted" => "AddPaymentInfo",
        "product_added_to_cart" => "AddToCart",
        "product_viewed" => "ViewContent",
        "collection_viewed" => "ViewContent",
        "page_viewed" => "PageView",
        "search_submitted" => "Search",
        other => other,
    }
}

pub struct MetaAdapter {
    decryptor: Arc<dyn FieldDecryptor>,
    api_base: String,
}

impl MetaAdapter {
    pub fn new(decryptor: Arc<dyn FieldDecryptor>) -> Self {
        Self {
            decryptor,
            api_base: GRAPH_API_BASE.to_string(),
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
impl DestinationAdapter for MetaAdapter {
    fn destination(&self) -> Destination {
        Destination::Meta
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
        let Some(user_agent) = network.user_agent else {
            return DeliveryResult::invalid(
                "missing client user agent: Meta website events require one",
            );
        };
        let Some(page_url) = event
            .page_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
        else {
            return DeliveryResult::invalid(
                "missing page URL: Meta website events require event_source_url",
            );
        };

        let payload = build_payload(
            event,
            &user_agent,
            network.ip.as_deref(),
            page_url,
            credentials.get("test_event_code"),
        );
        let url = format!("{}/{}/events", self.api_base, pixel_id);
        submit_json(
            &url,
            AuthStyle {
                token: &access_token,
                fallback_query_param: "access_token",
            },
            &[],
            &payload,
            meta_error_message,
        )
        .await
    }
}

fn build_payload(
    event: &ConversionEvent,
    user_agent: &str,
    ip: Option<&str>,
    page_url: &str,
    test_event_code: Option<&str>,
) -> Value {
    let mut user_data = Map::new();
    user_data.insert("client_user_agent".into(), json!(user_agent));
    if let Some(ip) = ip {
        user_data.insert("client_ip_address".into(), json!(ip));
    }
    if let Some(em) = &event.email_sha256 {
        user_data.insert("em".into(), json!([em]));
    }
    if let Some(ph) = &event.phone_sha256 {
        user_data.insert("ph".into(), json!([ph]));
    }
    if let Some(first) = &event.first_name_sha256 {
        user_data.insert("fn".into(), json!([first]));
    }
    if let Some(last) = &event.last_name_sha256 {
        user_data.insert("ln".into(), json!([last]));
    }
    if let Some(client_id) = &event.client_id {
        user_data.insert("external_id".into(), json!([client_id]));
    }

    let mut custom_data = Map::new();
    custom_data.insert("value".into(), json!(coerce::money(&event.value)));
    if let Some(currency) = &event.currency {
        custom_data.insert("currency".into(), json!(currency));
    }
    if let Some(order_id) = &event.transaction_id {
        custom_data.insert("order_id".into(), json!(order_id));
    }
    let contents = normalize_items(&event.items);
    if !contents.is_empty() {
        custom_data.insert(
            "contents".into(),
            Value::Array(
                contents
                    .iter()
                    .map(|item| {
                        json!({
                            "id": item.id,
                            "quantity": item.quantity,
                            "item_price": item.unit_price,
                        })
                    })
                    .collect(),
            ),
        );
        custom_data.insert("content_type".into(), json!("product"));
    }

    let mut data = Map::new();
    data.insert("event_name".into(), json!(meta_event_name(&event.event_name)));
    data.insert("event_time".into(), json!(event.epoch_seconds()));
    data.insert("event_id".into(), json!(event.event_id));
    data.insert("event_source_url".into(), json!(page_url));
    data.insert("action_source".into(), json!(ACTION_SOURCE));
    data.insert("user_data".into(), Value::Object(user_data));
    data.insert("custom_data".into(), Value::Object(custom_data));

    let mut payload = Map::new();
    payload.insert("data".into(), json!([Value::Object(data)]));
    if let Some(code) = test_event_code {
        payload.insert("test_event_code".into(), json!(code));
    }
    Value::Object(payload)
}

/// Graph API errors arrive as `{"error": {"message": ...}}`, sometimes inside
/// a 2xx body.
fn meta_error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    Some(
        error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
    )
}
