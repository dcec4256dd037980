//! Pinterest Conversions API adapter.

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

const API_BASE: &str = "https://api.pinterest.com";

/// Storefront vocabulary -> Pinterest event names.
fn pinterest_event_name(internal: &str) -> &str {
    match internal {
        "checkout_completed" => "checkout",
        "product_added_to_cart" => "add_to_cart",
        "product_viewed" => "page_visit",
        "page_viewed" => "page_visit",
        "search_submitted" => "search",
        other => other,
    }
}

pub struct PinterestAdapter {
    decryptor: Arc<dyn FieldDecryptor>,
    api_base: String,
}

impl PinterestAdapter {
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
impl DestinationAdapter for PinterestAdapter {
    fn destination(&self) -> Destination {
        Destination::Pinterest
    }

    async fn send_event(
        &self,
        event: &ConversionEvent,
        credentials: &DestinationCredentials,
    ) -> DeliveryResult {
        if !event.consent.marketing {
            return DeliveryResult::invalid("marketing consent not granted for this event");
        }
        let ad_account_id = match credentials.required("ad_account_id") {
            Ok(value) => value,
            Err(err) => return DeliveryResult::invalid(err.to_string()),
        };
        let access_token = match credentials.required("access_token") {
            Ok(value) => value,
            Err(err) => return DeliveryResult::invalid(err.to_string()),
        };

        let network = network_context(event, self.decryptor.as_ref());

        let mut user_data = Map::new();
        if let Some(email) = &event.email_sha256 {
            user_data.insert("em".into(), json!([email]));
        }
        if let Some(phone) = &event.phone_sha256 {
            user_data.insert("ph".into(), json!([phone]));
        }
        if let Some(ip) = network.ip {
            user_data.insert("client_ip_address".into(), json!(ip));
        }
        if let Some(user_agent) = network.user_agent {
            user_data.insert("client_user_agent".into(), json!(user_agent));
        }

        let mut custom_data = Map::new();
        // Pinterest expects the value as a string.
        custom_data.insert(
            "value".into(),
            json!(coerce::money(&event.value).to_string()),
        );
        if let Some(currency) = &event.currency {
            custom_data.insert("currency".into(), json!(currency));
        }
        if let Some(order_id) = &event.transaction_id {
            custom_data.insert("order_id".into(), json!(order_id));
        }
        let items = normalize_items(&event.items);
        if !items.is_empty() {
            custom_data.insert(
                "content_ids".into(),
                Value::Array(items.iter().map(|item| json!(item.id)).collect()),
            );
            custom_data.insert(
                "num_items".into(),
                json!(items.iter().map(|item| item.quantity).sum::<i64>()),
            );
        }

        let mut data = Map::new();
        data.insert(
            "event_name".into(),
            json!(pinterest_event_name(&event.event_name)),
        );
        data.insert("action_source".into(), json!("web"));
        data.insert("event_time".into(), json!(event.epoch_seconds()));
        data.insert("event_id".into(), json!(event.event_id));
        if let Some(page_url) = &event.page_url {
            data.insert("event_source_url".into(), json!(page_url));
        }
        data.insert("user_data".into(), Value::Object(user_data));
        data.insert("custom_data".into(), Value::Object(custom_data));

        let payload = json!({"data": [Value::Object(data)]});
        let url = format!("{}/v5/ad_accounts/{}/events", self.api_base, ad_account_id);
        let test_query;
        let query: &[(&str, &str)] = if let Some(test) = credentials.get("test_event_code") {
            test_query = [("test", test)];
            &test_query
        } else {
            &[]
        };
        submit_json(
            &url,
            AuthStyle {
                token: &access_token,
                fallback_query_param: "access_token",
            },
            query,
            &payload,
            pinterest_error_message,
        )
        .await
    }
}

fn pinterest_error_message(body: &Value) -> Option<String> {
    let code = body.get("code").and_then(Value::as_i64)?;
    if code == 0 {
        return None;
    }
    Some(
        body.get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("code {code}")),
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
            event_name: "checkout_completed".to_string(),
            event_id: "dedupe_3".to_string(),
            client_id: None,
            occurred_at: Utc::now(),
            timestamp_ms: 0,
            ip: Default::default(),
            user_agent: Default::default(),
            page_url: Some("https://shop.example/checkout".to_string()),
            referrer: None,
            query_string: None,
            currency: Some("USD".to_string()),
            value: json!(30),
            transaction_id: Some("order_3".to_string()),
            items: vec![
                json!({"id": "a", "quantity": 2}),
                json!({"id": "b", "quantity": 3}),
            ],
            email_sha256: Some("emhash".to_string()),
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
    async fn event_posts_to_the_ad_account_path() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v5/ad_accounts/ACC9/events")
                    .json_body_partial(
                        json!({
                            "data": [{
                                "event_name": "checkout",
                                "action_source": "web",
                                "custom_data": {"value": "30", "num_items": 5}
                            }]
                        })
                        .to_string(),
                    );
                then.status(200).json_body(json!({"num_events_received": 1}));
            })
            .await;

        let adapter =
            PinterestAdapter::with_api_base(Arc::new(Base64Decryptor), server.base_url());
        let credentials =
            DestinationCredentials::new([("ad_account_id", "ACC9"), ("access_token", "tok")]);
        let result = adapter.send_event(&event(), &credentials).await;

        assert!(result.ok, "unexpected failure: {:?}", result.error);
        assert_eq!(mock.hits_async().await, 1);
    }
}
