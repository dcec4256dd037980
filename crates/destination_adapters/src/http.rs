//! Shared authenticated submit path for destination endpoints.

use std::time::Duration;

use core_model::delivery::DeliveryResult;
use once_cell::sync::Lazy;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

/// Every destination call is bounded by this timeout; the request is aborted
/// at the boundary rather than left hanging.
pub(crate) const SUBMIT_TIMEOUT: Duration = Duration::from_secs(20);

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("failed to create destination http client")
});

/// Bearer token plus the query-parameter name the destination accepts when
/// header auth is rejected.
pub(crate) struct AuthStyle<'a> {
    pub token: &'a str,
    pub fallback_query_param: &'a str,
}

/// POST `body` to `url` with bearer authorization and interpret the response.
///
/// 401/403 on the first attempt triggers exactly one sequential retry with
/// the token carried as a query parameter instead of the header; some
/// destination endpoints intermittently reject header-based auth. No other
/// failure class is retried, and the two attempts are never concurrent: a
/// parallel second attempt could double-submit the event.
pub(crate) async fn submit_json(
    url: &str,
    auth: AuthStyle<'_>,
    query: &[(&str, &str)],
    body: &Value,
    app_error: fn(&Value) -> Option<String>,
) -> DeliveryResult {
    let first = send_once(url, Some(auth.token), query, body).await;
    match first {
        Ok(response)
            if matches!(
                response.status(),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            ) =>
        {
            debug!(url, status = response.status().as_u16(), "header auth rejected, retrying with query-parameter auth");
            let mut retry_query = query.to_vec();
            retry_query.push((auth.fallback_query_param, auth.token));
            match send_once(url, None, &retry_query, body).await {
                Ok(retry_response) => interpret_response(retry_response, app_error).await,
                Err(err) => DeliveryResult::transport(err.to_string()),
            }
        }
        Ok(response) => interpret_response(response, app_error).await,
        Err(err) => DeliveryResult::transport(err.to_string()),
    }
}

async fn send_once(
    url: &str,
    bearer: Option<&str>,
    query: &[(&str, &str)],
    body: &Value,
) -> reqwest::Result<Response> {
    let mut builder = HTTP_CLIENT.post(url).timeout(SUBMIT_TIMEOUT).json(body);
    if !query.is_empty() {
        builder = builder.query(query);
    }
    if let Some(token) = bearer {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.send().await
}

/// Fold the destination's answer into a delivery outcome, surfacing the most
/// specific error message available: the application error, else the HTTP
/// status reason, else the bare status code.
async fn interpret_response(
    response: Response,
    app_error: fn(&Value) -> Option<String>,
) -> DeliveryResult {
    let status = response.status();
    let body: Option<Value> = response.json().await.ok();
    let error = body.as_ref().and_then(app_error);

    if status.is_success() && error.is_none() {
        return DeliveryResult::success(status.as_u16());
    }

    let message = error
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    DeliveryResult::rejected(status.as_u16(), message)
}
