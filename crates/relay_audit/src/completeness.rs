//! Scoring of captured and delivered events for required-parameter presence.

use chrono::{DateTime, Utc};
use core_model::coerce;
use core_model::delivery::DeliveryStatus;
use core_model::log::ConversionLogRow;
use core_types::Destination;
use relay_store::ConversionLogStore;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// At most this many rows are scored per capture, newest first.
pub const CAPTURE_LIMIT: usize = 100;
pub const DEFAULT_CAPTURE_WINDOW_MINUTES: i64 = 5;

const VALUE_PARAM: &str = "value";
const CURRENCY_PARAM: &str = "currency";
const ITEMS_PARAM: &str = "items";

#[derive(Debug, Clone, Serialize)]
pub struct ParameterCompleteness {
    pub has_value: bool,
    pub has_currency: bool,
    pub has_items: bool,
    pub missing_parameters: Vec<&'static str>,
    /// 0-100, equal weight per tracked parameter, rounded.
    pub completeness_rate: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct CapturedEvent {
    pub id: String,
    pub event_type: String,
    pub destination: Destination,
    pub status: DeliveryStatus,
    pub value: f64,
    pub currency: Option<String>,
    pub error_message: Option<String>,
    pub completeness_rate: u8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptureSummary {
    pub events: Vec<CapturedEvent>,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    /// Mean of the per-event rates; 0 when no events were captured.
    pub completeness_rate: u8,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventStatistics {
    pub total: usize,
    pub by_event_type: BTreeMap<String, usize>,
    pub by_destination: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub average_completeness: u8,
}

/// Score the most recent conversion log rows for a shop.
///
/// The log table carries no item array, so the items flag is always absent
/// here and the per-event ceiling is 67; richer payload-based scoring goes
/// through [`check_parameter_completeness`].
pub fn capture_recent_events(
    log: &dyn ConversionLogStore,
    shop_id: &str,
    since: DateTime<Utc>,
    destination: Option<&Destination>,
) -> CaptureSummary {
    let rows = match log.recent_rows(shop_id, since, CAPTURE_LIMIT, destination) {
        Ok(rows) => rows,
        Err(err) => {
            warn!(shop_id, error = %err, "failed to load recent conversion rows");
            Vec::new()
        }
    };

    let events: Vec<CapturedEvent> = rows.into_iter().map(score_row).collect();
    let total = events.len();
    let success = events
        .iter()
        .filter(|e| e.status == DeliveryStatus::Ok)
        .count();
    let completeness_rate = if total == 0 {
        0
    } else {
        let sum: u32 = events.iter().map(|e| e.completeness_rate as u32).sum();
        (sum as f64 / total as f64).round() as u8
    };

    CaptureSummary {
        failed: total - success,
        total,
        success,
        completeness_rate,
        events,
    }
}

fn score_row(row: ConversionLogRow) -> CapturedEvent {
    let value = coerce::money(&row.value);
    let flags = [
        value > 0.0,
        row.currency.as_deref().map(|c| !c.trim().is_empty()).unwrap_or(false),
        false, // the log row has no item array to inspect
    ];
    CapturedEvent {
        id: row.id,
        event_type: row.event_type,
        destination: row.destination,
        status: DeliveryStatus::from_upstream(&row.status),
        value,
        currency: row.currency,
        error_message: row.error_message,
        completeness_rate: percent_present(&flags),
        created_at: row.created_at,
    }
}

/// Pure check over an event payload's embedded `data` object, as used by
/// verification flows whose payloads do carry item arrays.
pub fn check_parameter_completeness(payload: &Value) -> ParameterCompleteness {
    let data = payload.get("data").unwrap_or(&Value::Null);

    let has_value = data
        .get(VALUE_PARAM)
        .map(|v| coerce::money(v) > 0.0)
        .unwrap_or(false);
    let has_currency = data
        .get(CURRENCY_PARAM)
        .and_then(Value::as_str)
        .map(|c| !c.trim().is_empty())
        .unwrap_or(false);
    let has_items = data
        .get(ITEMS_PARAM)
        .and_then(Value::as_array)
        .map(|items| !items.is_empty())
        .unwrap_or(false);

    let mut missing_parameters = Vec::new();
    if !has_value {
        missing_parameters.push(VALUE_PARAM);
    }
    if !has_currency {
        missing_parameters.push(CURRENCY_PARAM);
    }
    if !has_items {
        missing_parameters.push(ITEMS_PARAM);
    }

    ParameterCompleteness {
        has_value,
        has_currency,
        has_items,
        completeness_rate: percent_present(&[has_value, has_currency, has_items]),
        missing_parameters,
    }
}

/// Grouped delivery counts plus an average completeness figure.
///
/// Every row contributes two completeness samples to the average: a
/// two-parameter check over the row's own columns and the three-parameter
/// payload check. The two field sets differ, so this is not a plain
/// per-event mean; downstream verification reports rely on the exact figure,
/// so the accumulation is kept as-is.
pub fn event_statistics(
    log: &dyn ConversionLogStore,
    shop_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    destination: Option<&Destination>,
) -> EventStatistics {
    let rows = match log.rows_between(shop_id, start, end, destination) {
        Ok(rows) => rows,
        Err(err) => {
            warn!(shop_id, error = %err, "failed to load conversion rows for statistics");
            Vec::new()
        }
    };

    let mut stats = EventStatistics {
        total: rows.len(),
        ..Default::default()
    };
    let mut completeness_sum: u64 = 0;
    let mut completeness_samples: u64 = 0;

    for row in &rows {
        *stats.by_event_type.entry(row.event_type.clone()).or_insert(0) += 1;
        *stats
            .by_destination
            .entry(row.destination.as_key().to_string())
            .or_insert(0) += 1;
        *stats
            .by_status
            .entry(DeliveryStatus::from_upstream(&row.status).as_str().to_string())
            .or_insert(0) += 1;

        let row_rate = percent_present(&[
            coerce::money(&row.value) > 0.0,
            row.currency.as_deref().map(|c| !c.trim().is_empty()).unwrap_or(false),
        ]);
        let payload_rate = check_parameter_completeness(&row.payload).completeness_rate;
        completeness_sum += row_rate as u64 + payload_rate as u64;
        completeness_samples += 2;
    }

    stats.average_completeness = if completeness_samples == 0 {
        0
    } else {
        (completeness_sum as f64 / completeness_samples as f64).round() as u8
    };
    stats
}

fn percent_present(flags: &[bool]) -> u8 {
    if flags.is_empty() {
        return 0;
    }
    let present = flags.iter().filter(|f| **f).count();
    ((present as f64 / flags.len() as f64) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use chrono::Duration;
    use serde_json::json;

    struct FixedLog {
        rows: Vec<ConversionLogRow>,
        fail: bool,
    }

    impl ConversionLogStore for FixedLog {
        fn recent_rows(
            &self,
            _shop_id: &str,
            since: DateTime<Utc>,
            limit: usize,
            destination: Option<&Destination>,
        ) -> Result<Vec<ConversionLogRow>> {
            if self.fail {
                return Err(anyhow!("storage offline"));
            }
            let mut rows: Vec<ConversionLogRow> = self
                .rows
                .iter()
                .filter(|r| r.created_at >= since)
                .filter(|r| destination.map(|d| &r.destination == d).unwrap_or(true))
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            rows.truncate(limit);
            Ok(rows)
        }

        fn rows_between(
            &self,
            _shop_id: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
            destination: Option<&Destination>,
        ) -> Result<Vec<ConversionLogRow>> {
            if self.fail {
                return Err(anyhow!("storage offline"));
            }
            Ok(self
                .rows
                .iter()
                .filter(|r| r.created_at >= start && r.created_at < end)
                .filter(|r| destination.map(|d| &r.destination == d).unwrap_or(true))
                .cloned()
                .collect())
        }

        fn append(&self, _row: &ConversionLogRow) -> Result<()> {
            unimplemented!("not used by these tests")
        }
    }

    fn row(
        id: &str,
        status: &str,
        value: Value,
        currency: Option<&str>,
        payload: Value,
        created_at: DateTime<Utc>,
    ) -> ConversionLogRow {
        ConversionLogRow {
            id: id.to_string(),
            shop_id: "shop_1".to_string(),
            event_type: "checkout_completed".to_string(),
            destination: Destination::Meta,
            status: status.to_string(),
            value,
            currency: currency.map(str::to_string),
            error_message: None,
            payload,
            created_at,
        }
    }

    #[test]
    fn payload_completeness_rounds_two_of_three_to_67() {
        let report = check_parameter_completeness(&json!({
            "data": {"value": 10, "currency": "USD", "items": []}
        }));
        assert!(report.has_value);
        assert!(report.has_currency);
        assert!(!report.has_items);
        assert_eq!(report.completeness_rate, 67);
        assert_eq!(report.missing_parameters, vec!["items"]);
    }

    #[test]
    fn payload_completeness_is_pure_and_idempotent() {
        let payload = json!({"data": {"value": "12.5", "items": [{"id": "a"}]}});
        let first = check_parameter_completeness(&payload);
        let second = check_parameter_completeness(&payload);
        assert_eq!(first.completeness_rate, second.completeness_rate);
        assert_eq!(first.missing_parameters, second.missing_parameters);
        assert!(first.has_value);
        assert!(first.has_items);
        assert!(!first.has_currency);
        assert_eq!(first.completeness_rate, 67);
    }

    #[test]
    fn zero_and_junk_values_do_not_count() {
        assert!(!check_parameter_completeness(&json!({"data": {"value": 0}})).has_value);
        assert!(!check_parameter_completeness(&json!({"data": {"value": "junk"}})).has_value);
        assert!(!check_parameter_completeness(&json!({})).has_value);
    }

    #[test]
    fn capture_scores_and_normalizes_statuses() {
        let now = Utc::now();
        let log = FixedLog {
            rows: vec![
                row("a", "sent", json!("25.00"), Some("USD"), Value::Null, now),
                row("b", "failed", json!(0), None, Value::Null, now - Duration::minutes(1)),
            ],
            fail: false,
        };

        let summary = capture_recent_events(
            &log,
            "shop_1",
            now - Duration::minutes(DEFAULT_CAPTURE_WINDOW_MINUTES),
            None,
        );
        assert_eq!(summary.total, 2);
        assert_eq!(summary.success, 1);
        assert_eq!(summary.failed, 1);
        // 67 (value+currency of three) and 0, mean rounds to 34.
        assert_eq!(summary.events[0].completeness_rate, 67);
        assert_eq!(summary.events[1].completeness_rate, 0);
        assert_eq!(summary.completeness_rate, 34);
        assert_eq!(summary.events[0].value, 25.0);
    }

    #[test]
    fn capture_on_unreadable_storage_is_empty_not_fatal() {
        let log = FixedLog {
            rows: Vec::new(),
            fail: true,
        };
        let summary = capture_recent_events(&log, "shop_1", Utc::now(), None);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.completeness_rate, 0);
    }

    #[test]
    fn statistics_average_double_counts_each_row() {
        let now = Utc::now();
        // Row columns score 100 (value+currency), payload scores 100
        // (value+currency+items): average stays 100.
        let full = row(
            "full",
            "sent",
            json!("30"),
            Some("USD"),
            json!({"data": {"value": 30, "currency": "USD", "items": [{"id": "x"}]}}),
            now,
        );
        // Row columns score 100, but the payload carries no data object and
        // scores 0; the double accumulation drags the average to 50 even
        // though every row-level parameter is present.
        let bare = row("bare", "sent", json!("30"), Some("USD"), Value::Null, now);

        let log = FixedLog {
            rows: vec![full, bare],
            fail: false,
        };
        let stats = event_statistics(
            &log,
            "shop_1",
            now - Duration::hours(1),
            now + Duration::hours(1),
            None,
        );
        assert_eq!(stats.total, 2);
        // (100 + 100 + 100 + 0) / 4
        assert_eq!(stats.average_completeness, 75);
        assert_eq!(stats.by_status.get("ok"), Some(&2));
        assert_eq!(stats.by_event_type.get("checkout_completed"), Some(&2));
        assert_eq!(stats.by_destination.get("meta"), Some(&2));
    }
}
