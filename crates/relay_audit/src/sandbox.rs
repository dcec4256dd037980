//! Advisory classification of verification discrepancies against known
//! capture-sandbox restrictions.
//!
//! Everything here is pure text production for an operator: the rules
//! distinguish "the sandbox was never going to show this" from "this looks
//! like a genuine delivery defect".

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Event types the capture sandbox never emits.
const UNAVAILABLE_EVENT_TYPES: &[&str] = &[
    "refund",
    "order_edited",
    "subscription_created",
    "subscription_updated",
    "subscription_cancelled",
];

/// Buyer fields the sandbox withholds from checkout events.
const RESTRICTED_CHECKOUT_FIELDS: &[&str] =
    &["email", "phone", "billing_address", "shipping_address"];

const CHECKOUT_EVENT_TYPES: &[&str] = &[
    "checkout_started",
    "checkout_completed",
    "payment_info_submitted",
];

/// `<field> [is|was] missing|null|undefined` in free-text discrepancy notes.
static MISSING_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([a-z][a-z0-9_.]*)\s+(?:is\s+|was\s+)?(?:missing|null|undefined)\b")
        .expect("missing-field pattern must compile")
});

/// Outcome of verifying one captured event against its delivery, as produced
/// by the verification flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub event_type: String,
    pub success: bool,
    /// Free-text notes, one per mismatched or absent parameter.
    #[serde(default)]
    pub discrepancies: Vec<String>,
    pub value_captured: Option<f64>,
}

/// Map a verification result onto known sandbox limitations, in rule order.
/// The output is deduplicated but otherwise keeps discovery order; the
/// function never fails and has no side effects.
pub fn event_sandbox_limitations(result: &VerificationResult) -> Vec<String> {
    let mut limitations: Vec<String> = Vec::new();
    let event_type = result.event_type.as_str();

    // Entirely unavailable event types short-circuit every other rule.
    if UNAVAILABLE_EVENT_TYPES.contains(&event_type) {
        limitations.push(format!(
            "`{event_type}` events are not emitted in the capture sandbox; \
             this result cannot be verified there"
        ));
        return limitations;
    }

    let is_checkout = CHECKOUT_EVENT_TYPES.contains(&event_type);
    if is_checkout {
        let flagged: Vec<&str> = RESTRICTED_CHECKOUT_FIELDS
            .iter()
            .copied()
            .filter(|field| {
                result
                    .discrepancies
                    .iter()
                    .any(|note| note.contains(field))
            })
            .collect();
        if !flagged.is_empty() {
            limitations.push(format!(
                "known sandbox restriction: checkout events cannot observe {}",
                flagged.join(", ")
            ));
        } else if !result.success {
            limitations.push(
                "checkout buyer fields (email, phone, addresses) may be withheld by the \
                 sandbox; this failure is not necessarily a delivery defect"
                    .to_string(),
            );
        } else {
            limitations.push(
                "checkout buyer fields may be null in the sandbox even on successful delivery"
                    .to_string(),
            );
        }
    }

    for note in &result.discrepancies {
        for field in extract_missing_fields(note) {
            if is_checkout && RESTRICTED_CHECKOUT_FIELDS.contains(&field.as_str()) {
                continue;
            }
            limitations.push(format!(
                "field `{field}` was reported missing but is not a known sandbox restriction"
            ));
        }
    }

    if is_checkout && result.value_captured.unwrap_or(0.0) <= 0.0 && !result.success {
        limitations
            .push("no monetary value was captured for this checkout event".to_string());
    }

    dedup_preserving_order(limitations)
}

fn extract_missing_fields(note: &str) -> Vec<String> {
    MISSING_FIELD
        .captures_iter(note)
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
        .filter(|field| !matches!(field.as_str(), "is" | "was" | "value"))
        .collect()
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
