//! Line-item normalization shared by every destination payload.

use core_model::coerce;
use serde_json::Value;

/// Legacy identifier fields, first match wins.
const ID_FIELDS: &[&str] = &["id", "variant_id", "product_id"];

/// A line item reduced to the fields destination payloads agree on.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItem {
    pub id: String,
    pub quantity: i64,
    pub unit_price: f64,
}

/// Normalize captured line items. Items lacking any identifier are dropped;
/// quantity and price never go below 1 and 0.
pub fn normalize_items(items: &[Value]) -> Vec<NormalizedItem> {
    items.iter().filter_map(normalize_item).collect()
}

fn normalize_item(item: &Value) -> Option<NormalizedItem> {
    let id = ID_FIELDS
        .iter()
        .find_map(|field| coerce::non_empty_string(item.get(*field)))?;
    Some(NormalizedItem {
        id,
        quantity: coerce::quantity(item.get("quantity")),
        unit_price: coerce::unit_price(item.get("price")),
    })
}
