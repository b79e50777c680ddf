//! # Document Migrations
//!
//! Stored documents outlive the code that wrote them. Older documents lack
//! fields that were added later (archive flag, received quantities, cent
//! amounts) or use status names that were renamed. Each collection has a
//! migration function that upgrades one raw JSON document in place before
//! it is deserialized.
//!
//! ## Contract
//! - Input is the document exactly as stored.
//! - The function only adds or rewrites fields; it never drops business
//!   data except legacy keys it has just converted.
//! - Returns `true` when anything changed, so callers can write the
//!   upgraded document back.
//! - Running a migration on its own output is a no-op.

use chrono::Utc;
use serde_json::{Map, Value};

use crate::balance::Settlement;
use crate::money::Money;

type Doc = Map<String, Value>;

// =============================================================================
// Field Helpers
// =============================================================================

fn set_default(doc: &mut Doc, key: &str, value: Value) -> bool {
    if doc.get(key).map_or(true, Value::is_null) {
        doc.insert(key.to_string(), value);
        true
    } else {
        false
    }
}

fn int(doc: &Doc, key: &str) -> Option<i64> {
    match doc.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

fn float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Moves a legacy decimal amount (`unitPrice: 12.5`) into a cents field
/// (`unitPriceCents: 1250`), defaulting to zero when neither is present.
fn amount_to_cents(doc: &mut Doc, legacy_key: &str, cents_key: &str) -> bool {
    let legacy = doc.remove(legacy_key);
    if doc.get(cents_key).is_some_and(|v| !v.is_null()) {
        return legacy.is_some();
    }
    let cents = legacy
        .as_ref()
        .and_then(float)
        .map(|amount| Money::from_legacy_amount(amount).cents())
        .unwrap_or(0);
    doc.insert(cents_key.to_string(), Value::from(cents));
    true
}

/// Renames a key when only the legacy spelling is present.
fn rename(doc: &mut Doc, from: &str, to: &str) -> bool {
    if doc.contains_key(to) {
        return false;
    }
    match doc.remove(from) {
        Some(value) => {
            doc.insert(to.to_string(), value);
            true
        }
        None => false,
    }
}

/// Rewrites a status string through `map`, leaving unknown values alone.
fn map_status(doc: &mut Doc, map: &[(&str, &str)]) -> bool {
    let Some(Value::String(current)) = doc.get("status") else {
        return false;
    };
    let Some((_, to)) = map.iter().find(|(from, _)| from == current) else {
        return false;
    };
    doc.insert("status".to_string(), Value::String((*to).to_string()));
    true
}

fn lines_mut(doc: &mut Doc) -> impl Iterator<Item = &mut Doc> {
    doc.get_mut("lines")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

fn line_total(doc: &Doc, price_key: &str) -> Money {
    doc.get("lines")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .map(|line| {
            let qty = int(line, "quantity").unwrap_or(0);
            Money::from_cents(int(line, price_key).unwrap_or(0)).times(qty)
        })
        .sum()
}

fn set_if_different(doc: &mut Doc, key: &str, value: Value) -> bool {
    if doc.get(key) == Some(&value) {
        return false;
    }
    doc.insert(key.to_string(), value);
    true
}

/// Recomputes total, balance and payment status from lines and amount paid.
fn settle(doc: &mut Doc, price_key: &str) -> bool {
    let mut changed = amount_to_cents(doc, "amountPaid", "amountPaidCents");
    for legacy in ["total", "balance"] {
        changed |= doc.remove(legacy).is_some();
    }

    let paid = Money::from_cents(int(doc, "amountPaidCents").unwrap_or(0));
    let settlement = Settlement::new(line_total(doc, price_key), paid);

    changed |= set_if_different(doc, "totalCents", Value::from(settlement.total.cents()));
    changed |= set_if_different(doc, "balanceCents", Value::from(settlement.balance.cents()));
    changed |= set_if_different(
        doc,
        "paymentStatus",
        Value::String(settlement.status.to_string()),
    );
    changed
}

// =============================================================================
// Per-Collection Migrations
// =============================================================================

/// Fields every document carries: archive flag and both timestamps.
pub fn migrate_record(doc: &mut Value) -> bool {
    let Some(doc) = doc.as_object_mut() else {
        return false;
    };
    record_fields(doc)
}

fn record_fields(doc: &mut Doc) -> bool {
    let mut changed = false;

    if !doc.contains_key("archived") {
        let legacy = doc
            .remove("isArchived")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        doc.insert("archived".to_string(), Value::Bool(legacy));
        changed = true;
    }

    let created = doc.get("createdAt").filter(|v| v.is_string()).cloned();
    let updated = doc.get("updatedAt").filter(|v| v.is_string()).cloned();
    match (created, updated) {
        (Some(_), Some(_)) => {}
        (Some(created), None) => {
            doc.insert("updatedAt".to_string(), created);
            changed = true;
        }
        (None, Some(updated)) => {
            doc.insert("createdAt".to_string(), updated);
            changed = true;
        }
        (None, None) => {
            let now = Value::String(Utc::now().to_rfc3339());
            doc.insert("createdAt".to_string(), now.clone());
            doc.insert("updatedAt".to_string(), now);
            changed = true;
        }
    }

    changed
}

/// Inventory items.
///
/// Early documents only tracked `quantity` and `reorderLevel`. The purchase
/// and sale counters are reconstructed from those: at least `reorderLevel`
/// units (or everything on hand, if more) must have been bought, and
/// whatever was bought but is no longer on hand was sold.
pub fn migrate_inventory(doc: &mut Value) -> bool {
    let Some(doc) = doc.as_object_mut() else {
        return false;
    };
    let mut changed = record_fields(doc);

    let quantity = int(doc, "quantity").unwrap_or(0).max(0);
    let reorder = int(doc, "reorderLevel").unwrap_or(0).max(0);
    changed |= set_default(doc, "quantity", Value::from(quantity));
    changed |= set_default(doc, "reorderLevel", Value::from(reorder));

    if doc.get("quantityPurchased").map_or(true, Value::is_null) {
        let purchased = reorder.max(quantity);
        doc.insert("quantityPurchased".to_string(), Value::from(purchased));
        changed = true;
    }
    if doc.get("quantitySold").map_or(true, Value::is_null) {
        let purchased = int(doc, "quantityPurchased").unwrap_or(0);
        doc.insert(
            "quantitySold".to_string(),
            Value::from((purchased - quantity).max(0)),
        );
        changed = true;
    }

    changed |= amount_to_cents(doc, "unitPrice", "unitPriceCents");
    changed |= amount_to_cents(doc, "costPrice", "costPriceCents");
    changed
}

const PURCHASE_STATUS_MAP: &[(&str, &str)] = &[
    ("Pending", "Pending Approval"),
    ("PendingApproval", "Pending Approval"),
    ("PartiallyReceived", "Partially Received"),
    ("Completed", "Received"),
];

/// Purchase orders: line receipts, cent amounts, balance and status names.
pub fn migrate_purchase_order(doc: &mut Value) -> bool {
    let Some(doc) = doc.as_object_mut() else {
        return false;
    };
    let mut changed = record_fields(doc);
    changed |= rename(doc, "items", "lines");
    changed |= set_default(doc, "lines", Value::Array(Vec::new()));
    changed |= set_default(doc, "status", Value::String("Draft".to_string()));
    changed |= map_status(doc, PURCHASE_STATUS_MAP);

    for line in lines_mut(doc) {
        changed |= set_default(line, "quantityReceived", Value::from(0));
        changed |= rename(line, "unitPrice", "unitCost");
        changed |= amount_to_cents(line, "unitCost", "unitCostCents");
    }

    changed |= settle(doc, "unitCostCents");
    changed
}

const SALES_STATUS_MAP: &[(&str, &str)] = &[
    ("Pending", "Draft"),
    ("PartiallyShipped", "Partially Shipped"),
    ("Completed", "Delivered"),
];

/// Sales orders: line shipments, cent amounts, balance and status names.
pub fn migrate_sales_order(doc: &mut Value) -> bool {
    let Some(doc) = doc.as_object_mut() else {
        return false;
    };
    let mut changed = record_fields(doc);
    changed |= rename(doc, "items", "lines");
    changed |= set_default(doc, "lines", Value::Array(Vec::new()));
    changed |= set_default(doc, "status", Value::String("Draft".to_string()));
    changed |= map_status(doc, SALES_STATUS_MAP);

    for line in lines_mut(doc) {
        changed |= set_default(line, "quantityShipped", Value::from(0));
        changed |= amount_to_cents(line, "unitPrice", "unitPriceCents");
    }

    changed |= settle(doc, "unitPriceCents");
    changed
}

/// Customer orders: cent prices, recomputed total, status names.
pub fn migrate_order(doc: &mut Value) -> bool {
    let Some(doc) = doc.as_object_mut() else {
        return false;
    };
    let mut changed = record_fields(doc);
    changed |= rename(doc, "items", "lines");
    changed |= map_status(doc, &[("Completed", "Delivered")]);

    for line in lines_mut(doc) {
        changed |= amount_to_cents(line, "unitPrice", "unitPriceCents");
    }

    changed |= doc.remove("total").is_some();
    let total = line_total(doc, "unitPriceCents").cents();
    changed |= set_if_different(doc, "totalCents", Value::from(total));
    changed
}

/// Payment transactions: cent amount, order kind and payment date.
pub fn migrate_payment(doc: &mut Value) -> bool {
    let Some(doc) = doc.as_object_mut() else {
        return false;
    };
    let mut changed = record_fields(doc);
    changed |= amount_to_cents(doc, "amount", "amountCents");
    changed |= rename(doc, "date", "paidAt");

    if !doc.contains_key("orderKind") {
        let kind = match doc.remove("orderType").as_ref().and_then(Value::as_str) {
            Some("sale" | "sales" | "salesOrder") => "salesOrder",
            _ => "purchaseOrder",
        };
        doc.insert("orderKind".to_string(), Value::String(kind.to_string()));
        changed = true;
    }
    changed
}

/// Cash transactions: cent amount, direction and date.
pub fn migrate_cash_transaction(doc: &mut Value) -> bool {
    let Some(doc) = doc.as_object_mut() else {
        return false;
    };
    let mut changed = record_fields(doc);
    changed |= amount_to_cents(doc, "amount", "amountCents");
    changed |= rename(doc, "date", "occurredAt");

    if !doc.contains_key("kind") {
        let kind = match doc.remove("type").as_ref().and_then(Value::as_str) {
            Some("out" | "withdrawal" | "expense") => "withdrawal",
            _ => "deposit",
        };
        doc.insert("kind".to_string(), Value::String(kind.to_string()));
        changed = true;
    }
    if let Some(Value::String(account)) = doc.get("account") {
        let lowered = account.to_ascii_lowercase();
        if lowered != *account {
            doc.insert("account".to_string(), Value::String(lowered));
            changed = true;
        }
    }
    changed
}

/// Users: active flag, lower-case role, display name.
pub fn migrate_user(doc: &mut Value) -> bool {
    let Some(doc) = doc.as_object_mut() else {
        return false;
    };
    let mut changed = record_fields(doc);
    changed |= set_default(doc, "active", Value::Bool(true));
    changed |= rename(doc, "name", "displayName");

    if let Some(Value::String(role)) = doc.get("role") {
        let lowered = role.to_ascii_lowercase();
        if lowered != *role {
            doc.insert("role".to_string(), Value::String(lowered));
            changed = true;
        }
    }
    changed
}
