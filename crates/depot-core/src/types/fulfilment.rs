//! Customer orders and shipments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use ts_rs::TS;

use crate::entity::{Collection, Entity, Record};
use crate::error::{CoreError, CoreResult};
use crate::lifecycle::{Lifecycle, Workflow};
use crate::migration;
use crate::money::Money;
use crate::validation::{
    validate_amount, validate_code, validate_name, validate_quantity, validate_required,
    ValidationResult,
};

/// An item id with a quantity; used for receipts and shipment contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineQuantity {
    pub item_id: String,
    pub quantity: i64,
}

impl LineQuantity {
    pub fn new(item_id: impl Into<String>, quantity: i64) -> Self {
        LineQuantity {
            item_id: item_id.into(),
            quantity,
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Status of a customer order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl Lifecycle for OrderStatus {
    fn allowed_next(&self) -> &'static [Self] {
        use OrderStatus::*;
        match self {
            Pending => &[Processing, Cancelled],
            Processing => &[Shipped, Cancelled],
            Shipped => &[Delivered],
            Delivered | Cancelled => &[],
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

// =============================================================================
// Order
// =============================================================================

/// One line of a customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub item_id: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub name: String,
    pub quantity: i64,
    #[serde(default)]
    pub unit_price_cents: i64,
}

impl OrderLine {
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).times(self.quantity)
    }
}

/// A lightweight customer order (web-shop or phone order) tracked through
/// fulfilment without the approval and payment bookkeeping of a sales order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(flatten)]
    pub record: Record,

    pub order_number: String,

    #[serde(default)]
    pub customer_id: Option<String>,

    #[serde(default)]
    pub lines: Vec<OrderLine>,

    #[serde(default)]
    pub status: OrderStatus,

    #[serde(default)]
    pub total_cents: i64,

    #[serde(default)]
    pub shipping_address: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,

    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub shipped_at: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(order_number: impl Into<String>) -> Self {
        Order {
            record: Record::new(),
            order_number: order_number.into(),
            customer_id: None,
            lines: Vec::new(),
            status: OrderStatus::Pending,
            total_cents: 0,
            shipping_address: None,
            notes: None,
            shipped_at: None,
            delivered_at: None,
        }
    }

    pub fn total(&self) -> Money {
        self.lines.iter().map(OrderLine::line_total).sum()
    }
}

impl Entity for Order {
    const COLLECTION: Collection = Collection::Orders;
    const LABEL: &'static str = "Order";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn reset_for_create(&mut self) {
        self.status = OrderStatus::Pending;
        self.shipped_at = None;
        self.delivered_at = None;
    }

    /// Header fields are always editable; lines only while Pending. Status
    /// and its timestamps only move through `transition`.
    fn merge_update(&self, incoming: Self) -> CoreResult<Self> {
        let mut merged = self.clone();
        if incoming.lines != self.lines {
            if self.status != OrderStatus::Pending {
                return Err(CoreError::invalid_state(
                    Self::LABEL,
                    self.id(),
                    format!("lines cannot be changed while {}", self.status),
                ));
            }
            merged.lines = incoming.lines;
        }
        merged.order_number = incoming.order_number;
        merged.customer_id = incoming.customer_id;
        merged.shipping_address = incoming.shipping_address;
        merged.notes = incoming.notes;
        Ok(merged)
    }

    fn normalize(&mut self) {
        self.total_cents = self.total().cents();
    }

    fn validate(&self) -> ValidationResult<()> {
        validate_code("orderNumber", &self.order_number)?;
        for line in &self.lines {
            validate_required("lines.itemId", &line.item_id, 64)?;
            validate_quantity("lines.quantity", line.quantity)?;
            validate_amount("lines.unitPriceCents", line.unit_price_cents)?;
        }
        validate_amount("totalCents", self.total().cents())
    }

    fn unique_key(&self) -> Option<(&'static str, String)> {
        Some(("orderNumber", self.order_number.trim().to_string()))
    }

    fn migrate(doc: &mut Value) -> bool {
        migration::migrate_order(doc)
    }
}

impl Workflow for Order {
    type Status = OrderStatus;

    fn status(&self) -> OrderStatus {
        self.status
    }

    fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }

    fn on_enter(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        match status {
            OrderStatus::Shipped => self.shipped_at = Some(at),
            OrderStatus::Delivered => self.delivered_at = Some(at),
            _ => {}
        }
    }
}

// =============================================================================
// Shipment
// =============================================================================

/// Status of a shipment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ShipmentStatus {
    #[default]
    Pending,
    #[serde(rename = "In Transit")]
    InTransit,
    Delivered,
    Returned,
    Cancelled,
}

impl Lifecycle for ShipmentStatus {
    fn allowed_next(&self) -> &'static [Self] {
        use ShipmentStatus::*;
        match self {
            Pending => &[InTransit, Cancelled],
            InTransit => &[Delivered, Returned],
            Delivered => &[Returned],
            Returned | Cancelled => &[],
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Returned | ShipmentStatus::Cancelled)
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ShipmentStatus::Pending => "Pending",
            ShipmentStatus::InTransit => "In Transit",
            ShipmentStatus::Delivered => "Delivered",
            ShipmentStatus::Returned => "Returned",
            ShipmentStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

/// A consignment leaving the warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    #[serde(flatten)]
    pub record: Record,

    #[serde(default)]
    pub carrier: Option<String>,

    #[serde(default)]
    pub tracking_number: Option<String>,

    /// Customer order this shipment fulfils, if any.
    #[serde(default)]
    pub order_id: Option<String>,

    /// Sales order this shipment fulfils, if any.
    #[serde(default)]
    pub sales_order_id: Option<String>,

    pub destination: String,

    #[serde(default)]
    pub lines: Vec<LineQuantity>,

    #[serde(default)]
    pub status: ShipmentStatus,

    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub shipped_at: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Shipment {
    pub fn new(destination: impl Into<String>) -> Self {
        Shipment {
            record: Record::new(),
            carrier: None,
            tracking_number: None,
            order_id: None,
            sales_order_id: None,
            destination: destination.into(),
            lines: Vec::new(),
            status: ShipmentStatus::Pending,
            shipped_at: None,
            delivered_at: None,
        }
    }
}

impl Entity for Shipment {
    const COLLECTION: Collection = Collection::Shipments;
    const LABEL: &'static str = "Shipment";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn reset_for_create(&mut self) {
        self.status = ShipmentStatus::Pending;
        self.shipped_at = None;
        self.delivered_at = None;
    }

    /// Routing details are always editable. Contents are fixed once the
    /// shipment leaves or when a sales order shipped them; the sales order
    /// link and the status never come from an edit.
    fn merge_update(&self, incoming: Self) -> CoreResult<Self> {
        let mut merged = self.clone();
        if incoming.lines != self.lines {
            if self.status != ShipmentStatus::Pending || self.sales_order_id.is_some() {
                return Err(CoreError::invalid_state(
                    Self::LABEL,
                    self.id(),
                    format!("contents cannot be changed while {}", self.status),
                ));
            }
            merged.lines = incoming.lines;
        }
        merged.destination = incoming.destination;
        merged.carrier = incoming.carrier;
        merged.tracking_number = incoming.tracking_number;
        merged.order_id = incoming.order_id;
        Ok(merged)
    }

    fn validate(&self) -> ValidationResult<()> {
        validate_name("destination", &self.destination)?;
        for line in &self.lines {
            validate_quantity("lines.quantity", line.quantity)?;
        }
        Ok(())
    }
}

impl Workflow for Shipment {
    type Status = ShipmentStatus;

    fn status(&self) -> ShipmentStatus {
        self.status
    }

    fn set_status(&mut self, status: ShipmentStatus) {
        self.status = status;
    }

    fn on_enter(&mut self, status: ShipmentStatus, at: DateTime<Utc>) {
        match status {
            ShipmentStatus::InTransit => self.shipped_at = Some(at),
            ShipmentStatus::Delivered => self.delivered_at = Some(at),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::transition;

    #[test]
    fn test_order_total_is_normalized() {
        let mut order = Order::new("ORD-1001");
        order.lines.push(OrderLine {
            item_id: "a".to_string(),
            sku: "A".to_string(),
            name: "Widget".to_string(),
            quantity: 3,
            unit_price_cents: 250,
        });
        order.normalize();
        assert_eq!(order.total_cents, 750);
    }

    #[test]
    fn test_order_lifecycle() {
        let mut order = Order::new("ORD-1001");
        transition(&mut order, OrderStatus::Processing).unwrap();
        transition(&mut order, OrderStatus::Shipped).unwrap();
        assert!(order.shipped_at.is_some());

        let err = transition(&mut order, OrderStatus::Cancelled).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));

        transition(&mut order, OrderStatus::Delivered).unwrap();
        assert!(order.status.is_terminal());
    }

    #[test]
    fn test_shipment_status_serializes_with_space() {
        let json = serde_json::to_value(ShipmentStatus::InTransit).unwrap();
        assert_eq!(json, Value::String("In Transit".to_string()));
        assert_eq!(ShipmentStatus::InTransit.to_string(), "In Transit");
    }

    #[test]
    fn test_shipment_return_after_delivery() {
        let mut shipment = Shipment::new("Dock 4, Rotterdam");
        transition(&mut shipment, ShipmentStatus::InTransit).unwrap();
        transition(&mut shipment, ShipmentStatus::Delivered).unwrap();
        transition(&mut shipment, ShipmentStatus::Returned).unwrap();
        assert!(shipment.status.is_terminal());
        assert!(shipment.delivered_at.is_some());
    }

    #[test]
    fn test_order_edit_keeps_status() {
        let mut stored = Order::new("ORD-1001");
        transition(&mut stored, OrderStatus::Processing).unwrap();

        let mut edit = stored.clone();
        edit.status = OrderStatus::Delivered;
        edit.delivered_at = Some(Utc::now());
        edit.notes = Some("leave at gate".to_string());

        let merged = stored.merge_update(edit).unwrap();
        assert_eq!(merged.status, OrderStatus::Processing);
        assert!(merged.delivered_at.is_none());
        assert_eq!(merged.notes.as_deref(), Some("leave at gate"));
    }

    #[test]
    fn test_order_lines_locked_after_pending() {
        let mut stored = Order::new("ORD-1001");
        transition(&mut stored, OrderStatus::Processing).unwrap();
        let mut edit = stored.clone();
        edit.lines.push(OrderLine {
            item_id: "a".to_string(),
            sku: String::new(),
            name: String::new(),
            quantity: 1,
            unit_price_cents: 0,
        });
        let err = stored.merge_update(edit).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));
    }

    #[test]
    fn test_shipment_edit_keeps_status_and_link() {
        let mut stored = Shipment::new("Dock 4");
        stored.sales_order_id = Some("so-1".to_string());
        stored.lines.push(LineQuantity::new("a", 2));

        let mut edit = stored.clone();
        edit.status = ShipmentStatus::Returned;
        edit.sales_order_id = None;
        edit.carrier = Some("DHL".to_string());

        let merged = stored.merge_update(edit).unwrap();
        assert_eq!(merged.status, ShipmentStatus::Pending);
        assert_eq!(merged.sales_order_id.as_deref(), Some("so-1"));
        assert_eq!(merged.carrier.as_deref(), Some("DHL"));

        let mut edit = stored.clone();
        edit.lines[0].quantity = 20;
        assert!(stored.merge_update(edit).is_err());
    }

    #[test]
    fn test_reset_for_create() {
        let mut order = Order::new("ORD-1");
        order.status = OrderStatus::Delivered;
        order.delivered_at = Some(Utc::now());
        order.reset_for_create();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.delivered_at.is_none());

        let mut shipment = Shipment::new("Dock 1");
        shipment.status = ShipmentStatus::Returned;
        shipment.shipped_at = Some(Utc::now());
        shipment.reset_for_create();
        assert_eq!(shipment.status, ShipmentStatus::Pending);
        assert!(shipment.shipped_at.is_none());
    }
}
