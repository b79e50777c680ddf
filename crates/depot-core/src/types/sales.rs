//! # Sales Orders
//!
//! ## Lifecycle
//! ```text
//!   ┌───────┐ confirm ┌───────────┐  ship   ┌───────────────────┐
//!   │ Draft │ ──────► │ Confirmed │ ──────► │ Partially Shipped │ ─┐ ship
//!   └───┬───┘         └─────┬─────┘         └───────────────────┘  │
//!       │                   │ ship (everything)                    ▼
//!       │                   └──────────────────────────────► ┌─────────┐
//!       │ cancel                                             │ Shipped │
//!       ▼                                                    └────┬────┘
//!   ┌───────────┐ ◄── cancel (Confirmed, nothing shipped)         │ deliver
//!   │ Cancelled │                                            ┌────▼──────┐
//!   └───────────┘                                            │ Delivered │
//!                                                            └───────────┘
//! ```
//!
//! Confirming checks stock for every line. Shipping takes stock out of
//! inventory and produces a [`Shipment`] for the goods that left.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use ts_rs::TS;

use crate::balance::{Payable, Settlement};
use crate::entity::{Collection, Entity, Record};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::lifecycle::{ensure_live, settle_status, transition, Lifecycle, Workflow};
use crate::migration;
use crate::money::Money;
use crate::types::{
    InventoryItem, LineQuantity, OrderKind, PaymentStatus, Shipment, ShipmentStatus,
};
use crate::validation::{
    validate_amount, validate_code, validate_non_negative, validate_quantity, validate_required,
    ValidationResult,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum SalesOrderStatus {
    #[default]
    Draft,
    Confirmed,
    #[serde(rename = "Partially Shipped")]
    PartiallyShipped,
    Shipped,
    Delivered,
    Cancelled,
}

impl SalesOrderStatus {
    pub fn allows_line_edits(&self) -> bool {
        matches!(self, SalesOrderStatus::Draft)
    }

    pub fn accepts_shipments(&self) -> bool {
        matches!(
            self,
            SalesOrderStatus::Confirmed | SalesOrderStatus::PartiallyShipped
        )
    }
}

impl Lifecycle for SalesOrderStatus {
    fn allowed_next(&self) -> &'static [Self] {
        use SalesOrderStatus::*;
        match self {
            Draft => &[Confirmed, Cancelled],
            Confirmed => &[Cancelled],
            Shipped => &[Delivered],
            PartiallyShipped | Delivered | Cancelled => &[],
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, SalesOrderStatus::Delivered | SalesOrderStatus::Cancelled)
    }
}

impl fmt::Display for SalesOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SalesOrderStatus::Draft => "Draft",
            SalesOrderStatus::Confirmed => "Confirmed",
            SalesOrderStatus::PartiallyShipped => "Partially Shipped",
            SalesOrderStatus::Shipped => "Shipped",
            SalesOrderStatus::Delivered => "Delivered",
            SalesOrderStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrderLine {
    pub item_id: String,

    #[serde(default)]
    pub sku: String,

    #[serde(default)]
    pub name: String,

    pub quantity: i64,

    #[serde(default)]
    pub quantity_shipped: i64,

    #[serde(default)]
    pub unit_price_cents: i64,
}

impl SalesOrderLine {
    pub fn new(item_id: impl Into<String>, quantity: i64, unit_price: Money) -> Self {
        SalesOrderLine {
            item_id: item_id.into(),
            sku: String::new(),
            name: String::new(),
            quantity,
            quantity_shipped: 0,
            unit_price_cents: unit_price.cents(),
        }
    }

    pub fn remaining(&self) -> i64 {
        (self.quantity - self.quantity_shipped).max(0)
    }

    pub fn is_complete(&self) -> bool {
        self.quantity_shipped >= self.quantity
    }

    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).times(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrder {
    #[serde(flatten)]
    pub record: Record,

    pub so_number: String,

    pub customer_id: String,

    #[serde(default)]
    pub lines: Vec<SalesOrderLine>,

    #[serde(default)]
    pub status: SalesOrderStatus,

    #[serde(default)]
    pub total_cents: i64,

    #[serde(default)]
    pub amount_paid_cents: i64,

    #[serde(default)]
    pub balance_cents: i64,

    #[serde(default)]
    pub payment_status: PaymentStatus,

    #[serde(default)]
    pub shipping_address: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,

    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub shipped_at: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl SalesOrder {
    pub fn new(so_number: impl Into<String>, customer_id: impl Into<String>) -> Self {
        SalesOrder {
            record: Record::new(),
            so_number: so_number.into(),
            customer_id: customer_id.into(),
            lines: Vec::new(),
            status: SalesOrderStatus::Draft,
            total_cents: 0,
            amount_paid_cents: 0,
            balance_cents: 0,
            payment_status: PaymentStatus::Unpaid,
            shipping_address: None,
            notes: None,
            confirmed_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
        }
    }

    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    pub fn total_shipped(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity_shipped).sum()
    }

    /// Draft → Confirmed once every line can be supplied from `stock`.
    pub fn confirm(&mut self, stock: &[InventoryItem]) -> CoreResult<()> {
        ensure_live(self)?;
        if self.status.allows(SalesOrderStatus::Confirmed) {
            for line in &self.lines {
                check_stock(stock, &line.item_id, line.remaining())?;
            }
        }
        transition(self, SalesOrderStatus::Confirmed)
    }

    /// Shipped → Delivered.
    pub fn deliver(&mut self) -> CoreResult<()> {
        ensure_live(self)?;
        transition(self, SalesOrderStatus::Delivered)
    }

    pub fn cancel(&mut self) -> CoreResult<()> {
        ensure_live(self)?;
        transition(self, SalesOrderStatus::Cancelled)
    }

    /// Books goods leaving the warehouse against the order lines.
    ///
    /// Entries for the same item are added together. Stock is checked
    /// against `stock` but not changed; the returned quantities are what
    /// the caller takes out of inventory. Nothing is applied unless every
    /// entry is valid.
    pub fn ship(
        &mut self,
        request: &[LineQuantity],
        stock: &[InventoryItem],
    ) -> CoreResult<Vec<LineQuantity>> {
        ensure_live(self)?;
        if !self.status.accepts_shipments() {
            return Err(CoreError::invalid_state(
                Self::LABEL,
                self.id(),
                format!("cannot ship while {}", self.status),
            ));
        }
        if request.is_empty() {
            return Err(ValidationError::Required {
                field: "lines".to_string(),
            }
            .into());
        }

        let mut requested: BTreeMap<usize, i64> = BTreeMap::new();
        for entry in request {
            validate_quantity("quantity", entry.quantity)?;
            let index = self
                .lines
                .iter()
                .position(|l| l.item_id == entry.item_id)
                .ok_or_else(|| CoreError::not_found("Sales order line", &entry.item_id))?;
            let total = requested.entry(index).or_default();
            *total = total.saturating_add(entry.quantity);
        }

        for (&index, &quantity) in &requested {
            let line = &self.lines[index];
            if quantity > line.remaining() {
                return Err(CoreError::OverReceipt {
                    order: self.so_number.clone(),
                    line: index + 1,
                    remaining: line.remaining(),
                    requested: quantity,
                });
            }
            check_stock(stock, &line.item_id, quantity)?;
        }

        let mut shipped = Vec::with_capacity(requested.len());
        for (index, quantity) in requested {
            let line = &mut self.lines[index];
            line.quantity_shipped += quantity;
            shipped.push(LineQuantity::new(line.item_id.clone(), quantity));
        }

        let next = if self.lines.iter().all(SalesOrderLine::is_complete) {
            SalesOrderStatus::Shipped
        } else {
            SalesOrderStatus::PartiallyShipped
        };
        settle_status(self, next);
        Ok(shipped)
    }

    /// The shipment record for goods just shipped from this order. It
    /// starts in transit.
    pub fn shipment_for(
        &self,
        lines: Vec<LineQuantity>,
        destination: impl Into<String>,
        carrier: Option<String>,
        tracking_number: Option<String>,
    ) -> Shipment {
        let mut shipment = Shipment::new(destination);
        shipment.sales_order_id = Some(self.id().to_string());
        shipment.lines = lines;
        shipment.carrier = carrier;
        shipment.tracking_number = tracking_number;
        shipment.status = ShipmentStatus::InTransit;
        shipment.shipped_at = Some(Utc::now());
        shipment
    }
}

fn check_stock(stock: &[InventoryItem], item_id: &str, requested: i64) -> CoreResult<()> {
    let item = stock
        .iter()
        .find(|i| i.record.id == item_id)
        .ok_or_else(|| CoreError::not_found(InventoryItem::LABEL, item_id))?;
    if !item.can_supply(requested) {
        return Err(CoreError::InsufficientStock {
            sku: item.sku.clone(),
            available: item.quantity,
            requested,
        });
    }
    Ok(())
}

impl Entity for SalesOrder {
    const COLLECTION: Collection = Collection::SalesOrders;
    const LABEL: &'static str = "Sales order";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn reset_for_create(&mut self) {
        self.status = SalesOrderStatus::Draft;
        for line in &mut self.lines {
            line.quantity_shipped = 0;
        }
        self.amount_paid_cents = 0;
        self.confirmed_at = None;
        self.shipped_at = None;
        self.delivered_at = None;
        self.cancelled_at = None;
    }

    fn merge_update(&self, incoming: Self) -> CoreResult<Self> {
        let mut merged = self.clone();
        if incoming.lines != self.lines {
            if !self.status.allows_line_edits() {
                return Err(CoreError::invalid_state(
                    Self::LABEL,
                    self.id(),
                    format!("lines cannot be changed while {}", self.status),
                ));
            }
            merged.lines = incoming
                .lines
                .into_iter()
                .map(|mut line| {
                    line.quantity_shipped = 0;
                    line
                })
                .collect();
        }
        merged.so_number = incoming.so_number;
        merged.customer_id = incoming.customer_id;
        merged.shipping_address = incoming.shipping_address;
        merged.notes = incoming.notes;
        Ok(merged)
    }

    fn normalize(&mut self) {
        let settlement = Settlement::new(self.total(), self.amount_paid());
        self.apply_settlement(&settlement);
    }

    fn validate(&self) -> ValidationResult<()> {
        validate_code("soNumber", &self.so_number)?;
        validate_required("customerId", &self.customer_id, 64)?;

        let mut seen = HashSet::new();
        for line in &self.lines {
            validate_required("lines.itemId", &line.item_id, 64)?;
            validate_quantity("lines.quantity", line.quantity)?;
            validate_non_negative("lines.quantityShipped", line.quantity_shipped)?;
            validate_amount("lines.unitPriceCents", line.unit_price_cents)?;
            if line.quantity_shipped > line.quantity {
                return Err(ValidationError::OutOfRange {
                    field: "lines.quantityShipped".to_string(),
                    min: 0,
                    max: line.quantity,
                });
            }
            if !seen.insert(line.item_id.as_str()) {
                return Err(ValidationError::Duplicate {
                    field: "lines.itemId".to_string(),
                    value: line.item_id.clone(),
                });
            }
        }
        validate_amount("totalCents", self.total().cents())
    }

    fn unique_key(&self) -> Option<(&'static str, String)> {
        Some(("soNumber", self.so_number.trim().to_string()))
    }

    fn migrate(doc: &mut Value) -> bool {
        migration::migrate_sales_order(doc)
    }
}

impl Workflow for SalesOrder {
    type Status = SalesOrderStatus;

    fn status(&self) -> SalesOrderStatus {
        self.status
    }

    fn set_status(&mut self, status: SalesOrderStatus) {
        self.status = status;
    }

    fn guard(&self, to: SalesOrderStatus) -> CoreResult<()> {
        match to {
            SalesOrderStatus::Confirmed if self.lines.is_empty() => Err(CoreError::invalid_state(
                Self::LABEL,
                self.id(),
                "cannot confirm an order without lines",
            )),
            SalesOrderStatus::Cancelled if self.total_shipped() > 0 => {
                Err(CoreError::invalid_state(
                    Self::LABEL,
                    self.id(),
                    "goods have already been shipped",
                ))
            }
            _ => Ok(()),
        }
    }

    fn on_enter(&mut self, status: SalesOrderStatus, at: DateTime<Utc>) {
        match status {
            SalesOrderStatus::Confirmed => self.confirmed_at = Some(at),
            SalesOrderStatus::Shipped => self.shipped_at = Some(at),
            SalesOrderStatus::Delivered => self.delivered_at = Some(at),
            SalesOrderStatus::Cancelled => self.cancelled_at = Some(at),
            SalesOrderStatus::Draft | SalesOrderStatus::PartiallyShipped => {}
        }
    }
}

impl Payable for SalesOrder {
    const KIND: OrderKind = OrderKind::SalesOrder;

    fn total(&self) -> Money {
        self.lines.iter().map(SalesOrderLine::line_total).sum()
    }

    fn apply_settlement(&mut self, settlement: &Settlement) {
        self.total_cents = settlement.total.cents();
        self.amount_paid_cents = settlement.amount_paid.cents();
        self.balance_cents = settlement.balance.cents();
        self.payment_status = settlement.status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(id: &str, quantity: i64) -> InventoryItem {
        let mut item = InventoryItem::new(format!("SKU-{id}"), format!("Item {id}"));
        item.record.id = id.to_string();
        item.quantity = quantity;
        item
    }

    fn draft() -> SalesOrder {
        let mut so = SalesOrder::new("SO-1001", "cust-1");
        so.lines.push(SalesOrderLine::new("a", 5, Money::from_cents(1000)));
        so.lines.push(SalesOrderLine::new("b", 2, Money::from_cents(250)));
        so
    }

    #[test]
    fn test_confirm_checks_stock() {
        let mut so = draft();
        let err = so.confirm(&[stock("a", 5), stock("b", 1)]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 1, requested: 2, .. }
        ));
        assert_eq!(so.status, SalesOrderStatus::Draft);

        so.confirm(&[stock("a", 5), stock("b", 2)]).unwrap();
        assert_eq!(so.status, SalesOrderStatus::Confirmed);
        assert!(so.confirmed_at.is_some());
    }

    #[test]
    fn test_confirm_unknown_item() {
        let mut so = draft();
        let err = so.confirm(&[stock("a", 5)]).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_partial_then_full_shipment() {
        let mut so = draft();
        let items = [stock("a", 10), stock("b", 10)];
        so.confirm(&items).unwrap();

        let shipped = so.ship(&[LineQuantity::new("a", 3)], &items).unwrap();
        assert_eq!(shipped, vec![LineQuantity::new("a", 3)]);
        assert_eq!(so.status, SalesOrderStatus::PartiallyShipped);
        assert!(so.cancel().is_err());

        so.ship(&[LineQuantity::new("a", 2), LineQuantity::new("b", 2)], &items)
            .unwrap();
        assert_eq!(so.status, SalesOrderStatus::Shipped);
        assert!(so.shipped_at.is_some());

        so.deliver().unwrap();
        assert!(so.status.is_terminal());
    }

    #[test]
    fn test_ship_rejects_over_shipment_and_short_stock() {
        let mut so = draft();
        let items = [stock("a", 10), stock("b", 10)];
        so.confirm(&items).unwrap();

        let err = so.ship(&[LineQuantity::new("b", 3)], &items).unwrap_err();
        assert!(matches!(err, CoreError::OverReceipt { .. }));

        let short = [stock("a", 1), stock("b", 10)];
        let err = so.ship(&[LineQuantity::new("a", 2)], &short).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { .. }));
        assert_eq!(so.total_shipped(), 0);
    }

    #[test]
    fn test_ship_requires_confirmation() {
        let mut so = draft();
        let err = so.ship(&[LineQuantity::new("a", 1)], &[stock("a", 10)]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));
    }

    #[test]
    fn test_shipment_for_links_order() {
        let so = draft();
        let shipment = so.shipment_for(
            vec![LineQuantity::new("a", 1)],
            "12 Harbour Rd",
            Some("DHL".to_string()),
            None,
        );
        assert_eq!(shipment.sales_order_id.as_deref(), Some(so.id()));
        assert_eq!(shipment.status, ShipmentStatus::InTransit);
    }

    #[test]
    fn test_totals() {
        let mut so = draft();
        so.normalize();
        assert_eq!(so.total_cents, 5500);
        assert_eq!(so.balance_cents, 5500);
        assert_eq!(so.payment_status, PaymentStatus::Unpaid);
    }
}
