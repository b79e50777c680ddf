//! # Purchase Orders
//!
//! ## Lifecycle
//! ```text
//!                     ┌──────────► Cancelled ◄──────────┬───────────────┐
//!                     │                ▲                │               │
//!   ┌───────┐  submit ┴──────────┐  approve  ┌─────────┴┐  place  ┌─────┴───┐
//!   │ Draft │ ──────► │ Pending  │ ────────► │ Approved │ ──────► │ Ordered │
//!   └───────┘         │ Approval │           └──────────┘         └────┬────┘
//!       ▲             └────┬─────┘                                     │ receive
//!       │ revise           │ reject                                    ▼
//!   ┌───┴──────┐           │                      ┌────────────────────────┐
//!   │ Rejected │ ◄─────────┘                      │ Partially Received ──► │
//!   └──────────┘                                  │ Received               │
//!                                                 └────────────────────────┘
//! ```
//!
//! Lines can only be edited while the order is a draft (or was rejected and
//! is being reworked). Goods arrive through [`PurchaseOrder::receive`], which
//! returns the stock movements the caller must book against inventory in
//! the same batch.

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
use crate::types::{LineQuantity, OrderKind, PaymentStatus};
use crate::validation::{
    validate_amount, validate_code, validate_non_negative, validate_quantity, validate_required,
    ValidationResult,
};

// =============================================================================
// Status
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PurchaseOrderStatus {
    #[default]
    Draft,
    #[serde(rename = "Pending Approval")]
    PendingApproval,
    Approved,
    Ordered,
    #[serde(rename = "Partially Received")]
    PartiallyReceived,
    Received,
    Rejected,
    Cancelled,
}

impl PurchaseOrderStatus {
    /// Lines (items, quantities, costs) may change.
    pub fn allows_line_edits(&self) -> bool {
        matches!(self, PurchaseOrderStatus::Draft | PurchaseOrderStatus::Rejected)
    }

    /// Goods may be received against the order.
    pub fn accepts_receipts(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Ordered | PurchaseOrderStatus::PartiallyReceived
        )
    }
}

impl Lifecycle for PurchaseOrderStatus {
    fn allowed_next(&self) -> &'static [Self] {
        use PurchaseOrderStatus::*;
        match self {
            Draft => &[PendingApproval, Cancelled],
            PendingApproval => &[Approved, Rejected, Cancelled],
            Rejected => &[Draft],
            Approved => &[Ordered, Cancelled],
            Ordered => &[Cancelled],
            PartiallyReceived | Received | Cancelled => &[],
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Received | PurchaseOrderStatus::Cancelled
        )
    }
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PurchaseOrderStatus::Draft => "Draft",
            PurchaseOrderStatus::PendingApproval => "Pending Approval",
            PurchaseOrderStatus::Approved => "Approved",
            PurchaseOrderStatus::Ordered => "Ordered",
            PurchaseOrderStatus::PartiallyReceived => "Partially Received",
            PurchaseOrderStatus::Received => "Received",
            PurchaseOrderStatus::Rejected => "Rejected",
            PurchaseOrderStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

// =============================================================================
// Lines
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderLine {
    pub item_id: String,

    /// SKU and name are copied from the item when the line is added so the
    /// order still reads correctly if the item is renamed later.
    #[serde(default)]
    pub sku: String,

    #[serde(default)]
    pub name: String,

    pub quantity: i64,

    #[serde(default)]
    pub quantity_received: i64,

    #[serde(default)]
    pub unit_cost_cents: i64,
}

impl PurchaseOrderLine {
    pub fn new(item_id: impl Into<String>, quantity: i64, unit_cost: Money) -> Self {
        PurchaseOrderLine {
            item_id: item_id.into(),
            sku: String::new(),
            name: String::new(),
            quantity,
            quantity_received: 0,
            unit_cost_cents: unit_cost.cents(),
        }
    }

    pub fn remaining(&self) -> i64 {
        (self.quantity - self.quantity_received).max(0)
    }

    pub fn is_complete(&self) -> bool {
        self.quantity_received >= self.quantity
    }

    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_cost_cents).times(self.quantity)
    }
}

/// A stock movement produced by a receipt: add `quantity` units of
/// `item_id` at `unit_cost_cents`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReceipt {
    pub item_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

// =============================================================================
// Purchase Order
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    #[serde(flatten)]
    pub record: Record,

    pub po_number: String,

    pub supplier_id: String,

    #[serde(default)]
    pub lines: Vec<PurchaseOrderLine>,

    #[serde(default)]
    pub status: PurchaseOrderStatus,

    #[serde(default)]
    pub total_cents: i64,

    #[serde(default)]
    pub amount_paid_cents: i64,

    #[serde(default)]
    pub balance_cents: i64,

    #[serde(default)]
    pub payment_status: PaymentStatus,

    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub expected_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub notes: Option<String>,

    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub approved_by: Option<String>,

    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub rejection_reason: Option<String>,

    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub ordered_at: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl PurchaseOrder {
    pub fn new(po_number: impl Into<String>, supplier_id: impl Into<String>) -> Self {
        PurchaseOrder {
            record: Record::new(),
            po_number: po_number.into(),
            supplier_id: supplier_id.into(),
            lines: Vec::new(),
            status: PurchaseOrderStatus::Draft,
            total_cents: 0,
            amount_paid_cents: 0,
            balance_cents: 0,
            payment_status: PaymentStatus::Unpaid,
            expected_date: None,
            notes: None,
            submitted_at: None,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            ordered_at: None,
            received_at: None,
            cancelled_at: None,
        }
    }

    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    pub fn total_received(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity_received).sum()
    }

    /// Draft → Pending Approval.
    pub fn submit(&mut self) -> CoreResult<()> {
        ensure_live(self)?;
        transition(self, PurchaseOrderStatus::PendingApproval)
    }

    /// Pending Approval → Approved, recording who approved.
    pub fn approve(&mut self, approved_by: &str) -> CoreResult<()> {
        ensure_live(self)?;
        validate_required("approvedBy", approved_by, 100)?;
        transition(self, PurchaseOrderStatus::Approved)?;
        self.approved_by = Some(approved_by.trim().to_string());
        Ok(())
    }

    /// Pending Approval → Rejected. A reason is mandatory.
    pub fn reject(&mut self, reason: &str) -> CoreResult<()> {
        ensure_live(self)?;
        validate_required("reason", reason, 500)?;
        transition(self, PurchaseOrderStatus::Rejected)?;
        self.rejection_reason = Some(reason.trim().to_string());
        Ok(())
    }

    /// Rejected → Draft so the order can be reworked and resubmitted.
    pub fn revise(&mut self) -> CoreResult<()> {
        ensure_live(self)?;
        transition(self, PurchaseOrderStatus::Draft)
    }

    /// Approved → Ordered: the order has been sent to the supplier.
    pub fn place(&mut self) -> CoreResult<()> {
        ensure_live(self)?;
        transition(self, PurchaseOrderStatus::Ordered)
    }

    pub fn cancel(&mut self) -> CoreResult<()> {
        ensure_live(self)?;
        transition(self, PurchaseOrderStatus::Cancelled)
    }

    /// Books a goods receipt against the order lines.
    ///
    /// Receipts are matched to lines by item id. Several entries for the
    /// same item are added together. Nothing is applied unless every entry
    /// is valid.
    pub fn receive(&mut self, receipts: &[LineQuantity]) -> CoreResult<Vec<StockReceipt>> {
        ensure_live(self)?;
        if !self.status.accepts_receipts() {
            return Err(CoreError::invalid_state(
                Self::LABEL,
                self.id(),
                format!("cannot receive goods while {}", self.status),
            ));
        }
        if receipts.is_empty() {
            return Err(ValidationError::Required {
                field: "receipts".to_string(),
            }
            .into());
        }

        let mut requested: BTreeMap<usize, i64> = BTreeMap::new();
        for receipt in receipts {
            validate_quantity("quantity", receipt.quantity)?;
            let index = self
                .lines
                .iter()
                .position(|l| l.item_id == receipt.item_id)
                .ok_or_else(|| CoreError::not_found("Purchase order line", &receipt.item_id))?;
            let total = requested.entry(index).or_default();
            *total = total.saturating_add(receipt.quantity);
        }

        for (&index, &quantity) in &requested {
            let line = &self.lines[index];
            if quantity > line.remaining() {
                return Err(CoreError::OverReceipt {
                    order: self.po_number.clone(),
                    line: index + 1,
                    remaining: line.remaining(),
                    requested: quantity,
                });
            }
        }

        let mut movements = Vec::with_capacity(requested.len());
        for (index, quantity) in requested {
            let line = &mut self.lines[index];
            line.quantity_received += quantity;
            movements.push(StockReceipt {
                item_id: line.item_id.clone(),
                quantity,
                unit_cost_cents: line.unit_cost_cents,
            });
        }

        let next = if self.lines.iter().all(PurchaseOrderLine::is_complete) {
            PurchaseOrderStatus::Received
        } else {
            PurchaseOrderStatus::PartiallyReceived
        };
        settle_status(self, next);
        Ok(movements)
    }
}

impl Entity for PurchaseOrder {
    const COLLECTION: Collection = Collection::PurchaseOrders;
    const LABEL: &'static str = "Purchase order";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn reset_for_create(&mut self) {
        self.status = PurchaseOrderStatus::Draft;
        for line in &mut self.lines {
            line.quantity_received = 0;
        }
        self.amount_paid_cents = 0;
        self.submitted_at = None;
        self.approved_by = None;
        self.approved_at = None;
        self.rejection_reason = None;
        self.ordered_at = None;
        self.received_at = None;
        self.cancelled_at = None;
    }

    /// Header fields are always editable; lines only while Draft or
    /// Rejected. Status, receipts and payment figures never come from an
    /// edit.
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
                    line.quantity_received = 0;
                    line
                })
                .collect();
        }
        merged.po_number = incoming.po_number;
        merged.supplier_id = incoming.supplier_id;
        merged.expected_date = incoming.expected_date;
        merged.notes = incoming.notes;
        Ok(merged)
    }

    fn normalize(&mut self) {
        let settlement = Settlement::new(self.total(), self.amount_paid());
        self.apply_settlement(&settlement);
    }

    fn validate(&self) -> ValidationResult<()> {
        validate_code("poNumber", &self.po_number)?;
        validate_required("supplierId", &self.supplier_id, 64)?;

        let mut seen = HashSet::new();
        for line in &self.lines {
            validate_required("lines.itemId", &line.item_id, 64)?;
            validate_quantity("lines.quantity", line.quantity)?;
            validate_non_negative("lines.quantityReceived", line.quantity_received)?;
            validate_amount("lines.unitCostCents", line.unit_cost_cents)?;
            if line.quantity_received > line.quantity {
                return Err(ValidationError::OutOfRange {
                    field: "lines.quantityReceived".to_string(),
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
        Some(("poNumber", self.po_number.trim().to_string()))
    }

    fn migrate(doc: &mut Value) -> bool {
        migration::migrate_purchase_order(doc)
    }
}

impl Workflow for PurchaseOrder {
    type Status = PurchaseOrderStatus;

    fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    fn set_status(&mut self, status: PurchaseOrderStatus) {
        self.status = status;
    }

    fn guard(&self, to: PurchaseOrderStatus) -> CoreResult<()> {
        match to {
            PurchaseOrderStatus::PendingApproval if self.lines.is_empty() => Err(
                CoreError::invalid_state(Self::LABEL, self.id(), "cannot submit an order without lines"),
            ),
            PurchaseOrderStatus::PendingApproval => {
                for line in &self.lines {
                    validate_quantity("lines.quantity", line.quantity)?;
                }
                Ok(())
            }
            PurchaseOrderStatus::Cancelled if self.total_received() > 0 => {
                Err(CoreError::invalid_state(
                    Self::LABEL,
                    self.id(),
                    "goods have already been received",
                ))
            }
            _ => Ok(()),
        }
    }

    fn on_enter(&mut self, status: PurchaseOrderStatus, at: DateTime<Utc>) {
        match status {
            PurchaseOrderStatus::Draft => {
                self.submitted_at = None;
                self.rejection_reason = None;
            }
            PurchaseOrderStatus::PendingApproval => self.submitted_at = Some(at),
            PurchaseOrderStatus::Approved => self.approved_at = Some(at),
            PurchaseOrderStatus::Ordered => self.ordered_at = Some(at),
            PurchaseOrderStatus::Received => self.received_at = Some(at),
            PurchaseOrderStatus::Cancelled => self.cancelled_at = Some(at),
            PurchaseOrderStatus::PartiallyReceived | PurchaseOrderStatus::Rejected => {}
        }
    }
}

impl Payable for PurchaseOrder {
    const KIND: OrderKind = OrderKind::PurchaseOrder;

    fn total(&self) -> Money {
        self.lines.iter().map(PurchaseOrderLine::line_total).sum()
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
    use crate::validation::{MAX_AMOUNT_CENTS, MAX_QUANTITY};

    fn ordered_po() -> PurchaseOrder {
        let mut po = PurchaseOrder::new("PO-2024-001", "sup-1");
        po.lines.push(PurchaseOrderLine::new("item-a", 10, Money::from_cents(500)));
        po.lines.push(PurchaseOrderLine::new("item-b", 4, Money::from_cents(1200)));
        po.submit().unwrap();
        po.approve("dana").unwrap();
        po.place().unwrap();
        po
    }

    #[test]
    fn test_happy_path_timestamps() {
        let po = ordered_po();
        assert_eq!(po.status, PurchaseOrderStatus::Ordered);
        assert!(po.submitted_at.is_some());
        assert!(po.approved_at.is_some());
        assert!(po.ordered_at.is_some());
        assert_eq!(po.approved_by.as_deref(), Some("dana"));
    }

    #[test]
    fn test_oversized_lines_fail_validation() {
        let mut po = PurchaseOrder::new("PO-9", "sup-1");
        po.lines.push(PurchaseOrderLine::new("item-a", i64::MAX / 2, Money::from_cents(3)));
        po.lines.push(PurchaseOrderLine::new("item-b", i64::MAX / 2, Money::from_cents(3)));
        po.normalize();
        assert!(matches!(po.validate(), Err(ValidationError::OutOfRange { .. })));

        let mut po = PurchaseOrder::new("PO-10", "sup-1");
        po.lines.push(PurchaseOrderLine::new(
            "item-a",
            MAX_QUANTITY,
            Money::from_cents(MAX_AMOUNT_CENTS),
        ));
        po.normalize();
        let err = po.validate().unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "totalCents"));
    }

    #[test]
    fn test_oversized_receipts_are_rejected() {
        let mut po = ordered_po();
        let err = po.receive(&[LineQuantity::new("item-a", i64::MAX)]).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        let err = po
            .receive(&[
                LineQuantity::new("item-a", MAX_QUANTITY),
                LineQuantity::new("item-a", MAX_QUANTITY),
            ])
            .unwrap_err();
        assert!(matches!(err, CoreError::OverReceipt { .. }));
        assert_eq!(po.total_received(), 0);
    }

    #[test]
    fn test_submit_requires_lines() {
        let mut po = PurchaseOrder::new("PO-1", "sup-1");
        let err = po.submit().unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));
        assert_eq!(po.status, PurchaseOrderStatus::Draft);
    }

    #[test]
    fn test_cannot_approve_draft() {
        let mut po = PurchaseOrder::new("PO-1", "sup-1");
        po.lines.push(PurchaseOrderLine::new("item-a", 1, Money::zero()));
        let err = po.approve("dana").unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_reject_and_revise() {
        let mut po = PurchaseOrder::new("PO-1", "sup-1");
        po.lines.push(PurchaseOrderLine::new("item-a", 1, Money::zero()));
        po.submit().unwrap();

        assert!(po.reject("  ").is_err());
        po.reject("Supplier price too high").unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::Rejected);
        assert!(po.status.allows_line_edits());

        po.revise().unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::Draft);
        assert!(po.rejection_reason.is_none());
    }

    #[test]
    fn test_partial_then_full_receipt() {
        let mut po = ordered_po();

        let moves = po.receive(&[LineQuantity::new("item-a", 6)]).unwrap();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].unit_cost_cents, 500);
        assert_eq!(po.status, PurchaseOrderStatus::PartiallyReceived);
        assert!(po.received_at.is_none());

        po.receive(&[LineQuantity::new("item-a", 4), LineQuantity::new("item-b", 4)])
            .unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::Received);
        assert!(po.received_at.is_some());
        assert!(po.status.is_terminal());
    }

    #[test]
    fn test_over_receipt_applies_nothing() {
        let mut po = ordered_po();
        let err = po
            .receive(&[LineQuantity::new("item-a", 3), LineQuantity::new("item-b", 5)])
            .unwrap_err();
        assert!(matches!(err, CoreError::OverReceipt { line: 2, remaining: 4, .. }));
        assert_eq!(po.total_received(), 0);
        assert_eq!(po.status, PurchaseOrderStatus::Ordered);
    }

    #[test]
    fn test_duplicate_receipt_entries_are_summed() {
        let mut po = ordered_po();
        let err = po
            .receive(&[LineQuantity::new("item-b", 3), LineQuantity::new("item-b", 3)])
            .unwrap_err();
        assert!(matches!(err, CoreError::OverReceipt { requested: 6, .. }));
    }

    #[test]
    fn test_receive_unknown_item() {
        let mut po = ordered_po();
        let err = po.receive(&[LineQuantity::new("item-z", 1)]).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_receive_requires_ordered() {
        let mut po = PurchaseOrder::new("PO-1", "sup-1");
        po.lines.push(PurchaseOrderLine::new("item-a", 1, Money::zero()));
        let err = po.receive(&[LineQuantity::new("item-a", 1)]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));
    }

    #[test]
    fn test_cancel_rules() {
        let mut po = ordered_po();
        po.cancel().unwrap();
        assert!(po.cancelled_at.is_some());

        let mut po = ordered_po();
        po.receive(&[LineQuantity::new("item-a", 1)]).unwrap();
        assert!(po.cancel().is_err());
    }

    #[test]
    fn test_merge_update_locks_lines_after_submit() {
        let mut po = PurchaseOrder::new("PO-1", "sup-1");
        po.lines.push(PurchaseOrderLine::new("item-a", 1, Money::zero()));

        let mut edit = po.clone();
        edit.lines[0].quantity = 5;
        edit.notes = Some("rush".to_string());
        let merged = po.merge_update(edit.clone()).unwrap();
        assert_eq!(merged.lines[0].quantity, 5);

        po.submit().unwrap();
        assert!(po.merge_update(edit.clone()).is_err());

        edit.lines = po.lines.clone();
        edit.status = PurchaseOrderStatus::Received;
        let merged = po.merge_update(edit).unwrap();
        assert_eq!(merged.status, PurchaseOrderStatus::PendingApproval);
        assert_eq!(merged.notes.as_deref(), Some("rush"));
    }

    #[test]
    fn test_normalize_computes_balance() {
        let mut po = ordered_po();
        po.amount_paid_cents = 2000;
        po.normalize();
        assert_eq!(po.total_cents, 10 * 500 + 4 * 1200);
        assert_eq!(po.balance_cents, 9800 - 2000);
        assert_eq!(po.payment_status, PaymentStatus::Partial);
    }

    #[test]
    fn test_duplicate_line_items_rejected() {
        let mut po = PurchaseOrder::new("PO-1", "sup-1");
        po.lines.push(PurchaseOrderLine::new("item-a", 1, Money::zero()));
        po.lines.push(PurchaseOrderLine::new("item-a", 2, Money::zero()));
        assert!(matches!(po.validate(), Err(ValidationError::Duplicate { .. })));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_value(PurchaseOrderStatus::PendingApproval).unwrap(),
            "Pending Approval"
        );
        assert_eq!(
            serde_json::from_value::<PurchaseOrderStatus>("Partially Received".into()).unwrap(),
            PurchaseOrderStatus::PartiallyReceived
        );
    }
}
