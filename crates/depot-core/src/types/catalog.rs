//! Categories and inventory items.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::entity::{Collection, Entity, Record};
use crate::migration;
use crate::money::Money;
use crate::validation::{
    normalize_key, validate_amount, validate_code, validate_name, validate_non_negative,
    ValidationResult,
};

// =============================================================================
// Category
// =============================================================================

/// A grouping for inventory items ("Packaging", "Spare parts").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(flatten)]
    pub record: Record,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

impl Entity for Category {
    const COLLECTION: Collection = Collection::Categories;
    const LABEL: &'static str = "Category";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)
    }

    fn unique_key(&self) -> Option<(&'static str, String)> {
        Some(("name", normalize_key(&self.name)))
    }
}

// =============================================================================
// Inventory Item
// =============================================================================

/// A stock-keeping unit held in the warehouse.
///
/// ## Quantity Bookkeeping
/// ```text
/// quantity          on hand right now
/// quantityPurchased total ever received through purchase orders
/// quantitySold      total ever shipped through sales orders
/// reorderLevel      low-stock threshold
/// ```
/// Receipts raise `quantity` and `quantityPurchased` together; shipments
/// lower `quantity` and raise `quantitySold` together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    #[serde(flatten)]
    pub record: Record,

    /// Stock Keeping Unit - unique business identifier.
    pub sku: String,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub category_id: Option<String>,

    /// Preferred supplier for replenishment.
    #[serde(default)]
    pub supplier_id: Option<String>,

    /// Aisle / bin label.
    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub quantity: i64,

    #[serde(default)]
    pub quantity_purchased: i64,

    #[serde(default)]
    pub quantity_sold: i64,

    #[serde(default)]
    pub reorder_level: i64,

    /// Selling price in cents.
    #[serde(default)]
    pub unit_price_cents: i64,

    /// Last purchase cost in cents.
    #[serde(default)]
    pub cost_price_cents: i64,
}

impl InventoryItem {
    /// Creates a new item with zero stock.
    pub fn new(sku: impl Into<String>, name: impl Into<String>) -> Self {
        InventoryItem {
            record: Record::new(),
            sku: sku.into(),
            name: name.into(),
            description: None,
            category_id: None,
            supplier_id: None,
            location: None,
            quantity: 0,
            quantity_purchased: 0,
            quantity_sold: 0,
            reorder_level: 0,
            unit_price_cents: 0,
            cost_price_cents: 0,
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Value of the stock on hand at cost.
    pub fn stock_value(&self) -> Money {
        Money::from_cents(self.cost_price_cents).times(self.quantity)
    }

    /// True when stock has fallen to or below the reorder level.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    /// Checks whether `quantity` units can be taken from stock.
    pub fn can_supply(&self, quantity: i64) -> bool {
        self.quantity >= quantity
    }

    /// Books a receipt of `quantity` units at `unit_cost_cents`.
    pub fn receive(&mut self, quantity: i64, unit_cost_cents: i64) {
        self.quantity = self.quantity.saturating_add(quantity);
        self.quantity_purchased = self.quantity_purchased.saturating_add(quantity);
        if unit_cost_cents > 0 {
            self.cost_price_cents = unit_cost_cents;
        }
    }

    /// Books a shipment of `quantity` units. Callers check `can_supply` first.
    pub fn issue(&mut self, quantity: i64) {
        self.quantity = self.quantity.saturating_sub(quantity);
        self.quantity_sold = self.quantity_sold.saturating_add(quantity);
    }
}

impl Entity for InventoryItem {
    const COLLECTION: Collection = Collection::Inventory;
    const LABEL: &'static str = "Inventory item";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn validate(&self) -> ValidationResult<()> {
        validate_code("sku", &self.sku)?;
        validate_name("name", &self.name)?;
        validate_non_negative("quantity", self.quantity)?;
        validate_non_negative("quantityPurchased", self.quantity_purchased)?;
        validate_non_negative("quantitySold", self.quantity_sold)?;
        validate_non_negative("reorderLevel", self.reorder_level)?;
        validate_amount("unitPriceCents", self.unit_price_cents)?;
        validate_amount("costPriceCents", self.cost_price_cents)
    }

    fn unique_key(&self) -> Option<(&'static str, String)> {
        Some(("sku", normalize_key(&self.sku)))
    }

    fn migrate(doc: &mut Value) -> bool {
        migration::migrate_inventory(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_and_issue_keep_counters_in_step() {
        let mut item = InventoryItem::new("PAL-001", "Euro pallet");
        item.receive(40, 1250);
        item.issue(15);

        assert_eq!(item.quantity, 25);
        assert_eq!(item.quantity_purchased, 40);
        assert_eq!(item.quantity_sold, 15);
        assert_eq!(item.cost_price_cents, 1250);
        assert_eq!(item.stock_value().cents(), 25 * 1250);
    }

    #[test]
    fn test_low_stock() {
        let mut item = InventoryItem::new("PAL-001", "Euro pallet");
        item.reorder_level = 5;
        item.quantity = 5;
        assert!(item.is_low_stock());
        item.quantity = 6;
        assert!(!item.is_low_stock());
    }

    #[test]
    fn test_validation() {
        let mut item = InventoryItem::new("PAL-001", "Euro pallet");
        assert!(item.validate().is_ok());

        item.quantity = -1;
        assert!(item.validate().is_err());

        item.quantity = 0;
        item.sku = "bad sku".to_string();
        assert!(item.validate().is_err());
    }

    #[test]
    fn test_document_shape() {
        let item = InventoryItem::new("PAL-001", "Euro pallet");
        let doc = serde_json::to_value(&item).unwrap();
        assert_eq!(doc["sku"], "PAL-001");
        assert_eq!(doc["quantityPurchased"], 0);
        assert!(doc.get("record").is_none());
        assert_eq!(doc["id"], Value::String(item.record.id.clone()));
    }
}
