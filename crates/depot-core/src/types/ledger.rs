//! Money movements: payments against orders and cash / bank entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use ts_rs::TS;

use crate::entity::{Collection, Entity, Record};
use crate::migration;
use crate::money::Money;
use crate::validation::{validate_amount, validate_positive, validate_required, ValidationResult};

// =============================================================================
// Enums
// =============================================================================

/// How far an order's total has been settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
    Overpaid,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::Partial => "Partial",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Overpaid => "Overpaid",
        };
        f.write_str(label)
    }
}

/// Payment method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    BankTransfer,
    Card,
    Cheque,
}

/// Which kind of order a payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum OrderKind {
    PurchaseOrder,
    SalesOrder,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::PurchaseOrder => f.write_str("purchaseOrder"),
            OrderKind::SalesOrder => f.write_str("salesOrder"),
        }
    }
}

/// Cash drawer or bank account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CashAccount {
    #[default]
    Cash,
    Bank,
}

impl std::str::FromStr for CashAccount {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cash" => Ok(CashAccount::Cash),
            "bank" => Ok(CashAccount::Bank),
            _ => Err(crate::error::ValidationError::NotAllowed {
                field: "account".to_string(),
                allowed: vec!["cash".to_string(), "bank".to_string()],
            }),
        }
    }
}

/// Direction of a cash movement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CashDirection {
    #[default]
    Deposit,
    Withdrawal,
}

// =============================================================================
// Payment Transaction
// =============================================================================

/// A payment made against a purchase order or received for a sales order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTransaction {
    #[serde(flatten)]
    pub record: Record,

    pub order_kind: OrderKind,

    pub order_id: String,

    pub amount_cents: i64,

    #[serde(default)]
    pub method: PaymentMethod,

    /// Bank reference, cheque number, card slip.
    #[serde(default)]
    pub reference: Option<String>,

    #[ts(as = "String")]
    #[serde(default = "Utc::now")]
    pub paid_at: DateTime<Utc>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl PaymentTransaction {
    pub fn new(order_kind: OrderKind, order_id: impl Into<String>, amount: Money) -> Self {
        PaymentTransaction {
            record: Record::new(),
            order_kind,
            order_id: order_id.into(),
            amount_cents: amount.cents(),
            method: PaymentMethod::Cash,
            reference: None,
            paid_at: Utc::now(),
            notes: None,
        }
    }

    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

impl Entity for PaymentTransaction {
    const COLLECTION: Collection = Collection::PaymentTransactions;
    const LABEL: &'static str = "Payment";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn validate(&self) -> ValidationResult<()> {
        validate_required("orderId", &self.order_id, 64)?;
        validate_positive("amountCents", self.amount_cents)?;
        validate_amount("amountCents", self.amount_cents)
    }

    fn migrate(doc: &mut Value) -> bool {
        migration::migrate_payment(doc)
    }
}

// =============================================================================
// Cash Transaction
// =============================================================================

/// A deposit into or withdrawal from the cash drawer or bank account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CashTransaction {
    #[serde(flatten)]
    pub record: Record,

    #[serde(default)]
    pub account: CashAccount,

    #[serde(default)]
    pub kind: CashDirection,

    pub amount_cents: i64,

    #[serde(default)]
    pub reference: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[ts(as = "String")]
    #[serde(default = "Utc::now")]
    pub occurred_at: DateTime<Utc>,
}

impl CashTransaction {
    pub fn new(account: CashAccount, kind: CashDirection, amount: Money) -> Self {
        CashTransaction {
            record: Record::new(),
            account,
            kind,
            amount_cents: amount.cents(),
            reference: None,
            description: None,
            occurred_at: Utc::now(),
        }
    }

    /// Amount with sign applied: deposits positive, withdrawals negative.
    pub fn signed_amount(&self) -> Money {
        let amount = Money::from_cents(self.amount_cents);
        match self.kind {
            CashDirection::Deposit => amount,
            CashDirection::Withdrawal => -amount,
        }
    }
}

impl Entity for CashTransaction {
    const COLLECTION: Collection = Collection::CashTransactions;
    const LABEL: &'static str = "Cash transaction";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn validate(&self) -> ValidationResult<()> {
        validate_positive("amountCents", self.amount_cents)?;
        validate_amount("amountCents", self.amount_cents)
    }

    fn migrate(doc: &mut Value) -> bool {
        migration::migrate_cash_transaction(doc)
    }
}

/// Balance of one account over a set of transactions; archived entries
/// are ignored.
pub fn account_balance<'a>(
    account: CashAccount,
    transactions: impl IntoIterator<Item = &'a CashTransaction>,
) -> Money {
    transactions
        .into_iter()
        .filter(|t| t.account == account && !t.record.archived)
        .map(CashTransaction::signed_amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_balance() {
        let mut txs = vec![
            CashTransaction::new(CashAccount::Cash, CashDirection::Deposit, Money::from_cents(10_000)),
            CashTransaction::new(CashAccount::Cash, CashDirection::Withdrawal, Money::from_cents(2_500)),
            CashTransaction::new(CashAccount::Bank, CashDirection::Deposit, Money::from_cents(99_900)),
            CashTransaction::new(CashAccount::Cash, CashDirection::Deposit, Money::from_cents(700)),
        ];
        txs[3].record.archived = true;

        assert_eq!(account_balance(CashAccount::Cash, &txs).cents(), 7_500);
        assert_eq!(account_balance(CashAccount::Bank, &txs).cents(), 99_900);
    }

    #[test]
    fn test_account_parse() {
        assert_eq!("Bank".parse::<CashAccount>().unwrap(), CashAccount::Bank);
        assert!("vault".parse::<CashAccount>().is_err());
    }

    #[test]
    fn test_payment_requires_positive_amount() {
        let payment = PaymentTransaction::new(OrderKind::SalesOrder, "so-1", Money::zero());
        assert!(payment.validate().is_err());
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_value(PaymentMethod::BankTransfer).unwrap(),
            "bank_transfer"
        );
        assert_eq!(serde_json::to_value(OrderKind::PurchaseOrder).unwrap(), "purchaseOrder");
        assert_eq!(serde_json::to_value(CashDirection::Withdrawal).unwrap(), "withdrawal");
    }
}
