//! # Order Balances
//!
//! Purchase and sales orders both carry a total, an amount paid and the
//! outstanding balance. The amount paid is never edited directly: it is
//! recomputed from the payment transactions that reference the order.
//!
//! ```text
//! total      = Σ line.quantity × line.unit price
//! amountPaid = Σ payment.amount   (non-archived payments of this order)
//! balance    = total - amountPaid
//! ```

use crate::entity::Entity;
use crate::money::Money;
use crate::types::{OrderKind, PaymentStatus, PaymentTransaction};

/// Outcome of settling an order against its payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub total: Money,
    pub amount_paid: Money,
    pub balance: Money,
    pub status: PaymentStatus,
}

impl Settlement {
    /// Settles `total` against an amount already paid.
    pub fn new(total: Money, amount_paid: Money) -> Self {
        let status = if amount_paid.is_zero() || amount_paid.is_negative() {
            PaymentStatus::Unpaid
        } else if amount_paid < total {
            PaymentStatus::Partial
        } else if amount_paid == total {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Overpaid
        };

        Settlement {
            total,
            amount_paid,
            balance: total - amount_paid,
            status,
        }
    }

    /// Settles `total` against every live payment for `order_id`.
    pub fn from_payments<'a>(
        total: Money,
        kind: OrderKind,
        order_id: &str,
        payments: impl IntoIterator<Item = &'a PaymentTransaction>,
    ) -> Self {
        let paid = payments
            .into_iter()
            .filter(|p| p.order_kind == kind && p.order_id == order_id && !p.is_archived())
            .map(PaymentTransaction::amount)
            .sum();
        Settlement::new(total, paid)
    }
}

/// An order that payments can be recorded against.
pub trait Payable: Entity {
    const KIND: OrderKind;

    /// Sum of the order lines.
    fn total(&self) -> Money;

    /// Writes the settled amounts back onto the order.
    fn apply_settlement(&mut self, settlement: &Settlement);

    fn settle<'a>(&mut self, payments: impl IntoIterator<Item = &'a PaymentTransaction>) -> Settlement {
        let settlement = Settlement::from_payments(self.total(), Self::KIND, self.id(), payments);
        self.apply_settlement(&settlement);
        settlement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(Settlement::new(cents(1000), cents(0)).status, PaymentStatus::Unpaid);
        assert_eq!(Settlement::new(cents(1000), cents(1)).status, PaymentStatus::Partial);
        assert_eq!(Settlement::new(cents(1000), cents(1000)).status, PaymentStatus::Paid);
        assert_eq!(Settlement::new(cents(1000), cents(1200)).status, PaymentStatus::Overpaid);
        assert_eq!(Settlement::new(cents(0), cents(0)).status, PaymentStatus::Unpaid);
    }

    #[test]
    fn test_balance_goes_negative_when_overpaid() {
        let s = Settlement::new(cents(1000), cents(1200));
        assert_eq!(s.balance.cents(), -200);
    }

    #[test]
    fn test_from_payments_filters_order_and_archived() {
        let mut payments = vec![
            PaymentTransaction::new(OrderKind::PurchaseOrder, "po-1", cents(300)),
            PaymentTransaction::new(OrderKind::PurchaseOrder, "po-1", cents(200)),
            PaymentTransaction::new(OrderKind::PurchaseOrder, "po-2", cents(999)),
            PaymentTransaction::new(OrderKind::SalesOrder, "po-1", cents(999)),
        ];
        payments[1].record.archived = true;

        let s = Settlement::from_payments(cents(1000), OrderKind::PurchaseOrder, "po-1", &payments);
        assert_eq!(s.amount_paid.cents(), 300);
        assert_eq!(s.balance.cents(), 700);
        assert_eq!(s.status, PaymentStatus::Partial);
    }
}
