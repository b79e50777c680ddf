//! # Payments
//!
//! Every write to a payment (create, edit, archive, restore, delete)
//! recomputes the paid amount, balance and payment status of the order it
//! belongs to, and of the order it belonged to before if that changed.
//! The order rewrite joins the payment's batch, so the two never disagree.

use depot_core::{
    Entity, OrderKind, Payable, PaymentTransaction, PurchaseOrder, SalesOrder,
};
use tracing::debug;

use super::hooks::{Change, WriteHook};
use super::Repository;
use crate::backend::{Batch, StoreBackend};
use crate::error::{StoreError, StoreResult};

impl WriteHook for PaymentTransaction {
    async fn prepare(backend: &StoreBackend, payment: &mut Self) -> StoreResult<()> {
        let exists = match payment.order_kind {
            OrderKind::PurchaseOrder => Repository::<PurchaseOrder>::new(backend.clone())
                .get(&payment.order_id)
                .await?
                .is_some(),
            OrderKind::SalesOrder => Repository::<SalesOrder>::new(backend.clone())
                .get(&payment.order_id)
                .await?
                .is_some(),
        };
        if !exists {
            return Err(StoreError::not_found(payment.order_kind.to_string(), &payment.order_id));
        }
        Ok(())
    }

    async fn on_write(
        backend: &StoreBackend,
        change: Change<'_, Self>,
        batch: &mut Batch,
    ) -> StoreResult<()> {
        let mut payments = Repository::<PaymentTransaction>::new(backend.clone())
            .list(true)
            .await?;
        if let Some(before) = change.before() {
            payments.retain(|p| p.id() != before.id());
        }
        if let Some(after) = change.after() {
            payments.retain(|p| p.id() != after.id());
            payments.push(after.clone());
        }

        let mut targets: Vec<(OrderKind, &str)> = Vec::with_capacity(2);
        for payment in change.before().into_iter().chain(change.after()) {
            let target = (payment.order_kind, payment.order_id.as_str());
            if !targets.contains(&target) {
                targets.push(target);
            }
        }

        for (kind, order_id) in targets {
            match kind {
                OrderKind::PurchaseOrder => {
                    resettle::<PurchaseOrder>(backend, order_id, &payments, batch).await?
                }
                OrderKind::SalesOrder => {
                    resettle::<SalesOrder>(backend, order_id, &payments, batch).await?
                }
            }
        }
        Ok(())
    }
}

/// Rewrites one order's payment figures. An order that no longer exists
/// is skipped.
async fn resettle<O: Payable + WriteHook>(
    backend: &StoreBackend,
    order_id: &str,
    payments: &[PaymentTransaction],
    batch: &mut Batch,
) -> StoreResult<()> {
    let Some(mut order) = Repository::<O>::new(backend.clone()).get(order_id).await? else {
        return Ok(());
    };
    let settlement = order.settle(payments);
    order.touch();
    batch.put_entity(&order)?;

    debug!(
        order = %order_id,
        paid = %settlement.amount_paid,
        balance = %settlement.balance,
        status = %settlement.status,
        "Order balance recalculated"
    );
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    payments: Repository<PaymentTransaction>,
}

impl PaymentRepository {
    pub fn new(backend: StoreBackend) -> Self {
        PaymentRepository {
            payments: Repository::new(backend),
        }
    }

    pub fn records(&self) -> &Repository<PaymentTransaction> {
        &self.payments
    }

    /// Records a payment against its order.
    pub async fn record(&self, payment: PaymentTransaction) -> StoreResult<PaymentTransaction> {
        self.payments.create(payment).await
    }

    /// Live payments of one order, oldest first.
    pub async fn for_order(&self, kind: OrderKind, order_id: &str) -> StoreResult<Vec<PaymentTransaction>> {
        Ok(self
            .payments
            .list(false)
            .await?
            .into_iter()
            .filter(|p| p.order_kind == kind && p.order_id == order_id)
            .collect())
    }
}
