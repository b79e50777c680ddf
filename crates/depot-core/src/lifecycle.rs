//! # Status Lifecycles
//!
//! Shared machinery for every entity that moves through enumerated statuses
//! (purchase orders, sales orders, customer orders, shipments).
//!
//! ## How A Transition Runs
//! ```text
//! transition(entity, to)
//!      │
//!      ├── from.allows(to)?      no ──► InvalidTransition
//!      │
//!      ├── entity.guard(to)?     err ──► entity-specific rule (e.g. cannot
//!      │                                 cancel after goods arrived)
//!      ▼
//!  set_status(to) ──► on_enter(to) ──► touch()
//! ```
//!
//! Some statuses are never a manual target: a purchase order only becomes
//! `Received` through a receipt, a sales order only becomes `Shipped`
//! through a shipment. Those moves set the status directly after their own
//! checks and are simply absent from `allowed_next`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Debug, Display};

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};

/// A status enum with a fixed table of user-initiated transitions.
pub trait Lifecycle:
    Copy + Eq + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Statuses reachable from `self` by a direct transition.
    fn allowed_next(&self) -> &'static [Self];

    /// No further change of any kind is possible.
    fn is_terminal(&self) -> bool;

    fn allows(&self, to: Self) -> bool {
        self.allowed_next().contains(&to)
    }
}

/// An entity whose status follows a [`Lifecycle`].
pub trait Workflow: Entity {
    type Status: Lifecycle;

    fn status(&self) -> Self::Status;

    fn set_status(&mut self, status: Self::Status);

    /// Entity-specific precondition for a manual transition.
    fn guard(&self, _to: Self::Status) -> CoreResult<()> {
        Ok(())
    }

    /// Bookkeeping on entering a status (timestamps).
    fn on_enter(&mut self, _status: Self::Status, _at: DateTime<Utc>) {}
}

/// Applies a user-initiated status change.
pub fn transition<W: Workflow>(entity: &mut W, to: W::Status) -> CoreResult<()> {
    let from = entity.status();

    if !from.allows(to) {
        return Err(CoreError::InvalidTransition {
            entity: W::LABEL.to_string(),
            id: entity.id().to_string(),
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    entity.guard(to)?;
    entity.set_status(to);
    entity.on_enter(to, Utc::now());
    entity.touch();
    Ok(())
}

/// Sets a status reached as the outcome of a receipt or shipment.
pub(crate) fn settle_status<W: Workflow>(entity: &mut W, status: W::Status) {
    if entity.status() != status {
        entity.set_status(status);
        entity.on_enter(status, Utc::now());
    }
    entity.touch();
}

/// Rejects any mutation of an archived record other than restore.
pub(crate) fn ensure_live<E: Entity>(entity: &E) -> CoreResult<()> {
    if entity.is_archived() {
        return Err(CoreError::invalid_state(
            E::LABEL,
            entity.id(),
            "record is archived",
        ));
    }
    Ok(())
}
