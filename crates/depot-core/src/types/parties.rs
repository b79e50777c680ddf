//! Suppliers and customers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entity::{Collection, Entity, Record};
use crate::validation::{validate_email, validate_name, ValidationResult};

/// A vendor purchase orders are raised against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    #[serde(flatten)]
    pub record: Record,

    pub name: String,

    #[serde(default)]
    pub contact_name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

    /// Payment terms in days (net 30 = 30).
    #[serde(default)]
    pub payment_terms_days: Option<u32>,
}

impl Supplier {
    pub fn new(name: impl Into<String>) -> Self {
        Supplier {
            record: Record::new(),
            name: name.into(),
            contact_name: None,
            email: None,
            phone: None,
            address: None,
            payment_terms_days: None,
        }
    }
}

impl Entity for Supplier {
    const COLLECTION: Collection = Collection::Suppliers;
    const LABEL: &'static str = "Supplier";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_email("email", self.email.as_deref())
    }
}

/// A buyer sales orders and customer orders are raised for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(flatten)]
    pub record: Record,

    pub name: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub billing_address: Option<String>,

    #[serde(default)]
    pub shipping_address: Option<String>,
}

impl Customer {
    pub fn new(name: impl Into<String>) -> Self {
        Customer {
            record: Record::new(),
            name: name.into(),
            email: None,
            phone: None,
            billing_address: None,
            shipping_address: None,
        }
    }
}

impl Entity for Customer {
    const COLLECTION: Collection = Collection::Customers;
    const LABEL: &'static str = "Customer";

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_email("email", self.email.as_deref())
    }
}
