use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, FieldViolation, ValidationErrors};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PurchaseRequestId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub String);

/// Stored as an integer code. Code 1 is retired and must stay unassigned so
/// historical rows keep decoding to the same type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i64)]
pub enum PurchaseType {
    Software = 0,
    OfficeSupply = 2,
    Hardware = 3,
    Other = 4,
    Micropurchase = 5,
}

impl PurchaseType {
    pub const ALL: [Self; 5] =
        [Self::Software, Self::OfficeSupply, Self::Hardware, Self::Other, Self::Micropurchase];

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Result<Self, DomainError> {
        Self::ALL
            .into_iter()
            .find(|purchase_type| purchase_type.code() == code)
            .ok_or(DomainError::UnknownCode { kind: "purchase_type", code })
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Software => "Software",
            Self::OfficeSupply => "Office Supply/Miscellaneous",
            Self::Hardware => "Hardware",
            Self::Other => "Other",
            Self::Micropurchase => "Micropurchase",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i64)]
pub enum Urgency {
    Yesterday = 10,
    WithinAWeek = 20,
    Whenever = 30,
}

impl Urgency {
    pub const ALL: [Self; 3] = [Self::Yesterday, Self::WithinAWeek, Self::Whenever];

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Result<Self, DomainError> {
        Self::ALL
            .into_iter()
            .find(|urgency| urgency.code() == code)
            .ok_or(DomainError::UnknownCode { kind: "urgency", code })
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Yesterday => "I need it yesterday",
            Self::WithinAWeek => "I'm patient but would like w/in a week",
            Self::Whenever => "Whenever",
        }
    }
}

pub const OFFICES: [&str; 6] =
    ["DC", "Chicago", "Dayton", "New York", "San Francisco", "Me! (Remote Worker)"];

pub const RECURRENCE_INTERVALS: [&str; 3] = ["Daily", "Monthly", "Yearly"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Office {
    Dc,
    Chicago,
    Dayton,
    NewYork,
    SanFrancisco,
    Remote,
}

impl Office {
    pub const ALL: [Self; 6] =
        [Self::Dc, Self::Chicago, Self::Dayton, Self::NewYork, Self::SanFrancisco, Self::Remote];

    pub fn index(self) -> i64 {
        match self {
            Self::Dc => 0,
            Self::Chicago => 1,
            Self::Dayton => 2,
            Self::NewYork => 3,
            Self::SanFrancisco => 4,
            Self::Remote => 5,
        }
    }

    pub fn from_index(index: i64) -> Result<Self, DomainError> {
        usize::try_from(index)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or(DomainError::UnknownCode { kind: "office", code: index })
    }

    pub fn label(self) -> &'static str {
        OFFICES[self.index() as usize]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecurrenceInterval {
    Daily,
    Monthly,
    Yearly,
}

impl RecurrenceInterval {
    pub const ALL: [Self; 3] = [Self::Daily, Self::Monthly, Self::Yearly];

    pub fn index(self) -> i64 {
        match self {
            Self::Daily => 0,
            Self::Monthly => 1,
            Self::Yearly => 2,
        }
    }

    pub fn from_index(index: i64) -> Result<Self, DomainError> {
        usize::try_from(index)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or(DomainError::UnknownCode { kind: "recurring_interval", code: index })
    }

    pub fn label(self) -> &'static str {
        RECURRENCE_INTERVALS[self.index() as usize]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: PurchaseRequestId,
    pub proposal_id: ProposalId,
    pub product_name_and_description: Option<String>,
    pub justification: Option<String>,
    pub link_to_product: Option<String>,
    pub additional_info: Option<String>,
    pub cost_per_unit: Option<Decimal>,
    pub quantity: Option<i64>,
    pub purchase_type: Option<PurchaseType>,
    pub urgency: Option<Urgency>,
    pub office: Option<Office>,
    pub recurring: bool,
    pub recurring_interval: Option<RecurrenceInterval>,
    pub recurring_length: Option<i64>,
    pub is_tock_billable: bool,
    pub client_billed: bool,
    pub date_requested: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const BASE_FIELDS: &[&str] = &[
    "office",
    "justification",
    "link_to_product",
    "quantity",
    "date_requested",
    "start_date",
    "end_date",
    "additional_info",
    "cost_per_unit",
    "product_name_and_description",
    "recurring",
    "urgency",
    "purchase_type",
    "is_tock_billable",
    "client_billed",
];

const RECURRING_FIELDS: &[&str] = &["recurring_interval", "recurring_length"];

impl PurchaseRequest {
    pub fn new(id: impl Into<String>, proposal_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PurchaseRequestId(id.into()),
            proposal_id: ProposalId(proposal_id.into()),
            product_name_and_description: None,
            justification: None,
            link_to_product: None,
            additional_info: None,
            cost_per_unit: None,
            quantity: None,
            purchase_type: None,
            urgency: None,
            office: None,
            recurring: false,
            recurring_interval: None,
            recurring_length: None,
            is_tock_billable: false,
            client_billed: false,
            date_requested: None,
            start_date: None,
            end_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Zero while either side is blank.
    pub fn total_price(&self) -> Result<Decimal, DomainError> {
        match (self.cost_per_unit, self.quantity) {
            (Some(cost), Some(quantity)) => cost
                .checked_mul(Decimal::from(quantity))
                .ok_or(DomainError::AmountOverflow { field: "total_price" }),
            _ => Ok(Decimal::ZERO),
        }
    }

    pub fn name(&self) -> &str {
        self.product_name_and_description.as_deref().unwrap_or_default()
    }

    pub fn public_identifier(&self) -> String {
        format!("#{}", self.proposal_id.0)
    }

    pub fn is_editable(&self) -> bool {
        true
    }

    pub fn urgency_label(&self) -> Option<&'static str> {
        self.urgency.map(Urgency::label)
    }

    pub fn version(&self) -> i64 {
        self.updated_at.timestamp()
    }

    /// Fields a requester may edit; the recurrence details only apply to
    /// recurring purchases.
    pub fn relevant_fields(recurring: bool) -> Vec<&'static str> {
        let mut fields = BASE_FIELDS.to_vec();
        if recurring {
            fields.extend_from_slice(RECURRING_FIELDS);
        }
        fields
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        match self.cost_per_unit {
            None => errors.push(FieldViolation::new(
                "cost_per_unit",
                "REQUIRED",
                "cost per unit can't be blank",
            )),
            Some(cost) if cost < Decimal::ZERO => errors.push(FieldViolation::new(
                "cost_per_unit",
                "NEGATIVE_COST",
                "cost per unit must not be negative",
            )),
            Some(_) => {}
        }

        match self.quantity {
            None => errors.push(FieldViolation::new(
                "quantity",
                "REQUIRED",
                "quantity can't be blank",
            )),
            Some(quantity) if quantity < 1 => errors.push(FieldViolation::new(
                "quantity",
                "MIN_QUANTITY",
                format!("quantity must be greater than or equal to 1 (got {quantity})"),
            )),
            Some(_) => {}
        }

        let both_present = self.cost_per_unit.is_some() && self.quantity.is_some();
        if both_present && self.total_price().is_err() {
            errors.push(FieldViolation::new(
                "total_price",
                "TOTAL_PRICE_OVERFLOW",
                "total price exceeds the supported amount range",
            ));
        }

        let description_blank = self
            .product_name_and_description
            .as_deref()
            .map(|description| description.trim().is_empty())
            .unwrap_or(true);
        if description_blank {
            errors.push(FieldViolation::new(
                "product_name_and_description",
                "REQUIRED",
                "product name and description can't be blank",
            ));
        }

        if self.purchase_type.is_none() {
            errors.push(FieldViolation::new(
                "purchase_type",
                "REQUIRED",
                "purchase type can't be blank",
            ));
        }

        if self.recurring && self.recurring_interval.is_none() {
            errors.push(FieldViolation::new(
                "recurring_interval",
                "REQUIRED_WHEN_RECURRING",
                "recurring interval can't be blank for a recurring purchase",
            ));
        }

        errors.into_result()
    }
}
