use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::procurement::ProposalId;

pub const EVENT_TYPES: [&str; 4] = ["Conference", "Training", "Meetup", "Other"];

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventRequestId(pub String);

/// Request to attend or host an event. Rendered through the same display
/// pipeline as purchase requests with its own formatter table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRequest {
    pub id: EventRequestId,
    pub proposal_id: ProposalId,
    pub title: Option<String>,
    pub type_of_event: Option<i64>,
    pub estimated_cost: Option<Decimal>,
    pub is_tock_billable: bool,
    pub client_billed: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl EventRequest {
    pub fn new(id: impl Into<String>, proposal_id: impl Into<String>) -> Self {
        Self {
            id: EventRequestId(id.into()),
            proposal_id: ProposalId(proposal_id.into()),
            title: None,
            type_of_event: None,
            estimated_cost: None,
            is_tock_billable: false,
            client_billed: false,
            start_date: None,
            end_date: None,
        }
    }

    pub fn event_type_label(&self) -> Option<&'static str> {
        self.type_of_event
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| EVENT_TYPES.get(index).copied())
    }
}
