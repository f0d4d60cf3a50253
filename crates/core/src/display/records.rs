use super::formatters::{calendar_date, coded, currency, option_at, plain, sentence};
use super::{Attribute, DisplayRecord, FormatterRegistry};
use crate::domain::event::{EventRequest, EVENT_TYPES};
use crate::domain::procurement::{
    Office, PurchaseRequest, PurchaseType, RecurrenceInterval, Urgency, OFFICES,
    RECURRENCE_INTERVALS,
};
use crate::errors::ConfigurationError;

const BILLABLE: (&str, &str) = ("This project is billable", "This project is not billable");
const BILLED: (&str, &str) = ("The client has been billed", "The client has not been billed");

impl DisplayRecord for PurchaseRequest {
    const RECORD_TYPE: &'static str = "purchase_request";

    fn record_id(&self) -> &str {
        &self.id.0
    }

    fn attributes(&self) -> Vec<Attribute> {
        vec![
            Attribute::new("id", self.id.0.as_str()),
            Attribute::new("proposal_id", self.proposal_id.0.as_str()),
            Attribute::new(
                "product_name_and_description",
                self.product_name_and_description.clone(),
            ),
            Attribute::new("justification", self.justification.clone()),
            Attribute::new("link_to_product", self.link_to_product.clone()),
            Attribute::new("additional_info", self.additional_info.clone()),
            Attribute::new("cost_per_unit", self.cost_per_unit),
            Attribute::new("quantity", self.quantity),
            Attribute::new("total_price", self.total_price().ok()),
            Attribute::new("purchase_type", self.purchase_type.map(PurchaseType::code)),
            Attribute::new("urgency", self.urgency.map(Urgency::code)),
            Attribute::new("office", self.office.map(Office::index)),
            Attribute::new("recurring", self.recurring),
            Attribute::new(
                "recurring_interval",
                self.recurring_interval.map(RecurrenceInterval::index),
            ),
            Attribute::new("recurring_length", self.recurring_length),
            Attribute::new("is_tock_billable", self.is_tock_billable),
            Attribute::new("client_billed", self.client_billed),
            Attribute::new("date_requested", self.date_requested),
            Attribute::new("start_date", self.start_date),
            Attribute::new("end_date", self.end_date),
            Attribute::new("created_at", self.created_at),
            Attribute::new("updated_at", self.updated_at),
        ]
    }

    fn special_fields() -> &'static [&'static str] {
        &[
            "recurring_interval",
            "recurring_length",
            "total_price",
            "urgency",
            "is_tock_billable",
            "date_requested",
            "recurring",
            "client_billed",
            "end_date",
            "start_date",
            "purchase_type",
            "office",
        ]
    }

    fn register_formatters(
        registry: &mut FormatterRegistry<Self>,
    ) -> Result<(), ConfigurationError> {
        registry.register("office", option_at(&OFFICES))?;
        registry.register("recurring_interval", option_at(&RECURRENCE_INTERVALS))?;
        registry.register(
            "purchase_type",
            coded(|code| PurchaseType::from_code(code).map(PurchaseType::label)),
        )?;
        registry.register("urgency", coded(|code| Urgency::from_code(code).map(Urgency::label)))?;
        registry.register("recurring_length", plain::<Self>)?;
        // The stored column can lag edits to cost or quantity.
        registry.register("total_price", |context| {
            Ok(currency(context.refetch()?.total_price()?))
        })?;
        registry.register("recurring", sentence("This is recurring", "This is not recurring"))?;
        registry.register("is_tock_billable", sentence(BILLABLE.0, BILLABLE.1))?;
        registry.register("client_billed", sentence(BILLED.0, BILLED.1))?;
        registry.register("date_requested", calendar_date::<Self>)?;
        registry.register("start_date", calendar_date::<Self>)?;
        registry.register("end_date", calendar_date::<Self>)
    }
}

impl DisplayRecord for EventRequest {
    const RECORD_TYPE: &'static str = "event_request";

    fn record_id(&self) -> &str {
        &self.id.0
    }

    fn attributes(&self) -> Vec<Attribute> {
        vec![
            Attribute::new("id", self.id.0.as_str()),
            Attribute::new("proposal_id", self.proposal_id.0.as_str()),
            Attribute::new("title", self.title.clone()),
            Attribute::new("type_of_event", self.type_of_event),
            Attribute::new("estimated_cost", self.estimated_cost),
            Attribute::new("is_tock_billable", self.is_tock_billable),
            Attribute::new("client_billed", self.client_billed),
            Attribute::new("start_date", self.start_date),
            Attribute::new("end_date", self.end_date),
        ]
    }

    fn special_fields() -> &'static [&'static str] {
        &[
            "type_of_event",
            "estimated_cost",
            "is_tock_billable",
            "client_billed",
            "start_date",
            "end_date",
        ]
    }

    fn register_formatters(
        registry: &mut FormatterRegistry<Self>,
    ) -> Result<(), ConfigurationError> {
        registry.register("type_of_event", option_at(&EVENT_TYPES))?;
        registry.register("estimated_cost", super::formatters::currency_value::<Self>)?;
        registry.register("is_tock_billable", sentence(BILLABLE.0, BILLABLE.1))?;
        registry.register("client_billed", sentence(BILLED.0, BILLED.1))?;
        registry.register("start_date", calendar_date::<Self>)?;
        registry.register("end_date", calendar_date::<Self>)
    }
}
