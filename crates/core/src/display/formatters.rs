//! Reusable field formatters shared by the record types in [`super::records`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::warn;

use super::{DisplayRecord, FieldValue, FormatContext, PLACEHOLDER};
use crate::errors::{ApplicationError, DomainError};

pub const CALENDAR_DATE_FORMAT: &str = "%b %d, %Y";

/// Treats the raw value as a zero-based index into `options`.
pub fn option_at<R>(
    options: &'static [&'static str],
) -> impl Fn(&FormatContext<'_, R>) -> Result<String, ApplicationError> + Send + Sync + 'static
where
    R: DisplayRecord,
{
    move |context: &FormatContext<'_, R>| {
        let label = context
            .value
            .as_integer()
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| options.get(index));

        Ok(match label {
            Some(label) => (*label).to_owned(),
            None => out_of_range(context),
        })
    }
}

/// Decodes the raw value as a stored integer code.
pub fn coded<R, D>(
    decode: D,
) -> impl Fn(&FormatContext<'_, R>) -> Result<String, ApplicationError> + Send + Sync + 'static
where
    R: DisplayRecord,
    D: Fn(i64) -> Result<&'static str, DomainError> + Send + Sync + 'static,
{
    move |context: &FormatContext<'_, R>| {
        let label = context.value.as_integer().map(&decode);
        Ok(match label {
            Some(Ok(label)) => label.to_owned(),
            Some(Err(_)) | None => out_of_range(context),
        })
    }
}

pub fn sentence<R>(
    when_true: &'static str,
    when_false: &'static str,
) -> impl Fn(&FormatContext<'_, R>) -> Result<String, ApplicationError> + Send + Sync + 'static
where
    R: DisplayRecord,
{
    move |context: &FormatContext<'_, R>| {
        Ok(if context.value.is_true() { when_true } else { when_false }.to_owned())
    }
}

pub fn calendar_date<R>(context: &FormatContext<'_, R>) -> Result<String, ApplicationError>
where
    R: DisplayRecord,
{
    let date = match context.value {
        FieldValue::Date(date) => Some(*date),
        FieldValue::Timestamp(timestamp) => Some(timestamp.date_naive()),
        FieldValue::Text(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok(),
        _ => None,
    };

    Ok(match date {
        Some(date) => date.format(CALENDAR_DATE_FORMAT).to_string(),
        None => context.value.to_string(),
    })
}

pub fn plain<R>(context: &FormatContext<'_, R>) -> Result<String, ApplicationError>
where
    R: DisplayRecord,
{
    Ok(context.value.to_string())
}

pub fn currency(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

pub fn currency_value<R>(context: &FormatContext<'_, R>) -> Result<String, ApplicationError>
where
    R: DisplayRecord,
{
    Ok(match context.value {
        FieldValue::Decimal(amount) => currency(*amount),
        FieldValue::Integer(amount) => currency(Decimal::from(*amount)),
        other => other.to_string(),
    })
}

fn out_of_range<R>(context: &FormatContext<'_, R>) -> String
where
    R: DisplayRecord,
{
    warn!(
        event_name = "display.value.out_of_range",
        record_type = R::RECORD_TYPE,
        record_id = context.record.record_id(),
        field = context.field,
        value = %context.value,
        "stored value has no display label"
    );
    PLACEHOLDER.to_owned()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{calendar_date, coded, currency, currency_value, option_at, sentence};
    use crate::display::{
        Attribute, DisplayRecord, FieldValue, FormatContext, FormatterRegistry,
        InMemoryRecordStore, PLACEHOLDER,
    };
    use crate::domain::procurement::{PurchaseType, OFFICES};
    use crate::errors::ConfigurationError;

    #[derive(Clone, Debug)]
    struct Row {
        id: String,
    }

    impl DisplayRecord for Row {
        const RECORD_TYPE: &'static str = "row";

        fn record_id(&self) -> &str {
            &self.id
        }

        fn attributes(&self) -> Vec<Attribute> {
            Vec::new()
        }

        fn special_fields() -> &'static [&'static str] {
            &[]
        }

        fn register_formatters(
            _registry: &mut FormatterRegistry<Self>,
        ) -> Result<(), ConfigurationError> {
            Ok(())
        }
    }

    fn format_with<F>(formatter: F, value: FieldValue) -> String
    where
        F: Fn(&FormatContext<'_, Row>) -> Result<String, crate::errors::ApplicationError>,
    {
        let store = InMemoryRecordStore::<Row>::default();
        let row = Row { id: "R-1".to_owned() };
        let context = FormatContext::new("field", &value, &row, &store);
        formatter(&context).expect("formatter succeeds")
    }

    #[test]
    fn option_at_reads_the_label_at_the_stored_index() {
        assert_eq!(format_with(option_at(&OFFICES), FieldValue::Integer(2)), "Dayton");
        assert_eq!(format_with(option_at(&OFFICES), FieldValue::Integer(0)), "DC");
        assert_eq!(
            format_with(option_at(&OFFICES), FieldValue::Text("4".to_owned())),
            "San Francisco"
        );
    }

    #[test]
    fn out_of_range_indexes_render_the_placeholder() {
        assert_eq!(format_with(option_at(&OFFICES), FieldValue::Integer(6)), PLACEHOLDER);
        assert_eq!(format_with(option_at(&OFFICES), FieldValue::Integer(-1)), PLACEHOLDER);
        assert_eq!(format_with(option_at(&OFFICES), FieldValue::Bool(true)), PLACEHOLDER);
    }

    #[test]
    fn coded_values_decode_through_the_enumeration() {
        let purchase_type = || coded(|code| PurchaseType::from_code(code).map(PurchaseType::label));
        assert_eq!(format_with(purchase_type(), FieldValue::Integer(5)), "Micropurchase");
        assert_eq!(format_with(purchase_type(), FieldValue::Integer(0)), "Software");
        assert_eq!(format_with(purchase_type(), FieldValue::Integer(1)), PLACEHOLDER);
    }

    #[test]
    fn sentences_follow_the_flag() {
        let recurring = || sentence("This is recurring", "This is not recurring");
        assert_eq!(format_with(recurring(), FieldValue::Bool(true)), "This is recurring");
        assert_eq!(format_with(recurring(), FieldValue::Bool(false)), "This is not recurring");
    }

    #[test]
    fn dates_use_the_calendar_format() {
        let date = NaiveDate::from_ymd_opt(2015, 6, 1).expect("date");
        assert_eq!(format_with(calendar_date::<Row>, FieldValue::Date(date)), "Jun 01, 2015");
        assert_eq!(
            format_with(calendar_date::<Row>, FieldValue::Text("2015-12-24".to_owned())),
            "Dec 24, 2015"
        );
        assert_eq!(format_with(calendar_date::<Row>, FieldValue::Text("soon".to_owned())), "soon");
    }

    #[test]
    fn currency_always_has_two_decimals() {
        assert_eq!(currency(Decimal::new(370, 0)), "370.00");
        assert_eq!(currency(Decimal::new(12346, 3)), "12.35");
        assert_eq!(
            format_with(currency_value::<Row>, FieldValue::Decimal(Decimal::new(185, 1))),
            "18.50"
        );
    }
}
