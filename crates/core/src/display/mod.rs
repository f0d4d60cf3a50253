//! Renders record snapshots into human-readable field values for change
//! history. Each record type registers a formatter per "special" field; the
//! registry is checked when the transformer is built.

pub mod formatters;
pub mod records;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{ApplicationError, ConfigurationError};

pub const PLACEHOLDER: &str = "--";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view used by by-position and coded fields; numeric text is accepted.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Self::Bool(true))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Decimal(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Self::Timestamp(value) => f.write_str(&value.to_rfc3339()),
        }
    }
}

impl<T> From<Option<T>> for FieldValue
where
    T: Into<FieldValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: &'static str,
    pub value: FieldValue,
}

impl Attribute {
    pub fn new(name: &'static str, value: impl Into<FieldValue>) -> Self {
        Self { name, value: value.into() }
    }
}

pub trait DisplayRecord: Sized + Send + Sync + 'static {
    const RECORD_TYPE: &'static str;

    fn record_id(&self) -> &str;

    /// Current attribute values in a stable order.
    fn attributes(&self) -> Vec<Attribute>;

    fn special_fields() -> &'static [&'static str];

    fn register_formatters(
        registry: &mut FormatterRegistry<Self>,
    ) -> Result<(), ConfigurationError>;
}

/// Re-fetches the persisted state of a record by identity.
pub trait RecordLookup<R>: Send + Sync {
    fn find_by_id(&self, id: &str) -> Result<Option<R>, ApplicationError>;
}

impl<R, L> RecordLookup<R> for &L
where
    L: RecordLookup<R> + ?Sized,
{
    fn find_by_id(&self, id: &str) -> Result<Option<R>, ApplicationError> {
        (**self).find_by_id(id)
    }
}

pub struct FormatContext<'a, R> {
    pub field: &'a str,
    pub value: &'a FieldValue,
    pub record: &'a R,
    lookup: &'a dyn RecordLookup<R>,
}

impl<'a, R> FormatContext<'a, R>
where
    R: DisplayRecord,
{
    pub fn new(
        field: &'a str,
        value: &'a FieldValue,
        record: &'a R,
        lookup: &'a dyn RecordLookup<R>,
    ) -> Self {
        Self { field, value, record, lookup }
    }

    pub fn refetch(&self) -> Result<R, ApplicationError> {
        let id = self.record.record_id();
        self.lookup.find_by_id(id)?.ok_or_else(|| ApplicationError::NotFound {
            record_type: R::RECORD_TYPE,
            id: id.to_owned(),
        })
    }
}

pub trait FieldFormatter<R>: Send + Sync {
    fn format(&self, context: &FormatContext<'_, R>) -> Result<String, ApplicationError>;
}

impl<R, F> FieldFormatter<R> for F
where
    F: Fn(&FormatContext<'_, R>) -> Result<String, ApplicationError> + Send + Sync,
{
    fn format(&self, context: &FormatContext<'_, R>) -> Result<String, ApplicationError> {
        self(context)
    }
}

pub struct FormatterRegistry<R> {
    formatters: HashMap<&'static str, Box<dyn FieldFormatter<R>>>,
}

impl<R> Default for FormatterRegistry<R> {
    fn default() -> Self {
        Self { formatters: HashMap::new() }
    }
}

impl<R> FormatterRegistry<R>
where
    R: DisplayRecord,
{
    pub fn register<F>(
        &mut self,
        field: &'static str,
        formatter: F,
    ) -> Result<(), ConfigurationError>
    where
        F: Fn(&FormatContext<'_, R>) -> Result<String, ApplicationError> + Send + Sync + 'static,
    {
        self.register_formatter(field, formatter)
    }

    pub fn register_formatter<F>(
        &mut self,
        field: &'static str,
        formatter: F,
    ) -> Result<(), ConfigurationError>
    where
        F: FieldFormatter<R> + 'static,
    {
        if self.formatters.contains_key(field) {
            return Err(ConfigurationError::DuplicateFormatter {
                record_type: R::RECORD_TYPE,
                field: field.to_owned(),
            });
        }
        self.formatters.insert(field, Box::new(formatter));
        Ok(())
    }

    pub fn get(&self, field: &str) -> Option<&dyn FieldFormatter<R>> {
        self.formatters.get(field).map(|formatter| formatter.as_ref())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.formatters.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }
}

pub type DisplayFields = BTreeMap<String, String>;

pub struct FieldDisplayTransformer<R, L> {
    registry: FormatterRegistry<R>,
    special_fields: HashSet<&'static str>,
    lookup: L,
}

impl<R, L> FieldDisplayTransformer<R, L>
where
    R: DisplayRecord,
    L: RecordLookup<R>,
{
    pub fn new(lookup: L) -> Result<Self, ConfigurationError> {
        let mut registry = FormatterRegistry::default();
        R::register_formatters(&mut registry)?;

        let special_fields: HashSet<&'static str> = R::special_fields().iter().copied().collect();
        if let Some(missing) = R::special_fields().iter().find(|field| !registry.contains(field)) {
            return Err(ConfigurationError::MissingFormatter {
                record_type: R::RECORD_TYPE,
                field: (*missing).to_owned(),
            });
        }

        debug!(
            event_name = "display.registry.loaded",
            record_type = R::RECORD_TYPE,
            formatter_count = registry.len(),
            "display formatters registered"
        );
        Ok(Self { registry, special_fields, lookup })
    }

    pub fn render(&self, record: &R) -> Result<DisplayFields, ApplicationError> {
        let mut display = DisplayFields::new();

        for attribute in record.attributes() {
            let rendered = self.render_attribute(record, &attribute)?;
            display.insert(attribute.name.to_owned(), rendered);
        }

        Ok(display)
    }

    fn render_attribute(
        &self,
        record: &R,
        attribute: &Attribute,
    ) -> Result<String, ApplicationError> {
        if attribute.value.is_null() {
            return Ok(PLACEHOLDER.to_owned());
        }

        if !self.special_fields.contains(attribute.name) {
            return Ok(attribute.value.to_string());
        }

        let formatter = self.registry.get(attribute.name).ok_or_else(|| {
            ConfigurationError::MissingFormatter {
                record_type: R::RECORD_TYPE,
                field: attribute.name.to_owned(),
            }
        })?;
        let context = FormatContext::new(attribute.name, &attribute.value, record, &self.lookup);
        formatter.format(&context)
    }
}

/// Keyed by record identity.
#[derive(Debug)]
pub struct InMemoryRecordStore<R> {
    records: RwLock<HashMap<String, R>>,
}

impl<R> Default for InMemoryRecordStore<R> {
    fn default() -> Self {
        Self { records: RwLock::new(HashMap::new()) }
    }
}

impl<R> InMemoryRecordStore<R>
where
    R: DisplayRecord + Clone,
{
    pub fn save(&self, record: R) {
        let mut records = match self.records.write() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.insert(record.record_id().to_owned(), record);
    }

    pub fn remove(&self, id: &str) -> Option<R> {
        let mut records = match self.records.write() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.remove(id)
    }
}

impl<R> RecordLookup<R> for InMemoryRecordStore<R>
where
    R: DisplayRecord + Clone,
{
    fn find_by_id(&self, id: &str) -> Result<Option<R>, ApplicationError> {
        let records = match self.records.read() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(records.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Attribute, DisplayRecord, FieldDisplayTransformer, FieldValue, FormatContext,
        FormatterRegistry, InMemoryRecordStore, PLACEHOLDER,
    };
    use crate::errors::{ApplicationError, ConfigurationError};

    #[derive(Clone, Debug)]
    struct Memo {
        id: String,
        subject: Option<String>,
        pages: Option<i64>,
        urgent: bool,
    }

    impl DisplayRecord for Memo {
        const RECORD_TYPE: &'static str = "memo";

        fn record_id(&self) -> &str {
            &self.id
        }

        fn attributes(&self) -> Vec<Attribute> {
            vec![
                Attribute::new("subject", self.subject.clone()),
                Attribute::new("pages", self.pages),
                Attribute::new("urgent", self.urgent),
            ]
        }

        fn special_fields() -> &'static [&'static str] {
            &["urgent", "pages"]
        }

        fn register_formatters(
            registry: &mut FormatterRegistry<Self>,
        ) -> Result<(), ConfigurationError> {
            registry.register("urgent", |context| {
                Ok(if context.value.is_true() { "Urgent".to_owned() } else { "Routine".to_owned() })
            })?;
            registry.register("pages", |context| Ok(format!("{} page(s)", context.value)))
        }
    }

    #[derive(Clone, Debug)]
    struct Incomplete {
        id: String,
    }

    impl DisplayRecord for Incomplete {
        const RECORD_TYPE: &'static str = "incomplete";

        fn record_id(&self) -> &str {
            &self.id
        }

        fn attributes(&self) -> Vec<Attribute> {
            vec![Attribute::new("status", "open")]
        }

        fn special_fields() -> &'static [&'static str] {
            &["status"]
        }

        fn register_formatters(
            _registry: &mut FormatterRegistry<Self>,
        ) -> Result<(), ConfigurationError> {
            Ok(())
        }
    }

    fn memo() -> Memo {
        Memo {
            id: "M-1".to_owned(),
            subject: Some("Budget".to_owned()),
            pages: None,
            urgent: false,
        }
    }

    #[test]
    fn null_values_render_as_placeholder_even_for_special_fields() {
        let transformer = FieldDisplayTransformer::<Memo, _>::new(InMemoryRecordStore::default())
            .expect("registry");
        let display = transformer.render(&memo()).expect("render");

        assert_eq!(display["pages"], PLACEHOLDER);
    }

    #[test]
    fn plain_fields_pass_through_and_special_fields_are_formatted() {
        let transformer = FieldDisplayTransformer::<Memo, _>::new(InMemoryRecordStore::default())
            .expect("registry");
        let mut record = memo();
        record.pages = Some(3);

        let display = transformer.render(&record).expect("render");
        assert_eq!(display["subject"], "Budget");
        assert_eq!(display["pages"], "3 page(s)");
        assert_eq!(display["urgent"], "Routine");
        assert_eq!(display.len(), 3);
    }

    #[test]
    fn rendering_is_repeatable() {
        let transformer = FieldDisplayTransformer::<Memo, _>::new(InMemoryRecordStore::default())
            .expect("registry");
        let record = memo();
        assert_eq!(transformer.render(&record), transformer.render(&record));
    }

    #[test]
    fn missing_formatter_is_detected_when_the_transformer_is_built() {
        let error = FieldDisplayTransformer::<Incomplete, _>::new(InMemoryRecordStore::default())
            .err()
            .expect("missing formatter");
        assert_eq!(
            error,
            ConfigurationError::MissingFormatter {
                record_type: "incomplete",
                field: "status".to_owned(),
            }
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = FormatterRegistry::<Memo>::default();
        let formatter = |_: &FormatContext<'_, Memo>| -> Result<String, ApplicationError> {
            Ok(String::new())
        };
        registry.register("urgent", formatter).expect("first registration");

        let error = registry.register("urgent", formatter).expect_err("duplicate");
        assert!(matches!(error, ConfigurationError::DuplicateFormatter { .. }));
    }

    #[test]
    fn refetch_reports_missing_records() {
        let store = InMemoryRecordStore::<Memo>::default();
        let record = memo();
        let value = FieldValue::Integer(1);
        let context = FormatContext::new("pages", &value, &record, &store);

        assert_eq!(
            context.refetch().err(),
            Some(ApplicationError::NotFound { record_type: "memo", id: "M-1".to_owned() })
        );

        store.save(record.clone());
        assert_eq!(context.refetch().map(|found| found.id).ok(), Some("M-1".to_owned()));
    }

    #[test]
    fn field_values_render_their_raw_string_form() {
        for (value, expected) in [
            (FieldValue::Integer(20), "20"),
            (FieldValue::Bool(true), "true"),
            (FieldValue::Text("Dell".to_owned()), "Dell"),
            (FieldValue::Null, ""),
        ] {
            assert_eq!(value.to_string(), expected);
        }
        assert_eq!(FieldValue::Text(" 2 ".to_owned()).as_integer(), Some(2));
        assert_eq!(FieldValue::from(None::<i64>), FieldValue::Null);
    }
}
