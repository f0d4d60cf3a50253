use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::Row;
use tracing::warn;

use procure_core::domain::procurement::{
    Office, ProposalId, PurchaseRequest, PurchaseRequestId, PurchaseType, RecurrenceInterval,
    Urgency,
};
use procure_core::errors::DomainError;

use super::user::parse_timestamp;
use super::{PurchaseRequestRepository, RepositoryError};
use crate::DbPool;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqlPurchaseRequestRepository {
    pool: DbPool,
}

impl SqlPurchaseRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T>(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_date(raw: Option<String>) -> Result<Option<NaiveDate>, RepositoryError> {
    raw.map(|value| {
        NaiveDate::parse_from_str(&value, DATE_FORMAT)
            .map_err(|e| RepositoryError::Decode(format!("invalid date `{value}`: {e}")))
    })
    .transpose()
}

fn parse_decimal(raw: Option<String>) -> Result<Option<Decimal>, RepositoryError> {
    raw.map(|value| {
        Decimal::from_str(&value)
            .map_err(|e| RepositoryError::Decode(format!("invalid decimal `{value}`: {e}")))
    })
    .transpose()
}

fn decode_code<T>(
    raw: Option<i64>,
    from_code: fn(i64) -> Result<T, DomainError>,
) -> Result<Option<T>, RepositoryError> {
    raw.map(|code| from_code(code).map_err(|e| RepositoryError::Decode(e.to_string())))
        .transpose()
}

/// Option-list indexes that fall outside the list load as blank.
fn decode_index<T>(
    row: &sqlx::sqlite::SqliteRow,
    column: &'static str,
    from_index: fn(i64) -> Result<T, DomainError>,
) -> Result<Option<T>, RepositoryError> {
    let raw: Option<i64> = decode(row, column)?;
    Ok(raw.and_then(|index| match from_index(index) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(
                event_name = "db.purchase_request.unknown_index",
                column,
                index,
                error = %error,
                "stored option index is outside the option list; loading it as blank"
            );
            None
        }
    }))
}

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<PurchaseRequest, RepositoryError> {
    let created_at: String = decode(row, "created_at")?;
    let updated_at: String = decode(row, "updated_at")?;

    Ok(PurchaseRequest {
        id: PurchaseRequestId(decode(row, "id")?),
        proposal_id: ProposalId(decode(row, "proposal_id")?),
        product_name_and_description: decode(row, "product_name_and_description")?,
        justification: decode(row, "justification")?,
        link_to_product: decode(row, "link_to_product")?,
        additional_info: decode(row, "additional_info")?,
        cost_per_unit: parse_decimal(decode(row, "cost_per_unit")?)?,
        quantity: decode(row, "quantity")?,
        purchase_type: decode_code(decode(row, "purchase_type")?, PurchaseType::from_code)?,
        urgency: decode_code(decode(row, "urgency")?, Urgency::from_code)?,
        office: decode_index(row, "office", Office::from_index)?,
        recurring: decode(row, "recurring")?,
        recurring_interval: decode_index(
            row,
            "recurring_interval",
            RecurrenceInterval::from_index,
        )?,
        recurring_length: decode(row, "recurring_length")?,
        is_tock_billable: decode(row, "is_tock_billable")?,
        client_billed: decode(row, "client_billed")?,
        date_requested: parse_date(decode(row, "date_requested")?)?,
        start_date: parse_date(decode(row, "start_date")?)?,
        end_date: parse_date(decode(row, "end_date")?)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|value| value.format(DATE_FORMAT).to_string())
}

#[async_trait::async_trait]
impl PurchaseRequestRepository for SqlPurchaseRequestRepository {
    async fn find_by_id(
        &self,
        id: &PurchaseRequestId,
    ) -> Result<Option<PurchaseRequest>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, proposal_id, product_name_and_description, justification, link_to_product,
                    additional_info, cost_per_unit, quantity, purchase_type, urgency, office,
                    recurring, recurring_interval, recurring_length, is_tock_billable,
                    client_billed, date_requested, start_date, end_date, created_at, updated_at
             FROM purchase_requests WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, request: PurchaseRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO purchase_requests (
                 id, proposal_id, product_name_and_description, justification, link_to_product,
                 additional_info, cost_per_unit, quantity, purchase_type, urgency, office,
                 recurring, recurring_interval, recurring_length, is_tock_billable,
                 client_billed, date_requested, start_date, end_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 product_name_and_description = excluded.product_name_and_description,
                 justification = excluded.justification,
                 link_to_product = excluded.link_to_product,
                 additional_info = excluded.additional_info,
                 cost_per_unit = excluded.cost_per_unit,
                 quantity = excluded.quantity,
                 purchase_type = excluded.purchase_type,
                 urgency = excluded.urgency,
                 office = excluded.office,
                 recurring = excluded.recurring,
                 recurring_interval = excluded.recurring_interval,
                 recurring_length = excluded.recurring_length,
                 is_tock_billable = excluded.is_tock_billable,
                 client_billed = excluded.client_billed,
                 date_requested = excluded.date_requested,
                 start_date = excluded.start_date,
                 end_date = excluded.end_date,
                 updated_at = excluded.updated_at",
        )
        .bind(&request.id.0)
        .bind(&request.proposal_id.0)
        .bind(&request.product_name_and_description)
        .bind(&request.justification)
        .bind(&request.link_to_product)
        .bind(&request.additional_info)
        .bind(request.cost_per_unit.map(|cost| cost.to_string()))
        .bind(request.quantity)
        .bind(request.purchase_type.map(PurchaseType::code))
        .bind(request.urgency.map(Urgency::code))
        .bind(request.office.map(Office::index))
        .bind(request.recurring)
        .bind(request.recurring_interval.map(RecurrenceInterval::index))
        .bind(request.recurring_length)
        .bind(request.is_tock_billable)
        .bind(request.client_billed)
        .bind(format_date(request.date_requested))
        .bind(format_date(request.start_date))
        .bind(format_date(request.end_date))
        .bind(request.created_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
