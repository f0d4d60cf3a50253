use chrono::Utc;
use sqlx::Row;
use tracing::{debug, warn};

use procure_core::domain::procurement::ProposalId;
use procure_core::domain::step::{ApprovalStep, StepKind};

use super::user::row_to_user;
use super::{ProposalRepository, RepositoryError};
use crate::DbPool;

/// Step storage for proposals. `UNIQUE(proposal_id, position)` makes the
/// initial append at-most-once even across concurrent callers.
pub struct SqlProposalRepository {
    pool: DbPool,
}

impl SqlProposalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.is_unique_violation(),
        _ => false,
    }
}

fn row_to_step(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalStep, RepositoryError> {
    let kind_str: String =
        row.try_get("kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role: String =
        row.try_get("role_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let position: i64 =
        row.try_get("position").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let kind = StepKind::parse(&kind_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown step kind `{kind_str}`")))?;
    let position = usize::try_from(position)
        .map_err(|_| RepositoryError::Decode(format!("negative step position `{position}`")))?;

    Ok(ApprovalStep { kind, role, assignee: row_to_user(row)?, position })
}

#[async_trait::async_trait]
impl ProposalRepository for SqlProposalRepository {
    async fn append_initial_steps(
        &self,
        proposal_id: &ProposalId,
        steps: &[ApprovalStep],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM proposal_steps WHERE proposal_id = ?1")
                .bind(&proposal_id.0)
                .fetch_one(&mut *tx)
                .await?;
        if existing > 0 {
            warn!(
                event_name = "db.proposal.steps_exist",
                proposal_id = %proposal_id.0,
                existing,
                "refusing to append a second initial step set"
            );
            return Err(RepositoryError::StepsAlreadyInitialized(proposal_id.0.clone()));
        }

        let created_at = Utc::now().to_rfc3339();
        for step in steps {
            let position = i64::try_from(step.position).map_err(|_| {
                RepositoryError::Decode(format!("step position `{}` out of range", step.position))
            })?;
            let inserted = sqlx::query(
                "INSERT INTO proposal_steps (proposal_id, position, kind, role_name, user_id, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&proposal_id.0)
            .bind(position)
            .bind(step.kind.as_str())
            .bind(&step.role)
            .bind(&step.assignee.id.0)
            .bind(&created_at)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {}
                Err(error) if is_unique_violation(&error) => {
                    return Err(RepositoryError::StepsAlreadyInitialized(proposal_id.0.clone()));
                }
                Err(error) => return Err(error.into()),
            }
        }

        tx.commit().await?;

        debug!(
            event_name = "db.proposal.steps_appended",
            proposal_id = %proposal_id.0,
            step_count = steps.len(),
            "initial steps stored"
        );
        Ok(())
    }

    async fn steps_for(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<Vec<ApprovalStep>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT s.kind, s.role_name, s.position,
                    u.id, u.email_address, u.first_name, u.last_name, u.client_slug, u.active,
                    u.created_at
             FROM proposal_steps s
             JOIN users u ON u.id = s.user_id
             WHERE s.proposal_id = ?1
             ORDER BY s.position ASC",
        )
        .bind(&proposal_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_step).collect()
    }
}
