use sqlx::Executor;
use tracing::info;

use procure_core::roles::WorkflowRoles;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Seeded role holders for the default `gsa18f` tenant.
const SEED_ROLE_HOLDERS: &[SeedRoleHolder] = &[
    SeedRoleHolder {
        user_id: "user-approver-001",
        email_address: "approver@gsa.gov",
        role_name: "gsa18f_approver",
    },
    SeedRoleHolder {
        user_id: "user-purchaser-001",
        email_address: "purchaser@gsa.gov",
        role_name: "gsa18f_purchaser",
    },
    SeedRoleHolder {
        user_id: "user-micro-001",
        email_address: "micropurchaser@gsa.gov",
        role_name: "gsa18f_micropurchase_purchaser",
    },
];

const SEED_USER_IDS: &[&str] =
    &["user-approver-001", "user-purchaser-001", "user-micro-001", "user-requester-001"];

pub const SEED_REQUEST_ID: &str = "pr-seed-001";
pub const SEED_PROPOSAL_ID: &str = "proposal-seed-001";

/// Deterministic users, role bindings and one micropurchase request.
pub struct RoleSeedDataset;

impl RoleSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        info!(
            event_name = "db.seed.loaded",
            role_holders = SEED_ROLE_HOLDERS.len(),
            request_id = SEED_REQUEST_ID,
            "seed dataset loaded"
        );

        Ok(SeedResult {
            users_seeded: SEED_USER_IDS.to_vec(),
            roles_seeded: SEED_ROLE_HOLDERS.iter().map(|holder| holder.role_name).collect(),
            request_id: SEED_REQUEST_ID,
        })
    }

    /// Checks the seeded rows are present and that every configured role has
    /// at least one active holder in the configured tenant.
    pub async fn verify(
        pool: &DbPool,
        roles: &WorkflowRoles,
    ) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for holder in SEED_ROLE_HOLDERS {
            let bound: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                     SELECT 1 FROM users u JOIN user_roles r ON r.user_id = u.id
                     WHERE u.id = ?1 AND u.email_address = ?2 AND r.role_name = ?3)",
            )
            .bind(holder.user_id)
            .bind(holder.email_address)
            .bind(holder.role_name)
            .fetch_one(pool)
            .await?;
            checks.push((format!("seed-holder:{}", holder.role_name), bound == 1));
        }

        let request_exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM purchase_requests WHERE id = ?1 AND proposal_id = ?2)",
        )
        .bind(SEED_REQUEST_ID)
        .bind(SEED_PROPOSAL_ID)
        .fetch_one(pool)
        .await?;
        checks.push(("seed-request".to_string(), request_exists == 1));

        for role in roles.all() {
            let holders: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM users u JOIN user_roles r ON r.user_id = u.id
                 WHERE r.role_name = ?1 AND u.client_slug = ?2 AND u.active = 1",
            )
            .bind(role)
            .bind(&roles.tenant)
            .fetch_one(pool)
            .await?;
            checks.push((format!("role-resolves:{role}"), holders > 0));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes seeded rows, including any steps routed for the seed request.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        let quoted_users = sql_array_from_ids(SEED_USER_IDS);

        sqlx::query("DELETE FROM proposal_steps WHERE proposal_id = ?1")
            .bind(SEED_PROPOSAL_ID)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM purchase_requests WHERE id = ?1")
            .bind(SEED_REQUEST_ID)
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM user_roles WHERE user_id IN {quoted_users}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM users WHERE id IN {quoted_users}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedRoleHolder {
    user_id: &'static str,
    email_address: &'static str,
    role_name: &'static str,
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id.replace('\'', "''"))).collect::<Vec<_>>();
    format!("({})", quoted.join(", "))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedResult {
    pub users_seeded: Vec<&'static str>,
    pub roles_seeded: Vec<&'static str>,
    pub request_id: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

impl VerificationResult {
    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks.iter().filter(|(_, ok)| !ok).map(|(name, _)| name.as_str()).collect()
    }
}
