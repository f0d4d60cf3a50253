use async_trait::async_trait;
use thiserror::Error;

use procure_core::domain::procurement::{ProposalId, PurchaseRequest, PurchaseRequestId};
use procure_core::domain::step::ApprovalStep;
use procure_core::domain::user::{User, UserId};
use procure_core::errors::ApplicationError;

pub mod memory;
pub mod proposal;
pub mod purchase_request;
pub mod user;

pub use memory::{
    InMemoryProposalRepository, InMemoryPurchaseRequestRepository, InMemoryUserRepository,
};
pub use proposal::SqlProposalRepository;
pub use purchase_request::SqlPurchaseRequestRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("proposal `{0}` already has approval steps")]
    StepsAlreadyInitialized(String),
    #[error("user `{0}` does not exist")]
    UnknownUser(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    async fn save(&self, user: User) -> Result<(), RepositoryError>;
    async fn add_role(&self, user_id: &UserId, role: &str) -> Result<(), RepositoryError>;

    /// Active users holding `role` in `tenant`, oldest first.
    async fn find_active_by_role_and_tenant(
        &self,
        role: &str,
        tenant: &str,
    ) -> Result<Vec<User>, RepositoryError>;
}

#[async_trait]
pub trait PurchaseRequestRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &PurchaseRequestId,
    ) -> Result<Option<PurchaseRequest>, RepositoryError>;
    async fn save(&self, request: PurchaseRequest) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProposalRepository: Send + Sync {
    /// Fails with `StepsAlreadyInitialized` when the proposal already has steps;
    /// nothing is written in that case.
    async fn append_initial_steps(
        &self,
        proposal_id: &ProposalId,
        steps: &[ApprovalStep],
    ) -> Result<(), RepositoryError>;

    async fn steps_for(&self, proposal_id: &ProposalId)
        -> Result<Vec<ApprovalStep>, RepositoryError>;
}
