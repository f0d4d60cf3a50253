use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use procure_core::domain::procurement::{ProposalId, PurchaseRequest, PurchaseRequestId};
use procure_core::domain::step::ApprovalStep;
use procure_core::domain::user::{User, UserId};

use super::{ProposalRepository, PurchaseRequestRepository, RepositoryError, UserRepository};

/// Insertion order stands in for creation order.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<Vec<(User, HashSet<String>)>>,
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|(user, _)| &user.id == id).map(|(user, _)| user.clone()))
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|(existing, _)| existing.id == user.id) {
            Some((existing, _)) => *existing = user,
            None => users.push((user, HashSet::new())),
        }
        Ok(())
    }

    async fn add_role(&self, user_id: &UserId, role: &str) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        let (_, roles) = users
            .iter_mut()
            .find(|(user, _)| &user.id == user_id)
            .ok_or_else(|| RepositoryError::UnknownUser(user_id.0.clone()))?;
        roles.insert(role.to_string());
        Ok(())
    }

    async fn find_active_by_role_and_tenant(
        &self,
        role: &str,
        tenant: &str,
    ) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .filter(|(user, roles)| roles.contains(role) && user.active && user.belongs_to(tenant))
            .map(|(user, _)| user.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryPurchaseRequestRepository {
    requests: RwLock<HashMap<String, PurchaseRequest>>,
}

#[async_trait::async_trait]
impl PurchaseRequestRepository for InMemoryPurchaseRequestRepository {
    async fn find_by_id(
        &self,
        id: &PurchaseRequestId,
    ) -> Result<Option<PurchaseRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn save(&self, request: PurchaseRequest) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProposalRepository {
    steps: RwLock<HashMap<String, Vec<ApprovalStep>>>,
}

#[async_trait::async_trait]
impl ProposalRepository for InMemoryProposalRepository {
    async fn append_initial_steps(
        &self,
        proposal_id: &ProposalId,
        steps: &[ApprovalStep],
    ) -> Result<(), RepositoryError> {
        let mut stored = self.steps.write().await;
        if stored.get(&proposal_id.0).is_some_and(|existing| !existing.is_empty()) {
            return Err(RepositoryError::StepsAlreadyInitialized(proposal_id.0.clone()));
        }
        stored.insert(proposal_id.0.clone(), steps.to_vec());
        Ok(())
    }

    async fn steps_for(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<Vec<ApprovalStep>, RepositoryError> {
        let stored = self.steps.read().await;
        Ok(stored.get(&proposal_id.0).cloned().unwrap_or_default())
    }
}
