use std::collections::HashSet;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::domain::user::{User, UserId};
use crate::errors::{ApplicationError, ConfigurationError};

/// Role names and tenant the approval pipeline resolves assignees from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRoles {
    pub tenant: String,
    pub approver: String,
    pub purchaser: String,
    pub micropurchase_purchaser: String,
}

impl Default for WorkflowRoles {
    fn default() -> Self {
        Self {
            tenant: "gsa18f".to_owned(),
            approver: "gsa18f_approver".to_owned(),
            purchaser: "gsa18f_purchaser".to_owned(),
            micropurchase_purchaser: "gsa18f_micropurchase_purchaser".to_owned(),
        }
    }
}

impl WorkflowRoles {
    pub fn all(&self) -> [&str; 3] {
        [self.approver.as_str(), self.purchaser.as_str(), self.micropurchase_purchaser.as_str()]
    }
}

/// External user store contract.
pub trait UserStore: Send + Sync {
    /// Active users holding `role` in `tenant`, in creation order.
    fn find_active_users_by_role_and_tenant(
        &self,
        role: &str,
        tenant: &str,
    ) -> Result<Vec<User>, ApplicationError>;
}

pub trait RoleDirectory: Send + Sync {
    fn resolve(&self, role: &str, tenant: &str) -> Result<User, ApplicationError>;
}

#[derive(Clone, Debug)]
pub struct StoreRoleDirectory<S> {
    store: S,
}

impl<S> StoreRoleDirectory<S>
where
    S: UserStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> RoleDirectory for StoreRoleDirectory<S>
where
    S: UserStore,
{
    fn resolve(&self, role: &str, tenant: &str) -> Result<User, ApplicationError> {
        let candidates = self.store.find_active_users_by_role_and_tenant(role, tenant)?;
        let candidate_count = candidates.len();

        // TODO: reject ambiguous bindings once role uniqueness is enforced at seed time.
        let Some(user) =
            candidates.into_iter().find(|user| user.active && user.belongs_to(tenant))
        else {
            error!(
                event_name = "workflow.role.unresolved",
                role,
                tenant,
                "no active user holds the required role"
            );
            return Err(ConfigurationError::MissingRoleUser {
                role: role.to_owned(),
                tenant: tenant.to_owned(),
            }
            .into());
        };

        debug!(
            event_name = "workflow.role.resolved",
            role,
            tenant,
            user_id = %user.id.0,
            candidate_count,
            "role resolved to user"
        );
        Ok(user)
    }
}

impl<T> RoleDirectory for &T
where
    T: RoleDirectory + ?Sized,
{
    fn resolve(&self, role: &str, tenant: &str) -> Result<User, ApplicationError> {
        (**self).resolve(role, tenant)
    }
}

#[derive(Clone, Debug)]
struct RoleAssignment {
    user: User,
    roles: HashSet<String>,
}

/// Insertion order stands in for creation order.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    assignments: RwLock<Vec<RoleAssignment>>,
}

impl InMemoryUserStore {
    pub fn insert(&self, user: User) {
        let mut assignments = match self.assignments.write() {
            Ok(assignments) => assignments,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(existing) =
            assignments.iter_mut().find(|assignment| assignment.user.id == user.id)
        {
            existing.user = user;
            return;
        }
        assignments.push(RoleAssignment { user, roles: HashSet::new() });
    }

    /// Returns false when the user is unknown.
    pub fn add_role(&self, user_id: &UserId, role: impl Into<String>) -> bool {
        let mut assignments = match self.assignments.write() {
            Ok(assignments) => assignments,
            Err(poisoned) => poisoned.into_inner(),
        };
        match assignments.iter_mut().find(|assignment| &assignment.user.id == user_id) {
            Some(assignment) => {
                assignment.roles.insert(role.into());
                true
            }
            None => false,
        }
    }

    pub fn insert_with_role(&self, user: User, role: impl Into<String>) {
        let user_id = user.id.clone();
        self.insert(user);
        self.add_role(&user_id, role);
    }

    pub fn has_role(&self, user_id: &UserId, role: &str) -> bool {
        let assignments = match self.assignments.read() {
            Ok(assignments) => assignments,
            Err(poisoned) => poisoned.into_inner(),
        };
        assignments
            .iter()
            .any(|assignment| &assignment.user.id == user_id && assignment.roles.contains(role))
    }

    pub fn with_role(&self, role: &str) -> Vec<User> {
        let assignments = match self.assignments.read() {
            Ok(assignments) => assignments,
            Err(poisoned) => poisoned.into_inner(),
        };
        assignments
            .iter()
            .filter(|assignment| assignment.roles.contains(role))
            .map(|assignment| assignment.user.clone())
            .collect()
    }
}

impl UserStore for InMemoryUserStore {
    fn find_active_users_by_role_and_tenant(
        &self,
        role: &str,
        tenant: &str,
    ) -> Result<Vec<User>, ApplicationError> {
        Ok(self
            .with_role(role)
            .into_iter()
            .filter(|user| user.active && user.belongs_to(tenant))
            .collect())
    }
}
