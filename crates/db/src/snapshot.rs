//! Bridges the async repositories to the synchronous workflow core: the
//! records a single command needs are loaded up front into in-memory stores.

use tracing::debug;

use procure_core::display::InMemoryRecordStore;
use procure_core::domain::procurement::{PurchaseRequest, PurchaseRequestId};
use procure_core::roles::{InMemoryUserStore, WorkflowRoles};

use crate::repositories::{PurchaseRequestRepository, RepositoryError, UserRepository};

/// Users bound to each configured workflow role, in creation order.
pub async fn load_role_snapshot<R>(
    users: &R,
    roles: &WorkflowRoles,
) -> Result<InMemoryUserStore, RepositoryError>
where
    R: UserRepository + ?Sized,
{
    let store = InMemoryUserStore::default();
    for role in roles.all() {
        let holders = users.find_active_by_role_and_tenant(role, &roles.tenant).await?;
        debug!(
            event_name = "db.snapshot.role_loaded",
            role,
            tenant = %roles.tenant,
            holder_count = holders.len(),
            "role holders loaded"
        );
        for user in holders {
            store.insert_with_role(user, role);
        }
    }
    Ok(store)
}

/// Lookup store holding the persisted state of one request, or nothing when
/// the request is missing.
pub async fn load_purchase_request_store<R>(
    requests: &R,
    id: &PurchaseRequestId,
) -> Result<InMemoryRecordStore<PurchaseRequest>, RepositoryError>
where
    R: PurchaseRequestRepository + ?Sized,
{
    let store = InMemoryRecordStore::default();
    if let Some(request) = requests.find_by_id(id).await? {
        store.save(request);
    }
    Ok(store)
}
