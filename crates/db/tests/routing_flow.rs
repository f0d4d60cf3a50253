use procure_core::approvals::{
    ApprovalCoordinator, InMemoryProposalTracker, RecordingNotifier, StepFactory,
};
use procure_core::audit::{AuditContext, InMemoryAuditSink};
use procure_core::display::{FieldDisplayTransformer, PLACEHOLDER};
use procure_core::domain::procurement::{ProposalId, PurchaseRequestId};
use procure_core::domain::step::StepKind;
use procure_core::errors::ApplicationError;
use procure_core::roles::{StoreRoleDirectory, WorkflowRoles};
use procure_db::fixtures::{SEED_PROPOSAL_ID, SEED_REQUEST_ID};
use procure_db::repositories::{
    ProposalRepository, PurchaseRequestRepository, RepositoryError, SqlProposalRepository,
    SqlPurchaseRequestRepository, SqlUserRepository,
};
use procure_db::{
    connect_with_settings, load_purchase_request_store, load_role_snapshot, migrations,
    RoleSeedDataset,
};
use tempfile::TempDir;

async fn seeded_pool(dir: &TempDir) -> procure_db::DbPool {
    let url = format!("sqlite://{}", dir.path().join("procure.db").display());
    let pool = connect_with_settings(&url, 2, 5).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    RoleSeedDataset::load(&pool).await.expect("seed");
    pool
}

#[tokio::test]
async fn seeded_micropurchase_routes_to_the_micropurchase_holder() {
    let dir = TempDir::new().expect("tempdir");
    let pool = seeded_pool(&dir).await;
    let roles = WorkflowRoles::default();

    let request = SqlPurchaseRequestRepository::new(pool.clone())
        .find_by_id(&PurchaseRequestId(SEED_REQUEST_ID.to_string()))
        .await
        .expect("query")
        .expect("seed request");
    let snapshot =
        load_role_snapshot(&SqlUserRepository::new(pool.clone()), &roles).await.expect("snapshot");

    let tracker = InMemoryProposalTracker::default();
    let coordinator = ApprovalCoordinator::new(
        StepFactory::new(StoreRoleDirectory::new(snapshot), roles),
        &tracker,
        RecordingNotifier::default(),
        InMemoryAuditSink::default(),
    );
    let steps = coordinator
        .initialize(&request, &AuditContext::new("it-routing", "test"))
        .expect("initialize");

    let proposals = SqlProposalRepository::new(pool.clone());
    let proposal_id = ProposalId(SEED_PROPOSAL_ID.to_string());
    proposals.append_initial_steps(&proposal_id, &steps).await.expect("persist");

    let stored = proposals.steps_for(&proposal_id).await.expect("load steps");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].kind, StepKind::Approval);
    assert_eq!(stored[0].assignee_email(), "approver@gsa.gov");
    assert_eq!(stored[1].kind, StepKind::Purchase);
    assert_eq!(stored[1].assignee_email(), "micropurchaser@gsa.gov");

    let again = proposals.append_initial_steps(&proposal_id, &steps).await;
    assert!(matches!(again, Err(RepositoryError::StepsAlreadyInitialized(_))));
}

#[tokio::test]
async fn second_persist_of_staged_steps_is_audited_as_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let pool = seeded_pool(&dir).await;
    let roles = WorkflowRoles::default();

    let request = SqlPurchaseRequestRepository::new(pool.clone())
        .find_by_id(&PurchaseRequestId(SEED_REQUEST_ID.to_string()))
        .await
        .expect("query")
        .expect("seed request");
    let snapshot =
        load_role_snapshot(&SqlUserRepository::new(pool.clone()), &roles).await.expect("snapshot");

    let tracker = InMemoryProposalTracker::default();
    let sink = InMemoryAuditSink::default();
    let coordinator = ApprovalCoordinator::new(
        StepFactory::new(StoreRoleDirectory::new(snapshot), roles),
        &tracker,
        RecordingNotifier::default(),
        sink.clone(),
    );
    let proposals = SqlProposalRepository::new(pool.clone());
    let audit = AuditContext::new("it-rerouting", "test");

    for _ in 0..2 {
        coordinator.stage(&request, &audit).expect("stage");
        let staged = tracker.take(&request.proposal_id);
        match proposals.append_initial_steps(&request.proposal_id, &staged).await {
            Ok(()) => coordinator.confirm_initialized(&request, &audit, &staged),
            Err(error) => {
                assert!(matches!(error, RepositoryError::StepsAlreadyInitialized(_)));
                let rejection = ApplicationError::Persistence(error.to_string());
                coordinator.record_rejection(&request, &audit, &rejection);
            }
        }
    }

    let event_types = sink.events().into_iter().map(|event| event.event_type).collect::<Vec<_>>();
    assert_eq!(event_types, vec!["workflow.steps_initialized", "workflow.steps_rejected"]);
    assert_eq!(proposals.steps_for(&request.proposal_id).await.expect("load").len(), 2);
}

#[tokio::test]
async fn seeded_request_renders_its_display_fields() {
    let dir = TempDir::new().expect("tempdir");
    let pool = seeded_pool(&dir).await;
    let requests = SqlPurchaseRequestRepository::new(pool.clone());
    let id = PurchaseRequestId(SEED_REQUEST_ID.to_string());

    let request = requests.find_by_id(&id).await.expect("query").expect("seed request");
    let store = load_purchase_request_store(&requests, &id).await.expect("store");
    let transformer = FieldDisplayTransformer::new(store).expect("formatters");
    let display = transformer.render(&request).expect("render");

    assert_eq!(display["office"], "Dayton");
    assert_eq!(display["purchase_type"], "Micropurchase");
    assert_eq!(display["total_price"], "370.00");
    assert_eq!(display["recurring"], "This is not recurring");
    assert_eq!(display["is_tock_billable"], "This project is billable");
    assert_eq!(display["date_requested"], "Jun 01, 2015");
    assert_eq!(display["additional_info"], "--");
}

#[tokio::test]
async fn legacy_office_index_renders_as_placeholder() {
    let dir = TempDir::new().expect("tempdir");
    let pool = seeded_pool(&dir).await;
    sqlx::query("UPDATE purchase_requests SET office = 9 WHERE id = ?")
        .bind(SEED_REQUEST_ID)
        .execute(&pool)
        .await
        .expect("write legacy office");

    let requests = SqlPurchaseRequestRepository::new(pool.clone());
    let id = PurchaseRequestId(SEED_REQUEST_ID.to_string());
    let request = requests.find_by_id(&id).await.expect("query").expect("seed request");
    let store = load_purchase_request_store(&requests, &id).await.expect("store");
    let display = FieldDisplayTransformer::new(store)
        .expect("formatters")
        .render(&request)
        .expect("render");

    assert_eq!(display["office"], PLACEHOLDER);
    assert_eq!(display["purchase_type"], "Micropurchase");
}
