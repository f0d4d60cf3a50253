use procure_core::approvals::{
    ApprovalCoordinator, InMemoryProposalTracker, StepFactory, TracingNotifier,
};
use procure_core::audit::{AuditContext, InMemoryAuditSink};
use procure_core::domain::procurement::PurchaseRequestId;
use procure_core::errors::ApplicationError;
use procure_core::roles::StoreRoleDirectory;
use procure_db::load_role_snapshot;
use procure_db::repositories::{
    ProposalRepository, PurchaseRequestRepository, RepositoryError, SqlProposalRepository,
    SqlPurchaseRequestRepository, SqlUserRepository,
};
use serde::Serialize;
use uuid::Uuid;

use crate::commands::{
    application_failure, build_runtime, load_config, open_database, CommandResult, Failure,
    StepSummary,
};

const ACTOR: &str = "procure-cli";

#[derive(Debug, Serialize)]
struct RouteOutput {
    request_id: String,
    proposal_id: String,
    correlation_id: String,
    steps: Vec<StepSummary>,
    subscribers_notified: bool,
    audit_events: Vec<String>,
}

/// Builds and stores the approval steps for one request, optionally
/// notifying its subscribers with `comment` afterwards.
pub fn run(request_id: &str, comment: Option<&str>) -> CommandResult {
    let config = match load_config("route") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("route") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let roles = config.workflow_roles();
    let id = PurchaseRequestId(request_id.to_string());

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;

        let request = SqlPurchaseRequestRepository::new(pool.clone())
            .find_by_id(&id)
            .await
            .map_err(repository_failure)?
            .ok_or_else(|| {
                application_failure(ApplicationError::NotFound {
                    record_type: "purchase_request",
                    id: request_id.to_string(),
                })
            })?;

        let snapshot = load_role_snapshot(&SqlUserRepository::new(pool.clone()), &roles)
            .await
            .map_err(repository_failure)?;

        let tracker = InMemoryProposalTracker::default();
        let audit_sink = InMemoryAuditSink::default();
        let coordinator = ApprovalCoordinator::new(
            StepFactory::new(StoreRoleDirectory::new(snapshot), roles.clone()),
            &tracker,
            TracingNotifier,
            audit_sink.clone(),
        );
        let audit = AuditContext::new(Uuid::new_v4().to_string(), ACTOR);

        coordinator.stage(&request, &audit).map_err(application_failure)?;

        let staged = tracker.take(&request.proposal_id);
        if let Err(error) = SqlProposalRepository::new(pool.clone())
            .append_initial_steps(&request.proposal_id, &staged)
            .await
        {
            let rejection = ApplicationError::Persistence(error.to_string());
            coordinator.record_rejection(&request, &audit, &rejection);
            return Err(repository_failure(error));
        }
        coordinator.confirm_initialized(&request, &audit, &staged);

        if let Some(comment) = comment {
            coordinator.notify_subscribers(&request, comment, &audit);
        }

        pool.close().await;
        Ok::<RouteOutput, Failure>(RouteOutput {
            request_id: request.id.0.clone(),
            proposal_id: request.proposal_id.0.clone(),
            correlation_id: audit.correlation_id,
            steps: staged.iter().map(StepSummary::from).collect(),
            subscribers_notified: comment.is_some(),
            audit_events: audit_sink.events().into_iter().map(|event| event.event_type).collect(),
        })
    });

    match result {
        Ok(output) => {
            let message = routed_message(&output.proposal_id, &output.steps);
            CommandResult::success_with_details("route", message, output)
        }
        Err(failure) => CommandResult::from_failure("route", failure),
    }
}

fn routed_message(proposal_id: &str, steps: &[StepSummary]) -> String {
    let assignees = steps
        .iter()
        .map(|step| format!("{} -> {}", step.kind, step.assignee))
        .collect::<Vec<_>>();
    format!("proposal {proposal_id} routed: {}", assignees.join(", "))
}

fn repository_failure(error: RepositoryError) -> Failure {
    if matches!(error, RepositoryError::StepsAlreadyInitialized(_)) {
        return ("steps_already_initialized", error.to_string(), 10);
    }
    application_failure(ApplicationError::from(error))
}
