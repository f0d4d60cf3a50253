use procure_core::display::{DisplayFields, FieldDisplayTransformer, RecordLookup};
use procure_core::domain::procurement::{PurchaseRequest, PurchaseRequestId};
use procure_core::errors::ApplicationError;
use procure_db::load_purchase_request_store;
use procure_db::repositories::{
    ProposalRepository, SqlProposalRepository, SqlPurchaseRequestRepository,
};
use serde::Serialize;

use crate::commands::{
    application_failure, build_runtime, load_config, open_database, CommandResult, Failure,
    StepSummary,
};

#[derive(Debug, Serialize)]
struct HistoryOutput {
    request_id: String,
    public_identifier: String,
    fields: DisplayFields,
    steps: Vec<StepSummary>,
}

/// Renders a request the way change history shows it, with its stored steps.
pub fn run(request_id: &str) -> CommandResult {
    let config = match load_config("history") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("history") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let id = PurchaseRequestId(request_id.to_string());

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;

        let requests = SqlPurchaseRequestRepository::new(pool.clone());
        let store = load_purchase_request_store(&requests, &id)
            .await
            .map_err(|error| application_failure(error.into()))?;
        let request = store
            .find_by_id(request_id)
            .map_err(application_failure)?
            .ok_or_else(|| {
                application_failure(ApplicationError::NotFound {
                    record_type: "purchase_request",
                    id: request_id.to_string(),
                })
            })?;

        let transformer = FieldDisplayTransformer::<PurchaseRequest, _>::new(&store)
            .map_err(|error| application_failure(error.into()))?;
        let fields = transformer.render(&request).map_err(application_failure)?;

        let steps = SqlProposalRepository::new(pool.clone())
            .steps_for(&request.proposal_id)
            .await
            .map_err(|error| application_failure(error.into()))?;

        pool.close().await;
        Ok::<HistoryOutput, Failure>(HistoryOutput {
            request_id: request.id.0.clone(),
            public_identifier: request.public_identifier(),
            fields,
            steps: steps.iter().map(StepSummary::from).collect(),
        })
    });

    match result {
        Ok(output) => {
            let message = format!(
                "request {} ({}): {} fields rendered, {} steps",
                output.request_id,
                output.public_identifier,
                output.fields.len(),
                output.steps.len()
            );
            CommandResult::success_with_details("history", message, output)
        }
        Err(failure) => CommandResult::from_failure("history", failure),
    }
}
