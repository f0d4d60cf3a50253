pub mod coordinator;

use tracing::info;

use crate::domain::procurement::{PurchaseRequest, PurchaseType};
use crate::domain::step::{ApprovalStep, StepKind};
use crate::errors::{ApplicationError, FieldViolation, ValidationErrors};
use crate::roles::{RoleDirectory, WorkflowRoles};

pub use coordinator::{
    ApprovalCoordinator, InMemoryProposalTracker, Notifier, ProposalTracker, RecordingNotifier,
    TracingNotifier, UpdateNotification,
};

/// Builds the ordered approval pipeline for a purchase request: the approver
/// signs off first, then the purchaser for the request's purchase type buys.
#[derive(Clone, Debug)]
pub struct StepFactory<D> {
    directory: D,
    roles: WorkflowRoles,
}

impl<D> StepFactory<D>
where
    D: RoleDirectory,
{
    pub fn new(directory: D, roles: WorkflowRoles) -> Self {
        Self { directory, roles }
    }

    pub fn roles(&self) -> &WorkflowRoles {
        &self.roles
    }

    pub fn purchaser_role(&self, purchase_type: PurchaseType) -> &str {
        match purchase_type {
            PurchaseType::Micropurchase => &self.roles.micropurchase_purchaser,
            PurchaseType::Software
            | PurchaseType::OfficeSupply
            | PurchaseType::Hardware
            | PurchaseType::Other => &self.roles.purchaser,
        }
    }

    pub fn build_steps(
        &self,
        request: &PurchaseRequest,
    ) -> Result<Vec<ApprovalStep>, ApplicationError> {
        request.validate()?;
        let purchase_type = request.purchase_type.ok_or_else(|| {
            let mut errors = ValidationErrors::default();
            errors.push(FieldViolation::new(
                "purchase_type",
                "REQUIRED",
                "purchase type can't be blank",
            ));
            ApplicationError::from(errors)
        })?;

        let tenant = self.roles.tenant.as_str();
        let pipeline = [
            (StepKind::Approval, self.roles.approver.as_str()),
            (StepKind::Purchase, self.purchaser_role(purchase_type)),
        ];

        let steps = pipeline
            .into_iter()
            .enumerate()
            .map(|(position, (kind, role))| {
                let assignee = self.directory.resolve(role, tenant)?;
                Ok(ApprovalStep { kind, role: role.to_owned(), assignee, position })
            })
            .collect::<Result<Vec<_>, ApplicationError>>()?;

        info!(
            event_name = "workflow.steps.built",
            request_id = %request.id.0,
            purchase_type = purchase_type.label(),
            step_count = steps.len(),
            "approval steps built"
        );
        Ok(steps)
    }
}
