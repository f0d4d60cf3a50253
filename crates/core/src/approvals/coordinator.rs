use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::approvals::StepFactory;
use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::procurement::{ProposalId, PurchaseRequest, PurchaseRequestId};
use crate::domain::step::ApprovalStep;
use crate::errors::ApplicationError;
use crate::roles::RoleDirectory;

/// The proposal that owns a request's steps and drives their completion.
pub trait ProposalTracker: Send + Sync {
    fn append_initial_steps(
        &self,
        proposal_id: &ProposalId,
        steps: Vec<ApprovalStep>,
    ) -> Result<(), ApplicationError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNotification {
    pub request_id: PurchaseRequestId,
    pub proposal_id: ProposalId,
    pub public_identifier: String,
    pub comment: String,
}

/// Fire-and-forget; delivery guarantees belong to the implementation.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: UpdateNotification);
}

pub struct ApprovalCoordinator<D, T, N, S> {
    factory: StepFactory<D>,
    tracker: T,
    notifier: N,
    audit_sink: S,
}

impl<D, T, N, S> ApprovalCoordinator<D, T, N, S>
where
    D: RoleDirectory,
    T: ProposalTracker,
    N: Notifier,
    S: AuditSink,
{
    pub fn new(factory: StepFactory<D>, tracker: T, notifier: N, audit_sink: S) -> Self {
        Self { factory, tracker, notifier, audit_sink }
    }

    pub fn factory(&self) -> &StepFactory<D> {
        &self.factory
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Seeds the request's proposal with its step sequence. Call once per
    /// request; deduplication is left to the tracker.
    pub fn initialize(
        &self,
        request: &PurchaseRequest,
        audit: &AuditContext,
    ) -> Result<Vec<ApprovalStep>, ApplicationError> {
        let steps = self.stage(request, audit)?;
        self.confirm_initialized(request, audit, &steps);
        Ok(steps)
    }

    /// Builds the steps and hands them to the tracker without announcing
    /// them. Callers that persist the staged steps elsewhere finish with
    /// [`Self::confirm_initialized`] or [`Self::record_rejection`].
    pub fn stage(
        &self,
        request: &PurchaseRequest,
        audit: &AuditContext,
    ) -> Result<Vec<ApprovalStep>, ApplicationError> {
        let steps = match self.factory.build_steps(request) {
            Ok(steps) => steps,
            Err(error) => {
                self.record_rejection(request, audit, &error);
                return Err(error);
            }
        };

        if let Err(error) = self.tracker.append_initial_steps(&request.proposal_id, steps.clone())
        {
            self.record_rejection(request, audit, &error);
            return Err(error);
        }
        Ok(steps)
    }

    pub fn confirm_initialized(
        &self,
        request: &PurchaseRequest,
        audit: &AuditContext,
        steps: &[ApprovalStep],
    ) {
        let mut event = AuditEvent::new(
            Some(request.id.clone()),
            audit,
            "workflow.steps_initialized",
            AuditCategory::Workflow,
            AuditOutcome::Success,
        )
        .with_metadata("proposal_id", request.proposal_id.0.clone());
        for step in steps {
            event = event.with_metadata(step.kind.as_str(), step.assignee_email());
        }
        self.audit_sink.emit(event);

        info!(
            event_name = "workflow.steps.initialized",
            request_id = %request.id.0,
            proposal_id = %request.proposal_id.0,
            correlation_id = %audit.correlation_id,
            "proposal seeded with approval steps"
        );
    }

    pub fn notify_subscribers(
        &self,
        request: &PurchaseRequest,
        comment: &str,
        audit: &AuditContext,
    ) {
        self.notifier.notify(UpdateNotification {
            request_id: request.id.clone(),
            proposal_id: request.proposal_id.clone(),
            public_identifier: request.public_identifier(),
            comment: comment.to_owned(),
        });

        self.audit_sink.emit(
            AuditEvent::new(
                Some(request.id.clone()),
                audit,
                "workflow.subscribers_notified",
                AuditCategory::Notification,
                AuditOutcome::Success,
            )
            .with_metadata("comment", comment),
        );
    }

    pub fn record_rejection(
        &self,
        request: &PurchaseRequest,
        audit: &AuditContext,
        error: &ApplicationError,
    ) {
        warn!(
            event_name = "workflow.steps.rejected",
            request_id = %request.id.0,
            correlation_id = %audit.correlation_id,
            error = %error,
            "approval steps were not initialized"
        );
        let outcome = if error.validation_errors().is_some() {
            AuditOutcome::Rejected
        } else {
            AuditOutcome::Failed
        };
        self.audit_sink.emit(
            AuditEvent::new(
                Some(request.id.clone()),
                audit,
                "workflow.steps_rejected",
                AuditCategory::Workflow,
                outcome,
            )
            .with_metadata("error", error.to_string()),
        );
    }
}

/// Appends every call it receives, including repeats for the same proposal.
#[derive(Debug, Default)]
pub struct InMemoryProposalTracker {
    steps: Mutex<HashMap<String, Vec<ApprovalStep>>>,
}

impl InMemoryProposalTracker {
    pub fn steps_for(&self, proposal_id: &ProposalId) -> Vec<ApprovalStep> {
        let steps = match self.steps.lock() {
            Ok(steps) => steps,
            Err(poisoned) => poisoned.into_inner(),
        };
        steps.get(&proposal_id.0).cloned().unwrap_or_default()
    }

    pub fn take(&self, proposal_id: &ProposalId) -> Vec<ApprovalStep> {
        let mut steps = match self.steps.lock() {
            Ok(steps) => steps,
            Err(poisoned) => poisoned.into_inner(),
        };
        steps.remove(&proposal_id.0).unwrap_or_default()
    }
}

impl ProposalTracker for InMemoryProposalTracker {
    fn append_initial_steps(
        &self,
        proposal_id: &ProposalId,
        steps: Vec<ApprovalStep>,
    ) -> Result<(), ApplicationError> {
        let mut tracked = match self.steps.lock() {
            Ok(tracked) => tracked,
            Err(poisoned) => poisoned.into_inner(),
        };
        tracked.entry(proposal_id.0.clone()).or_default().extend(steps);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<UpdateNotification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<UpdateNotification> {
        match self.notifications.lock() {
            Ok(notifications) => notifications.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: UpdateNotification) {
        match self.notifications.lock() {
            Ok(mut notifications) => notifications.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: UpdateNotification) {
        info!(
            event_name = "workflow.subscribers.notified",
            request_id = %notification.request_id.0,
            proposal = %notification.public_identifier,
            comment = %notification.comment,
            "subscriber notification handed off"
        );
    }
}

impl<T> ProposalTracker for &T
where
    T: ProposalTracker + ?Sized,
{
    fn append_initial_steps(
        &self,
        proposal_id: &ProposalId,
        steps: Vec<ApprovalStep>,
    ) -> Result<(), ApplicationError> {
        (**self).append_initial_steps(proposal_id, steps)
    }
}

impl<T> Notifier for &T
where
    T: Notifier + ?Sized,
{
    fn notify(&self, notification: UpdateNotification) {
        (**self).notify(notification)
    }
}
