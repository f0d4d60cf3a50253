pub mod approvals;
pub mod audit;
pub mod config;
pub mod display;
pub mod domain;
pub mod errors;
pub mod roles;

pub use approvals::{
    ApprovalCoordinator, InMemoryProposalTracker, Notifier, ProposalTracker, RecordingNotifier,
    StepFactory, TracingNotifier, UpdateNotification,
};
pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink};
pub use display::{
    DisplayFields, DisplayRecord, FieldDisplayTransformer, FieldValue, InMemoryRecordStore,
    RecordLookup, PLACEHOLDER,
};
pub use domain::event::{EventRequest, EventRequestId};
pub use domain::procurement::{
    Office, ProposalId, PurchaseRequest, PurchaseRequestId, PurchaseType, RecurrenceInterval,
    Urgency,
};
pub use domain::step::{ApprovalStep, StepKind};
pub use domain::user::{EmailAddress, User, UserId};
pub use errors::{ApplicationError, ConfigurationError, DomainError};
pub use roles::{InMemoryUserStore, RoleDirectory, StoreRoleDirectory, UserStore, WorkflowRoles};
