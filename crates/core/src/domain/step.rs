use serde::{Deserialize, Serialize};

use crate::domain::user::User;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Approval,
    Purchase,
}

impl StepKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approval => "approval",
            Self::Purchase => "purchase",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approval" => Some(Self::Approval),
            "purchase" => Some(Self::Purchase),
            _ => None,
        }
    }
}

/// A step whose assignee was resolved when the step was built. Completion is
/// tracked by the proposal that owns it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub kind: StepKind,
    pub role: String,
    pub assignee: User,
    pub position: usize,
}

impl ApprovalStep {
    pub fn assignee_email(&self) -> &str {
        self.assignee.email_address.as_str()
    }
}
