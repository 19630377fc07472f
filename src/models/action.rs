//! Pending-action models for the outbox partition

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

// == Action Kind ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CartAdd,
    CartUpdate,
    CartRemove,
    QaSubmit,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CartAdd => "cart_add",
            ActionKind::CartUpdate => "cart_update",
            ActionKind::CartRemove => "cart_remove",
            ActionKind::QaSubmit => "qa_submit",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cart_add" => Ok(ActionKind::CartAdd),
            "cart_update" => Ok(ActionKind::CartUpdate),
            "cart_remove" => Ok(ActionKind::CartRemove),
            "qa_submit" => Ok(ActionKind::QaSubmit),
            other => Err(CacheError::InvalidRequest(format!(
                "Unknown action kind: {}",
                other
            ))),
        }
    }
}

// == Action Payload ==
/// A user mutation waiting for network replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload {
    CartAdd {
        product_id: String,
        quantity: u32,
        #[serde(default)]
        options: BTreeMap<String, String>,
    },
    CartUpdate {
        product_id: String,
        quantity: u32,
    },
    CartRemove {
        product_id: String,
    },
    QaSubmit {
        question: String,
        category: String,
    },
}

impl ActionPayload {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionPayload::CartAdd { .. } => ActionKind::CartAdd,
            ActionPayload::CartUpdate { .. } => ActionKind::CartUpdate,
            ActionPayload::CartRemove { .. } => ActionKind::CartRemove,
            ActionPayload::QaSubmit { .. } => ActionKind::QaSubmit,
        }
    }

    /// The thing the action is about, used as the id fragment.
    pub fn subject(&self) -> &str {
        match self {
            ActionPayload::CartAdd { product_id, .. }
            | ActionPayload::CartUpdate { product_id, .. }
            | ActionPayload::CartRemove { product_id } => product_id,
            ActionPayload::QaSubmit { category, .. } => category,
        }
    }

    pub fn validate(&self) -> Result<(), CacheError> {
        match self {
            ActionPayload::CartAdd { quantity: 0, .. } => Err(CacheError::InvalidRequest(
                "cart_add quantity must be at least 1".to_string(),
            )),
            ActionPayload::QaSubmit { question, .. } if question.trim().is_empty() => Err(
                CacheError::InvalidRequest("qa_submit question cannot be empty".to_string()),
            ),
            _ if self.subject().is_empty() => Err(CacheError::InvalidRequest(format!(
                "{} requires a subject",
                self.kind()
            ))),
            _ => Ok(()),
        }
    }
}

// == Pending Action ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: String,
    pub kind: ActionKind,
    pub payload: ActionPayload,
    /// Enqueue timestamp (Unix milliseconds)
    pub queued_at: i64,
}
