//! Error values embedded in reconciliation results.
//!
//! Gateway failures at create / update time never abort a submission; they
//! become a [`ReconcileError`] inside the result, next to whatever did
//! succeed.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use dealsync_core::{ContactId, DeliveryCode};
use dealsync_crm::GatewayError;

/// Coarse classification of an embedded error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The CRM could not be reached or answered unreadably.
    Transport,
    /// The CRM answered and refused the operation.
    Rejected,
    /// The delivery code already belongs to another contact.
    Conflict,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Rejected => "rejected",
            ErrorKind::Conflict => "conflict",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{kind}: {message}")]
pub struct ReconcileError {
    pub kind: ErrorKind,
    pub message: String,
    /// Upstream payload for rejections, owning contact for conflicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ReconcileError {
    /// A delivery code already bound to a different contact.
    pub fn conflict(code: &DeliveryCode, owner: Option<&ContactId>) -> Self {
        ReconcileError {
            kind: ErrorKind::Conflict,
            message: format!("a deal with delivery code '{code}' already belongs to another contact"),
            detail: Some(json!({ "owner_contact_id": owner.map(|id| id.0.as_str()) })),
        }
    }
}

impl From<&GatewayError> for ReconcileError {
    fn from(err: &GatewayError) -> Self {
        match err {
            GatewayError::Transport { .. } => ReconcileError {
                kind: ErrorKind::Transport,
                message: err.to_string(),
                detail: None,
            },
            GatewayError::Rejected { method, payload } => ReconcileError {
                kind: ErrorKind::Rejected,
                message: format!("CRM rejected {method}"),
                detail: Some(payload.clone()),
            },
            GatewayError::Decode { .. } | GatewayError::MissingRecord { .. } => ReconcileError {
                kind: ErrorKind::Rejected,
                message: err.to_string(),
                detail: None,
            },
        }
    }
}

impl From<GatewayError> for ReconcileError {
    fn from(err: GatewayError) -> Self {
        ReconcileError::from(&err)
    }
}
