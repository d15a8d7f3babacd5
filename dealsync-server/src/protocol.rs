//! Response bodies that are not a submission result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use dealsync_crm::GatewayError;

/// Body of every non-200 answer from `POST /api/v1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    /// `validation`, `upstream` or `internal`.
    pub kind: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ErrorResponse {
    fn new(kind: &str, error: impl Into<String>, detail: Option<Value>) -> Self {
        Self {
            ok: false,
            kind: kind.to_owned(),
            error: error.into(),
            detail,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation", message, None)
    }

    /// A CRM lookup failed before anything could be reconciled.
    pub fn upstream(err: &GatewayError) -> Self {
        let detail = match err {
            GatewayError::Rejected { payload, .. } => Some(payload.clone()),
            _ => None,
        };
        Self::new("upstream", err.to_string(), detail)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal", message, None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
