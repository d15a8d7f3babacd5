//! Error types for dealsync-crm.

use serde_json::Value;
use thiserror::Error;

/// All errors a single CRM call can produce.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The request never produced a readable response (DNS, TLS, connection
    /// reset, timeout, non-JSON error page).
    #[error("CRM transport failure calling {method}: {detail}")]
    Transport { method: &'static str, detail: String },

    /// The CRM answered but reported no result. `payload` is the upstream
    /// envelope, verbatim.
    #[error("CRM rejected {method}: {payload}")]
    Rejected { method: &'static str, payload: Value },

    /// The CRM reported success but the body did not have the expected shape.
    #[error("unexpected CRM response to {method}: {detail}")]
    Decode { method: &'static str, detail: String },

    /// A write succeeded but the follow-up lookup found nothing.
    #[error("{entity} not found after successful {method}")]
    MissingRecord {
        method: &'static str,
        entity: &'static str,
    },
}

impl GatewayError {
    pub fn method(&self) -> &'static str {
        match self {
            GatewayError::Transport { method, .. }
            | GatewayError::Rejected { method, .. }
            | GatewayError::Decode { method, .. }
            | GatewayError::MissingRecord { method, .. } => method,
        }
    }

    /// `true` when the call could not be completed at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport { .. })
    }
}

/// The custom-field bootstrap could not run; the service must not start.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("custom field check failed: {0}")]
    FieldListing(#[source] GatewayError),
}
