//! Shared submission entrypoint used by the HTTP server and the CLI.

use serde::Serialize;

use dealsync_core::{Contact, Deal, DealSubmission, LogicalField};
use dealsync_crm::{CrmGateway, GatewayError};

use crate::contact::resolve_contact;
use crate::deal::resolve_deal;
use crate::engine::{reconcile, Disposition, EntityOutcome};

/// Outcome of one submission, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionResult {
    pub disposition: Disposition,
    pub contact: EntityOutcome<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal: Option<EntityOutcome<Deal>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub updated_fields: Vec<LogicalField>,
}

/// Reconcile one validated submission.
///
/// Runs contact resolution, deal lookup and the engine in that order. Only a
/// failed lookup aborts the run; create and update failures are embedded in
/// the result. The deal lookup is skipped when the contact could not be
/// resolved.
pub fn submit<G>(gateway: &G, submission: &DealSubmission) -> Result<SubmissionResult, GatewayError>
where
    G: CrmGateway + ?Sized,
{
    let code = &submission.delivery_code;
    let resolution = resolve_contact(gateway, &submission.client)?;

    let existing = match resolution.contact {
        Ok(_) => resolve_deal(gateway, code)?,
        Err(_) => None,
    };
    let outcome = reconcile(gateway, &resolution, existing, submission);

    tracing::info!("submission {code}: {}", outcome.disposition);
    Ok(SubmissionResult {
        disposition: outcome.disposition,
        contact: resolution.contact.into(),
        deal: outcome.deal,
        updated_fields: outcome.updated_fields,
    })
}
