//! The reconciliation decision procedure.
//!
//! | contact  | existing deal            | action                          |
//! |----------|--------------------------|---------------------------------|
//! | failed   | -                        | nothing, partial failure        |
//! | new      | yes                      | conflict                        |
//! | new      | no                       | create deal                     |
//! | existing | yes, other contact       | conflict                        |
//! | existing | yes, same contact        | diff, update only when changed  |
//! | existing | no                       | create deal                     |
//!
//! A brand-new contact can never own an existing deal, so any existing deal
//! is a conflict in that case.

use std::fmt;

use serde::Serialize;

use dealsync_core::{Deal, DealSubmission, LogicalField};
use dealsync_crm::CrmGateway;

use crate::contact::ContactResolution;
use crate::diff::compute_changes;
use crate::error::ReconcileError;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Classified outcome of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    NewContactNewDeal,
    ExistingContactNewDeal,
    ExistingContactUpdatedDeal,
    ExistingContactUnchangedDeal,
    /// The delivery code belongs to another contact; no deal was touched.
    Conflict,
    /// A contact or deal write failed; see the embedded errors.
    PartialFailure,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Disposition::NewContactNewDeal => "new contact, new deal",
            Disposition::ExistingContactNewDeal => "existing contact, new deal",
            Disposition::ExistingContactUpdatedDeal => "existing contact, updated deal",
            Disposition::ExistingContactUnchangedDeal => "existing contact, unchanged deal",
            Disposition::Conflict => "conflict",
            Disposition::PartialFailure => "partial failure",
        };
        f.write_str(s)
    }
}

/// An entity as the CRM stored it, or the error that prevented it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityOutcome<T> {
    Ok(T),
    Error(ReconcileError),
}

impl<T> EntityOutcome<T> {
    pub fn entity(&self) -> Option<&T> {
        match self {
            EntityOutcome::Ok(entity) => Some(entity),
            EntityOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ReconcileError> {
        match self {
            EntityOutcome::Ok(_) => None,
            EntityOutcome::Error(err) => Some(err),
        }
    }
}

impl<T> From<Result<T, ReconcileError>> for EntityOutcome<T> {
    fn from(result: Result<T, ReconcileError>) -> Self {
        match result {
            Ok(entity) => EntityOutcome::Ok(entity),
            Err(err) => EntityOutcome::Error(err),
        }
    }
}

/// What the engine decided and did about the deal.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub disposition: Disposition,
    /// `None` only when the contact could not be resolved.
    pub deal: Option<EntityOutcome<Deal>>,
    /// Fields sent in an update; empty for every other path.
    pub updated_fields: Vec<LogicalField>,
}

impl Reconciliation {
    fn new(disposition: Disposition, deal: Option<EntityOutcome<Deal>>) -> Self {
        Self {
            disposition,
            deal,
            updated_fields: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

/// Decide what to do with the deal and perform the resulting gateway call.
///
/// Gateway failures are embedded in the returned [`Reconciliation`]; this
/// function never fails.
pub fn reconcile<G>(
    gateway: &G,
    resolution: &ContactResolution,
    existing: Option<Deal>,
    submission: &DealSubmission,
) -> Reconciliation
where
    G: CrmGateway + ?Sized,
{
    let contact = match &resolution.contact {
        Ok(contact) => contact,
        Err(_) => return Reconciliation::new(Disposition::PartialFailure, None),
    };
    let code = &submission.delivery_code;

    match existing {
        Some(deal) if resolution.is_new || deal.contact_id.as_ref() != Some(&contact.id) => {
            tracing::warn!(
                "delivery code {code} is held by deal {} of contact {}, not {}",
                deal.id,
                deal.contact_id
                    .as_ref()
                    .map(|id| id.0.as_str())
                    .unwrap_or("-"),
                contact.id
            );
            let conflict = ReconcileError::conflict(code, deal.contact_id.as_ref());
            Reconciliation::new(Disposition::Conflict, Some(EntityOutcome::Error(conflict)))
        }
        Some(deal) => {
            let changes = compute_changes(&deal, submission);
            if changes.is_empty() {
                tracing::debug!("deal {} is up to date", deal.id);
                return Reconciliation::new(
                    Disposition::ExistingContactUnchangedDeal,
                    Some(EntityOutcome::Ok(deal)),
                );
            }

            match gateway.update_deal(&deal.id, code, &changes) {
                Ok(updated) => {
                    tracing::info!("updated deal {} ({} fields)", updated.id, changes.len());
                    Reconciliation {
                        disposition: Disposition::ExistingContactUpdatedDeal,
                        deal: Some(EntityOutcome::Ok(updated)),
                        updated_fields: changes.fields(),
                    }
                }
                Err(err) => {
                    tracing::warn!("could not update deal {}: {err}", deal.id);
                    Reconciliation::new(
                        Disposition::PartialFailure,
                        Some(EntityOutcome::Error(ReconcileError::from(&err))),
                    )
                }
            }
        }
        None => match gateway.create_deal(submission, &contact.id) {
            Ok(created) => {
                tracing::info!("created deal {} for contact {}", created.id, contact.id);
                let disposition = if resolution.is_new {
                    Disposition::NewContactNewDeal
                } else {
                    Disposition::ExistingContactNewDeal
                };
                Reconciliation::new(disposition, Some(EntityOutcome::Ok(created)))
            }
            Err(err) => {
                tracing::warn!("could not create deal for code {code}: {err}");
                Reconciliation::new(
                    Disposition::PartialFailure,
                    Some(EntityOutcome::Error(ReconcileError::from(&err))),
                )
            }
        },
    }
}
