//! # dealsync-reconcile
//!
//! Reconciles one order submission against the CRM.
//!
//! Call [`submit`] with any [`CrmGateway`](dealsync_crm::CrmGateway): it
//! resolves the contact by phone, looks up the deal by delivery code, and
//! then creates, updates, leaves alone, or refuses the deal. The outcome is a
//! [`SubmissionResult`] whose [`Disposition`] classifies what happened.

pub mod contact;
pub mod deal;
pub mod diff;
pub mod engine;
pub mod error;
pub mod pipeline;

pub use contact::{resolve_contact, ContactResolution};
pub use deal::resolve_deal;
pub use diff::compute_changes;
pub use engine::{reconcile, Disposition, EntityOutcome, Reconciliation};
pub use error::{ErrorKind, ReconcileError};
pub use pipeline::{submit, SubmissionResult};
