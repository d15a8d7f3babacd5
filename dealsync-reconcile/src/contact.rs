//! Find-or-create a contact by phone.

use dealsync_core::{Contact, ContactPayload};
use dealsync_crm::{CrmGateway, GatewayError};

use crate::error::ReconcileError;

/// The contact a submission resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactResolution {
    /// The stored contact, or why it could not be created.
    pub contact: Result<Contact, ReconcileError>,
    /// `true` when no contact with this phone existed before the submission.
    pub is_new: bool,
}

/// Look the contact up by phone and create it when absent.
///
/// Only the first match is used. A failed create is embedded in the
/// resolution without retrying; a failed lookup is returned as `Err`.
pub fn resolve_contact<G>(
    gateway: &G,
    payload: &ContactPayload,
) -> Result<ContactResolution, GatewayError>
where
    G: CrmGateway + ?Sized,
{
    if let Some(contact) = gateway.find_contact_by_phone(&payload.phone)? {
        tracing::debug!("contact {} matched phone {}", contact.id, payload.phone);
        return Ok(ContactResolution {
            contact: Ok(contact),
            is_new: false,
        });
    }

    let contact = match gateway.create_contact(payload) {
        Ok(contact) => {
            tracing::info!("created contact {} for phone {}", contact.id, payload.phone);
            Ok(contact)
        }
        Err(err) => {
            tracing::warn!("could not create contact for phone {}: {err}", payload.phone);
            Err(ReconcileError::from(&err))
        }
    };
    Ok(ContactResolution {
        contact,
        is_new: true,
    })
}

#[cfg(test)]
mod tests {
    use dealsync_crm::{CrmOp, InMemoryCrm};

    use super::*;
    use crate::error::ErrorKind;

    fn payload(phone: &str) -> ContactPayload {
        ContactPayload {
            name: Some("Ivan".to_owned()),
            surname: Some("Petrov".to_owned()),
            phone: phone.parse().expect("phone"),
            address: None,
        }
    }

    #[test]
    fn unknown_phone_creates_exactly_one_contact() {
        let crm = InMemoryCrm::new();

        let resolution = resolve_contact(&crm, &payload("79990000000")).expect("resolve");

        assert!(resolution.is_new);
        let contact = resolution.contact.expect("contact");
        assert_eq!(contact.phone.as_deref(), Some("79990000000"));
        assert_eq!(crm.count(CrmOp::CreateContact), 1);
        assert_eq!(crm.contacts().len(), 1);
    }

    #[test]
    fn known_phone_returns_that_contact_without_creating() {
        let crm = InMemoryCrm::new();
        let seeded = crm.insert_contact(&payload("79990000000"));

        let resolution = resolve_contact(&crm, &payload("79990000000")).expect("resolve");

        assert!(!resolution.is_new);
        assert_eq!(resolution.contact, Ok(seeded));
        assert_eq!(crm.count(CrmOp::CreateContact), 0);
    }

    #[test]
    fn failed_create_is_embedded_not_raised() {
        let crm = InMemoryCrm::new();
        crm.reject(CrmOp::CreateContact);

        let resolution = resolve_contact(&crm, &payload("79990000000")).expect("resolve");

        assert!(resolution.is_new);
        let err = resolution.contact.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Rejected);
        assert_eq!(crm.count(CrmOp::CreateContact), 1, "no retry");
    }

    #[test]
    fn failed_lookup_is_an_error() {
        let crm = InMemoryCrm::new();
        crm.reject(CrmOp::FindContact);

        let err = resolve_contact(&crm, &payload("79990000000")).unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { .. }));
        assert_eq!(crm.count(CrmOp::CreateContact), 0);
    }
}
