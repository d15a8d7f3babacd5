//! Process-local CRM.
//!
//! Behaves like the real gateway (exact-match lookups, writes followed by a
//! re-read, string-typed custom fields) and records every call it receives,
//! so reconciliation runs can be inspected after the fact. Used by
//! `--in-memory` runs and by tests.

use std::collections::HashSet;

use parking_lot::Mutex;
use serde_json::json;

use dealsync_core::fields::REQUIRED_FIELD_TYPE;
use dealsync_core::{
    Contact, ContactId, ContactPayload, Deal, DealChanges, DealId, DealSubmission, DeliveryCode,
    LogicalField, Phone,
};

use crate::error::GatewayError;
use crate::gateway::{method, CrmGateway, UserFieldDefinition};

/// Gateway operations, used to count calls and to inject rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrmOp {
    FindContact,
    CreateContact,
    FindDeal,
    CreateDeal,
    UpdateDeal,
    ListFields,
    AddField,
    DeleteField,
}

impl CrmOp {
    pub fn method(self) -> &'static str {
        match self {
            CrmOp::FindContact => method::CONTACT_LIST,
            CrmOp::CreateContact => method::CONTACT_ADD,
            CrmOp::FindDeal => method::DEAL_LIST,
            CrmOp::CreateDeal => method::DEAL_ADD,
            CrmOp::UpdateDeal => method::DEAL_UPDATE,
            CrmOp::ListFields => method::DEAL_USERFIELD_LIST,
            CrmOp::AddField => method::DEAL_USERFIELD_ADD,
            CrmOp::DeleteField => method::DEAL_USERFIELD_DELETE,
        }
    }
}

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrmCall {
    FindContact { phone: String },
    CreateContact { phone: String },
    FindDeal { delivery_code: String },
    CreateDeal { delivery_code: String, contact_id: ContactId },
    UpdateDeal { deal_id: DealId, fields: Vec<LogicalField> },
    ListFields,
    AddField { field: LogicalField },
    DeleteField { field_id: String },
}

impl CrmCall {
    pub fn op(&self) -> CrmOp {
        match self {
            CrmCall::FindContact { .. } => CrmOp::FindContact,
            CrmCall::CreateContact { .. } => CrmOp::CreateContact,
            CrmCall::FindDeal { .. } => CrmOp::FindDeal,
            CrmCall::CreateDeal { .. } => CrmOp::CreateDeal,
            CrmCall::UpdateDeal { .. } => CrmOp::UpdateDeal,
            CrmCall::ListFields => CrmOp::ListFields,
            CrmCall::AddField { .. } => CrmOp::AddField,
            CrmCall::DeleteField { .. } => CrmOp::DeleteField,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    contacts: Vec<Contact>,
    deals: Vec<Deal>,
    fields: Vec<UserFieldDefinition>,
    next_id: u64,
    calls: Vec<CrmCall>,
    rejected: HashSet<CrmOp>,
}

impl State {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn record(&mut self, call: CrmCall) -> Result<(), GatewayError> {
        let op = call.op();
        self.calls.push(call);
        if self.rejected.contains(&op) {
            return Err(GatewayError::Rejected {
                method: op.method(),
                payload: json!({
                    "error": "ACCESS_DENIED",
                    "error_description": format!("{} is rejected by this portal", op.method()),
                }),
            });
        }
        Ok(())
    }

    fn deal_by_code(&self, code: &str) -> Option<&Deal> {
        self.deals
            .iter()
            .find(|deal| deal.delivery_code.as_deref() == Some(code))
    }
}

/// In-memory [`CrmGateway`].
#[derive(Debug, Default)]
pub struct InMemoryCrm {
    state: Mutex<State>,
}

impl InMemoryCrm {
    pub fn new() -> Self {
        Self::default()
    }

    /// A CRM whose custom field registry is already provisioned.
    pub fn provisioned() -> Self {
        let crm = Self::new();
        for field in LogicalField::ALL {
            crm.insert_field(field.crm_id(), REQUIRED_FIELD_TYPE);
        }
        crm
    }

    /// Seed a contact without recording a call.
    pub fn insert_contact(&self, payload: &ContactPayload) -> Contact {
        let mut state = self.state.lock();
        let contact = Contact {
            id: ContactId(state.allocate_id()),
            name: payload.name.clone(),
            surname: payload.surname.clone(),
            phone: Some(payload.phone.as_str().to_owned()),
            address: payload.address.clone(),
        };
        state.contacts.push(contact.clone());
        contact
    }

    /// Seed a deal without recording a call. The deal's id is replaced with a
    /// freshly allocated one.
    pub fn insert_deal(&self, mut deal: Deal) -> Deal {
        let mut state = self.state.lock();
        deal.id = DealId(state.allocate_id());
        state.deals.push(deal.clone());
        deal
    }

    /// Seed a custom field definition without recording a call.
    pub fn insert_field(&self, field_name: &str, user_type_id: &str) -> UserFieldDefinition {
        let mut state = self.state.lock();
        let definition = UserFieldDefinition {
            id: state.allocate_id(),
            field_name: field_name.to_owned(),
            user_type_id: user_type_id.to_owned(),
        };
        state.fields.push(definition.clone());
        definition
    }

    /// Make every later call of `op` fail with an application rejection.
    pub fn reject(&self, op: CrmOp) {
        self.state.lock().rejected.insert(op);
    }

    pub fn calls(&self) -> Vec<CrmCall> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, op: CrmOp) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    /// Number of calls that changed CRM state.
    pub fn mutation_count(&self) -> usize {
        [
            CrmOp::CreateContact,
            CrmOp::CreateDeal,
            CrmOp::UpdateDeal,
            CrmOp::AddField,
            CrmOp::DeleteField,
        ]
        .into_iter()
        .map(|op| self.count(op))
        .sum()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn contacts(&self) -> Vec<Contact> {
        self.state.lock().contacts.clone()
    }

    pub fn deals(&self) -> Vec<Deal> {
        self.state.lock().deals.clone()
    }

    pub fn fields(&self) -> Vec<UserFieldDefinition> {
        self.state.lock().fields.clone()
    }
}

impl CrmGateway for InMemoryCrm {
    fn find_contact_by_phone(&self, phone: &Phone) -> Result<Option<Contact>, GatewayError> {
        let mut state = self.state.lock();
        state.record(CrmCall::FindContact {
            phone: phone.as_str().to_owned(),
        })?;
        Ok(state
            .contacts
            .iter()
            .find(|contact| contact.phone.as_deref() == Some(phone.as_str()))
            .cloned())
    }

    fn create_contact(&self, payload: &ContactPayload) -> Result<Contact, GatewayError> {
        let mut state = self.state.lock();
        state.record(CrmCall::CreateContact {
            phone: payload.phone.as_str().to_owned(),
        })?;
        let contact = Contact {
            id: ContactId(state.allocate_id()),
            name: payload.name.clone(),
            surname: payload.surname.clone(),
            phone: Some(payload.phone.as_str().to_owned()),
            address: payload.address.clone(),
        };
        state.contacts.push(contact.clone());
        Ok(contact)
    }

    fn find_deal_by_delivery_code(
        &self,
        code: &DeliveryCode,
    ) -> Result<Option<Deal>, GatewayError> {
        let mut state = self.state.lock();
        state.record(CrmCall::FindDeal {
            delivery_code: code.as_str().to_owned(),
        })?;
        Ok(state.deal_by_code(code.as_str()).cloned())
    }

    fn create_deal(
        &self,
        submission: &DealSubmission,
        contact_id: &ContactId,
    ) -> Result<Deal, GatewayError> {
        let mut state = self.state.lock();
        state.record(CrmCall::CreateDeal {
            delivery_code: submission.delivery_code.as_str().to_owned(),
            contact_id: contact_id.clone(),
        })?;
        let mut deal = Deal {
            id: DealId(state.allocate_id()),
            title: submission.title.clone(),
            description: submission.description.clone(),
            contact_id: Some(contact_id.clone()),
            products: None,
            delivery_address: None,
            delivery_date: None,
            delivery_code: None,
        };
        for field in LogicalField::ALL {
            deal.set_field_value(field, submission.field_value(field));
        }
        state.deals.push(deal.clone());
        Ok(deal)
    }

    fn update_deal(
        &self,
        deal_id: &DealId,
        delivery_code: &DeliveryCode,
        changes: &DealChanges,
    ) -> Result<Deal, GatewayError> {
        let mut state = self.state.lock();
        state.record(CrmCall::UpdateDeal {
            deal_id: deal_id.clone(),
            fields: changes.fields(),
        })?;

        let Some(deal) = state.deals.iter_mut().find(|deal| &deal.id == deal_id) else {
            return Err(GatewayError::Rejected {
                method: method::DEAL_UPDATE,
                payload: json!({ "error": "NOT_FOUND", "error_description": "Not found" }),
            });
        };
        for (field, value) in changes.iter() {
            deal.set_field_value(field, value.to_owned());
        }

        state
            .deal_by_code(delivery_code.as_str())
            .cloned()
            .ok_or(GatewayError::MissingRecord {
                method: method::DEAL_UPDATE,
                entity: "deal",
            })
    }

    fn list_deal_fields(&self) -> Result<Vec<UserFieldDefinition>, GatewayError> {
        let mut state = self.state.lock();
        state.record(CrmCall::ListFields)?;
        Ok(state.fields.clone())
    }

    fn add_deal_field(&self, field: LogicalField) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        state.record(CrmCall::AddField { field })?;
        let definition = UserFieldDefinition {
            id: state.allocate_id(),
            field_name: field.crm_id().to_owned(),
            user_type_id: REQUIRED_FIELD_TYPE.to_owned(),
        };
        state.fields.push(definition);
        Ok(())
    }

    fn delete_deal_field(&self, field_id: &str) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        state.record(CrmCall::DeleteField {
            field_id: field_id.to_owned(),
        })?;
        state.fields.retain(|definition| definition.id != field_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(phone: &str) -> ContactPayload {
        ContactPayload {
            name: Some("Ivan".to_owned()),
            surname: None,
            phone: phone.parse().expect("phone"),
            address: None,
        }
    }

    #[test]
    fn lookups_are_exact_match_on_phone() {
        let crm = InMemoryCrm::new();
        let seeded = crm.insert_contact(&payload("79990000000"));

        let found = crm
            .find_contact_by_phone(&"79990000000".parse().expect("phone"))
            .expect("lookup");
        assert_eq!(found, Some(seeded));
        let missing = crm
            .find_contact_by_phone(&"79990000001".parse().expect("phone"))
            .expect("lookup");
        assert_eq!(missing, None);
        assert_eq!(crm.count(CrmOp::FindContact), 2);
        assert_eq!(crm.mutation_count(), 0, "seeding is not recorded");
    }

    #[test]
    fn rejected_op_returns_upstream_style_error_and_is_still_recorded() {
        let crm = InMemoryCrm::new();
        crm.reject(CrmOp::CreateContact);

        let err = crm.create_contact(&payload("79990000000")).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Rejected {
                method: method::CONTACT_ADD,
                ..
            }
        ));
        assert_eq!(crm.count(CrmOp::CreateContact), 1);
        assert!(crm.contacts().is_empty());
    }

    #[test]
    fn provisioned_crm_has_all_string_fields() {
        let crm = InMemoryCrm::provisioned();
        let fields = crm.fields();
        assert_eq!(fields.len(), LogicalField::ALL.len());
        assert!(fields.iter().all(|f| f.user_type_id == REQUIRED_FIELD_TYPE));
    }
}
