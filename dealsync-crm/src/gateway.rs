//! The CRM gateway seam.
//!
//! Everything above this trait speaks domain types; everything below it
//! speaks CRM method names and field identifiers.

use serde::{Deserialize, Serialize};

use dealsync_core::{
    Contact, ContactId, ContactPayload, Deal, DealChanges, DealId, DealSubmission, DeliveryCode,
    LogicalField, Phone,
};

use crate::error::GatewayError;

/// CRM REST method names.
pub mod method {
    pub const CONTACT_LIST: &str = "crm.contact.list";
    pub const CONTACT_ADD: &str = "crm.contact.add";
    pub const DEAL_LIST: &str = "crm.deal.list";
    pub const DEAL_ADD: &str = "crm.deal.add";
    pub const DEAL_UPDATE: &str = "crm.deal.update";
    pub const DEAL_USERFIELD_LIST: &str = "crm.deal.userfield.list";
    pub const DEAL_USERFIELD_ADD: &str = "crm.deal.userfield.add";
    pub const DEAL_USERFIELD_DELETE: &str = "crm.deal.userfield.delete";
}

/// A user-defined field on the CRM deal entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFieldDefinition {
    pub id: String,
    /// Full CRM identifier, e.g. `UF_CRM_PRODUCTS`.
    pub field_name: String,
    pub user_type_id: String,
}

/// Synchronous operations against the external CRM.
///
/// Lookups return the first exact match only; writes re-read the stored
/// record so callers always see what the CRM actually persisted.
pub trait CrmGateway: Send + Sync {
    fn find_contact_by_phone(&self, phone: &Phone) -> Result<Option<Contact>, GatewayError>;

    fn create_contact(&self, payload: &ContactPayload) -> Result<Contact, GatewayError>;

    fn find_deal_by_delivery_code(
        &self,
        code: &DeliveryCode,
    ) -> Result<Option<Deal>, GatewayError>;

    fn create_deal(
        &self,
        submission: &DealSubmission,
        contact_id: &ContactId,
    ) -> Result<Deal, GatewayError>;

    /// Send only `changes`, then re-read the deal by its delivery code.
    fn update_deal(
        &self,
        deal_id: &DealId,
        delivery_code: &DeliveryCode,
        changes: &DealChanges,
    ) -> Result<Deal, GatewayError>;

    fn list_deal_fields(&self) -> Result<Vec<UserFieldDefinition>, GatewayError>;

    fn add_deal_field(&self, field: LogicalField) -> Result<(), GatewayError>;

    fn delete_deal_field(&self, field_id: &str) -> Result<(), GatewayError>;
}
