//! [`CrmGateway`] for Bitrix24 inbound webhooks.
//!
//! Maps domain fields to Bitrix24 field names:
//!
//! | domain            | contact      | deal                          |
//! |-------------------|--------------|-------------------------------|
//! | name / title      | `NAME`       | `TITLE`                       |
//! | surname / desc.   | `LAST_NAME`  | `ADDITIONAL_INFO`             |
//! | phone / client    | `PHONE`      | `CONTACT_ID`                  |
//! | address           | `ADDRESS`    | `UF_CRM_DELIVERY_ADDRESS`     |
//! | custom fields     | -            | [`LogicalField::crm_id`]      |

use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};

use dealsync_core::fields::REQUIRED_FIELD_TYPE;
use dealsync_core::{
    Contact, ContactId, ContactPayload, CrmSettings, Deal, DealChanges, DealId, DealSubmission,
    DeliveryCode, LogicalField, Phone,
};

use crate::error::GatewayError;
use crate::gateway::{method, CrmGateway, UserFieldDefinition};
use crate::transport::{list_result, write_result, Transport, UreqTransport};

const CONTACT_SELECT: [&str; 5] = ["ID", "NAME", "LAST_NAME", "PHONE", "ADDRESS"];

/// Bitrix24 gateway over any [`Transport`].
#[derive(Debug)]
pub struct Bitrix24Gateway<T = UreqTransport> {
    transport: T,
}

impl Bitrix24Gateway<UreqTransport> {
    pub fn from_settings(settings: &CrmSettings) -> Self {
        Self::new(UreqTransport::from_settings(settings))
    }
}

impl<T: Transport> Bitrix24Gateway<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn list_contacts(&self, phone: &str) -> Result<Vec<Contact>, GatewayError> {
        let params = json!({
            "filter": { "PHONE": phone },
            "select": CONTACT_SELECT,
        });
        let envelope = self.transport.call(method::CONTACT_LIST, &params)?;
        list_result(method::CONTACT_LIST, envelope)?
            .into_iter()
            .map(|item| decode::<RawContact>(method::CONTACT_LIST, item).map(Contact::from))
            .collect()
    }

    fn list_deals(&self, code: &str) -> Result<Vec<Deal>, GatewayError> {
        let mut select = vec!["ID", "TITLE", "ADDITIONAL_INFO", "CONTACT_ID"];
        select.extend(LogicalField::ALL.iter().map(|field| field.crm_id()));
        let mut filter = Map::new();
        filter.insert(LogicalField::DeliveryCode.crm_id().into(), json!(code));
        let params = json!({ "filter": filter, "select": select });
        let envelope = self.transport.call(method::DEAL_LIST, &params)?;
        list_result(method::DEAL_LIST, envelope)?
            .into_iter()
            .map(|item| decode::<RawDeal>(method::DEAL_LIST, item).map(Deal::from))
            .collect()
    }

    fn refetch_deal(&self, code: &str, after: &'static str) -> Result<Deal, GatewayError> {
        self.list_deals(code)?
            .into_iter()
            .next()
            .ok_or(GatewayError::MissingRecord {
                method: after,
                entity: "deal",
            })
    }
}

impl<T: Transport> CrmGateway for Bitrix24Gateway<T> {
    fn find_contact_by_phone(&self, phone: &Phone) -> Result<Option<Contact>, GatewayError> {
        Ok(self.list_contacts(phone.as_str())?.into_iter().next())
    }

    fn create_contact(&self, payload: &ContactPayload) -> Result<Contact, GatewayError> {
        let params = json!({
            "fields": {
                "NAME": payload.name,
                "LAST_NAME": payload.surname,
                "PHONE": [{ "VALUE": payload.phone.as_str(), "VALUE_TYPE": "WORK" }],
                "ADDRESS": payload.address,
            }
        });
        let envelope = self.transport.call(method::CONTACT_ADD, &params)?;
        write_result(method::CONTACT_ADD, envelope)?;

        self.list_contacts(payload.phone.as_str())?
            .into_iter()
            .next()
            .ok_or(GatewayError::MissingRecord {
                method: method::CONTACT_ADD,
                entity: "contact",
            })
    }

    fn find_deal_by_delivery_code(
        &self,
        code: &DeliveryCode,
    ) -> Result<Option<Deal>, GatewayError> {
        Ok(self.list_deals(code.as_str())?.into_iter().next())
    }

    fn create_deal(
        &self,
        submission: &DealSubmission,
        contact_id: &ContactId,
    ) -> Result<Deal, GatewayError> {
        let mut fields = Map::new();
        fields.insert("TITLE".into(), json!(submission.title));
        fields.insert("ADDITIONAL_INFO".into(), json!(submission.description));
        fields.insert("CONTACT_ID".into(), json!(contact_id.0));
        for field in LogicalField::ALL {
            fields.insert(field.crm_id().into(), json!(submission.field_value(field)));
        }

        let envelope = self
            .transport
            .call(method::DEAL_ADD, &json!({ "fields": fields }))?;
        write_result(method::DEAL_ADD, envelope)?;
        self.refetch_deal(submission.delivery_code.as_str(), method::DEAL_ADD)
    }

    fn update_deal(
        &self,
        deal_id: &DealId,
        delivery_code: &DeliveryCode,
        changes: &DealChanges,
    ) -> Result<Deal, GatewayError> {
        let fields: Map<String, Value> = changes
            .iter()
            .map(|(field, value)| (field.crm_id().to_owned(), json!(value)))
            .collect();
        let params = json!({ "id": deal_id.0, "fields": fields });

        let envelope = self.transport.call(method::DEAL_UPDATE, &params)?;
        write_result(method::DEAL_UPDATE, envelope)?;
        self.refetch_deal(delivery_code.as_str(), method::DEAL_UPDATE)
    }

    fn list_deal_fields(&self) -> Result<Vec<UserFieldDefinition>, GatewayError> {
        let envelope = self
            .transport
            .call(method::DEAL_USERFIELD_LIST, &json!({}))?;
        list_result(method::DEAL_USERFIELD_LIST, envelope)?
            .into_iter()
            .map(|item| {
                decode::<RawUserField>(method::DEAL_USERFIELD_LIST, item)
                    .map(UserFieldDefinition::from)
            })
            .collect()
    }

    fn add_deal_field(&self, field: LogicalField) -> Result<(), GatewayError> {
        let params = json!({
            "fields": {
                "FIELD_NAME": field.name(),
                "USER_TYPE_ID": REQUIRED_FIELD_TYPE,
            }
        });
        let envelope = self.transport.call(method::DEAL_USERFIELD_ADD, &params)?;
        write_result(method::DEAL_USERFIELD_ADD, envelope).map(|_| ())
    }

    fn delete_deal_field(&self, field_id: &str) -> Result<(), GatewayError> {
        let envelope = self
            .transport
            .call(method::DEAL_USERFIELD_DELETE, &json!({ "id": field_id }))?;
        write_result(method::DEAL_USERFIELD_DELETE, envelope).map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

fn decode<R: for<'de> Deserialize<'de>>(
    method: &'static str,
    item: Value,
) -> Result<R, GatewayError> {
    serde_json::from_value(item).map_err(|err| GatewayError::Decode {
        method,
        detail: err.to_string(),
    })
}

/// Bitrix24 returns identifiers as strings, but some portals send numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Number(u64),
}

impl From<IdRepr> for String {
    fn from(id: IdRepr) -> Self {
        match id {
            IdRepr::Text(text) => text,
            IdRepr::Number(number) => number.to_string(),
        }
    }
}

fn id_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    IdRepr::deserialize(d).map(String::from)
}

fn optional_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<IdRepr>::deserialize(d)?
        .map(String::from)
        .filter(|id| !id.is_empty() && id != "0"))
}

/// Custom field values come back as strings, but unset fields may be `false`
/// or `null` depending on the portal.
fn loose_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Deserialize)]
struct RawMultiField {
    #[serde(rename = "VALUE")]
    value: String,
}

#[derive(Deserialize)]
struct RawContact {
    #[serde(rename = "ID", deserialize_with = "id_string")]
    id: String,
    #[serde(rename = "NAME", default)]
    name: Option<String>,
    #[serde(rename = "LAST_NAME", default)]
    last_name: Option<String>,
    #[serde(rename = "PHONE", default)]
    phone: Option<Vec<RawMultiField>>,
    #[serde(rename = "ADDRESS", default)]
    address: Option<String>,
}

impl From<RawContact> for Contact {
    fn from(raw: RawContact) -> Self {
        Contact {
            id: ContactId(raw.id),
            name: non_empty(raw.name),
            surname: non_empty(raw.last_name),
            phone: raw
                .phone
                .and_then(|phones| phones.into_iter().next())
                .map(|p| p.value),
            address: non_empty(raw.address),
        }
    }
}

#[derive(Deserialize)]
struct RawDeal {
    #[serde(rename = "ID", deserialize_with = "id_string")]
    id: String,
    #[serde(rename = "TITLE", default)]
    title: Option<String>,
    #[serde(rename = "ADDITIONAL_INFO", default)]
    additional_info: Option<String>,
    #[serde(rename = "CONTACT_ID", default, deserialize_with = "optional_id")]
    contact_id: Option<String>,
    #[serde(rename = "UF_CRM_PRODUCTS", default, deserialize_with = "loose_text")]
    products: Option<String>,
    #[serde(rename = "UF_CRM_DELIVERY_ADDRESS", default, deserialize_with = "loose_text")]
    delivery_address: Option<String>,
    #[serde(rename = "UF_CRM_DELIVERY_DATE", default, deserialize_with = "loose_text")]
    delivery_date: Option<String>,
    #[serde(rename = "UF_CRM_DELIVERY_CODE", default, deserialize_with = "loose_text")]
    delivery_code: Option<String>,
}

impl From<RawDeal> for Deal {
    fn from(raw: RawDeal) -> Self {
        Deal {
            id: DealId(raw.id),
            title: non_empty(raw.title),
            description: non_empty(raw.additional_info),
            contact_id: raw.contact_id.map(ContactId),
            products: raw.products,
            delivery_address: raw.delivery_address,
            delivery_date: raw.delivery_date,
            delivery_code: raw.delivery_code,
        }
    }
}

#[derive(Deserialize)]
struct RawUserField {
    #[serde(rename = "ID", deserialize_with = "id_string")]
    id: String,
    #[serde(rename = "FIELD_NAME")]
    field_name: String,
    #[serde(rename = "USER_TYPE_ID")]
    user_type_id: String,
}

impl From<RawUserField> for UserFieldDefinition {
    fn from(raw: RawUserField) -> Self {
        UserFieldDefinition {
            id: raw.id,
            field_name: raw.field_name,
            user_type_id: raw.user_type_id,
        }
    }
}
