//! Domain types for contacts, deals and incoming order submissions.
//!
//! The matching keys ([`Phone`], [`DeliveryCode`]) are validated newtypes:
//! deserializing a submission with a malformed key fails at the boundary,
//! so the reconciliation code never sees one.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::fields::{normalize_products, LogicalField};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Opaque CRM identifier of a contact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub String);

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ContactId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContactId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque CRM identifier of a deal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DealId(pub String);

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DealId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DealId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Matching keys
// ---------------------------------------------------------------------------

/// A contact phone number: 11 or 12 characters, ASCII digits with an
/// optional leading `+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Phone {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let digits = value.strip_prefix('+').unwrap_or(&value);
        let len_ok = (11..=12).contains(&value.len());
        if len_ok && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(value))
        } else {
            Err(ValidationError::Phone { value })
        }
    }
}

impl FromStr for Phone {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The 12-character token that uniquely identifies one order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeliveryCode(String);

impl DeliveryCode {
    pub const LEN: usize = 12;

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DeliveryCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let len = value.chars().count();
        if len == Self::LEN {
            Ok(Self(value))
        } else {
            Err(ValidationError::DeliveryCode { value, len })
        }
    }
}

impl FromStr for DeliveryCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl From<DeliveryCode> for String {
    fn from(code: DeliveryCode) -> Self {
        code.0
    }
}

impl fmt::Display for DeliveryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Incoming payloads
// ---------------------------------------------------------------------------

/// Client details carried by a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    pub phone: Phone,
    #[serde(default, alias = "adress")]
    pub address: Option<String>,
}

/// One order submission as received from the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealSubmission {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub client: ContactPayload,
    pub products: Vec<String>,
    #[serde(alias = "delivery_adress")]
    pub delivery_address: String,
    pub delivery_date: String,
    pub delivery_code: DeliveryCode,
}

impl DealSubmission {
    /// The submitted value of a logical field, normalised to the stored form.
    pub fn field_value(&self, field: LogicalField) -> String {
        match field {
            LogicalField::Products => normalize_products(&self.products),
            LogicalField::DeliveryAddress => self.delivery_address.clone(),
            LogicalField::DeliveryDate => self.delivery_date.clone(),
            LogicalField::DeliveryCode => self.delivery_code.as_str().to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stored entities
// ---------------------------------------------------------------------------

/// A contact as stored in the CRM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// A deal as stored in the CRM. Custom fields hold their stored string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<ContactId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_code: Option<String>,
}

impl Deal {
    /// The stored value of a logical field, if the CRM has one.
    pub fn field_value(&self, field: LogicalField) -> Option<&str> {
        match field {
            LogicalField::Products => self.products.as_deref(),
            LogicalField::DeliveryAddress => self.delivery_address.as_deref(),
            LogicalField::DeliveryDate => self.delivery_date.as_deref(),
            LogicalField::DeliveryCode => self.delivery_code.as_deref(),
        }
    }

    /// Overwrite a logical field with a new stored value.
    pub fn set_field_value(&mut self, field: LogicalField, value: String) {
        let slot = match field {
            LogicalField::Products => &mut self.products,
            LogicalField::DeliveryAddress => &mut self.delivery_address,
            LogicalField::DeliveryDate => &mut self.delivery_date,
            LogicalField::DeliveryCode => &mut self.delivery_code,
        };
        *slot = Some(value);
    }
}

/// The set of changed custom fields to send in a deal update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealChanges(BTreeMap<LogicalField, String>);

impl DealChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: LogicalField, value: String) {
        self.0.insert(field, value);
    }

    pub fn get(&self, field: LogicalField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LogicalField, &str)> {
        self.0.iter().map(|(field, value)| (*field, value.as_str()))
    }

    pub fn fields(&self) -> Vec<LogicalField> {
        self.0.keys().copied().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("79990000000")]
    #[case("+79990000000")]
    #[case("379990000000")]
    #[case("+7999000000")]
    fn phone_accepts_eleven_or_twelve_chars_plus_included(#[case] raw: &str) {
        let phone: Phone = raw.parse().expect("valid phone");
        assert_eq!(phone.as_str(), raw);
    }

    #[rstest]
    #[case("7999000000")]
    #[case("7999000000000")]
    #[case("7999-000-000")]
    #[case("+799900000")]
    #[case("+")]
    #[case("")]
    fn phone_rejects_malformed_values(#[case] raw: &str) {
        let err = raw.parse::<Phone>().unwrap_err();
        assert!(matches!(err, ValidationError::Phone { .. }), "got: {err}");
    }

    #[test]
    fn delivery_code_must_be_twelve_chars() {
        assert!("AAABBBCCCDDD".parse::<DeliveryCode>().is_ok());
        let err = "AAABBB".parse::<DeliveryCode>().unwrap_err();
        assert_eq!(
            err,
            ValidationError::DeliveryCode {
                value: "AAABBB".to_owned(),
                len: 6
            }
        );
    }

    #[test]
    fn delivery_code_counts_characters_not_bytes() {
        assert!("ААБББВВВГГГД".parse::<DeliveryCode>().is_ok());
    }

    #[test]
    fn newtype_display() {
        assert_eq!(ContactId::from("17").to_string(), "17");
        assert_eq!(DealId::from("42").to_string(), "42");
    }

    #[test]
    fn deal_field_accessors_agree() {
        let mut deal = Deal {
            id: DealId::from("1"),
            title: None,
            description: None,
            contact_id: None,
            products: None,
            delivery_address: None,
            delivery_date: None,
            delivery_code: None,
        };
        for field in LogicalField::ALL {
            assert_eq!(deal.field_value(field), None);
            deal.set_field_value(field, field.to_string());
            assert_eq!(deal.field_value(field), Some(field.to_string().as_str()));
        }
    }

    #[test]
    fn deal_changes_iterate_in_field_order() {
        let mut changes = DealChanges::new();
        changes.insert(LogicalField::DeliveryDate, "2024-02-02".to_owned());
        changes.insert(LogicalField::Products, "Chair".to_owned());
        assert_eq!(
            changes.fields(),
            vec![LogicalField::Products, LogicalField::DeliveryDate]
        );
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.get(LogicalField::Products), Some("Chair"));
        assert_eq!(changes.get(LogicalField::DeliveryAddress), None);
    }
}
