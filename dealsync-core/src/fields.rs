//! Custom field registry for the CRM deal entity.
//!
//! The CRM stores four order attributes in user-defined deal fields. Each
//! logical field has a short name used when the field is created
//! (`PRODUCTS`) and the identifier the CRM assigns to it, which is used for
//! every read and write (`UF_CRM_PRODUCTS`). All four must be of type
//! [`REQUIRED_FIELD_TYPE`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator used to store the ordered products list as one string.
pub const PRODUCTS_SEPARATOR: &str = ", ";

/// The CRM user-field type every registry entry must have.
pub const REQUIRED_FIELD_TYPE: &str = "string";

/// One of the four order attributes kept in CRM custom fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalField {
    Products,
    DeliveryAddress,
    DeliveryDate,
    DeliveryCode,
}

impl LogicalField {
    /// Every registry entry, in bootstrap order.
    pub const ALL: [LogicalField; 4] = [
        LogicalField::Products,
        LogicalField::DeliveryAddress,
        LogicalField::DeliveryDate,
        LogicalField::DeliveryCode,
    ];

    /// Name passed to the CRM when the field is created.
    pub fn name(self) -> &'static str {
        match self {
            LogicalField::Products => "PRODUCTS",
            LogicalField::DeliveryAddress => "DELIVERY_ADDRESS",
            LogicalField::DeliveryDate => "DELIVERY_DATE",
            LogicalField::DeliveryCode => "DELIVERY_CODE",
        }
    }

    /// Identifier of the field on the CRM deal entity.
    pub fn crm_id(self) -> &'static str {
        match self {
            LogicalField::Products => "UF_CRM_PRODUCTS",
            LogicalField::DeliveryAddress => "UF_CRM_DELIVERY_ADDRESS",
            LogicalField::DeliveryDate => "UF_CRM_DELIVERY_DATE",
            LogicalField::DeliveryCode => "UF_CRM_DELIVERY_CODE",
        }
    }

    /// Whether a resubmission may change the field. The delivery code is
    /// the matching key and never changes once a deal exists.
    pub fn is_mutable(self) -> bool {
        !matches!(self, LogicalField::DeliveryCode)
    }

    /// Registry entries a resubmission may change, in bootstrap order.
    pub fn mutable() -> impl Iterator<Item = LogicalField> {
        Self::ALL.into_iter().filter(|field| field.is_mutable())
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalField::Products => write!(f, "products"),
            LogicalField::DeliveryAddress => write!(f, "delivery_address"),
            LogicalField::DeliveryDate => write!(f, "delivery_date"),
            LogicalField::DeliveryCode => write!(f, "delivery_code"),
        }
    }
}

/// Join an ordered products list into the single string the CRM stores.
///
/// This is the only place products are flattened; both the field diff and
/// the gateway payloads go through it so comparisons and writes agree.
pub fn normalize_products<S: AsRef<str>>(products: &[S]) -> String {
    products
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(PRODUCTS_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(&[], "")]
    #[case(&["Chair"], "Chair")]
    #[case(&["Chair", "Table"], "Chair, Table")]
    #[case(&["A", "B", "C"], "A, B, C")]
    fn products_are_joined_with_comma_space(#[case] input: &[&str], #[case] expected: &str) {
        assert_eq!(normalize_products(input), expected);
    }

    #[test]
    fn crm_ids_carry_the_user_field_prefix() {
        for field in LogicalField::ALL {
            assert_eq!(field.crm_id(), format!("UF_CRM_{}", field.name()));
        }
    }

    #[test]
    fn delivery_code_is_the_only_immutable_field() {
        let immutable: Vec<_> = LogicalField::ALL
            .into_iter()
            .filter(|f| !f.is_mutable())
            .collect();
        assert_eq!(immutable, vec![LogicalField::DeliveryCode]);
        assert_eq!(
            LogicalField::mutable().collect::<Vec<_>>(),
            vec![
                LogicalField::Products,
                LogicalField::DeliveryAddress,
                LogicalField::DeliveryDate,
            ]
        );
    }
}
