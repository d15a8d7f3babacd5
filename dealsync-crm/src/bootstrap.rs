//! Custom field bootstrap.
//!
//! Runs once before the service accepts submissions. Lists the deal user
//! fields a single time, then for each registry entry:
//!
//! 1. missing → add it as a string field;
//! 2. present with a non-string type → delete it, then add it again;
//! 3. present as a string → leave it alone.
//!
//! Only a failed listing is fatal. A failed add or delete is recorded in the
//! report and logged; the remaining fields are still processed.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use dealsync_core::fields::REQUIRED_FIELD_TYPE;
use dealsync_core::LogicalField;

use crate::error::StartupError;
use crate::gateway::{CrmGateway, UserFieldDefinition};

/// What the bootstrap did with one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FieldAction {
    Present,
    Added,
    Recreated { previous_type: String },
    Failed { error: String },
}

impl fmt::Display for FieldAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldAction::Present => write!(f, "present"),
            FieldAction::Added => write!(f, "added"),
            FieldAction::Recreated { previous_type } => {
                write!(f, "recreated (was {previous_type})")
            }
            FieldAction::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldStatus {
    pub field: LogicalField,
    pub crm_id: &'static str,
    #[serde(flatten)]
    pub action: FieldAction,
}

/// Outcome of [`ensure_custom_fields`], one entry per registry field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    pub fields: Vec<FieldStatus>,
}

impl FieldReport {
    /// Every field was already present with the right type.
    pub fn is_clean(&self) -> bool {
        self.fields
            .iter()
            .all(|status| status.action == FieldAction::Present)
    }

    pub fn changed(&self) -> usize {
        self.fields
            .iter()
            .filter(|status| {
                matches!(
                    status.action,
                    FieldAction::Added | FieldAction::Recreated { .. }
                )
            })
            .count()
    }

    pub fn failures(&self) -> Vec<&FieldStatus> {
        self.fields
            .iter()
            .filter(|status| matches!(status.action, FieldAction::Failed { .. }))
            .collect()
    }
}

/// Verify and repair the custom field registry on the CRM deal entity.
pub fn ensure_custom_fields<G>(gateway: &G) -> Result<FieldReport, StartupError>
where
    G: CrmGateway + ?Sized,
{
    let existing: HashMap<String, UserFieldDefinition> = gateway
        .list_deal_fields()
        .map_err(StartupError::FieldListing)?
        .into_iter()
        .map(|definition| (definition.field_name.clone(), definition))
        .collect();

    let mut report = FieldReport::default();
    for field in LogicalField::ALL {
        let action = match existing.get(field.crm_id()) {
            None => match gateway.add_deal_field(field) {
                Ok(()) => FieldAction::Added,
                Err(err) => FieldAction::Failed {
                    error: err.to_string(),
                },
            },
            Some(definition) if definition.user_type_id != REQUIRED_FIELD_TYPE => {
                recreate(gateway, field, definition)
            }
            Some(_) => FieldAction::Present,
        };

        match &action {
            FieldAction::Present => tracing::debug!("custom field {} present", field.crm_id()),
            FieldAction::Failed { error } => {
                tracing::warn!("custom field {} could not be repaired: {error}", field.crm_id())
            }
            other => tracing::info!("custom field {}: {other}", field.crm_id()),
        }

        report.fields.push(FieldStatus {
            field,
            crm_id: field.crm_id(),
            action,
        });
    }

    Ok(report)
}

fn recreate<G>(gateway: &G, field: LogicalField, definition: &UserFieldDefinition) -> FieldAction
where
    G: CrmGateway + ?Sized,
{
    if let Err(err) = gateway.delete_deal_field(&definition.id) {
        return FieldAction::Failed {
            error: err.to_string(),
        };
    }
    match gateway.add_deal_field(field) {
        Ok(()) => FieldAction::Recreated {
            previous_type: definition.user_type_id.clone(),
        },
        Err(err) => FieldAction::Failed {
            error: err.to_string(),
        },
    }
}
