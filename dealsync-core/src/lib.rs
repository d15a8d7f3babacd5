//! dealsync core library: domain types, custom-field registry, configuration.
//!
//! Public API surface:
//! - [`types`]: newtypes, CRM entities and incoming submission payloads
//! - [`fields`]: the custom field registry and products normalisation
//! - [`config`]: [`Settings`] loaded from the environment or a YAML file
//! - [`error`]: [`ValidationError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod fields;
pub mod types;

pub use config::{CrmSettings, ServerSettings, Settings};
pub use error::{ConfigError, ValidationError};
pub use fields::{normalize_products, LogicalField};
pub use types::{
    Contact, ContactId, ContactPayload, Deal, DealChanges, DealId, DealSubmission, DeliveryCode,
    Phone,
};
