//! # dealsync-crm
//!
//! The CRM gateway: a [`CrmGateway`] trait over contact / deal lookups and
//! writes, the Bitrix24 implementation ([`Bitrix24Gateway`] over a blocking
//! [`Transport`]), a process-local [`InMemoryCrm`], and the one-time
//! custom field bootstrap ([`ensure_custom_fields`]).

pub mod bitrix;
pub mod bootstrap;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod transport;

pub use bitrix::Bitrix24Gateway;
pub use bootstrap::{ensure_custom_fields, FieldAction, FieldReport, FieldStatus};
pub use error::{GatewayError, StartupError};
pub use gateway::{method, CrmGateway, UserFieldDefinition};
pub use memory::{CrmCall, CrmOp, InMemoryCrm};
pub use transport::{Transport, UreqTransport};
