//! Deal lookup by delivery code.

use dealsync_core::{Deal, DeliveryCode};
use dealsync_crm::{CrmGateway, GatewayError};

/// The deal currently holding `code`, if any. Never writes.
pub fn resolve_deal<G>(gateway: &G, code: &DeliveryCode) -> Result<Option<Deal>, GatewayError>
where
    G: CrmGateway + ?Sized,
{
    let deal = gateway.find_deal_by_delivery_code(code)?;
    match &deal {
        Some(deal) => tracing::debug!("delivery code {code} held by deal {}", deal.id),
        None => tracing::debug!("delivery code {code} is unused"),
    }
    Ok(deal)
}
