use crate::domain::catalog::{EventListing, Location};
use crate::domain::ids::{EventId, UserId};
use crate::domain::money::Amount;
use crate::domain::ports::{Catalog, CatalogRegistry};
use crate::error::{MarketplaceError, Result};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Event details submitted by a host.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventDraft {
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub description: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub price_per_ticket: Decimal,
    pub ticket_limit: u32,
}

/// Publishes ticketed events. Only masters of ceremony may host.
pub struct EventHosting<S: ?Sized> {
    catalog: Arc<S>,
}

impl<S: Catalog + CatalogRegistry + ?Sized> EventHosting<S> {
    pub fn new(catalog: Arc<S>) -> Self {
        Self { catalog }
    }

    pub async fn host_event(&self, host_id: UserId, draft: EventDraft) -> Result<EventListing> {
        let host = self
            .catalog
            .user(host_id)
            .await?
            .ok_or_else(|| MarketplaceError::NotFound(format!("user {host_id}")))?;
        if !host.is_master_of_ceremony {
            return Err(MarketplaceError::Unauthenticated(
                "only a master of ceremony can host events".to_string(),
            ));
        }

        let title = draft.title.trim();
        if title.is_empty() {
            return Err(MarketplaceError::InvalidArgument(
                "event title is required".to_string(),
            ));
        }
        if draft.ticket_limit == 0 {
            return Err(MarketplaceError::InvalidArgument(
                "ticket_limit must be at least 1".to_string(),
            ));
        }
        if draft.end_time <= draft.start_time {
            return Err(MarketplaceError::InvalidArgument(
                "end_time must be after start_time".to_string(),
            ));
        }
        let price_per_ticket = Amount::new(draft.price_per_ticket)?;

        let event = EventListing {
            event_id: EventId::new(),
            title: title.to_string(),
            hosted_by: host_id,
            date: draft.date,
            location: draft.location,
            description: draft.description,
            start_time: draft.start_time,
            end_time: draft.end_time,
            price_per_ticket,
            ticket_limit: draft.ticket_limit,
            tickets_sold: 0,
        };
        self.catalog.register_event(event.clone()).await?;

        info!(event_id = %event.event_id, %host_id, ticket_limit = event.ticket_limit, "event hosted");
        Ok(event)
    }
}
