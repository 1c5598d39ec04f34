use super::approval::BookingApprovals;
use super::checkout::{CheckoutInitiator, CheckoutPolicy};
use super::hosting::EventHosting;
use super::queries::WalletQueries;
use super::settlement::SettlementEngine;
use super::webhook::PaymentEventProcessor;
use crate::config::Settings;
use crate::domain::ports::{MarketplaceStore, SharedGateway, SharedStore};
use crate::error::Result;
use std::sync::Arc;

/// Wires every marketplace service onto one store and one gateway.
pub struct Marketplace {
    store: SharedStore,
    checkout: CheckoutInitiator<dyn MarketplaceStore>,
    payments: PaymentEventProcessor,
    approvals: BookingApprovals,
    queries: WalletQueries<dyn MarketplaceStore>,
    hosting: EventHosting<dyn MarketplaceStore>,
}

impl Marketplace {
    pub fn new(store: SharedStore, gateway: SharedGateway, settings: &Settings) -> Result<Self> {
        let policy = CheckoutPolicy::from_settings(settings)?;
        let role_upgrade_price = policy.role_upgrade_price;

        Ok(Self {
            checkout: CheckoutInitiator::new(Arc::clone(&store), gateway, policy),
            payments: PaymentEventProcessor::new(
                SettlementEngine::new(Arc::clone(&store)),
                role_upgrade_price,
            ),
            approvals: BookingApprovals::new(Arc::clone(&store)),
            queries: WalletQueries::new(Arc::clone(&store)),
            hosting: EventHosting::new(Arc::clone(&store)),
            store,
        })
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn checkout(&self) -> &CheckoutInitiator<dyn MarketplaceStore> {
        &self.checkout
    }

    pub fn payments(&self) -> &PaymentEventProcessor {
        &self.payments
    }

    pub fn approvals(&self) -> &BookingApprovals {
        &self.approvals
    }

    pub fn queries(&self) -> &WalletQueries<dyn MarketplaceStore> {
        &self.queries
    }

    pub fn hosting(&self) -> &EventHosting<dyn MarketplaceStore> {
        &self.hosting
    }
}
