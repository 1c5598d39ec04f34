//! Capability traits the application layer is written against.
//!
//! Storage is split by concern so each component only depends on what it
//! touches. Every mutation happens inside a [`UnitOfWork`]: the store
//! serialises units of work, stages their writes and applies them atomically
//! on [`UnitOfWork::commit`]. Dropping a unit of work discards its writes.

use super::booking::Booking;
use super::catalog::{EventListing, UserProfile, VendorService};
use super::ids::{BookingId, EventId, ServiceId, UserId};
use super::money::Amount;
use super::ticket::{QrCode, Ticket};
use super::transaction::{AdminWalletTransaction, PaymentStatus, Transaction};
use super::wallet::{Wallet, WalletOwner};
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;

#[async_trait]
pub trait WalletLedger: Send {
    async fn load_wallet(&mut self, owner: WalletOwner) -> Result<Option<Wallet>>;
    async fn store_wallet(&mut self, wallet: Wallet) -> Result<()>;

    /// Adds to balance and deposits, creating the wallet on first use.
    async fn credit(&mut self, owner: WalletOwner, amount: Amount) -> Result<Wallet> {
        let mut wallet = self
            .load_wallet(owner)
            .await?
            .unwrap_or_else(|| Wallet::new(owner));
        wallet.credit(amount);
        self.store_wallet(wallet.clone()).await?;
        Ok(wallet)
    }

    /// Takes from balance and adds to withdrawals; refused when the balance does not cover it.
    async fn debit(&mut self, owner: WalletOwner, amount: Amount) -> Result<Wallet> {
        let mut wallet = self
            .load_wallet(owner)
            .await?
            .unwrap_or_else(|| Wallet::new(owner));
        wallet.debit(amount)?;
        self.store_wallet(wallet.clone()).await?;
        Ok(wallet)
    }
}

#[async_trait]
pub trait TransactionLog: Send {
    /// Records that `payment_intent_id` settled with `status`.
    ///
    /// Returns `false` when that pair was already claimed, meaning the payment
    /// event was delivered before and its effects are already in the ledger.
    async fn claim_payment_intent(
        &mut self,
        payment_intent_id: &str,
        status: PaymentStatus,
    ) -> Result<bool>;
    async fn append_transaction(&mut self, tx: Transaction) -> Result<()>;
    async fn append_admin_entry(&mut self, entry: AdminWalletTransaction) -> Result<()>;
}

#[async_trait]
pub trait BookingRepository: Send {
    async fn load_booking(&mut self, booking_id: BookingId) -> Result<Option<Booking>>;
    async fn store_booking(&mut self, booking: Booking) -> Result<()>;
}

#[async_trait]
pub trait TicketOffice: Send {
    /// Fails when the ticket id is already taken.
    async fn issue_ticket(&mut self, ticket: Ticket, qr: QrCode) -> Result<()>;
    async fn record_ticket_sale(&mut self, event_id: EventId) -> Result<EventListing>;
}

#[async_trait]
pub trait RoleRegistry: Send {
    async fn grant_master_of_ceremony(&mut self, user_id: UserId) -> Result<()>;
}

#[async_trait]
pub trait UnitOfWork:
    WalletLedger + TransactionLog + BookingRepository + TicketOffice + RoleRegistry + Send
{
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Read side of the catalog used for checkout validation and pricing.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn user(&self, user_id: UserId) -> Result<Option<UserProfile>>;
    async fn service(&self, service_id: ServiceId) -> Result<Option<VendorService>>;
    async fn event(&self, event_id: EventId) -> Result<Option<EventListing>>;
    async fn bookings_created_on(&self, client_id: UserId, day: NaiveDate) -> Result<u32>;
}

/// Write side of the catalog, owned by marketplace administration.
#[async_trait]
pub trait CatalogRegistry: Send + Sync {
    async fn register_user(&self, user: UserProfile) -> Result<()>;
    async fn register_service(&self, service: VendorService) -> Result<()>;
    async fn register_event(&self, event: EventListing) -> Result<()>;
}

/// Committed ledger state, for wallet and history views.
#[async_trait]
pub trait LedgerQueries: Send + Sync {
    async fn wallet(&self, owner: WalletOwner) -> Result<Option<Wallet>>;
    async fn wallets(&self) -> Result<Vec<Wallet>>;
    async fn transactions_for(&self, user_id: UserId) -> Result<Vec<Transaction>>;
    async fn admin_entries(&self) -> Result<Vec<AdminWalletTransaction>>;
    async fn booking(&self, booking_id: BookingId) -> Result<Option<Booking>>;
    async fn bookings_for_client(&self, client_id: UserId) -> Result<Vec<Booking>>;
    async fn tickets_for(&self, client_id: UserId) -> Result<Vec<Ticket>>;
}

#[async_trait]
pub trait MarketplaceStore: Catalog + CatalogRegistry + LedgerQueries + Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}

pub type SharedStore = Arc<dyn MarketplaceStore>;

/// A priced, single-line-item hosted checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSessionRequest {
    pub product_name: String,
    pub unit_amount: Amount,
    pub currency: String,
    pub quantity: u32,
    pub client_reference_id: String,
    /// Copied onto both the session and its payment intent.
    pub metadata: BTreeMap<String, String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession>;
}

pub type SharedGateway = Arc<dyn PaymentGateway>;
