use crate::domain::booking::Booking;
use crate::domain::catalog::{EventListing, UserProfile, VendorService};
use crate::domain::ids::{BookingId, EventId, ServiceId, UserId};
use crate::domain::ports::{
    BookingRepository, Catalog, CatalogRegistry, LedgerQueries, MarketplaceStore, RoleRegistry,
    TicketOffice, TransactionLog, UnitOfWork, WalletLedger,
};
use crate::domain::ticket::{QrCode, Ticket};
use crate::domain::transaction::{AdminWalletTransaction, PaymentStatus, Transaction};
use crate::domain::wallet::{Wallet, WalletOwner};
use crate::error::{MarketplaceError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Everything the marketplace persists, held as plain collections.
#[derive(Debug, Default)]
struct LedgerState {
    users: HashMap<UserId, UserProfile>,
    services: HashMap<ServiceId, VendorService>,
    events: HashMap<EventId, EventListing>,
    wallets: BTreeMap<WalletOwner, Wallet>,
    transactions: Vec<Transaction>,
    settled_intents: HashSet<(String, PaymentStatus)>,
    admin_entries: Vec<AdminWalletTransaction>,
    bookings: HashMap<BookingId, Booking>,
    tickets: HashMap<String, Ticket>,
    qr_codes: HashMap<String, QrCode>,
}

/// A thread-safe in-memory marketplace store.
///
/// A unit of work takes the state lock for its whole lifetime and stages only
/// the records it writes; commit merges them into the shared state. Units of
/// work are therefore serialised and see no partial writes from each other.
/// Suited to tests and single-process runs where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Catalog for InMemoryStore {
    async fn user(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn service(&self, service_id: ServiceId) -> Result<Option<VendorService>> {
        Ok(self.state.lock().await.services.get(&service_id).cloned())
    }

    async fn event(&self, event_id: EventId) -> Result<Option<EventListing>> {
        Ok(self.state.lock().await.events.get(&event_id).cloned())
    }

    async fn bookings_created_on(&self, client_id: UserId, day: NaiveDate) -> Result<u32> {
        let state = self.state.lock().await;
        let count = state
            .bookings
            .values()
            .filter(|b| b.client_id == client_id && b.created_at.date_naive() == day)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

#[async_trait]
impl CatalogRegistry for InMemoryStore {
    async fn register_user(&self, user: UserProfile) -> Result<()> {
        self.state.lock().await.users.insert(user.user_id, user);
        Ok(())
    }

    async fn register_service(&self, service: VendorService) -> Result<()> {
        self.state
            .lock()
            .await
            .services
            .insert(service.service_id, service);
        Ok(())
    }

    async fn register_event(&self, event: EventListing) -> Result<()> {
        self.state.lock().await.events.insert(event.event_id, event);
        Ok(())
    }
}

#[async_trait]
impl LedgerQueries for InMemoryStore {
    async fn wallet(&self, owner: WalletOwner) -> Result<Option<Wallet>> {
        Ok(self.state.lock().await.wallets.get(&owner).cloned())
    }

    async fn wallets(&self) -> Result<Vec<Wallet>> {
        Ok(self.state.lock().await.wallets.values().cloned().collect())
    }

    async fn transactions_for(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| tx.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn admin_entries(&self) -> Result<Vec<AdminWalletTransaction>> {
        Ok(self.state.lock().await.admin_entries.clone())
    }

    async fn booking(&self, booking_id: BookingId) -> Result<Option<Booking>> {
        Ok(self.state.lock().await.bookings.get(&booking_id).cloned())
    }

    async fn bookings_for_client(&self, client_id: UserId) -> Result<Vec<Booking>> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .values()
            .filter(|b| b.client_id == client_id)
            .cloned()
            .collect())
    }

    async fn tickets_for(&self, client_id: UserId) -> Result<Vec<Ticket>> {
        let state = self.state.lock().await;
        Ok(state
            .tickets
            .values()
            .filter(|t| t.client_id == client_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MarketplaceStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(InMemoryUnitOfWork {
            guard,
            staged: Staged::default(),
        }))
    }
}

/// Records written by one unit of work, layered over the locked state.
#[derive(Default)]
struct Staged {
    users: HashMap<UserId, UserProfile>,
    events: HashMap<EventId, EventListing>,
    wallets: BTreeMap<WalletOwner, Wallet>,
    transactions: Vec<Transaction>,
    settled_intents: HashSet<(String, PaymentStatus)>,
    admin_entries: Vec<AdminWalletTransaction>,
    bookings: HashMap<BookingId, Booking>,
    tickets: HashMap<String, Ticket>,
    qr_codes: HashMap<String, QrCode>,
}

/// Holds the store lock for its lifetime; `staged` is merged in on commit.
struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<LedgerState>,
    staged: Staged,
}

impl InMemoryUnitOfWork {
    fn staged_event(&mut self, event_id: EventId) -> Option<&mut EventListing> {
        if !self.staged.events.contains_key(&event_id) {
            let event = self.guard.events.get(&event_id)?.clone();
            self.staged.events.insert(event_id, event);
        }
        self.staged.events.get_mut(&event_id)
    }

    fn staged_user(&mut self, user_id: UserId) -> Option<&mut UserProfile> {
        if !self.staged.users.contains_key(&user_id) {
            let user = self.guard.users.get(&user_id)?.clone();
            self.staged.users.insert(user_id, user);
        }
        self.staged.users.get_mut(&user_id)
    }
}

#[async_trait]
impl WalletLedger for InMemoryUnitOfWork {
    async fn load_wallet(&mut self, owner: WalletOwner) -> Result<Option<Wallet>> {
        Ok(self
            .staged
            .wallets
            .get(&owner)
            .or_else(|| self.guard.wallets.get(&owner))
            .cloned())
    }

    async fn store_wallet(&mut self, wallet: Wallet) -> Result<()> {
        self.staged.wallets.insert(wallet.owner, wallet);
        Ok(())
    }
}

#[async_trait]
impl TransactionLog for InMemoryUnitOfWork {
    async fn claim_payment_intent(
        &mut self,
        payment_intent_id: &str,
        status: PaymentStatus,
    ) -> Result<bool> {
        let key = (payment_intent_id.to_string(), status);
        if self.guard.settled_intents.contains(&key) {
            return Ok(false);
        }
        Ok(self.staged.settled_intents.insert(key))
    }

    async fn append_transaction(&mut self, tx: Transaction) -> Result<()> {
        self.staged.transactions.push(tx);
        Ok(())
    }

    async fn append_admin_entry(&mut self, entry: AdminWalletTransaction) -> Result<()> {
        self.staged.admin_entries.push(entry);
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for InMemoryUnitOfWork {
    async fn load_booking(&mut self, booking_id: BookingId) -> Result<Option<Booking>> {
        Ok(self
            .staged
            .bookings
            .get(&booking_id)
            .or_else(|| self.guard.bookings.get(&booking_id))
            .cloned())
    }

    async fn store_booking(&mut self, booking: Booking) -> Result<()> {
        self.staged.bookings.insert(booking.booking_id, booking);
        Ok(())
    }
}

#[async_trait]
impl TicketOffice for InMemoryUnitOfWork {
    async fn issue_ticket(&mut self, ticket: Ticket, qr: QrCode) -> Result<()> {
        if self.staged.tickets.contains_key(&ticket.ticket_id)
            || self.guard.tickets.contains_key(&ticket.ticket_id)
        {
            return Err(MarketplaceError::Storage(format!(
                "ticket id {} already exists",
                ticket.ticket_id
            )));
        }
        self.staged.qr_codes.insert(qr.code.clone(), qr);
        self.staged.tickets.insert(ticket.ticket_id.clone(), ticket);
        Ok(())
    }

    async fn record_ticket_sale(&mut self, event_id: EventId) -> Result<EventListing> {
        let event = self
            .staged_event(event_id)
            .ok_or_else(|| MarketplaceError::NotFound(format!("event {event_id}")))?;
        event.tickets_sold += 1;
        Ok(event.clone())
    }
}

#[async_trait]
impl RoleRegistry for InMemoryUnitOfWork {
    async fn grant_master_of_ceremony(&mut self, user_id: UserId) -> Result<()> {
        let user = self
            .staged_user(user_id)
            .ok_or_else(|| MarketplaceError::NotFound(format!("user {user_id}")))?;
        user.is_master_of_ceremony = true;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryUnitOfWork { mut guard, staged } = *self;
        guard.users.extend(staged.users);
        guard.events.extend(staged.events);
        guard.wallets.extend(staged.wallets);
        guard.transactions.extend(staged.transactions);
        guard.settled_intents.extend(staged.settled_intents);
        guard.admin_entries.extend(staged.admin_entries);
        guard.bookings.extend(staged.bookings);
        guard.tickets.extend(staged.tickets);
        guard.qr_codes.extend(staged.qr_codes);
        Ok(())
    }
}
