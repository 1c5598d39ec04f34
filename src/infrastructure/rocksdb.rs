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
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub const CF_USERS: &str = "users";
pub const CF_SERVICES: &str = "services";
pub const CF_EVENTS: &str = "events";
pub const CF_WALLETS: &str = "wallets";
/// Keyed by `<user id>/<timestamp>/<record id>` so a user's history is one prefix.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Claimed `(payment intent, status)` pairs.
pub const CF_SETTLED_INTENTS: &str = "settled_intents";
pub const CF_ADMIN_ENTRIES: &str = "admin_entries";
pub const CF_BOOKINGS: &str = "bookings";
pub const CF_TICKETS: &str = "tickets";
pub const CF_QR_CODES: &str = "qr_codes";

const COLUMN_FAMILIES: [&str; 10] = [
    CF_USERS,
    CF_SERVICES,
    CF_EVENTS,
    CF_WALLETS,
    CF_TRANSACTIONS,
    CF_SETTLED_INTENTS,
    CF_ADMIN_ENTRIES,
    CF_BOOKINGS,
    CF_TICKETS,
    CF_QR_CODES,
];

/// A persistent marketplace store backed by RocksDB.
///
/// Each record kind lives in its own column family as JSON. Units of work are
/// serialised by a writer lock, read through their own staged writes, and
/// commit with a single atomic `WriteBatch`. Readers outside a unit of work
/// only ever see committed batches.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at `path` with every column family present.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }

    fn get<T: DeserializeOwned>(&self, cf: &'static str, key: &[u8]) -> Result<Option<T>> {
        get_json(&self.db, cf, key)
    }

    fn put<T: Serialize>(&self, cf: &'static str, key: &[u8], value: &T) -> Result<()> {
        let handle = cf_handle(&self.db, cf)?;
        self.db.put_cf(handle, key, encode(value)?)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf: &'static str, prefix: Option<&[u8]>) -> Result<Vec<T>> {
        let handle = cf_handle(&self.db, cf)?;
        let mode = match prefix {
            Some(prefix) => IteratorMode::From(prefix, Direction::Forward),
            None => IteratorMode::Start,
        };

        let mut records = Vec::new();
        for item in self.db.iterator_cf(handle, mode) {
            let (key, value) = item?;
            if let Some(prefix) = prefix
                && !key.starts_with(prefix)
            {
                break;
            }
            records.push(decode(&value)?);
        }
        Ok(records)
    }
}

fn cf_handle<'a>(db: &'a DB, cf: &'static str) -> Result<&'a ColumnFamily> {
    db.cf_handle(cf)
        .ok_or_else(|| MarketplaceError::Storage(format!("column family {cf} not found")))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| MarketplaceError::Storage(format!("serialization error: {e}")))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| MarketplaceError::Storage(format!("deserialization error: {e}")))
}

fn get_json<T: DeserializeOwned>(db: &DB, cf: &'static str, key: &[u8]) -> Result<Option<T>> {
    let handle = cf_handle(db, cf)?;
    match db.get_pinned_cf(handle, key)? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

fn transaction_key(tx: &Transaction) -> Vec<u8> {
    format!(
        "{}/{:020}/{}",
        tx.user_id,
        tx.timestamp.timestamp_micros(),
        tx.id
    )
    .into_bytes()
}

fn intent_key(payment_intent_id: &str, status: PaymentStatus) -> Vec<u8> {
    format!("{payment_intent_id}/{}", status.as_str()).into_bytes()
}

#[async_trait]
impl Catalog for RocksDbStore {
    async fn user(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        self.get(CF_USERS, user_id.as_uuid().as_bytes())
    }

    async fn service(&self, service_id: ServiceId) -> Result<Option<VendorService>> {
        self.get(CF_SERVICES, service_id.as_uuid().as_bytes())
    }

    async fn event(&self, event_id: EventId) -> Result<Option<EventListing>> {
        self.get(CF_EVENTS, event_id.as_uuid().as_bytes())
    }

    async fn bookings_created_on(&self, client_id: UserId, day: NaiveDate) -> Result<u32> {
        let bookings: Vec<Booking> = self.scan(CF_BOOKINGS, None)?;
        let count = bookings
            .iter()
            .filter(|b| b.client_id == client_id && b.created_at.date_naive() == day)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

#[async_trait]
impl CatalogRegistry for RocksDbStore {
    async fn register_user(&self, user: UserProfile) -> Result<()> {
        let _writer = self.writer.lock().await;
        self.put(CF_USERS, user.user_id.as_uuid().as_bytes(), &user)
    }

    async fn register_service(&self, service: VendorService) -> Result<()> {
        let _writer = self.writer.lock().await;
        self.put(CF_SERVICES, service.service_id.as_uuid().as_bytes(), &service)
    }

    async fn register_event(&self, event: EventListing) -> Result<()> {
        let _writer = self.writer.lock().await;
        self.put(CF_EVENTS, event.event_id.as_uuid().as_bytes(), &event)
    }
}

#[async_trait]
impl LedgerQueries for RocksDbStore {
    async fn wallet(&self, owner: WalletOwner) -> Result<Option<Wallet>> {
        self.get(CF_WALLETS, owner.storage_key().as_bytes())
    }

    async fn wallets(&self) -> Result<Vec<Wallet>> {
        self.scan(CF_WALLETS, None)
    }

    async fn transactions_for(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        let prefix = format!("{user_id}/");
        self.scan(CF_TRANSACTIONS, Some(prefix.as_bytes()))
    }

    async fn admin_entries(&self) -> Result<Vec<AdminWalletTransaction>> {
        self.scan(CF_ADMIN_ENTRIES, None)
    }

    async fn booking(&self, booking_id: BookingId) -> Result<Option<Booking>> {
        self.get(CF_BOOKINGS, booking_id.as_uuid().as_bytes())
    }

    async fn bookings_for_client(&self, client_id: UserId) -> Result<Vec<Booking>> {
        let bookings: Vec<Booking> = self.scan(CF_BOOKINGS, None)?;
        Ok(bookings
            .into_iter()
            .filter(|b| b.client_id == client_id)
            .collect())
    }

    async fn tickets_for(&self, client_id: UserId) -> Result<Vec<Ticket>> {
        let tickets: Vec<Ticket> = self.scan(CF_TICKETS, None)?;
        Ok(tickets
            .into_iter()
            .filter(|t| t.client_id == client_id)
            .collect())
    }
}

#[async_trait]
impl MarketplaceStore for RocksDbStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let writer = Arc::clone(&self.writer).lock_owned().await;
        Ok(Box::new(RocksDbUnitOfWork {
            db: Arc::clone(&self.db),
            _writer: writer,
            staged: BTreeMap::new(),
        }))
    }
}

/// Staged puts keyed by column family and key, applied in one batch on commit.
struct RocksDbUnitOfWork {
    db: Arc<DB>,
    _writer: OwnedMutexGuard<()>,
    staged: BTreeMap<(&'static str, Vec<u8>), Vec<u8>>,
}

impl RocksDbUnitOfWork {
    fn read<T: DeserializeOwned>(&self, cf: &'static str, key: &[u8]) -> Result<Option<T>> {
        match self.staged.get(&(cf, key.to_vec())) {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => get_json(&self.db, cf, key),
        }
    }

    fn exists(&self, cf: &'static str, key: &[u8]) -> Result<bool> {
        if self.staged.contains_key(&(cf, key.to_vec())) {
            return Ok(true);
        }
        let handle = cf_handle(&self.db, cf)?;
        Ok(self.db.get_pinned_cf(handle, key)?.is_some())
    }

    fn write<T: Serialize>(&mut self, cf: &'static str, key: Vec<u8>, value: &T) -> Result<()> {
        self.staged.insert((cf, key), encode(value)?);
        Ok(())
    }
}

#[async_trait]
impl WalletLedger for RocksDbUnitOfWork {
    async fn load_wallet(&mut self, owner: WalletOwner) -> Result<Option<Wallet>> {
        self.read(CF_WALLETS, owner.storage_key().as_bytes())
    }

    async fn store_wallet(&mut self, wallet: Wallet) -> Result<()> {
        self.write(CF_WALLETS, wallet.owner.storage_key().into_bytes(), &wallet)
    }
}

#[async_trait]
impl TransactionLog for RocksDbUnitOfWork {
    async fn claim_payment_intent(
        &mut self,
        payment_intent_id: &str,
        status: PaymentStatus,
    ) -> Result<bool> {
        let key = intent_key(payment_intent_id, status);
        if self.exists(CF_SETTLED_INTENTS, &key)? {
            return Ok(false);
        }
        self.write(CF_SETTLED_INTENTS, key, &payment_intent_id)?;
        Ok(true)
    }

    async fn append_transaction(&mut self, tx: Transaction) -> Result<()> {
        self.write(CF_TRANSACTIONS, transaction_key(&tx), &tx)
    }

    async fn append_admin_entry(&mut self, entry: AdminWalletTransaction) -> Result<()> {
        let key = format!("{:020}/{}", entry.timestamp.timestamp_micros(), entry.id).into_bytes();
        self.write(CF_ADMIN_ENTRIES, key, &entry)
    }
}

#[async_trait]
impl BookingRepository for RocksDbUnitOfWork {
    async fn load_booking(&mut self, booking_id: BookingId) -> Result<Option<Booking>> {
        self.read(CF_BOOKINGS, booking_id.as_uuid().as_bytes())
    }

    async fn store_booking(&mut self, booking: Booking) -> Result<()> {
        let key = booking.booking_id.as_uuid().as_bytes().to_vec();
        self.write(CF_BOOKINGS, key, &booking)
    }
}

#[async_trait]
impl TicketOffice for RocksDbUnitOfWork {
    async fn issue_ticket(&mut self, ticket: Ticket, qr: QrCode) -> Result<()> {
        if self.exists(CF_TICKETS, ticket.ticket_id.as_bytes())? {
            return Err(MarketplaceError::Storage(format!(
                "ticket id {} already exists",
                ticket.ticket_id
            )));
        }
        self.write(CF_QR_CODES, qr.code.clone().into_bytes(), &qr)?;
        self.write(CF_TICKETS, ticket.ticket_id.clone().into_bytes(), &ticket)
    }

    async fn record_ticket_sale(&mut self, event_id: EventId) -> Result<EventListing> {
        let key = event_id.as_uuid().as_bytes().to_vec();
        let mut event: EventListing = self
            .read(CF_EVENTS, &key)?
            .ok_or_else(|| MarketplaceError::NotFound(format!("event {event_id}")))?;
        event.tickets_sold += 1;
        self.write(CF_EVENTS, key, &event)?;
        Ok(event)
    }
}

#[async_trait]
impl RoleRegistry for RocksDbUnitOfWork {
    async fn grant_master_of_ceremony(&mut self, user_id: UserId) -> Result<()> {
        let key = user_id.as_uuid().as_bytes().to_vec();
        let mut user: UserProfile = self
            .read(CF_USERS, &key)?
            .ok_or_else(|| MarketplaceError::NotFound(format!("user {user_id}")))?;
        user.is_master_of_ceremony = true;
        self.write(CF_USERS, key, &user)
    }
}

#[async_trait]
impl UnitOfWork for RocksDbUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        let mut batch = WriteBatch::default();
        for ((cf, key), value) in &self.staged {
            let handle = cf_handle(&self.db, *cf)?;
            batch.put_cf(handle, key, value);
        }
        self.db.write(batch)?;
        Ok(())
    }
}
