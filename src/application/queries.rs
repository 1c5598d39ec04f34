use crate::domain::booking::Booking;
use crate::domain::ids::UserId;
use crate::domain::ports::LedgerQueries;
use crate::domain::ticket::Ticket;
use crate::domain::transaction::{AdminWalletTransaction, Transaction};
use crate::domain::wallet::{Wallet, WalletOwner};
use crate::error::Result;
use std::sync::Arc;

/// Read-only wallet and history views. Histories are newest first.
pub struct WalletQueries<S: ?Sized> {
    ledger: Arc<S>,
}

impl<S: LedgerQueries + ?Sized> WalletQueries<S> {
    pub fn new(ledger: Arc<S>) -> Self {
        Self { ledger }
    }

    /// A wallet that was never touched reads as zero; nothing is persisted.
    pub async fn wallet(&self, owner: WalletOwner) -> Result<Wallet> {
        Ok(self
            .ledger
            .wallet(owner)
            .await?
            .unwrap_or_else(|| Wallet::new(owner)))
    }

    pub async fn client_wallet(&self, client_id: UserId) -> Result<Wallet> {
        self.wallet(WalletOwner::Client(client_id)).await
    }

    pub async fn vendor_wallet(&self, vendor_id: UserId) -> Result<Wallet> {
        self.wallet(WalletOwner::Vendor(vendor_id)).await
    }

    pub async fn admin_wallet(&self) -> Result<Wallet> {
        self.wallet(WalletOwner::Admin).await
    }

    pub async fn all_wallets(&self) -> Result<Vec<Wallet>> {
        self.ledger.wallets().await
    }

    pub async fn transactions(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        let mut txs = self.ledger.transactions_for(user_id).await?;
        txs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(txs)
    }

    pub async fn admin_transactions(&self) -> Result<Vec<AdminWalletTransaction>> {
        let mut entries = self.ledger.admin_entries().await?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    pub async fn bookings(&self, client_id: UserId) -> Result<Vec<Booking>> {
        let mut bookings = self.ledger.bookings_for_client(client_id).await?;
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    pub async fn tickets(&self, client_id: UserId) -> Result<Vec<Ticket>> {
        let mut tickets = self.ledger.tickets_for(client_id).await?;
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }
}
