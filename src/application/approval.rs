//! Two-sided approval, fund release and refunds for vendor bookings.
//!
//! Every operation runs in one unit of work, so a refused debit leaves the
//! booking and all wallets exactly as they were.

use crate::domain::booking::{Approval, Booking, BookingStatus, Party, Unwind};
use crate::domain::ids::{BookingId, UserId};
use crate::domain::ports::{BookingRepository, SharedStore, TransactionLog, WalletLedger};
use crate::domain::transaction::{
    AdminEntryStatus, AdminWalletTransaction, PaymentMethod, PaymentStatus, Purpose, Transaction,
};
use crate::domain::wallet::WalletOwner;
use crate::error::{MarketplaceError, Result};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingOutcome {
    AwaitingCounterparty,
    FundsReleased,
    AlreadyReleased,
    Refunded,
    /// The request was refused by a booking guard; nothing changed.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingReply {
    pub outcome: BookingOutcome,
    pub message: String,
}

impl BookingReply {
    fn new(outcome: BookingOutcome, message: impl Into<String>) -> Self {
        Self {
            outcome,
            message: message.into(),
        }
    }
}

pub struct BookingApprovals {
    store: SharedStore,
}

impl BookingApprovals {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Client-side approval. `status` optionally moves the booking to
    /// `confirmed` or `completed` while the vendor has not approved yet.
    pub async fn complete_service_booking(
        &self,
        booking_id: BookingId,
        client_id: UserId,
        status: Option<BookingStatus>,
    ) -> Result<BookingReply> {
        if let Some(status) = status
            && !matches!(status, BookingStatus::Confirmed | BookingStatus::Completed)
        {
            return Err(MarketplaceError::InvalidArgument(format!(
                "status must be confirmed or completed, got {status:?}"
            )));
        }

        let mut uow = self.store.begin().await?;
        let mut booking = load_for(&mut *uow, booking_id, Party::Client, client_id).await?;
        let reply = approve(&mut *uow, &mut booking, Party::Client, status).await?;
        if reply.outcome != BookingOutcome::AlreadyReleased {
            uow.store_booking(booking).await?;
            uow.commit().await?;
        }
        Ok(reply)
    }

    /// Vendor-side approval; releases the escrowed price when the client already approved.
    pub async fn approve_service_booking(
        &self,
        booking_id: BookingId,
        vendor_id: UserId,
    ) -> Result<BookingReply> {
        let mut uow = self.store.begin().await?;
        let mut booking = load_for(&mut *uow, booking_id, Party::Vendor, vendor_id).await?;
        let reply = approve(&mut *uow, &mut booking, Party::Vendor, None).await?;
        if reply.outcome != BookingOutcome::AlreadyReleased {
            uow.store_booking(booking).await?;
            uow.commit().await?;
        }
        Ok(reply)
    }

    /// Client cancels and is refunded the booking price.
    pub async fn cancel_vendor_booking(
        &self,
        booking_id: BookingId,
        client_id: UserId,
    ) -> Result<BookingReply> {
        self.unwind(booking_id, Party::Client, client_id).await
    }

    /// Vendor declines and the client is refunded the booking price.
    pub async fn reject_vendor_booking(
        &self,
        booking_id: BookingId,
        vendor_id: UserId,
    ) -> Result<BookingReply> {
        self.unwind(booking_id, Party::Vendor, vendor_id).await
    }

    async fn unwind(
        &self,
        booking_id: BookingId,
        party: Party,
        caller: UserId,
    ) -> Result<BookingReply> {
        let (purpose, closed_as) = match party {
            Party::Client => (Purpose::CancelVendorBooking, BookingStatus::Cancelled),
            Party::Vendor => (Purpose::RejectVendorBooking, BookingStatus::Rejected),
        };

        let mut uow = self.store.begin().await?;
        let mut booking = load_for(&mut *uow, booking_id, party, caller).await?;
        if let Unwind::Refused(reason) = booking.unwind_check() {
            info!(%booking_id, ?party, %reason, "booking unwind refused");
            return Ok(BookingReply::new(BookingOutcome::Unchanged, reason));
        }

        refund(&mut *uow, &booking, purpose).await?;
        booking.close(closed_as);
        uow.store_booking(booking).await?;
        uow.commit().await?;

        let message = match party {
            Party::Client => "booking cancelled and refunded",
            Party::Vendor => "booking rejected and refunded",
        };
        Ok(BookingReply::new(BookingOutcome::Refunded, message))
    }
}

async fn load_for<L>(
    ledger: &mut L,
    booking_id: BookingId,
    party: Party,
    caller: UserId,
) -> Result<Booking>
where
    L: BookingRepository + ?Sized,
{
    let booking = ledger
        .load_booking(booking_id)
        .await?
        .ok_or_else(|| MarketplaceError::NotFound(format!("booking {booking_id}")))?;
    let owner = match party {
        Party::Client => booking.client_id,
        Party::Vendor => booking.vendor_id,
    };
    if owner != caller {
        return Err(MarketplaceError::PermissionDenied(format!(
            "user {caller} is not the {} of booking {booking_id}",
            match party {
                Party::Client => "client",
                Party::Vendor => "vendor",
            }
        )));
    }
    Ok(booking)
}

async fn approve<L>(
    ledger: &mut L,
    booking: &mut Booking,
    party: Party,
    status: Option<BookingStatus>,
) -> Result<BookingReply>
where
    L: WalletLedger + TransactionLog + ?Sized,
{
    match booking.approve(party)? {
        Approval::AlreadyReleased => Ok(BookingReply::new(
            BookingOutcome::AlreadyReleased,
            "funds already released",
        )),
        Approval::AwaitingCounterparty => {
            if let Some(status) = status {
                booking.close(status);
            }
            info!(booking_id = %booking.booking_id, ?party, "booking approved, awaiting counterparty");
            Ok(BookingReply::new(
                BookingOutcome::AwaitingCounterparty,
                "approval recorded, waiting for the other party",
            ))
        }
        Approval::ReleaseDue => {
            release_funds(ledger, booking).await?;
            Ok(BookingReply::new(
                BookingOutcome::FundsReleased,
                "booking completed and funds released to the vendor",
            ))
        }
    }
}

/// Moves the escrowed price from the admin wallet to the vendor wallet.
async fn release_funds<L>(ledger: &mut L, booking: &mut Booking) -> Result<()>
where
    L: WalletLedger + TransactionLog + ?Sized,
{
    ledger.debit(WalletOwner::Admin, booking.price).await?;
    ledger
        .credit(WalletOwner::Vendor(booking.vendor_id), booking.price)
        .await?;
    ledger
        .append_transaction(
            Transaction::new(
                booking.vendor_id,
                Purpose::VendorPayout,
                booking.price,
                PaymentMethod::Wallet,
                PaymentStatus::Paid,
            )
            .with_payment_intent(booking.payment_intent_id.as_str()),
        )
        .await?;
    ledger
        .append_admin_entry(AdminWalletTransaction::new(
            Purpose::VendorPayout,
            booking.price,
            AdminEntryStatus::Withdrawn,
        ))
        .await?;
    booking.mark_released()?;

    info!(
        booking_id = %booking.booking_id,
        vendor_id = %booking.vendor_id,
        amount = %booking.price,
        "booking funds released"
    );
    Ok(())
}

/// Returns the booking price from the admin wallet to the client.
async fn refund<L>(ledger: &mut L, booking: &Booking, purpose: Purpose) -> Result<()>
where
    L: WalletLedger + TransactionLog + ?Sized,
{
    ledger.debit(WalletOwner::Admin, booking.price).await?;
    ledger
        .credit(WalletOwner::Client(booking.client_id), booking.price)
        .await?;
    ledger
        .append_transaction(
            Transaction::new(
                booking.client_id,
                purpose,
                booking.price,
                PaymentMethod::Wallet,
                PaymentStatus::Refunded,
            )
            .with_payment_intent(booking.payment_intent_id.as_str()),
        )
        .await?;
    ledger
        .append_admin_entry(AdminWalletTransaction::new(
            purpose,
            booking.price,
            AdminEntryStatus::Withdrawn,
        ))
        .await?;

    info!(
        booking_id = %booking.booking_id,
        client_id = %booking.client_id,
        amount = %booking.price,
        %purpose,
        "booking refunded"
    );
    Ok(())
}
