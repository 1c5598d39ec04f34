//! Turns verified payment outcomes into ledger effects.
//!
//! Each outcome is applied inside one unit of work: the payment intent is
//! claimed first, then the records for its purpose are staged, then the whole
//! set is committed. A replayed outcome finds its claim taken and changes
//! nothing. A failing step rolls the unit of work back and surfaces as an
//! internal error naming the step.

use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::catalog::VendorService;
use crate::domain::ids::{BookingId, EventId, ServiceId, UserId};
use crate::domain::money::Amount;
use crate::domain::ports::{
    BookingRepository, RoleRegistry, SharedStore, TicketOffice, TransactionLog, WalletLedger,
};
use crate::domain::ticket::Ticket;
use crate::domain::transaction::{
    AdminEntryStatus, AdminWalletTransaction, PaymentMethod, PaymentStatus, Purpose, Transaction,
};
use crate::domain::wallet::WalletOwner;
use crate::error::{MarketplaceError, Result, StepContext};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

/// What a payment was for, as recovered from its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementPurpose {
    RoleUpgrade,
    VendorBooking {
        vendor_id: UserId,
        service_id: ServiceId,
        /// Catalog price quoted when the session was opened.
        quoted_price: Option<Amount>,
    },
    EventBooking {
        event_id: EventId,
    },
}

impl SettlementPurpose {
    pub fn purpose(&self) -> Purpose {
        match self {
            Self::RoleUpgrade => Purpose::RoleUpgrade,
            Self::VendorBooking { .. } => Purpose::VendorBooking,
            Self::EventBooking { .. } => Purpose::EventBooking,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedPayment {
    pub user_id: UserId,
    pub payment_intent_id: String,
    pub amount: Amount,
    pub purpose: SettlementPurpose,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Succeeded(ClassifiedPayment),
    Failed(ClassifiedPayment),
}

impl PaymentOutcome {
    pub fn payment(&self) -> &ClassifiedPayment {
        match self {
            Self::Succeeded(payment) | Self::Failed(payment) => payment,
        }
    }

    pub fn status(&self) -> PaymentStatus {
        match self {
            Self::Succeeded(_) => PaymentStatus::Paid,
            Self::Failed(_) => PaymentStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementReceipt {
    Settled { transaction_id: Uuid },
    /// The payment intent was settled with this status before.
    AlreadySettled,
}

/// Work decided before the unit of work opens; catalog reads happen here.
enum Plan {
    RecordFailure,
    RoleUpgrade,
    VendorBooking {
        service: VendorService,
    },
    EventBooking {
        event_id: EventId,
    },
}

pub struct SettlementEngine {
    store: SharedStore,
}

impl SettlementEngine {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn settle(&self, outcome: PaymentOutcome) -> Result<SettlementReceipt> {
        let status = outcome.status();
        let payment = outcome.payment();
        let plan = self.plan(&outcome).await?;

        let mut uow = self.store.begin().await.step("open unit of work")?;
        let claimed = uow
            .claim_payment_intent(&payment.payment_intent_id, status)
            .await
            .step("claim payment intent")?;
        if !claimed {
            info!(
                payment_intent_id = %payment.payment_intent_id,
                status = status.as_str(),
                "payment already settled, skipping"
            );
            return Ok(SettlementReceipt::AlreadySettled);
        }

        let transaction_id = match plan {
            Plan::RecordFailure => record_failure(&mut *uow, payment).await?,
            Plan::RoleUpgrade => settle_role_upgrade(&mut *uow, payment).await?,
            Plan::VendorBooking { service } => {
                settle_vendor_booking(&mut *uow, payment, service).await?
            }
            Plan::EventBooking { event_id } => {
                settle_event_booking(&mut *uow, payment, event_id).await?
            }
        };
        uow.commit().await.step("commit settlement")?;

        info!(
            user_id = %payment.user_id,
            payment_intent_id = %payment.payment_intent_id,
            purpose = %payment.purpose.purpose(),
            status = status.as_str(),
            amount = %payment.amount,
            %transaction_id,
            "payment settled"
        );
        Ok(SettlementReceipt::Settled { transaction_id })
    }

    async fn plan(&self, outcome: &PaymentOutcome) -> Result<Plan> {
        let PaymentOutcome::Succeeded(payment) = outcome else {
            return Ok(Plan::RecordFailure);
        };

        match payment.purpose {
            SettlementPurpose::RoleUpgrade => Ok(Plan::RoleUpgrade),
            SettlementPurpose::EventBooking { event_id } => Ok(Plan::EventBooking { event_id }),
            SettlementPurpose::VendorBooking {
                vendor_id,
                service_id,
                quoted_price,
            } => {
                let service = self
                    .store
                    .service(service_id)
                    .await
                    .and_then(|service| {
                        service.ok_or_else(|| {
                            MarketplaceError::NotFound(format!("service {service_id}"))
                        })
                    })
                    .step("look up booked service")?;
                check_service_owner(&service, vendor_id).step("match service owner")?;
                check_paid_amount(payment, quoted_price).step("match paid amount to quote")?;
                Ok(Plan::VendorBooking { service })
            }
        }
    }
}

fn check_service_owner(service: &VendorService, vendor_id: UserId) -> Result<()> {
    if service.vendor_id == vendor_id {
        return Ok(());
    }
    Err(MarketplaceError::FailedPrecondition(format!(
        "service {} is owned by vendor {}, payment names vendor {vendor_id}",
        service.service_id, service.vendor_id
    )))
}

/// The booking holds exactly what was paid, so release and refund move that amount.
fn check_paid_amount(payment: &ClassifiedPayment, quoted_price: Option<Amount>) -> Result<()> {
    match quoted_price {
        Some(quote) if quote != payment.amount => Err(MarketplaceError::FailedPrecondition(
            format!("paid {} but the quoted price was {quote}", payment.amount),
        )),
        Some(_) => Ok(()),
        None => {
            warn!(
                payment_intent_id = %payment.payment_intent_id,
                paid = %payment.amount,
                "vendor booking payment without a quoted price, booking the paid amount"
            );
            Ok(())
        }
    }
}

async fn record_failure<L>(ledger: &mut L, payment: &ClassifiedPayment) -> Result<Uuid>
where
    L: TransactionLog + ?Sized,
{
    let tx = Transaction::new(
        payment.user_id,
        payment.purpose.purpose(),
        payment.amount,
        PaymentMethod::Card,
        PaymentStatus::Failed,
    )
    .with_payment_intent(payment.payment_intent_id.as_str());
    let transaction_id = tx.transaction_id;
    ledger
        .append_transaction(tx)
        .await
        .step("record failed transaction")?;
    Ok(transaction_id)
}

async fn settle_role_upgrade<L>(ledger: &mut L, payment: &ClassifiedPayment) -> Result<Uuid>
where
    L: TransactionLog + WalletLedger + RoleRegistry + ?Sized,
{
    let transaction_id = record_paid(ledger, payment, Purpose::RoleUpgrade).await?;
    collect_into_admin_wallet(ledger, Purpose::RoleUpgrade, payment.amount).await?;
    ledger
        .grant_master_of_ceremony(payment.user_id)
        .await
        .step("grant master of ceremony")?;
    Ok(transaction_id)
}

async fn settle_vendor_booking<L>(
    ledger: &mut L,
    payment: &ClassifiedPayment,
    service: VendorService,
) -> Result<Uuid>
where
    L: TransactionLog + WalletLedger + BookingRepository + ?Sized,
{
    let now = Utc::now();
    let booking = Booking {
        booking_id: BookingId::for_payment_intent(&payment.payment_intent_id),
        client_id: payment.user_id,
        vendor_id: service.vendor_id,
        service_id: service.service_id,
        service: service.title,
        date: service.available_date,
        price: payment.amount,
        status: BookingStatus::Pending,
        is_client_approved: false,
        is_vendor_approved: false,
        is_fund_released: false,
        payment_intent_id: payment.payment_intent_id.clone(),
        created_at: now,
        updated_at: now,
    };
    ledger
        .store_booking(booking)
        .await
        .step("create booking")?;

    let transaction_id = record_paid(ledger, payment, Purpose::VendorBooking).await?;
    collect_into_admin_wallet(ledger, Purpose::VendorBooking, payment.amount).await?;
    Ok(transaction_id)
}

async fn settle_event_booking<L>(
    ledger: &mut L,
    payment: &ClassifiedPayment,
    event_id: EventId,
) -> Result<Uuid>
where
    L: TransactionLog + WalletLedger + TicketOffice + ?Sized,
{
    let transaction_id = record_paid(ledger, payment, Purpose::EventBooking).await?;

    let (ticket, qr) = Ticket::issue(payment.user_id, event_id);
    let ticket_id = ticket.ticket_id.clone();
    ledger
        .issue_ticket(ticket, qr)
        .await
        .step("issue ticket")?;

    collect_into_admin_wallet(ledger, Purpose::EventBooking, payment.amount).await?;

    let event = ledger
        .record_ticket_sale(event_id)
        .await
        .step("count ticket sale")?;
    if event.tickets_sold > event.ticket_limit {
        warn!(
            %event_id,
            %ticket_id,
            tickets_sold = event.tickets_sold,
            ticket_limit = event.ticket_limit,
            "event oversold"
        );
    }
    Ok(transaction_id)
}

async fn record_paid<L>(
    ledger: &mut L,
    payment: &ClassifiedPayment,
    purpose: Purpose,
) -> Result<Uuid>
where
    L: TransactionLog + ?Sized,
{
    let tx = Transaction::new(
        payment.user_id,
        purpose,
        payment.amount,
        PaymentMethod::Card,
        PaymentStatus::Paid,
    )
    .with_payment_intent(payment.payment_intent_id.as_str());
    let transaction_id = tx.transaction_id;
    ledger
        .append_transaction(tx)
        .await
        .step("record transaction")?;
    Ok(transaction_id)
}

async fn collect_into_admin_wallet<L>(
    ledger: &mut L,
    purpose: Purpose,
    amount: Amount,
) -> Result<()>
where
    L: TransactionLog + WalletLedger + ?Sized,
{
    ledger
        .append_admin_entry(AdminWalletTransaction::new(
            purpose,
            amount,
            AdminEntryStatus::Succeeded,
        ))
        .await
        .step("record admin wallet transaction")?;
    ledger
        .credit(WalletOwner::Admin, amount)
        .await
        .step("credit admin wallet")?;
    Ok(())
}
