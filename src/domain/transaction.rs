use super::ids::{RecordId, UserId};
use super::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What a payment or ledger movement was for.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    RoleUpgrade,
    VendorBooking,
    EventBooking,
    CancelVendorBooking,
    RejectVendorBooking,
    VendorPayout,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleUpgrade => "role_upgrade",
            Self::VendorBooking => "vendor_booking",
            Self::EventBooking => "event_booking",
            Self::CancelVendorBooking => "cancel_vendor_booking",
            Self::RejectVendorBooking => "reject_vendor_booking",
            Self::VendorPayout => "vendor_payout",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Wallet,
}

/// One append-only ledger entry on the user side.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: RecordId,
    /// Correlation key shared with the matching admin-side entry.
    pub transaction_id: Uuid,
    pub user_id: UserId,
    pub purpose: Purpose,
    pub amount: Amount,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        user_id: UserId,
        purpose: Purpose,
        amount: Amount,
        payment_method: PaymentMethod,
        payment_status: PaymentStatus,
    ) -> Self {
        Self {
            id: RecordId::new(),
            transaction_id: Uuid::new_v4(),
            user_id,
            purpose,
            amount,
            payment_method,
            payment_status,
            payment_intent_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_payment_intent(mut self, payment_intent_id: impl Into<String>) -> Self {
        self.payment_intent_id = Some(payment_intent_id.into());
        self
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AdminEntryStatus {
    Succeeded,
    Withdrawn,
}

/// Platform-side mirror of a movement on the admin wallet.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AdminWalletTransaction {
    pub id: RecordId,
    pub r#type: Purpose,
    pub amount: Amount,
    pub status: AdminEntryStatus,
    pub timestamp: DateTime<Utc>,
}

impl AdminWalletTransaction {
    pub fn new(r#type: Purpose, amount: Amount, status: AdminEntryStatus) -> Self {
        Self {
            id: RecordId::new(),
            r#type,
            amount,
            status,
            timestamp: Utc::now(),
        }
    }
}
