use super::ids::{BookingId, ServiceId, UserId};
use super::money::Amount;
use crate::error::MarketplaceError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Rejected,
    Completed,
}

impl BookingStatus {
    /// Statuses after which nothing is refunded or released any more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Rejected | Self::Completed)
    }
}

/// Which side of the booking is acting.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Party {
    Client,
    Vendor,
}

/// Result of recording one party's approval.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Approval {
    /// Recorded; the other party has not approved yet.
    AwaitingCounterparty,
    /// Both parties have now approved and the escrowed price must be released.
    ReleaseDue,
    /// Funds already went out; nothing changed.
    AlreadyReleased,
}

/// Whether an unwind (client cancel or vendor reject) may refund the client.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Unwind {
    Refund,
    Refused(String),
}

/// A paid booking of one vendor service, escrowed in the platform wallet
/// until both client and vendor approve.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Booking {
    pub booking_id: BookingId,
    pub client_id: UserId,
    pub vendor_id: UserId,
    pub service_id: ServiceId,
    pub service: String,
    pub date: NaiveDate,
    pub price: Amount,
    pub status: BookingStatus,
    pub is_client_approved: bool,
    pub is_vendor_approved: bool,
    pub is_fund_released: bool,
    pub payment_intent_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn approve(&mut self, party: Party) -> Result<Approval, MarketplaceError> {
        if self.is_fund_released {
            return Ok(Approval::AlreadyReleased);
        }
        if matches!(self.status, BookingStatus::Cancelled | BookingStatus::Rejected) {
            return Err(MarketplaceError::FailedPrecondition(format!(
                "booking {} is {:?}",
                self.booking_id, self.status
            )));
        }

        match party {
            Party::Client => self.is_client_approved = true,
            Party::Vendor => self.is_vendor_approved = true,
        }
        self.updated_at = Utc::now();

        if self.is_client_approved && self.is_vendor_approved {
            Ok(Approval::ReleaseDue)
        } else {
            Ok(Approval::AwaitingCounterparty)
        }
    }

    /// Flips `is_fund_released`; only legal once and only with both approvals.
    pub fn mark_released(&mut self) -> Result<(), MarketplaceError> {
        if self.is_fund_released {
            return Err(MarketplaceError::FailedPrecondition(format!(
                "funds for booking {} were already released",
                self.booking_id
            )));
        }
        if !(self.is_client_approved && self.is_vendor_approved) {
            return Err(MarketplaceError::FailedPrecondition(format!(
                "booking {} lacks approval from both parties",
                self.booking_id
            )));
        }
        self.is_fund_released = true;
        self.status = BookingStatus::Completed;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn unwind_check(&self) -> Unwind {
        if self.is_fund_released {
            return Unwind::Refused(format!(
                "funds for booking {} were already released to the vendor",
                self.booking_id
            ));
        }
        match self.status {
            BookingStatus::Rejected => Unwind::Refused("booking was already rejected".to_string()),
            BookingStatus::Completed => Unwind::Refused("booking is already completed".to_string()),
            BookingStatus::Cancelled => Unwind::Refused("booking is already cancelled".to_string()),
            BookingStatus::Pending | BookingStatus::Confirmed => Unwind::Refund,
        }
    }

    pub fn close(&mut self, status: BookingStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn booking() -> Booking {
        let now = Utc::now();
        Booking {
            booking_id: BookingId::for_payment_intent("pi_test"),
            client_id: UserId::new(),
            vendor_id: UserId::new(),
            service_id: ServiceId::new(),
            service: "Photography".to_string(),
            date: now.date_naive(),
            price: Amount::new(dec!(500)).unwrap(),
            status: BookingStatus::Pending,
            is_client_approved: false,
            is_vendor_approved: false,
            is_fund_released: false,
            payment_intent_id: "pi_test".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_single_approval_does_not_release() {
        let mut b = booking();
        assert_eq!(b.approve(Party::Client).unwrap(), Approval::AwaitingCounterparty);
        assert!(b.is_client_approved);
        assert!(b.mark_released().is_err());
        assert!(!b.is_fund_released);
    }

    #[test]
    fn test_second_approval_triggers_release() {
        let mut b = booking();
        b.approve(Party::Vendor).unwrap();
        assert_eq!(b.approve(Party::Client).unwrap(), Approval::ReleaseDue);

        b.mark_released().unwrap();
        assert!(b.is_fund_released);
        assert_eq!(b.status, BookingStatus::Completed);
    }

    #[test]
    fn test_release_happens_at_most_once() {
        let mut b = booking();
        b.approve(Party::Vendor).unwrap();
        b.approve(Party::Client).unwrap();
        b.mark_released().unwrap();

        assert_eq!(b.approve(Party::Client).unwrap(), Approval::AlreadyReleased);
        assert!(b.mark_released().is_err());
    }

    #[test]
    fn test_cancelled_booking_cannot_be_approved() {
        let mut b = booking();
        b.close(BookingStatus::Cancelled);
        assert!(matches!(
            b.approve(Party::Client),
            Err(MarketplaceError::FailedPrecondition(_))
        ));
        assert!(!b.is_client_approved);
    }

    #[test]
    fn test_unwind_guards() {
        let mut b = booking();
        assert_eq!(b.unwind_check(), Unwind::Refund);

        for status in [
            BookingStatus::Rejected,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            b.status = status;
            assert!(matches!(b.unwind_check(), Unwind::Refused(_)));
        }

        b.status = BookingStatus::Confirmed;
        b.is_fund_released = true;
        assert!(matches!(b.unwind_check(), Unwind::Refused(_)));
    }
}
