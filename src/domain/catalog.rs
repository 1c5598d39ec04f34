//! Users, vendor services and hosted events as seen by checkout and settlement.
//!
//! The catalog is maintained by the administration side of the marketplace;
//! the payment core only reads it, except for the master-of-ceremony flag and
//! the ticket counter which settlement updates.

use super::ids::{EventId, ServiceId, UserId};
use super::money::Amount;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Client,
    Vendor,
    Admin,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct UserProfile {
    pub user_id: UserId,
    pub name: String,
    pub role: UserRole,
    #[serde(default)]
    pub is_master_of_ceremony: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct VendorService {
    pub service_id: ServiceId,
    pub vendor_id: UserId,
    pub title: String,
    pub available_date: NaiveDate,
    pub price: Amount,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct Location {
    pub address: String,
    pub city: String,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct EventListing {
    pub event_id: EventId,
    pub title: String,
    pub hosted_by: UserId,
    pub date: NaiveDate,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub description: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub price_per_ticket: Amount,
    pub ticket_limit: u32,
    #[serde(default)]
    pub tickets_sold: u32,
}

impl EventListing {
    pub fn is_sold_out(&self) -> bool {
        self.tickets_sold >= self.ticket_limit
    }
}
