//! Marketplace domain: money, wallets, ledger entries, bookings, catalog and
//! the ports the application layer drives.

pub mod booking;
pub mod catalog;
pub mod ids;
pub mod money;
pub mod ports;
pub mod ticket;
pub mod transaction;
pub mod wallet;
