//! Marketplace services, written against the capability traits in
//! [`crate::domain::ports`].
//!
//! [`marketplace::Marketplace`] wires them together; the CLI drives it
//! through the command interface.

pub mod approval;
pub mod checkout;
pub mod hosting;
pub mod marketplace;
pub mod queries;
pub mod settlement;
pub mod webhook;
