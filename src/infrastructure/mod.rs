//! Adapters behind the domain ports: storage backends and payment gateways.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod simulated;
pub mod stripe;
