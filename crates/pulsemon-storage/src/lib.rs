//! Persistence layer for monitors and their check results.
//!
//! [`store::MonitorStore`] wraps a SeaORM connection (SQLite by default,
//! WAL mode) and runs migrations on connect. Result rows are append-only:
//! the insert of a result and the update of its monitor's status fields
//! happen in one transaction, so observers never see a result without a
//! matching monitor state.

pub mod entities;
pub mod error;
pub mod store;

#[cfg(test)]
mod tests;

pub use store::{MonitorFilter, MonitorStore};
