//! Scan — photo analysis and the persisted last-scan session.

pub mod handlers;
pub mod models;
pub mod store;
pub mod vision;
