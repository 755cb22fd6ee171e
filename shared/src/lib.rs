//! Shared types and models for the Distributor Stock Ledger
//!
//! This crate contains the domain model of the multi-location inventory
//! ledger: stock accounts, the movement taxonomy, and the command documents
//! (distributions, orders, returns) whose execution mutates them. It is
//! consumed by the ledger crate and by read-only collaborators such as
//! reporting and notification delivery.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
