//! Domain models for the Distributor Stock Ledger

mod distribution;
mod movement;
mod order;
mod product;
mod returns;
mod stock;
mod transaction;

pub use distribution::*;
pub use movement::*;
pub use order::*;
pub use product::*;
pub use returns::*;
pub use stock::*;
pub use transaction::*;
