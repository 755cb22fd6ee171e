//! Business logic services

pub mod catalog;
pub mod distribution;
pub mod order;
pub mod returns;
pub mod stock;
pub mod transaction;

pub use catalog::CatalogService;
pub use distribution::DistributionService;
pub use order::{ActorContext, OrderService};
pub use returns::ReturnService;
pub use stock::StockService;
pub use transaction::TransactionService;
