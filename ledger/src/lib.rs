//! Distributor Stock Ledger
//!
//! Multi-location inventory ledger for a consumer-goods distributor.
//! Tracks warehouse stock accounts, per-salesman field accounts and an
//! immutable stock transaction log, and drives the three workflows that
//! move goods between them: distributions, shop orders and returns.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod config;
pub mod error;
pub mod events;
pub mod reference;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use events::{LowStockEvent, LowStockEvents};
pub use services::{
    ActorContext, CatalogService, DistributionService, OrderService, ReturnService, StockService,
    TransactionService,
};

/// The assembled ledger: one service per concern, all sharing a pool
/// and a low-stock event channel.
#[derive(Clone)]
pub struct Ledger {
    pub catalog: CatalogService,
    pub stock: StockService,
    pub transactions: TransactionService,
    pub distributions: DistributionService,
    pub orders: OrderService,
    pub returns: ReturnService,
    events: LowStockEvents,
}

impl Ledger {
    /// Wire the services onto an existing pool
    pub fn new(db: PgPool, config: &Config) -> Self {
        let events = LowStockEvents::new(config.ledger.low_stock_channel_capacity);
        let catalog = CatalogService::new(db.clone());
        let stock = StockService::new(db.clone(), events.clone());

        Self {
            transactions: TransactionService::new(db.clone()),
            distributions: DistributionService::new(db.clone(), catalog.clone(), stock.clone()),
            orders: OrderService::new(db.clone(), catalog.clone(), stock.clone()),
            returns: ReturnService::new(db, catalog.clone(), stock.clone()),
            catalog,
            stock,
            events,
        }
    }

    /// Connect to the database and wire the services
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.database.url)
            .await?;

        tracing::info!("database connection established");
        Ok(Self::new(db, config))
    }

    /// Subscribe to low-stock events emitted after commits
    pub fn subscribe_low_stock(&self) -> tokio::sync::broadcast::Receiver<LowStockEvent> {
        self.events.subscribe()
    }
}

/// Run the embedded schema migrations
pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(db).await?;
    tracing::info!("migrations completed");
    Ok(())
}

/// Install the process-wide tracing subscriber
///
/// Filter defaults to `ledger=debug,sqlx=warn`; override with `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledger=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
