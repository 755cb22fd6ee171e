//! Low-stock event emission
//!
//! Whenever a committed movement leaves a stock account at or below its
//! minimum threshold, the ledger broadcasts a `LowStockEvent`. The
//! notification collaborator subscribes and handles delivery; the ledger
//! never sends anything itself. Events are emitted only after the
//! surrounding transaction has committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::StockAccount;
use tokio::sync::broadcast;
use uuid::Uuid;

/// A stock account dropping to or below its minimum threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowStockEvent {
    pub product_id: Uuid,
    pub current_stock: i32,
    pub minimum_threshold: i32,
    pub reorder_quantity: i32,
    pub occurred_at: DateTime<Utc>,
}

/// Broadcast channel for low-stock events
#[derive(Debug, Clone)]
pub struct LowStockEvents {
    sender: broadcast::Sender<LowStockEvent>,
}

impl LowStockEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to low-stock events (notification collaborator side)
    pub fn subscribe(&self) -> broadcast::Receiver<LowStockEvent> {
        self.sender.subscribe()
    }

    /// Emit an event for `account` if it sits at or below its threshold.
    /// A send error only means no subscriber is currently listening.
    pub fn notify_if_low(&self, account: &StockAccount) {
        if !account.is_low_stock() {
            return;
        }
        let event = LowStockEvent {
            product_id: account.product_id,
            current_stock: account.current_stock,
            minimum_threshold: account.minimum_threshold,
            reorder_quantity: account.reorder_quantity,
            occurred_at: Utc::now(),
        };
        tracing::debug!(
            product_id = %event.product_id,
            current_stock = event.current_stock,
            "low stock condition"
        );
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(current: i32, threshold: i32) -> StockAccount {
        StockAccount {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            current_stock: current,
            warehouse_stock: current,
            allocated_stock: 0,
            minimum_threshold: threshold,
            reorder_quantity: 50,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn emits_when_at_or_below_threshold() {
        let events = LowStockEvents::new(8);
        let mut rx = events.subscribe();

        events.notify_if_low(&account(10, 10));

        let event = rx.try_recv().expect("event should be broadcast");
        assert_eq!(event.current_stock, 10);
        assert_eq!(event.minimum_threshold, 10);
    }

    #[test]
    fn silent_above_threshold() {
        let events = LowStockEvents::new(8);
        let mut rx = events.subscribe();

        events.notify_if_low(&account(11, 10));

        assert!(rx.try_recv().is_err());
    }
}
