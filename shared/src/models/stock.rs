//! Stock account models
//!
//! Two kinds of account track where units live: a warehouse-scoped
//! `StockAccount` per product and a `SalesmanStockAccount` per
//! (salesman, product) pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-product warehouse-scoped stock counters
///
/// `current_stock` counts every unit the business owns (warehouse plus
/// in-transit with salesmen); `warehouse_stock` only the units physically
/// on warehouse premises. Created lazily on the first movement for a
/// product and never deleted, only zeroed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAccount {
    pub id: Uuid,
    pub product_id: Uuid,
    pub current_stock: i32,
    pub warehouse_stock: i32,
    /// Units handed to salesmen but not yet sold or returned. Best-effort
    /// allocation counter, floored at zero on returns.
    pub allocated_stock: i32,
    pub minimum_threshold: i32,
    pub reorder_quantity: i32,
    pub last_updated: DateTime<Utc>,
}

impl StockAccount {
    /// Whether the account is at or below its low-stock threshold
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.minimum_threshold
    }
}

/// Per-(salesman, product) field stock counters
///
/// `allocated_quantity`, `sold_quantity` and `returned_quantity` are
/// cumulative; `remaining_quantity` is the sellable on-hand balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesmanStockAccount {
    pub id: Uuid,
    pub salesman_id: Uuid,
    pub product_id: Uuid,
    pub allocated_quantity: i32,
    pub remaining_quantity: i32,
    pub sold_quantity: i32,
    pub returned_quantity: i32,
    pub last_updated: DateTime<Utc>,
}

impl SalesmanStockAccount {
    /// Conservation check: everything ever allocated is either sold,
    /// returned, or still on hand.
    pub fn is_balanced(&self) -> bool {
        self.allocated_quantity - self.sold_quantity - self.returned_quantity
            == self.remaining_quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_stock_triggers_at_threshold() {
        let mut account = StockAccount {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            current_stock: 10,
            warehouse_stock: 10,
            allocated_stock: 0,
            minimum_threshold: 10,
            reorder_quantity: 50,
            last_updated: Utc::now(),
        };
        assert!(account.is_low_stock());

        account.current_stock = 11;
        assert!(!account.is_low_stock());
    }

    #[test]
    fn balanced_account_conserves_allocation() {
        let account = SalesmanStockAccount {
            id: Uuid::new_v4(),
            salesman_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            allocated_quantity: 40,
            remaining_quantity: 13,
            sold_quantity: 22,
            returned_quantity: 5,
            last_updated: Utc::now(),
        };
        assert!(account.is_balanced());
    }
}
