//! Stock mutation semantics
//!
//! One movement kind per transaction type, each carrying its own effect on
//! the affected account counters. All three workflows apply movements
//! through these functions, so "what does a transfer_out do to the two
//! affected accounts" has a single answer.

use serde::{Deserialize, Serialize};

use super::TransactionType;

/// Counter deltas applied to a warehouse stock account by one movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDelta {
    pub warehouse: i32,
    pub current: i32,
    /// Negative allocated deltas are floored so the counter never goes
    /// below zero.
    pub allocated: i32,
}

/// Movements touching the warehouse stock account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseMovement {
    /// Warehouse -> salesman: stock leaves the premises but stays owned
    SalesmanAllocation,
    /// Warehouse -> external buyer: stock leaves the business
    ExternalSale,
    /// Salesman -> warehouse: end-of-day hand-back of sellable goods
    SalesmanReturn,
    /// Salesman -> waste: damaged or expired goods leave circulation
    WasteDisposal,
    /// Supplier -> warehouse: goods received into stock
    SupplierReceipt,
    /// Manual correction, signed by `increase`
    Adjustment { increase: bool },
}

impl WarehouseMovement {
    /// Effect of moving `quantity` units on the warehouse account counters
    pub fn delta(&self, quantity: i32) -> StockDelta {
        match self {
            WarehouseMovement::SalesmanAllocation => StockDelta {
                warehouse: -quantity,
                current: 0,
                allocated: quantity,
            },
            WarehouseMovement::ExternalSale => StockDelta {
                warehouse: -quantity,
                current: -quantity,
                allocated: 0,
            },
            WarehouseMovement::SalesmanReturn => StockDelta {
                warehouse: quantity,
                current: 0,
                allocated: -quantity,
            },
            WarehouseMovement::WasteDisposal => StockDelta {
                warehouse: 0,
                current: -quantity,
                allocated: -quantity,
            },
            WarehouseMovement::SupplierReceipt => StockDelta {
                warehouse: quantity,
                current: quantity,
                allocated: 0,
            },
            WarehouseMovement::Adjustment { increase: true } => StockDelta {
                warehouse: quantity,
                current: quantity,
                allocated: 0,
            },
            WarehouseMovement::Adjustment { increase: false } => StockDelta {
                warehouse: -quantity,
                current: -quantity,
                allocated: 0,
            },
        }
    }

    /// Whether the movement must fail when `warehouse_stock < quantity`
    pub fn checks_warehouse_stock(&self) -> bool {
        matches!(
            self,
            WarehouseMovement::SalesmanAllocation
                | WarehouseMovement::ExternalSale
                | WarehouseMovement::Adjustment { increase: false }
        )
    }

    pub fn transaction_type(&self) -> TransactionType {
        match self {
            WarehouseMovement::SalesmanAllocation => TransactionType::TransferOut,
            WarehouseMovement::ExternalSale => TransactionType::StockOut,
            WarehouseMovement::SalesmanReturn => TransactionType::TransferIn,
            WarehouseMovement::WasteDisposal => TransactionType::StockOut,
            WarehouseMovement::SupplierReceipt => TransactionType::StockIn,
            WarehouseMovement::Adjustment { .. } => TransactionType::Adjustment,
        }
    }
}

/// Counter deltas applied to a salesman stock account by one movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalesmanStockDelta {
    pub allocated: i32,
    pub remaining: i32,
    pub sold: i32,
    pub returned: i32,
}

/// Movements touching a salesman stock account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SalesmanMovement {
    /// Distribution from the warehouse into the salesman's hands
    Allocation,
    /// Sale to a shop out of remaining stock
    Sale,
    /// Shop handing goods back to the salesman
    ShopReturn,
    /// End-of-day hand-back to the warehouse (or waste disposal)
    WarehouseReturn,
}

impl SalesmanMovement {
    /// Effect of moving `quantity` units on the salesman account counters
    pub fn delta(&self, quantity: i32) -> SalesmanStockDelta {
        match self {
            SalesmanMovement::Allocation => SalesmanStockDelta {
                allocated: quantity,
                remaining: quantity,
                sold: 0,
                returned: 0,
            },
            SalesmanMovement::Sale => SalesmanStockDelta {
                allocated: 0,
                remaining: -quantity,
                sold: quantity,
                returned: 0,
            },
            // A shop return un-sells: the salesman holds the goods again
            // and the cumulative sold counter shrinks, keeping
            // allocated - sold - returned == remaining.
            SalesmanMovement::ShopReturn => SalesmanStockDelta {
                allocated: 0,
                remaining: quantity,
                sold: -quantity,
                returned: 0,
            },
            SalesmanMovement::WarehouseReturn => SalesmanStockDelta {
                allocated: 0,
                remaining: -quantity,
                sold: 0,
                returned: quantity,
            },
        }
    }

    /// Whether the movement must fail when `sold_quantity < quantity`
    /// (a shop cannot hand back more than was ever sold to it)
    pub fn checks_sold(&self) -> bool {
        matches!(self, SalesmanMovement::ShopReturn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_keeps_current_stock_unchanged() {
        let d = WarehouseMovement::SalesmanAllocation.delta(40);
        assert_eq!(d.warehouse, -40);
        assert_eq!(d.current, 0);
        assert_eq!(d.allocated, 40);
    }

    #[test]
    fn external_sale_removes_ownership() {
        let d = WarehouseMovement::ExternalSale.delta(10);
        assert_eq!(d.warehouse, -10);
        assert_eq!(d.current, -10);
        assert_eq!(d.allocated, 0);
    }

    #[test]
    fn salesman_return_restores_warehouse_stock() {
        let d = WarehouseMovement::SalesmanReturn.delta(5);
        assert_eq!(d.warehouse, 5);
        assert_eq!(d.current, 0);
        assert_eq!(d.allocated, -5);
    }

    #[test]
    fn waste_disposal_leaves_warehouse_stock_alone() {
        let d = WarehouseMovement::WasteDisposal.delta(3);
        assert_eq!(d.warehouse, 0);
        assert_eq!(d.current, -3);
    }

    #[test]
    fn outbound_movements_check_warehouse_stock() {
        assert!(WarehouseMovement::SalesmanAllocation.checks_warehouse_stock());
        assert!(WarehouseMovement::ExternalSale.checks_warehouse_stock());
        assert!(!WarehouseMovement::SalesmanReturn.checks_warehouse_stock());
        assert!(!WarehouseMovement::WasteDisposal.checks_warehouse_stock());
    }

    #[test]
    fn movement_transaction_types() {
        assert_eq!(
            WarehouseMovement::SalesmanAllocation.transaction_type(),
            TransactionType::TransferOut
        );
        assert_eq!(
            WarehouseMovement::SalesmanReturn.transaction_type(),
            TransactionType::TransferIn
        );
        assert_eq!(
            WarehouseMovement::WasteDisposal.transaction_type(),
            TransactionType::StockOut
        );
    }

    #[test]
    fn sale_and_return_balance_out() {
        let sale = SalesmanMovement::Sale.delta(7);
        assert_eq!(sale.remaining, -7);
        assert_eq!(sale.sold, 7);

        let ret = SalesmanMovement::WarehouseReturn.delta(7);
        assert_eq!(ret.remaining, -7);
        assert_eq!(ret.returned, 7);
    }

    #[test]
    fn every_salesman_movement_conserves_the_account() {
        // allocated - sold - returned must change by exactly the same
        // amount as remaining for every movement kind.
        for movement in [
            SalesmanMovement::Allocation,
            SalesmanMovement::Sale,
            SalesmanMovement::ShopReturn,
            SalesmanMovement::WarehouseReturn,
        ] {
            let d = movement.delta(13);
            assert_eq!(
                d.allocated - d.sold - d.returned,
                d.remaining,
                "{movement:?} breaks conservation"
            );
        }
    }
}
