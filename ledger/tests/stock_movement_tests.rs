//! Stock movement tests
//!
//! Tests for the account mutation semantics:
//! - every movement kind has exactly one effect definition
//! - accounts never go negative, concurrent or not
//! - the salesman account invariant (allocated - sold - returned ==
//!   remaining) holds across any movement sequence

use proptest::prelude::*;
use shared::{SalesmanMovement, TransactionType, WarehouseMovement};

/// Warehouse account counters: (warehouse, current, allocated)
type WarehouseAccount = (i32, i32, i32);

/// Field account counters: (allocated, remaining, sold, returned)
type FieldAccount = (i32, i32, i32, i32);

/// Mirror of the conditional update: apply iff no counter would go
/// negative, otherwise reject and leave the account untouched.
fn apply_warehouse(
    account: &mut WarehouseAccount,
    movement: WarehouseMovement,
    quantity: i32,
) -> Result<(), ()> {
    let delta = movement.delta(quantity);
    if account.0 + delta.warehouse < 0 || account.1 + delta.current < 0 {
        return Err(());
    }
    account.0 += delta.warehouse;
    account.1 += delta.current;
    account.2 = (account.2 + delta.allocated).max(0);
    Ok(())
}

fn apply_field(
    account: &mut FieldAccount,
    movement: SalesmanMovement,
    quantity: i32,
) -> Result<(), ()> {
    let delta = movement.delta(quantity);
    if account.1 + delta.remaining < 0 || account.2 + delta.sold < 0 {
        return Err(());
    }
    account.0 += delta.allocated;
    account.1 += delta.remaining;
    account.2 += delta.sold;
    account.3 += delta.returned;
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn allocation_moves_warehouse_to_allocated() {
        let mut account = (100, 100, 0);
        apply_warehouse(&mut account, WarehouseMovement::SalesmanAllocation, 30).unwrap();

        // Ownership stays internal: current is unchanged
        assert_eq!(account, (70, 100, 30));
    }

    #[test]
    fn external_sale_reduces_warehouse_and_current() {
        let mut account = (100, 120, 20);
        apply_warehouse(&mut account, WarehouseMovement::ExternalSale, 40).unwrap();

        assert_eq!(account, (60, 80, 20));
    }

    #[test]
    fn supplier_receipt_grows_warehouse_and_current() {
        let mut account = (0, 0, 0);
        apply_warehouse(&mut account, WarehouseMovement::SupplierReceipt, 500).unwrap();

        assert_eq!(account, (500, 500, 0));
    }

    #[test]
    fn salesman_return_releases_allocation() {
        let mut account = (70, 100, 30);
        apply_warehouse(&mut account, WarehouseMovement::SalesmanReturn, 10).unwrap();

        assert_eq!(account, (80, 100, 20));
    }

    #[test]
    fn waste_disposal_writes_stock_out_of_circulation() {
        let mut account = (70, 100, 30);
        apply_warehouse(&mut account, WarehouseMovement::WasteDisposal, 5).unwrap();

        // Goods were in a salesman's hands, so warehouse stock is untouched
        assert_eq!(account, (70, 95, 25));
    }

    #[test]
    fn over_allocation_is_rejected_and_account_untouched() {
        let mut account = (20, 20, 0);
        let result = apply_warehouse(&mut account, WarehouseMovement::SalesmanAllocation, 21);

        assert!(result.is_err());
        assert_eq!(account, (20, 20, 0));
    }

    #[test]
    fn concurrent_decrements_cannot_jointly_overdraw() {
        // Two requests for 60 against a stock of 100: whichever lands
        // second finds the condition false.
        let mut account = (100, 100, 0);
        assert!(apply_warehouse(&mut account, WarehouseMovement::ExternalSale, 60).is_ok());
        assert!(apply_warehouse(&mut account, WarehouseMovement::ExternalSale, 60).is_err());
        assert_eq!(account, (40, 40, 0));
    }

    #[test]
    fn allocation_floor_never_goes_negative() {
        // Damaged stock disposed of beyond what is still allocated
        let mut account = (0, 10, 3);
        apply_warehouse(&mut account, WarehouseMovement::WasteDisposal, 5).unwrap();

        assert_eq!(account.2, 0);
    }

    #[test]
    fn field_sale_moves_remaining_to_sold() {
        let mut account = (50, 50, 0, 0);
        apply_field(&mut account, SalesmanMovement::Sale, 20).unwrap();

        assert_eq!(account, (50, 30, 20, 0));
    }

    #[test]
    fn field_sale_beyond_remaining_is_rejected() {
        let mut account = (50, 10, 40, 0);
        assert!(apply_field(&mut account, SalesmanMovement::Sale, 11).is_err());
        assert_eq!(account, (50, 10, 40, 0));
    }

    #[test]
    fn shop_return_reverses_a_sale() {
        let mut account = (50, 30, 20, 0);
        apply_field(&mut account, SalesmanMovement::ShopReturn, 5).unwrap();

        assert_eq!(account, (50, 35, 15, 0));
    }

    #[test]
    fn shop_return_cannot_exceed_sold() {
        let mut account = (50, 30, 20, 0);
        assert!(apply_field(&mut account, SalesmanMovement::ShopReturn, 21).is_err());
    }

    #[test]
    fn end_of_day_return_moves_remaining_to_returned() {
        let mut account = (50, 30, 20, 0);
        apply_field(&mut account, SalesmanMovement::WarehouseReturn, 30).unwrap();

        assert_eq!(account, (50, 0, 20, 30));
    }

    #[test]
    fn small_receipt_still_leaves_the_account_low() {
        // Receipts must check the threshold like every other movement: a
        // delivery too small to clear it still warrants a low-stock event.
        let delta = WarehouseMovement::SupplierReceipt.delta(3);
        let account = shared::StockAccount {
            id: uuid::Uuid::new_v4(),
            product_id: uuid::Uuid::new_v4(),
            current_stock: 2 + delta.current,
            warehouse_stock: 2 + delta.warehouse,
            allocated_stock: 0,
            minimum_threshold: 10,
            reorder_quantity: 50,
            last_updated: chrono::Utc::now(),
        };

        assert!(account.is_low_stock());

        let events = ledger::LowStockEvents::new(8);
        let mut rx = events.subscribe();
        events.notify_if_low(&account);
        assert_eq!(rx.try_recv().map(|e| e.current_stock), Ok(5));
    }

    #[test]
    fn movement_kinds_log_the_right_transaction_type() {
        assert_eq!(
            WarehouseMovement::SalesmanAllocation.transaction_type(),
            TransactionType::TransferOut
        );
        assert_eq!(
            WarehouseMovement::ExternalSale.transaction_type(),
            TransactionType::StockOut
        );
        assert_eq!(
            WarehouseMovement::SalesmanReturn.transaction_type(),
            TransactionType::TransferIn
        );
        assert_eq!(
            WarehouseMovement::WasteDisposal.transaction_type(),
            TransactionType::StockOut
        );
        assert_eq!(
            WarehouseMovement::SupplierReceipt.transaction_type(),
            TransactionType::StockIn
        );
        assert_eq!(
            WarehouseMovement::Adjustment { increase: true }.transaction_type(),
            TransactionType::Adjustment
        );
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = i32> {
        1i32..=500
    }

    fn warehouse_movement_strategy() -> impl Strategy<Value = WarehouseMovement> {
        prop_oneof![
            Just(WarehouseMovement::SalesmanAllocation),
            Just(WarehouseMovement::ExternalSale),
            Just(WarehouseMovement::SalesmanReturn),
            Just(WarehouseMovement::WasteDisposal),
            Just(WarehouseMovement::SupplierReceipt),
            Just(WarehouseMovement::Adjustment { increase: true }),
            Just(WarehouseMovement::Adjustment { increase: false }),
        ]
    }

    fn field_movement_strategy() -> impl Strategy<Value = SalesmanMovement> {
        prop_oneof![
            Just(SalesmanMovement::Allocation),
            Just(SalesmanMovement::Sale),
            Just(SalesmanMovement::ShopReturn),
            Just(SalesmanMovement::WarehouseReturn),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Accepted or rejected, warehouse counters never go negative.
        #[test]
        fn warehouse_counters_stay_non_negative(
            moves in prop::collection::vec((warehouse_movement_strategy(), quantity_strategy()), 0..40)
        ) {
            let mut account: WarehouseAccount = (0, 0, 0);
            for (movement, quantity) in moves {
                let _ = apply_warehouse(&mut account, movement, quantity);
                prop_assert!(account.0 >= 0);
                prop_assert!(account.1 >= 0);
                prop_assert!(account.2 >= 0);
            }
        }

        /// allocated - sold - returned == remaining after any sequence of
        /// accepted field movements.
        #[test]
        fn field_account_invariant_holds(
            moves in prop::collection::vec((field_movement_strategy(), quantity_strategy()), 0..40)
        ) {
            let mut account: FieldAccount = (0, 0, 0, 0);
            for (movement, quantity) in moves {
                let _ = apply_field(&mut account, movement, quantity);
                prop_assert_eq!(account.0 - account.2 - account.3, account.1);
                prop_assert!(account.1 >= 0);
                prop_assert!(account.2 >= 0);
            }
        }

        /// A rejected movement leaves the account exactly as it was.
        #[test]
        fn rejection_is_side_effect_free(
            stock in 0i32..100,
            requested in 1i32..300,
        ) {
            let mut account: WarehouseAccount = (stock, stock, 0);
            let before = account;
            let result = apply_warehouse(&mut account, WarehouseMovement::ExternalSale, requested);
            if requested > stock {
                prop_assert!(result.is_err());
                prop_assert_eq!(account, before);
            } else {
                prop_assert!(result.is_ok());
                prop_assert_eq!(account.0, stock - requested);
            }
        }

        /// Every warehouse delta moves warehouse and current by the same
        /// amount unless allocation is involved.
        #[test]
        fn deltas_are_scaled_by_quantity(
            movement in warehouse_movement_strategy(),
            quantity in quantity_strategy(),
        ) {
            let unit = movement.delta(1);
            let scaled = movement.delta(quantity);
            prop_assert_eq!(scaled.warehouse, unit.warehouse * quantity);
            prop_assert_eq!(scaled.current, unit.current * quantity);
            prop_assert_eq!(scaled.allocated, unit.allocated * quantity);
        }
    }
}
