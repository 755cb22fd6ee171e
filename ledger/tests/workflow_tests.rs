//! Workflow tests
//!
//! Tests for the distribution, order and return workflows:
//! - order status state machine
//! - reference number shape per document kind
//! - pricing defaults and line totals
//! - end-of-day condition routing
//! - a full day in the life of one product, reconciled

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    is_valid_reference_number, DistributionType, ItemCondition, OrderStatus, PaymentMethod,
    ReturnType, SalesmanMovement, WarehouseMovement,
};
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn pending_orders_can_move_forward_or_cancel() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn pending_orders_complete_only_via_processing() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Completed));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Completed));
    }

    #[test]
    fn processing_orders_cannot_go_back_to_pending() {
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::Pending));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Completed));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn terminal_statuses_are_immutable() {
        for terminal in [OrderStatus::Completed, OrderStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for target in [
                OrderStatus::Pending,
                OrderStatus::Processing,
                OrderStatus::Completed,
                OrderStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn reference_prefixes_identify_the_document() {
        assert_eq!(DistributionType::Salesman.reference_prefix(), "DIST");
        assert_eq!(DistributionType::Wholesale.reference_prefix(), "WHSL");
        assert_eq!(DistributionType::Retail.reference_prefix(), "RTL");
        assert_eq!(ReturnType::Shop.reference_prefix(), "RET");
        assert_eq!(ReturnType::Salesman.reference_prefix(), "EOD");
    }

    #[test]
    fn generated_references_are_well_formed() {
        for prefix in ["DIST", "WHSL", "RTL", "ORD", "RET", "EOD"] {
            let reference = ledger::reference::generate_reference(prefix);
            assert!(is_valid_reference_number(&reference), "{}", reference);
        }
    }

    #[test]
    fn line_total_is_price_times_quantity() {
        let unit_price = dec("12.50");
        let total = unit_price * Decimal::from(8);
        assert_eq!(total, dec("100.00"));
    }

    #[test]
    fn order_total_sums_line_totals() {
        let lines = [(3, dec("10.00")), (2, dec("7.25")), (1, dec("99.99"))];
        let total: Decimal = lines
            .iter()
            .map(|(qty, price)| *price * Decimal::from(*qty))
            .sum();
        assert_eq!(total, dec("144.49"));
    }

    #[test]
    fn only_good_condition_is_sellable() {
        assert!(ItemCondition::Good.is_sellable());
        assert!(!ItemCondition::Damaged.is_sellable());
        assert!(!ItemCondition::Expired.is_sellable());
        assert!(!ItemCondition::Other.is_sellable());
    }

    #[test]
    fn end_of_day_routing_per_condition() {
        // Sellable items go back into warehouse stock, the rest leave
        // circulation; same routing the return workflow applies.
        let route = |condition: ItemCondition| {
            if condition.is_sellable() {
                WarehouseMovement::SalesmanReturn
            } else {
                WarehouseMovement::WasteDisposal
            }
        };

        assert_eq!(
            route(ItemCondition::Good),
            WarehouseMovement::SalesmanReturn
        );
        assert_eq!(
            route(ItemCondition::Damaged),
            WarehouseMovement::WasteDisposal
        );
        assert_eq!(
            route(ItemCondition::Expired),
            WarehouseMovement::WasteDisposal
        );
    }

    #[test]
    fn payment_methods_round_trip_their_storage_form() {
        for method in [
            PaymentMethod::Cash,
            PaymentMethod::BankTransfer,
            PaymentMethod::Credit,
            PaymentMethod::MobileMoney,
        ] {
            assert_eq!(PaymentMethod::from_str(method.as_str()), Some(method));
        }
        assert_eq!(PaymentMethod::from_str("barter"), None);
    }

    /// A full day for one product: receipt, distribution, field sales, a
    /// shop return, then end-of-day reconciliation with one damaged unit.
    #[test]
    fn one_day_reconciles_across_both_accounts() {
        // (warehouse, current, allocated)
        let mut wh = (0i32, 0i32, 0i32);
        // (allocated, remaining, sold, returned)
        let mut field = (0i32, 0i32, 0i32, 0i32);

        let apply_wh = |acct: &mut (i32, i32, i32), m: WarehouseMovement, q: i32| {
            let d = m.delta(q);
            acct.0 += d.warehouse;
            acct.1 += d.current;
            acct.2 = (acct.2 + d.allocated).max(0);
        };
        let apply_field = |acct: &mut (i32, i32, i32, i32), m: SalesmanMovement, q: i32| {
            let d = m.delta(q);
            acct.0 += d.allocated;
            acct.1 += d.remaining;
            acct.2 += d.sold;
            acct.3 += d.returned;
        };

        // Morning: 100 units arrive, 40 go out with the salesman
        apply_wh(&mut wh, WarehouseMovement::SupplierReceipt, 100);
        apply_wh(&mut wh, WarehouseMovement::SalesmanAllocation, 40);
        apply_field(&mut field, SalesmanMovement::Allocation, 40);
        assert_eq!(wh, (60, 100, 40));

        // Daytime: 25 sold to shops, 3 come back from a shop
        apply_field(&mut field, SalesmanMovement::Sale, 25);
        apply_field(&mut field, SalesmanMovement::ShopReturn, 3);
        assert_eq!(field, (40, 18, 22, 0));

        // Evening: everything left comes back, one unit damaged
        apply_field(&mut field, SalesmanMovement::WarehouseReturn, 18);
        apply_wh(&mut wh, WarehouseMovement::SalesmanReturn, 17);
        apply_wh(&mut wh, WarehouseMovement::WasteDisposal, 1);

        // Field account closed out and still balanced
        assert_eq!(field, (40, 0, 22, 18));
        assert_eq!(field.0 - field.2 - field.3, field.1);

        // Warehouse got the sellable units back; only the wasted unit has
        // left total business stock (shop-order sales settle separately)
        assert_eq!(wh, (77, 99, 22));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn status_strategy() -> impl Strategy<Value = OrderStatus> {
        prop_oneof![
            Just(OrderStatus::Pending),
            Just(OrderStatus::Processing),
            Just(OrderStatus::Completed),
            Just(OrderStatus::Cancelled),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// No transition ever leaves a terminal status.
        #[test]
        fn terminal_statuses_accept_nothing(
            from in status_strategy(),
            to in status_strategy(),
        ) {
            if from.is_terminal() {
                prop_assert!(!from.can_transition_to(to));
            }
        }

        /// Self-transitions are never valid.
        #[test]
        fn no_self_transitions(status in status_strategy()) {
            prop_assert!(!status.can_transition_to(status));
        }

        /// Line totals scale linearly with quantity.
        #[test]
        fn line_totals_scale(qty in 1i32..10_000, cents in 0i64..1_000_000) {
            let unit_price = Decimal::new(cents, 2);
            let total = unit_price * Decimal::from(qty);
            prop_assert_eq!(total, Decimal::new(cents * qty as i64, 2));
        }

        /// Generated references always parse and carry their prefix.
        #[test]
        fn references_keep_their_prefix(choice in 0usize..5) {
            let prefix = ["DIST", "WHSL", "RTL", "ORD", "RET"][choice];
            let reference = ledger::reference::generate_reference(prefix);
            prop_assert!(is_valid_reference_number(&reference));
            prop_assert!(reference.starts_with(prefix));
        }
    }
}
