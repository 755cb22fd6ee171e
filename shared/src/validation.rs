//! Validation utilities for the Distributor Stock Ledger
//!
//! Small precondition checks shared by the three workflows. All of these
//! run before any write, so a failure never leaves partial state behind.

use rust_decimal::Decimal;

/// Validate that a movement quantity is positive
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a list of line-item quantities (non-empty, all positive)
pub fn validate_item_quantities(quantities: &[i32]) -> Result<(), &'static str> {
    if quantities.is_empty() {
        return Err("At least one item is required");
    }
    for &q in quantities {
        validate_quantity(q)?;
    }
    Ok(())
}

/// Validate an explicit unit-price override
pub fn validate_unit_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Unit price cannot be negative");
    }
    Ok(())
}

/// Check a reference number against the `<PREFIX>-<digits>-<digits>` shape
pub fn is_valid_reference_number(reference: &str) -> bool {
    let mut parts = reference.split('-');
    let (Some(prefix), Some(stamp), Some(suffix), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    !prefix.is_empty()
        && prefix.chars().all(|c| c.is_ascii_uppercase())
        && !stamp.is_empty()
        && stamp.chars().all(|c| c.is_ascii_digit())
        && !suffix.is_empty()
        && suffix.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn rejects_non_positive_quantities() {
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
        assert!(validate_quantity(1).is_ok());
    }

    #[test]
    fn rejects_empty_item_lists() {
        assert!(validate_item_quantities(&[]).is_err());
        assert!(validate_item_quantities(&[3, 2]).is_ok());
        assert!(validate_item_quantities(&[3, 0]).is_err());
    }

    #[test]
    fn rejects_negative_price_overrides() {
        assert!(validate_unit_price(Decimal::from(-1)).is_err());
        assert!(validate_unit_price(Decimal::ZERO).is_ok());
    }

    #[test]
    fn accepts_well_formed_reference_numbers() {
        assert!(is_valid_reference_number("DIST-240115093045-4821"));
        assert!(is_valid_reference_number("EOD-240115180000-0007"));
    }

    #[test]
    fn rejects_malformed_reference_numbers() {
        assert!(!is_valid_reference_number(""));
        assert!(!is_valid_reference_number("DIST-240115"));
        assert!(!is_valid_reference_number("dist-240115093045-4821"));
        assert!(!is_valid_reference_number("DIST-24011509x045-4821"));
        assert!(!is_valid_reference_number("DIST-240115093045-4821-9"));
    }
}
