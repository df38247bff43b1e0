//! Capacity decision for a purchase request. Pure; no I/O.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Allow { new_total: i64 },
    SoldOut { attempted_total: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity must be a positive integer, got {0}")]
    NonPositive(i32),
}

pub fn validate_quantity(quantity: i32) -> Result<(), QuantityError> {
    if quantity <= 0 {
        return Err(QuantityError::NonPositive(quantity));
    }
    Ok(())
}

/// Allows the purchase iff `ticket_sold + quantity <= capacity`.
pub fn check(ticket_sold: i32, capacity: i32, quantity: i32) -> Result<Availability, QuantityError> {
    validate_quantity(quantity)?;

    let attempted_total = i64::from(ticket_sold) + i64::from(quantity);
    if attempted_total > i64::from(capacity) {
        Ok(Availability::SoldOut { attempted_total })
    } else {
        Ok(Availability::Allow {
            new_total: attempted_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_capacity_is_allowed() {
        assert_eq!(check(8, 10, 2), Ok(Availability::Allow { new_total: 10 }));
    }

    #[test]
    fn test_one_over_capacity_is_sold_out() {
        assert_eq!(
            check(8, 10, 3),
            Ok(Availability::SoldOut { attempted_total: 11 })
        );
    }

    #[test]
    fn test_non_positive_quantity_is_a_validation_error() {
        assert_eq!(check(0, 10, 0), Err(QuantityError::NonPositive(0)));
        assert_eq!(check(0, 10, -4), Err(QuantityError::NonPositive(-4)));
    }

    #[test]
    fn test_large_quantities_do_not_overflow() {
        assert_eq!(
            check(i32::MAX, i32::MAX, 1),
            Ok(Availability::SoldOut {
                attempted_total: i64::from(i32::MAX) + 1
            })
        );
    }
}
