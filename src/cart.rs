//! Budget and checkout arithmetic over fetched cart items.
//!
//! Pure functions only; callers fetch the rows and keep the results.
//! Totals are compared at cent precision since they travel as JSON
//! doubles.

use crate::storage::models::GroceryItem;

/// Half a cent. Amounts closer than this are the same money.
const CENT_EPSILON: f64 = 0.005;

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= CENT_EPSILON
}

/// Line total for a cart item.
pub fn line_total(price: f64, quantity: i64) -> f64 {
    price * quantity as f64
}

/// Sum of line totals for everything currently in the cart.
pub fn grand_total(items: &[GroceryItem]) -> f64 {
    items.iter().map(|item| item.total).sum()
}

/// True when a budget is set and the cart has run past it.
pub fn over_budget(budget: Option<f64>, grand_total: f64) -> bool {
    match budget {
        Some(limit) => grand_total > limit,
        None => false,
    }
}

/// Remaining headroom against the budget; negative means over.
pub fn budget_deficit(budget: f64, grand_total: f64) -> f64 {
    budget - grand_total
}

/// Change owed for a cash payment.
pub fn change_due(tendered: f64, total: f64) -> f64 {
    (tendered - total).max(0.0)
}

/// Whether a cash payment covers the total.
pub fn cash_covers(tendered: f64, total: f64) -> bool {
    tendered + CENT_EPSILON >= total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::Unit;

    fn item(price: f64, quantity: i64) -> GroceryItem {
        GroceryItem {
            id: String::new(),
            barcode: String::new(),
            description: String::new(),
            price,
            quantity,
            unit: Unit::Pc,
            total: line_total(price, quantity),
            grocery_id: String::new(),
        }
    }

    #[test]
    fn test_grand_total_sums_line_totals() {
        let items = [item(10.0, 2), item(5.0, 3)];
        assert_eq!(grand_total(&items), 35.0);
        assert_eq!(grand_total(&[]), 0.0);
    }

    #[test]
    fn test_over_budget_flag_and_deficit() {
        assert!(over_budget(Some(30.0), 35.0));
        assert_eq!(budget_deficit(30.0, 35.0), -5.0);
        assert!(!over_budget(Some(35.0), 35.0));
        assert!(!over_budget(None, 1_000_000.0));
    }

    #[test]
    fn test_change_due_for_cash() {
        assert_eq!(change_due(150.0, 100.0), 50.0);
        assert_eq!(change_due(80.0, 100.0), 0.0);
    }

    #[test]
    fn test_cash_covers_blocks_short_tender() {
        assert!(cash_covers(150.0, 100.0));
        assert!(cash_covers(100.0, 100.0));
        assert!(!cash_covers(80.0, 100.0));
    }

    #[test]
    fn test_approx_eq_at_cent_precision() {
        assert!(approx_eq(35.0, 35.004));
        assert!(!approx_eq(35.0, 35.01));
    }
}
