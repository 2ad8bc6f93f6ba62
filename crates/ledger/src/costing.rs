//! Weighted-average costing.
//!
//! Pure arithmetic, no side effects: the ledger feeds it the item's current
//! (balance, average-cost) pair and persists whatever comes back.

use rust_decimal::Decimal;

/// New balance/cost pair produced by blending a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostedReceipt {
    pub new_balance: Decimal,
    pub new_average_cost: Decimal,
}

/// Blend an incoming receipt into the running weighted average.
///
/// `new_average_cost` is the quantity-weighted mix of the prior stock value
/// and the incoming value. When the resulting balance is not positive the
/// average collapses to zero; that is defined behavior for the degenerate
/// case, not an error. Outflows never call this; average cost is carried
/// forward unchanged on the way out.
pub fn apply_receipt(
    old_balance: Decimal,
    old_average_cost: Decimal,
    quantity: Decimal,
    unit_cost: Decimal,
) -> CostedReceipt {
    let new_balance = old_balance + quantity;
    let new_average_cost = if new_balance > Decimal::ZERO {
        ((old_balance * old_average_cost) + (quantity * unit_cost)) / new_balance
    } else {
        Decimal::ZERO
    };
    CostedReceipt {
        new_balance,
        new_average_cost,
    }
}
