//! Tax computation.
//!
//! A strategy seam so jurisdiction-specific logic can replace the flat rate
//! without touching invoice generation.

use rust_decimal::{Decimal, RoundingStrategy};

pub trait TaxStrategy: Send + Sync {
    /// Tax owed on `amount` for the given tenant.
    fn compute_tax(&self, amount: Decimal, tenant_id: &str) -> Decimal;
}

/// Flat-rate tax, rounded to 2 decimal places with banker's rounding
/// (midpoint to even).
pub struct FlatRateTax {
    rate: Decimal,
}

impl FlatRateTax {
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }
}

impl Default for FlatRateTax {
    fn default() -> Self {
        // 10%
        Self::new(Decimal::new(10, 2))
    }
}

impl TaxStrategy for FlatRateTax {
    fn compute_tax(&self, amount: Decimal, _tenant_id: &str) -> Decimal {
        (amount * self.rate).round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn flat_rate_computes_ten_percent() {
        let tax = FlatRateTax::default();
        assert_eq!(tax.compute_tax(dec!(100.00), "tenant-1"), dec!(10.00));
        assert_eq!(tax.compute_tax(dec!(29.99), "tenant-1"), dec!(3.00));
    }

    #[test]
    fn midpoints_round_to_even() {
        let tax = FlatRateTax::default();
        // 10% of 1.25 = 0.125 -> 0.12 (even), of 1.75 = 0.175 -> 0.18 (even)
        assert_eq!(tax.compute_tax(dec!(1.25), "tenant-1"), dec!(0.12));
        assert_eq!(tax.compute_tax(dec!(1.75), "tenant-1"), dec!(0.18));
    }

    #[test]
    fn zero_amount_yields_zero_tax() {
        let tax = FlatRateTax::default();
        assert_eq!(tax.compute_tax(dec!(0), "tenant-1"), dec!(0.00));
    }
}
