use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Converts notional capital into an order quantity: `(capital *
/// position_size_pct * leverage) / price`, rounded to `precision`
/// decimal places. Returns zero if `price` is non-positive rather than
/// dividing by it, since a tick can observe a stale zero price during
/// an exchange outage.
#[must_use]
pub fn position_quantity(
    notional_capital: Decimal,
    position_size_pct: f64,
    leverage: u32,
    price: Decimal,
    precision: u32,
) -> Decimal {
    if price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let pct = Decimal::from_f64(position_size_pct).unwrap_or(Decimal::ZERO);
    let leverage = Decimal::from(leverage);
    let raw = (notional_capital * pct * leverage) / price;
    raw.round_dp(precision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_quantity_from_capital_and_leverage() {
        let qty = position_quantity(Decimal::from(1000), 0.05, 10, Decimal::from(50_000), 3);
        // (1000 * 0.05 * 10) / 50_000 = 0.01
        assert_eq!(qty, Decimal::new(10, 3));
    }

    #[test]
    fn zero_price_yields_zero_quantity() {
        let qty = position_quantity(Decimal::from(1000), 0.05, 10, Decimal::ZERO, 3);
        assert_eq!(qty, Decimal::ZERO);
    }

    #[test]
    fn rounds_to_requested_precision() {
        let qty = position_quantity(Decimal::from(777), 0.03, 15, Decimal::from(43_210), 3);
        assert_eq!(qty.scale(), 3);
    }
}
