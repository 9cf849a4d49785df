//! Fixed whitelist of tradable perpetual symbols.
//!
//! The original prototype hard-coded a handful of liquid `USDT`-margined
//! perpetuals; we keep that list here as the single point of truth so
//! config validation and the exchange adapter agree on what's tradable.

/// Perpetual-futures tickers this process is allowed to trade.
pub const SYMBOL_WHITELIST: &[&str] = &[
    "BTCUSDT",
    "ETHUSDT",
    "SOLUSDT",
    "BNBUSDT",
    "XRPUSDT",
    "DOGEUSDT",
    "ADAUSDT",
    "AVAXUSDT",
    "LINKUSDT",
    "MATICUSDT",
];

/// Returns `true` if `symbol` (already uppercased) is in the whitelist.
#[must_use]
pub fn is_whitelisted(symbol: &str) -> bool {
    SYMBOL_WHITELIST.contains(&symbol)
}

/// Quantity precision (decimal places) for a given symbol.
///
/// Hard-coded to 3 decimals for every symbol today; multi-symbol
/// correctness would need per-symbol precision metadata (see Open
/// Questions), but nothing in the whitelist currently needs anything
/// finer.
#[must_use]
pub const fn quantity_precision(_symbol: &str) -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn btcusdt_is_whitelisted() {
        assert!(is_whitelisted("BTCUSDT"));
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        assert!(!is_whitelisted("SHIBUSDT"));
        assert!(!is_whitelisted("btcusdt"));
    }
}
