//! Shared RSI-zone classification.
//!
//! Used by both the ensemble's `RuleSignal` (to reason about a raw RSI
//! reading) and the memory builder's narrative generation (to bucket
//! historical trades by the RSI zone they were entered in), so the two
//! halves of the system agree on one vocabulary for "what kind of RSI
//! regime was this."

/// Buckets a raw RSI-14 reading into one of five named zones.
#[must_use]
pub fn rsi_zone(rsi: f64) -> &'static str {
    match rsi {
        r if r < 30.0 => "oversold",
        r if r < 45.0 => "neutral_low",
        r if r < 55.0 => "neutral",
        r if r < 70.0 => "neutral_high",
        _ => "overbought",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_extremes() {
        assert_eq!(rsi_zone(10.0), "oversold");
        assert_eq!(rsi_zone(90.0), "overbought");
        assert_eq!(rsi_zone(50.0), "neutral");
    }
}
