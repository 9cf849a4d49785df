use crate::indicators::MarketIndicators;
use perpbot_core::domain::{IndividualSignal, SignalKind};
use perpbot_core::rsi_zone;

/// Threshold-based voter: LONG on oversold RSI + price above the fast MA
/// + a volume spike, SHORT on the symmetric overbought condition, else
/// WAIT. Always confident (1.0) — it never hedges its own call.
#[derive(Debug, Clone, Copy)]
pub struct RuleSignal {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub volume_threshold: f64,
}

impl RuleSignal {
    #[must_use]
    pub const fn new(rsi_oversold: f64, rsi_overbought: f64, volume_threshold: f64) -> Self {
        Self {
            rsi_oversold,
            rsi_overbought,
            volume_threshold,
        }
    }

    #[must_use]
    pub fn evaluate(&self, ind: &MarketIndicators) -> IndividualSignal {
        let long = ind.rsi_14 < self.rsi_oversold
            && ind.price > ind.ma7
            && ind.volume_ratio > self.volume_threshold;
        let short = ind.rsi_14 > self.rsi_overbought
            && ind.price < ind.ma7
            && ind.volume_ratio > self.volume_threshold;

        let kind = if long {
            SignalKind::Long
        } else if short {
            SignalKind::Short
        } else {
            SignalKind::Wait
        };

        IndividualSignal {
            source: "rule".to_string(),
            kind,
            confidence: 1.0,
            weight: 0.3,
            reason: format!(
                "rsi={:.1} ({}), price {} ma7, volume_ratio={:.2}",
                ind.rsi_14,
                rsi_zone(ind.rsi_14),
                if ind.price > ind.ma7 { ">" } else { "<=" },
                ind.volume_ratio
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indicators(rsi_14: f64, price: f64, ma7: f64, volume_ratio: f64) -> MarketIndicators {
        MarketIndicators {
            price,
            rsi_14,
            ma7,
            ma25: ma7,
            ma99: ma7,
            atr_14: 0.0,
            volume_ratio,
            macd_histogram: 0.0,
            candle_pattern: 0.0,
            support: price,
            resistance: price,
            change_24h_pct: 0.0,
        }
    }

    #[test]
    fn oversold_with_price_above_ma7_and_volume_spike_is_long() {
        let rule = RuleSignal::new(35.0, 70.0, 1.2);
        let ind = indicators(30.0, 105_000.0, 104_000.0, 1.5);
        assert_eq!(rule.evaluate(&ind).kind, SignalKind::Long);
    }

    #[test]
    fn overbought_with_price_below_ma7_and_volume_spike_is_short() {
        let rule = RuleSignal::new(35.0, 70.0, 1.2);
        let ind = indicators(75.0, 95_000.0, 96_000.0, 1.5);
        assert_eq!(rule.evaluate(&ind).kind, SignalKind::Short);
    }

    #[test]
    fn neutral_rsi_waits() {
        let rule = RuleSignal::new(35.0, 70.0, 1.2);
        let ind = indicators(50.0, 100_000.0, 99_000.0, 1.5);
        assert_eq!(rule.evaluate(&ind).kind, SignalKind::Wait);
    }

    #[test]
    fn oversold_without_volume_confirmation_waits() {
        let rule = RuleSignal::new(35.0, 70.0, 1.2);
        let ind = indicators(30.0, 105_000.0, 104_000.0, 0.8);
        assert_eq!(rule.evaluate(&ind).kind, SignalKind::Wait);
    }

    /// §8 boundary: RSI exactly at `rsiOversold` does not trigger LONG
    /// (the comparison is strict).
    #[test]
    fn rsi_exactly_at_oversold_threshold_does_not_trigger_long() {
        let rule = RuleSignal::new(35.0, 70.0, 1.2);
        let ind = indicators(35.0, 105_000.0, 104_000.0, 1.5);
        assert_eq!(rule.evaluate(&ind).kind, SignalKind::Wait);
    }

    /// Symmetric boundary for the overbought threshold.
    #[test]
    fn rsi_exactly_at_overbought_threshold_does_not_trigger_short() {
        let rule = RuleSignal::new(35.0, 70.0, 1.2);
        let ind = indicators(70.0, 95_000.0, 96_000.0, 1.5);
        assert_eq!(rule.evaluate(&ind).kind, SignalKind::Wait);
    }
}
