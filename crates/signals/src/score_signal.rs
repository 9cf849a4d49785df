use crate::indicators::MarketIndicators;
use perpbot_core::domain::{IndividualSignal, SignalKind};

const LONG_THRESHOLD: f64 = 0.2;
const SHORT_THRESHOLD: f64 = -0.2;

const WEIGHT_RSI: f64 = 0.25;
const WEIGHT_MA_ALIGNMENT: f64 = 0.25;
const WEIGHT_VOLUME: f64 = 0.15;
const WEIGHT_ATR_BAND: f64 = 0.10;
const WEIGHT_MACD: f64 = 0.15;
const WEIGHT_MA25_POSITION: f64 = 0.10;

/// Weighted sum of six sub-scores, each bounded to `[-1, 1]` before
/// weighting. The total lands in `[-1, 1]`; confidence is the total's
/// magnitude, so a stronger composite reading is a more confident vote.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreSignal;

impl ScoreSignal {
    #[must_use]
    pub fn evaluate(&self, ind: &MarketIndicators) -> IndividualSignal {
        let rsi_score = Self::rsi_score(ind.rsi_14);
        let ma_alignment_score = Self::ma_alignment_score(ind.ma7, ind.ma25, ind.ma99);
        let volume_score = Self::volume_score(ind.volume_ratio);
        let atr_regime_score = Self::atr_regime_score(ind.atr_14, ind.price);
        let macd_score = Self::macd_score(ind.macd_histogram);
        let ma25_position_score = Self::ma25_position_score(ind.price, ind.ma25);

        let total = rsi_score * WEIGHT_RSI
            + ma_alignment_score * WEIGHT_MA_ALIGNMENT
            + volume_score * WEIGHT_VOLUME
            + atr_regime_score * WEIGHT_ATR_BAND
            + macd_score * WEIGHT_MACD
            + ma25_position_score * WEIGHT_MA25_POSITION;

        let kind = if total >= LONG_THRESHOLD {
            SignalKind::Long
        } else if total <= SHORT_THRESHOLD {
            SignalKind::Short
        } else {
            SignalKind::Wait
        };

        IndividualSignal {
            source: "score".to_string(),
            kind,
            confidence: total.abs().min(1.0),
            weight: 0.3,
            reason: format!(
                "score={total:.2} (rsi={rsi_score:.2}, ma_align={ma_alignment_score:.2}, \
                 volume={volume_score:.2}, atr_regime={atr_regime_score:.2}, macd={macd_score:.2}, \
                 ma25_pos={ma25_position_score:.2})"
            ),
        }
    }

    /// Maps RSI onto `[-1, 1]`: fully oversold (RSI=0) scores +1 (bullish),
    /// fully overbought (RSI=100) scores -1.
    fn rsi_score(rsi: f64) -> f64 {
        ((50.0 - rsi) / 50.0).clamp(-1.0, 1.0)
    }

    /// +1 when the MAs are in bullish order (`ma7 > ma25 > ma99`), -1 when
    /// fully inverted, 0 for a flat/tangled stack.
    fn ma_alignment_score(ma7: f64, ma25: f64, ma99: f64) -> f64 {
        let fast_over_mid = (ma7 - ma25).signum();
        let mid_over_slow = (ma25 - ma99).signum();
        ((fast_over_mid + mid_over_slow) / 2.0).clamp(-1.0, 1.0)
    }

    /// Volume above average nudges toward confirming whatever direction
    /// the other scores already lean, so on its own it only contributes
    /// magnitude, not direction — modeled as a positive score scaled by
    /// how far above 1.0 the ratio sits.
    fn volume_score(volume_ratio: f64) -> f64 {
        ((volume_ratio - 1.0) / 2.0).clamp(-1.0, 1.0)
    }

    /// Volatility-regime filter, not a directional score: both too-high
    /// and too-low ATR (as a percentage of price) penalize entry, and
    /// only a moderate regime scores positive.
    fn atr_regime_score(atr: f64, price: f64) -> f64 {
        if price <= 0.0 {
            return 0.0;
        }
        let atr_pct = (atr / price) * 100.0;
        if atr_pct > 3.0 {
            -0.3
        } else if atr_pct > 1.5 {
            0.2
        } else if atr_pct > 0.5 {
            0.0
        } else {
            -0.2
        }
    }

    /// MACD momentum score. The raw histogram is a price-scale EMA
    /// difference (tens to hundreds of dollars for BTC), so it's scaled
    /// by 100 rather than clamped directly, capping at +/-0.8 for a
    /// strong reading.
    fn macd_score(histogram: f64) -> f64 {
        if histogram > 0.0 {
            if histogram > 50.0 {
                0.8
            } else {
                0.3 + (histogram / 100.0).min(0.5)
            }
        } else if histogram < 0.0 {
            if histogram < -50.0 {
                -0.8
            } else {
                -0.3 + (histogram / 100.0).max(-0.5)
            }
        } else {
            0.0
        }
    }

    /// Mean-reverting at the extremes: price meaningfully above MA25
    /// confirms an uptrend up to a point, then scores negative past it
    /// as overheated (and the symmetric case below MA25 as oversold).
    fn ma25_position_score(price: f64, ma25: f64) -> f64 {
        if ma25 == 0.0 {
            return 0.0;
        }
        let pct = ((price - ma25) / ma25) * 100.0;
        if pct > 3.0 {
            -0.3
        } else if pct > 1.0 {
            0.2
        } else if pct < -3.0 {
            0.3
        } else if pct < -1.0 {
            -0.2
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indicators() -> MarketIndicators {
        MarketIndicators {
            price: 100.0,
            rsi_14: 50.0,
            ma7: 100.0,
            ma25: 100.0,
            ma99: 100.0,
            atr_14: 1.0,
            volume_ratio: 1.0,
            macd_histogram: 0.0,
            candle_pattern: 0.0,
            support: 99.0,
            resistance: 101.0,
            change_24h_pct: 0.0,
        }
    }

    #[test]
    fn neutral_indicators_wait() {
        let signal = ScoreSignal.evaluate(&indicators());
        assert_eq!(signal.kind, SignalKind::Wait);
    }

    #[test]
    fn strongly_oversold_bullish_stack_is_long() {
        let mut ind = indicators();
        ind.rsi_14 = 15.0;
        ind.ma7 = 105.0;
        ind.ma25 = 100.0;
        ind.ma99 = 95.0;
        ind.macd_histogram = 0.5;
        ind.price = 106.0;
        let signal = ScoreSignal.evaluate(&ind);
        assert_eq!(signal.kind, SignalKind::Long);
        assert!(signal.confidence > 0.2);
    }

    #[test]
    fn strongly_overbought_bearish_stack_is_short() {
        let mut ind = indicators();
        ind.rsi_14 = 85.0;
        ind.ma7 = 95.0;
        ind.ma25 = 100.0;
        ind.ma99 = 105.0;
        ind.macd_histogram = -0.5;
        ind.price = 94.0;
        let signal = ScoreSignal.evaluate(&ind);
        assert_eq!(signal.kind, SignalKind::Short);
    }

    #[test]
    fn macd_score_does_not_saturate_on_a_small_raw_histogram() {
        // A BTC-scale histogram of a few dollars is noise, not a strong
        // momentum read, so the sub-score should stay near zero rather
        // than clamp straight to +/-1.
        assert!(ScoreSignal::macd_score(3.0) < 0.35);
        assert!(ScoreSignal::macd_score(-3.0) > -0.35);
    }

    #[test]
    fn macd_score_caps_at_point_eight_for_a_strong_histogram() {
        assert_eq!(ScoreSignal::macd_score(80.0), 0.8);
        assert_eq!(ScoreSignal::macd_score(-80.0), -0.8);
    }

    #[test]
    fn atr_regime_penalizes_both_high_and_low_volatility() {
        assert_eq!(ScoreSignal::atr_regime_score(4.0, 100.0), -0.3);
        assert_eq!(ScoreSignal::atr_regime_score(2.0, 100.0), 0.2);
        assert_eq!(ScoreSignal::atr_regime_score(0.3, 100.0), -0.2);
    }

    #[test]
    fn ma25_position_is_mean_reverting_past_three_percent() {
        assert_eq!(ScoreSignal::ma25_position_score(104.0, 100.0), -0.3);
        assert_eq!(ScoreSignal::ma25_position_score(96.0, 100.0), 0.3);
        assert_eq!(ScoreSignal::ma25_position_score(101.5, 100.0), 0.2);
    }
}
