//! Technical indicators derived from a rolling window of candles.
//!
//! Every indicator here is computed in plain `f64` — candles are decimal
//! on the wire (`perpbot_exchange::Kline`) but once inside signal math,
//! float arithmetic is the right tool (§1: "never binary floats on the
//! wire" constrains transport, not in-process math).

use perpbot_exchange::Kline;
use rust_decimal::prelude::ToPrimitive;

fn to_f64(d: rust_decimal::Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Simple moving average of the last `period` closes. Returns `None`
/// if fewer than `period` candles are available.
#[must_use]
pub fn sma(candles: &[Kline], period: usize) -> Option<f64> {
    if candles.len() < period || period == 0 {
        return None;
    }
    let window = &candles[candles.len() - period..];
    let sum: f64 = window.iter().map(|c| to_f64(c.close)).sum();
    Some(sum / period as f64)
}

/// Wilder's RSI over `period` candles (default 14). Returns 50.0 (neutral)
/// when there isn't enough history to compute a real value.
#[must_use]
pub fn rsi(candles: &[Kline], period: usize) -> f64 {
    if candles.len() <= period {
        return 50.0;
    }
    let closes: Vec<f64> = candles.iter().map(|c| to_f64(c.close)).collect();
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let recent = &deltas[deltas.len() - period..];

    let avg_gain: f64 = recent.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
    let avg_loss: f64 = recent.iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// Average True Range over `period` candles (default 14), Wilder-style
/// simple average of true range (no further smoothing).
#[must_use]
pub fn atr(candles: &[Kline], period: usize) -> Option<f64> {
    if candles.len() < period + 1 {
        return None;
    }
    let mut true_ranges = Vec::with_capacity(candles.len() - 1);
    for window in candles.windows(2) {
        let prev_close = to_f64(window[0].close);
        let high = to_f64(window[1].high);
        let low = to_f64(window[1].low);
        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
        true_ranges.push(tr);
    }
    let recent = &true_ranges[true_ranges.len() - period..];
    Some(recent.iter().sum::<f64>() / period as f64)
}

/// Ratio of the most recent candle's volume to the average volume of the
/// preceding `period` candles. 1.0 when there isn't enough history.
#[must_use]
pub fn volume_ratio(candles: &[Kline], period: usize) -> f64 {
    if candles.len() <= period {
        return 1.0;
    }
    let last = to_f64(candles[candles.len() - 1].volume);
    let window = &candles[candles.len() - 1 - period..candles.len() - 1];
    let avg: f64 = window.iter().map(|c| to_f64(c.volume)).sum::<f64>() / period as f64;
    if avg == 0.0 {
        return 1.0;
    }
    last / avg
}

/// MACD histogram: `EMA(12) - EMA(26)` minus its own 9-period EMA signal
/// line. Returns 0.0 when there isn't enough history for the slow EMA.
#[must_use]
pub fn macd_histogram(candles: &[Kline]) -> f64 {
    let closes: Vec<f64> = candles.iter().map(|c| to_f64(c.close)).collect();
    if closes.len() < 35 {
        return 0.0;
    }
    let ema12 = ema_series(&closes, 12);
    let ema26 = ema_series(&closes, 26);
    let macd_line: Vec<f64> = ema12
        .iter()
        .zip(ema26.iter())
        .map(|(a, b)| a - b)
        .collect();
    let signal_line = ema_series(&macd_line, 9);
    macd_line.last().copied().unwrap_or(0.0) - signal_line.last().copied().unwrap_or(0.0)
}

fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    out.push(values[0]);
    for v in &values[1..] {
        let prev = *out.last().unwrap();
        out.push(v * k + prev * (1.0 - k));
    }
    out
}

/// Rolling support/resistance as the min/max close over `period` candles.
#[must_use]
pub fn support_resistance(candles: &[Kline], period: usize) -> Option<(f64, f64)> {
    if candles.is_empty() {
        return None;
    }
    let window_len = period.min(candles.len());
    let window = &candles[candles.len() - window_len..];
    let closes: Vec<f64> = window.iter().map(|c| to_f64(c.close)).collect();
    let support = closes.iter().copied().fold(f64::INFINITY, f64::min);
    let resistance = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((support, resistance))
}

/// Body-to-range ratio of the most recent candle, signed positive for a
/// bullish close (close above open) and negative for bearish. A value
/// near zero indicates a doji/indecision candle.
#[must_use]
pub fn candle_pattern_score(candles: &[Kline]) -> f64 {
    let Some(last) = candles.last() else {
        return 0.0;
    };
    let open = to_f64(last.open);
    let close = to_f64(last.close);
    let high = to_f64(last.high);
    let low = to_f64(last.low);
    let range = high - low;
    if range <= 0.0 {
        return 0.0;
    }
    (close - open) / range
}

/// The full set of derived indicators for one tick, computed once per
/// loop iteration and shared by every signal source (§4.2 step 1).
#[derive(Debug, Clone, Copy)]
pub struct MarketIndicators {
    pub price: f64,
    pub rsi_14: f64,
    pub ma7: f64,
    pub ma25: f64,
    pub ma99: f64,
    pub atr_14: f64,
    pub volume_ratio: f64,
    pub macd_histogram: f64,
    pub candle_pattern: f64,
    pub support: f64,
    pub resistance: f64,
    /// 24-hour price change as a percentage (e.g. `2.5` for +2.5%), from
    /// the exchange's ticker snapshot. Not folded into the rule/score
    /// voters — it's context for the AI voter's market prompt, same as
    /// it's surfaced only to the original's LLM prompt and nowhere else.
    pub change_24h_pct: f64,
}

impl MarketIndicators {
    /// Derives indicators from a price and a candle window (oldest-first).
    /// Missing history degrades gracefully: moving averages and ATR fall
    /// back to the current price, RSI to neutral (50), volume ratio to 1.0.
    #[must_use]
    pub fn compute(price: f64, candles: &[Kline], change_24h_pct: f64) -> Self {
        let (support, resistance) = support_resistance(candles, 24).unwrap_or((price, price));
        Self {
            price,
            rsi_14: rsi(candles, 14),
            ma7: sma(candles, 7).unwrap_or(price),
            ma25: sma(candles, 25).unwrap_or(price),
            ma99: sma(candles, 99).unwrap_or(price),
            atr_14: atr(candles, 14).unwrap_or(0.0),
            volume_ratio: volume_ratio(candles, 20),
            macd_histogram: macd_histogram(candles),
            candle_pattern: candle_pattern_score(candles),
            support,
            resistance,
            change_24h_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn candle(close: i64, volume: i64) -> Kline {
        Kline {
            open_time: Utc::now(),
            open: Decimal::from(close),
            high: Decimal::from(close + 10),
            low: Decimal::from(close - 10),
            close: Decimal::from(close),
            volume: Decimal::from(volume),
        }
    }

    #[test]
    fn rsi_is_neutral_with_insufficient_history() {
        let candles: Vec<Kline> = (0..5).map(|i| candle(100 + i, 10)).collect();
        assert!((rsi(&candles, 14) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_is_low_on_a_steady_downtrend() {
        let candles: Vec<Kline> = (0..20).map(|i| candle(200 - i, 10)).collect();
        let value = rsi(&candles, 14);
        assert!(value < 30.0, "expected oversold RSI, got {value}");
    }

    #[test]
    fn rsi_is_high_on_a_steady_uptrend() {
        let candles: Vec<Kline> = (0..20).map(|i| candle(100 + i, 10)).collect();
        let value = rsi(&candles, 14);
        assert!(value > 70.0, "expected overbought RSI, got {value}");
    }

    #[test]
    fn volume_ratio_detects_a_spike() {
        let mut candles: Vec<Kline> = (0..25).map(|_| candle(100, 10)).collect();
        candles.push(candle(100, 50));
        assert!(volume_ratio(&candles, 20) > 1.0);
    }

    #[test]
    fn support_resistance_brackets_the_window() {
        let candles: Vec<Kline> = (0..30).map(|i| candle(100 + i, 10)).collect();
        let (support, resistance) = support_resistance(&candles, 24).unwrap();
        assert!(support < resistance);
    }
}
