// Average true range over OHLC history

use crate::core::types::Candle;

/// Trailing-mean ATR.
///
/// Returns 0.0 when fewer than `period + 1` samples are available; callers
/// treat that as "no volatility data" and fall back to a fixed band.
pub fn average_true_range(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> f64 {
    let len = highs.len().min(lows.len()).min(closes.len());
    if period == 0 || len < period + 1 {
        return 0.0;
    }

    let true_ranges: Vec<f64> = (1..len)
        .map(|i| {
            let high_low = highs[i] - lows[i];
            let high_close = (highs[i] - closes[i - 1]).abs();
            let low_close = (lows[i] - closes[i - 1]).abs();
            high_low.max(high_close).max(low_close)
        })
        .collect();

    let window = &true_ranges[true_ranges.len().saturating_sub(period)..];
    window.iter().sum::<f64>() / window.len() as f64
}

/// Convenience wrapper over candle rows
pub fn candle_atr(candles: &[Candle], period: usize) -> f64 {
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    average_true_range(&highs, &lows, &closes, period)
}
