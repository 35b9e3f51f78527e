//! 技术指标与衍生字段计算
//!
//! 均衡位、趋势、信号、成交量档位等衍生字段的唯一计算入口。
//! 信号规则只保留一套：RSI 与均衡偏离度同时满足阈值才触发买卖

use crate::models::{
    CandlestickData, EquilibriumData, EquilibriumZone, PriceZone, Signal, StockData,
    TechnicalIndicators, Trend, VolumeProfile,
};

/// 计算均衡位（52周高低点的 50% 回撤位）
///
/// 非有限输入按 NaN 传播，不会 panic
pub fn equilibrium_level(high52: f64, low52: f64) -> f64 {
    (high52 + low52) / 2.0
}

/// 计算价格相对均衡位的偏离度（百分比）
///
/// 均衡位为 0 时返回 0.0 哨兵值而非无穷大
pub fn price_to_equilibrium(price: f64, equilibrium: f64) -> f64 {
    if equilibrium == 0.0 {
        return 0.0;
    }
    ((price - equilibrium) / equilibrium) * 100.0
}

/// 根据均线关系判定趋势
///
/// 价格 > SMA50 > SMA200 为多头，价格 < SMA50 < SMA200 为空头，其余为中性
pub fn determine_trend(price: f64, sma50: f64, sma200: f64) -> Trend {
    if price > sma50 && sma50 > sma200 {
        Trend::Bullish
    } else if price < sma50 && sma50 < sma200 {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

/// 根据 RSI 和均衡偏离度判定交易信号
///
/// RSI < 40 且偏离度 < -10 买入；RSI > 70 且偏离度 > 10 卖出；其余持有
pub fn determine_signal(rsi: f64, price_to_equilibrium: f64) -> Signal {
    if rsi < 40.0 && price_to_equilibrium < -10.0 {
        Signal::Buy
    } else if rsi > 70.0 && price_to_equilibrium > 10.0 {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

/// 根据成交量判定档位
///
/// 超过 5000 万为高，低于 1000 万为低，边界值归中
pub fn determine_volume_profile(volume: i64) -> VolumeProfile {
    if volume > 50_000_000 {
        VolumeProfile::High
    } else if volume < 10_000_000 {
        VolumeProfile::Low
    } else {
        VolumeProfile::Medium
    }
}

/// 根据均衡偏离度划分均衡区间
///
/// 偏离度 < -5 为折价区，[-5, 5] 为均衡区，> 5 为溢价区
pub fn equilibrium_zone(price_to_equilibrium: f64) -> EquilibriumZone {
    if price_to_equilibrium < -5.0 {
        EquilibriumZone::Discount
    } else if price_to_equilibrium <= 5.0 {
        EquilibriumZone::Equilibrium
    } else {
        EquilibriumZone::Premium
    }
}

/// 重算一条股票记录的全部衍生字段
///
/// 管道在过滤、缓存、返回之前必须调用，保证衍生字段与市场字段一致
pub fn enrich(stock: &mut StockData) {
    stock.equilibrium_level = equilibrium_level(stock.week52_high, stock.week52_low);
    stock.price_to_equilibrium = price_to_equilibrium(stock.price, stock.equilibrium_level);
    stock.trend = determine_trend(stock.price, stock.sma50, stock.sma200);
    stock.signal = determine_signal(stock.rsi, stock.price_to_equilibrium);
    stock.volume_profile = determine_volume_profile(stock.volume);
    stock.distance_from_52_week_high = if stock.week52_high != 0.0 {
        ((stock.price - stock.week52_high) / stock.week52_high) * 100.0
    } else {
        0.0
    };
    stock.distance_from_52_week_low = if stock.week52_low != 0.0 {
        ((stock.price - stock.week52_low) / stock.week52_low) * 100.0
    } else {
        0.0
    };
}

/// 支撑/压力位估算器
///
/// 在回看窗口内取最低的 3 个低点均值作为支撑位、
/// 最高的 3 个高点均值作为压力位
pub struct EquilibriumCalculator {
    lookback: usize,
}

impl EquilibriumCalculator {
    pub fn new(lookback: usize) -> Self {
        Self { lookback }
    }

    /// 根据历史K线和当前价格估算支撑/压力区间
    pub fn calculate(&self, candles: &[CandlestickData], current_price: f64) -> EquilibriumData {
        // 无历史数据时给出退化区间
        if candles.is_empty() {
            return EquilibriumData {
                zone: PriceZone::Neutral,
                strength: 0.5,
                support: current_price * 0.95,
                resistance: current_price * 1.05,
            };
        }

        let (support, resistance) = self.find_key_levels(candles);

        let mut zone = PriceZone::Neutral;
        let mut strength = 0.5;

        let price_range = resistance - support;
        if price_range > 0.0 {
            let position = (current_price - support) / price_range;
            if position < 0.3 {
                zone = PriceZone::Support;
                strength = 0.3 - position;
            } else if position > 0.7 {
                zone = PriceZone::Resistance;
                strength = position - 0.7;
            }
        }

        EquilibriumData {
            zone,
            strength,
            support,
            resistance,
        }
    }

    /// 在回看窗口内提取支撑位和压力位
    fn find_key_levels(&self, candles: &[CandlestickData]) -> (f64, f64) {
        // 回看长度不超过可用K线数
        let lookback = self.lookback.min(candles.len());
        let window = &candles[candles.len() - lookback..];

        let lows: Vec<f64> = window.iter().map(|c| c.low).collect();
        let highs: Vec<f64> = window.iter().map(|c| c.high).collect();

        (avg_of_lowest(&lows, 3), avg_of_highest(&highs, 3))
    }
}

/// 取最小的 n 个值的均值
fn avg_of_lowest(values: &[f64], n: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = n.min(sorted.len());
    sorted[..n].iter().sum::<f64>() / n as f64
}

/// 取最大的 n 个值的均值
fn avg_of_highest(values: &[f64], n: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let n = n.min(sorted.len());
    sorted[..n].iter().sum::<f64>() / n as f64
}

/// 按周期合成一组技术指标
///
/// 真实实现应基于该代码的历史价格序列计算；
/// 当前版本用周期的确定性伪计算代替，相同输入必得相同输出
pub fn synthesize_indicators(_symbol: &str, period: usize) -> TechnicalIndicators {
    let p = period as f64;
    let macd = (p % 10.0 - 5.0) * 0.5;
    let macd_signal = macd + (p % 4.0 - 2.0) * 0.2;

    TechnicalIndicators {
        rsi: 30.0 + p % 40.0,
        stoch_rsi: 20.0 + p % 60.0,
        historic_rsi_avg: 45.0 + p % 10.0,
        sma50: 100.0 * (0.9 + p % 0.2),
        sma200: 100.0 * (0.9 + p % 0.2),
        ema20: 100.0 * (0.95 + p % 0.1),
        macd,
        macd_signal,
        macd_histogram: macd - macd_signal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn candle(low: f64, high: f64) -> CandlestickData {
        CandlestickData {
            date: "2024-01-01".to_string(),
            open: (low + high) / 2.0,
            high,
            low,
            close: (low + high) / 2.0,
            volume: 1_000_000,
        }
    }

    /// 测试均衡位计算
    #[test]
    fn test_equilibrium_level() {
        assert_relative_eq!(equilibrium_level(200.0, 100.0), 150.0);
        assert!(equilibrium_level(f64::NAN, 100.0).is_nan());
    }

    /// 测试均衡偏离度（含均衡位为 0 的哨兵值）
    #[test]
    fn test_price_to_equilibrium() {
        assert_relative_eq!(price_to_equilibrium(165.0, 150.0), 10.0);
        assert_relative_eq!(price_to_equilibrium(135.0, 150.0), -10.0);
        // 均衡位为 0 时返回 0.0 而不是无穷大
        assert_relative_eq!(price_to_equilibrium(100.0, 0.0), 0.0);
    }

    /// 测试趋势判定的三种分支
    #[test]
    fn test_determine_trend() {
        assert_eq!(determine_trend(110.0, 105.0, 100.0), Trend::Bullish);
        assert_eq!(determine_trend(90.0, 95.0, 100.0), Trend::Bearish);
        // 价格高于 SMA50 但 SMA50 低于 SMA200，属于中性
        assert_eq!(determine_trend(110.0, 95.0, 100.0), Trend::Neutral);
        // 相等不构成严格大小关系
        assert_eq!(determine_trend(100.0, 100.0, 100.0), Trend::Neutral);
    }

    /// 测试信号判定：RSI 与偏离度必须同时满足
    #[test]
    fn test_determine_signal() {
        assert_eq!(determine_signal(30.0, -20.0), Signal::Buy);
        assert_eq!(determine_signal(80.0, 20.0), Signal::Sell);
        // 只满足一个条件不触发
        assert_eq!(determine_signal(30.0, 0.0), Signal::Hold);
        assert_eq!(determine_signal(50.0, -20.0), Signal::Hold);
        assert_eq!(determine_signal(80.0, 5.0), Signal::Hold);
        // 阈值本身不触发
        assert_eq!(determine_signal(40.0, -10.0), Signal::Hold);
        assert_eq!(determine_signal(70.0, 10.0), Signal::Hold);
    }

    /// 测试成交量档位边界：5000 万和 1000 万本身归中
    #[test]
    fn test_volume_profile_boundaries() {
        assert_eq!(determine_volume_profile(50_000_001), VolumeProfile::High);
        assert_eq!(determine_volume_profile(50_000_000), VolumeProfile::Medium);
        assert_eq!(determine_volume_profile(10_000_000), VolumeProfile::Medium);
        assert_eq!(determine_volume_profile(9_999_999), VolumeProfile::Low);
        assert_eq!(determine_volume_profile(0), VolumeProfile::Low);
    }

    /// 测试均衡区间边界：-5.0 归均衡区，-5.01 归折价区
    #[test]
    fn test_equilibrium_zone_boundaries() {
        assert_eq!(equilibrium_zone(-5.0), EquilibriumZone::Equilibrium);
        assert_eq!(equilibrium_zone(-5.01), EquilibriumZone::Discount);
        assert_eq!(equilibrium_zone(5.0), EquilibriumZone::Equilibrium);
        assert_eq!(equilibrium_zone(5.01), EquilibriumZone::Premium);
        assert_eq!(equilibrium_zone(0.0), EquilibriumZone::Equilibrium);
    }

    /// 测试空历史时的退化区间
    #[test]
    fn test_calculator_empty_history() {
        let calc = EquilibriumCalculator::new(20);
        let result = calc.calculate(&[], 100.0);

        assert_eq!(result.zone, PriceZone::Neutral);
        assert_relative_eq!(result.strength, 0.5);
        assert_relative_eq!(result.support, 95.0);
        assert_relative_eq!(result.resistance, 105.0);
    }

    /// 测试支撑/压力位：最低3个低点与最高3个高点的均值
    #[test]
    fn test_calculator_key_levels() {
        let candles = vec![
            candle(90.0, 110.0),
            candle(92.0, 112.0),
            candle(94.0, 114.0),
            candle(96.0, 116.0),
            candle(98.0, 118.0),
        ];
        let calc = EquilibriumCalculator::new(20);

        // support = (90+92+94)/3 = 92, resistance = (118+116+114)/3 = 116
        let near_support = calc.calculate(&candles, 93.0);
        assert_relative_eq!(near_support.support, 92.0);
        assert_relative_eq!(near_support.resistance, 116.0);
        // position = 1/24 < 0.3
        assert_eq!(near_support.zone, PriceZone::Support);
        assert_relative_eq!(near_support.strength, 0.3 - 1.0 / 24.0);

        let near_resistance = calc.calculate(&candles, 115.0);
        assert_eq!(near_resistance.zone, PriceZone::Resistance);

        let middle = calc.calculate(&candles, 104.0);
        assert_eq!(middle.zone, PriceZone::Neutral);
        assert_relative_eq!(middle.strength, 0.5);
    }

    /// 测试回看长度超过可用K线数时被收缩
    #[test]
    fn test_calculator_lookback_clamp() {
        let candles = vec![candle(100.0, 102.0), candle(101.0, 103.0)];
        let calc = EquilibriumCalculator::new(50);
        let result = calc.calculate(&candles, 101.0);

        // 只有两根K线，取两个低点/高点的均值
        assert_relative_eq!(result.support, 100.5);
        assert_relative_eq!(result.resistance, 102.5);
    }

    /// 测试衍生字段重算的一致性
    #[test]
    fn test_enrich_recomputes_derived_fields() {
        let mut stock = crate::services::provider::test_stock("AAPL");
        stock.price = 100.0;
        stock.week52_high = 160.0;
        stock.week52_low = 80.0;
        stock.rsi = 30.0;
        stock.sma50 = 110.0;
        stock.sma200 = 120.0;
        stock.volume = 60_000_000;

        enrich(&mut stock);

        assert_relative_eq!(stock.equilibrium_level, 120.0);
        assert_relative_eq!(stock.price_to_equilibrium, -100.0 / 6.0);
        assert_eq!(stock.trend, Trend::Bearish);
        assert_eq!(stock.signal, Signal::Buy);
        assert_eq!(stock.volume_profile, VolumeProfile::High);
        assert_relative_eq!(stock.distance_from_52_week_high, -37.5);
        assert_relative_eq!(stock.distance_from_52_week_low, 25.0);
    }

    /// 测试指标合成的确定性
    #[test]
    fn test_synthesize_indicators_deterministic() {
        let a = synthesize_indicators("AAPL", 200);
        let b = synthesize_indicators("AAPL", 200);

        assert_relative_eq!(a.rsi, b.rsi);
        assert_relative_eq!(a.macd, b.macd);
        assert_relative_eq!(a.macd_histogram, a.macd - a.macd_signal);
        assert!(a.rsi >= 30.0 && a.rsi < 70.0);
    }
}
