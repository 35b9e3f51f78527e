//! 行情数据源
//!
//! 通过 `StockProvider` 接口屏蔽具体数据来源，便于测试时注入固定数据集。
//! 当前内置基于固定种子的模拟数据源，相同种子必然生成相同的股票集合

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::models::{CandlestickData, Signal, StockData, Trend, VolumeProfile};

/// 数据源错误
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

/// 行情数据源接口
#[async_trait]
pub trait StockProvider: Send + Sync {
    /// 拉取全量股票集合（未过滤、未排序）
    async fn fetch_universe(&self) -> Result<Vec<StockData>, ProviderError>;

    /// 拉取指定代码的历史日K线
    async fn fetch_history(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<Vec<CandlestickData>, ProviderError>;
}

/// 股票池：代码、名称、板块
const TICKERS: &[(&str, &str, &str)] = &[
    ("AAPL", "Apple Inc.", "Technology"),
    ("MSFT", "Microsoft Corp.", "Technology"),
    ("GOOGL", "Alphabet Inc.", "Communication Services"),
    ("AMZN", "Amazon.com Inc.", "Consumer Cyclical"),
    ("NVDA", "NVIDIA Corp.", "Technology"),
    ("TSLA", "Tesla Inc.", "Consumer Cyclical"),
    ("META", "Meta Platforms", "Communication Services"),
    ("BRK.B", "Berkshire Hathaway", "Financial"),
    ("JNJ", "Johnson & Johnson", "Healthcare"),
    ("JPM", "JPMorgan Chase", "Financial"),
    ("V", "Visa Inc.", "Financial"),
    ("PG", "Procter & Gamble", "Consumer Defensive"),
    ("MA", "Mastercard Inc.", "Financial"),
    ("HD", "Home Depot", "Consumer Cyclical"),
    ("BAC", "Bank of America", "Financial"),
    ("XOM", "Exxon Mobil", "Energy"),
    ("CVX", "Chevron Corp.", "Energy"),
    ("ABBV", "AbbVie Inc.", "Healthcare"),
    ("KO", "Coca-Cola Co.", "Consumer Defensive"),
    ("PFE", "Pfizer Inc.", "Healthcare"),
];

/// 板块到行业的映射表
fn industry_for_sector(sector: &str, rng: &mut StdRng) -> String {
    let industries: &[&str] = match sector {
        "Technology" => &["Software", "Semiconductors", "Hardware", "IT Services"],
        "Healthcare" => &["Biotechnology", "Pharmaceuticals", "Medical Devices", "Healthcare Plans"],
        "Financial" => &["Banks", "Insurance", "Asset Management", "Capital Markets"],
        "Consumer Cyclical" => &["Retail", "Automotive", "Apparel", "Restaurants"],
        "Energy" => &["Oil & Gas", "Renewable Energy", "Utilities"],
        "Industrials" => &["Aerospace", "Construction", "Manufacturing", "Transportation"],
        "Consumer Defensive" => &["Food Products", "Beverages", "Household Products"],
        "Real Estate" => &["REITs", "Real Estate Services", "Development"],
        "Communication Services" => &["Telecom", "Media", "Entertainment"],
        "Utilities" => &["Electric", "Gas", "Water"],
        "Basic Materials" => &["Chemicals", "Metals & Mining", "Paper & Forest Products"],
        _ => return "General".to_string(),
    };
    industries[rng.gen_range(0..industries.len())].to_string()
}

/// 基于固定种子的模拟行情数据源
pub struct MockProvider {
    seed: u64,
}

impl MockProvider {
    pub const DEFAULT_SEED: u64 = 20_240_601;

    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}

#[async_trait]
impl StockProvider for MockProvider {
    async fn fetch_universe(&self) -> Result<Vec<StockData>, ProviderError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut stocks = Vec::with_capacity(TICKERS.len());

        for (symbol, name, sector) in TICKERS {
            let base_price = rng.gen::<f64>() * 500.0 + 50.0;
            let change_percent = (rng.gen::<f64>() - 0.5) * 10.0;
            let rsi = rng.gen::<f64>() * 100.0;
            let sma50 = base_price * (0.9 + rng.gen::<f64>() * 0.2);
            let sma200 = base_price * (0.85 + rng.gen::<f64>() * 0.3);
            let week52_high = base_price * (1.0 + rng.gen::<f64>() * 0.3);
            let week52_low = base_price * (0.7 + rng.gen::<f64>() * 0.2);
            let macd = (rng.gen::<f64>() - 0.5) * 5.0;
            let macd_signal = macd + (rng.gen::<f64>() - 0.5) * 2.0;
            let volume = (rng.gen::<f64>() * 100_000_000.0) as i64;
            let industry = industry_for_sector(sector, &mut rng);

            // 衍生字段统一置中性，由管道的 enrich 步骤按唯一规则重算
            stocks.push(StockData {
                symbol: symbol.to_string(),
                name: name.to_string(),
                price: base_price,
                change: base_price * (change_percent / 100.0),
                change_percent,
                volume,
                sector: sector.to_string(),
                industry,
                market_cap: base_price * (rng.gen::<f64>() * 1_000_000_000.0 + 100_000_000.0),
                rsi,
                stoch_rsi: rng.gen::<f64>() * 100.0,
                historic_rsi_avg: 50.0 + (rng.gen::<f64>() - 0.5) * 20.0,
                sma50,
                sma200,
                ema20: base_price * (0.95 + rng.gen::<f64>() * 0.1),
                macd,
                macd_signal,
                macd_histogram: macd - macd_signal,
                week52_high,
                week52_low,
                equilibrium_level: 0.0,
                price_to_equilibrium: 0.0,
                trend: Trend::Neutral,
                signal: Signal::Hold,
                volume_profile: VolumeProfile::Medium,
                distance_from_52_week_high: 0.0,
                distance_from_52_week_low: 0.0,
                last_updated: Utc::now(),
            });
        }

        Ok(stocks)
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<Vec<CandlestickData>, ProviderError> {
        // 种子混入代码，保证同一代码的历史数据稳定
        let seed = symbol
            .bytes()
            .fold(self.seed, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut rng = StdRng::seed_from_u64(seed);

        let today = Utc::now().date_naive();
        let mut close = rng.gen::<f64>() * 500.0 + 50.0;
        let mut candles = Vec::with_capacity(days);

        for i in 0..days {
            let date = today - Duration::days((days - i) as i64);
            let open = close;
            close = open * (1.0 + (rng.gen::<f64>() - 0.5) * 0.04);
            let high = open.max(close) * (1.0 + rng.gen::<f64>() * 0.01);
            let low = open.min(close) * (1.0 - rng.gen::<f64>() * 0.01);

            candles.push(CandlestickData {
                date: date.format("%Y-%m-%d").to_string(),
                open,
                high,
                low,
                close,
                volume: (rng.gen::<f64>() * 75_000_000.0 + 5_000_000.0) as i64,
            });
        }

        Ok(candles)
    }
}

/// 构造一条用于测试的股票记录，除代码外全部取中性值
#[cfg(test)]
pub fn test_stock(symbol: &str) -> StockData {
    StockData {
        symbol: symbol.to_string(),
        name: format!("{} Inc.", symbol),
        price: 100.0,
        change: 0.0,
        change_percent: 0.0,
        volume: 20_000_000,
        sector: "Technology".to_string(),
        industry: "Software".to_string(),
        market_cap: 1_000_000_000.0,
        rsi: 50.0,
        stoch_rsi: 50.0,
        historic_rsi_avg: 50.0,
        sma50: 100.0,
        sma200: 100.0,
        ema20: 100.0,
        macd: 0.0,
        macd_signal: 0.0,
        macd_histogram: 0.0,
        week52_high: 120.0,
        week52_low: 80.0,
        equilibrium_level: 100.0,
        price_to_equilibrium: 0.0,
        trend: Trend::Neutral,
        signal: Signal::Hold,
        volume_profile: VolumeProfile::Medium,
        distance_from_52_week_high: 0.0,
        distance_from_52_week_low: 0.0,
        last_updated: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试相同种子生成完全一致的股票集合
    #[tokio::test]
    async fn test_universe_deterministic() {
        let provider = MockProvider::new(42);
        let a = provider.fetch_universe().await.unwrap();
        let b = provider.fetch_universe().await.unwrap();

        assert_eq!(a.len(), TICKERS.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.symbol, y.symbol);
            assert_eq!(x.price, y.price);
            assert_eq!(x.rsi, y.rsi);
            assert_eq!(x.volume, y.volume);
        }
    }

    /// 测试不同种子生成不同价格
    #[tokio::test]
    async fn test_universe_seed_sensitivity() {
        let a = MockProvider::new(1).fetch_universe().await.unwrap();
        let b = MockProvider::new(2).fetch_universe().await.unwrap();
        assert_ne!(a[0].price, b[0].price);
    }

    /// 测试历史K线的条数、日期顺序与价格合法性
    #[tokio::test]
    async fn test_history_shape() {
        let provider = MockProvider::default();
        let candles = provider.fetch_history("AAPL", 90).await.unwrap();

        assert_eq!(candles.len(), 90);
        for pair in candles.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
        for c in &candles {
            assert!(c.low <= c.open && c.low <= c.close);
            assert!(c.high >= c.open && c.high >= c.close);
        }

        // 同一代码的历史数据稳定，不同代码不同
        let again = provider.fetch_history("AAPL", 90).await.unwrap();
        assert_eq!(candles[0].close, again[0].close);
        let other = provider.fetch_history("MSFT", 90).await.unwrap();
        assert_ne!(candles[0].close, other[0].close);
    }
}
