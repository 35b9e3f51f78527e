//! 行情查询管道
//!
//! 请求处理顺序：缓存查找 → 未命中时拉取全量数据 → 重算衍生字段 →
//! 过滤 → 排序 → 分页 → 回写缓存。
//! 缓存只是加速手段，不是正确性依赖：缓存故障一律按未命中降级

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::models::{
    ChartResponse, SortOrder, StockData, StockFilter, StockListRequest,
};
use crate::services::cache::CacheStore;
use crate::services::indicators::{self, EquilibriumCalculator};
use crate::services::provider::StockProvider;

/// K线支撑/压力位估算的回看长度
const CHART_LOOKBACK: usize = 20;

/// 可用板块列表
const SECTORS: &[&str] = &[
    "Technology",
    "Healthcare",
    "Financial",
    "Consumer Cyclical",
    "Energy",
    "Industrials",
    "Consumer Defensive",
    "Real Estate",
    "Communication Services",
    "Utilities",
    "Basic Materials",
];

/// 列表查询的缓存载体（页数据 + 分页前总数）
#[derive(Debug, Serialize, Deserialize)]
struct CachedPage {
    stocks: Vec<StockData>,
    total: usize,
}

// ==================== 过滤 ====================

/// 判断一条记录是否满足全部筛选条件
///
/// 各子条件为纯合取关系，任一不满足立即短路返回；
/// 集合类条件为空时视为满足
pub fn matches_filter(stock: &StockData, filter: &StockFilter) -> bool {
    if !filter.search_term.is_empty() {
        let needle = filter.search_term.to_lowercase();
        if !stock.symbol.to_lowercase().contains(&needle)
            && !stock.name.to_lowercase().contains(&needle)
        {
            return false;
        }
    }

    if !filter.sectors.is_empty() && !filter.sectors.iter().any(|s| *s == stock.sector) {
        return false;
    }

    if stock.rsi < filter.rsi_min || stock.rsi > filter.rsi_max {
        return false;
    }

    if stock.price < filter.price_min || stock.price > filter.price_max {
        return false;
    }

    if !filter.volume_profile.is_empty()
        && !filter
            .volume_profile
            .iter()
            .any(|p| p == stock.volume_profile.as_str())
    {
        return false;
    }

    if !filter.signals.is_empty() && !filter.signals.iter().any(|s| s == stock.signal.as_str()) {
        return false;
    }

    if !filter.trend.is_empty() && !filter.trend.iter().any(|t| t == stock.trend.as_str()) {
        return false;
    }

    if !filter.equilibrium_zone.is_empty() {
        let zone = indicators::equilibrium_zone(stock.price_to_equilibrium);
        if !filter.equilibrium_zone.iter().any(|z| z == zone.as_str()) {
            return false;
        }
    }

    true
}

// ==================== 排序 ====================

/// 排序字段，按名称解析一次后分发到类型化比较器
#[derive(Debug, Clone, Copy)]
enum SortKey {
    Symbol,
    Name,
    Price,
    ChangePercent,
    Rsi,
    Trend,
    Signal,
    Sector,
}

/// 解析排序字段名，无法识别时回退到代码
fn resolve_sort_key(field: &str) -> SortKey {
    match field {
        "symbol" => SortKey::Symbol,
        "name" => SortKey::Name,
        "price" => SortKey::Price,
        "changePercent" => SortKey::ChangePercent,
        "rsi" => SortKey::Rsi,
        "trend" => SortKey::Trend,
        "signal" => SortKey::Signal,
        "sector" => SortKey::Sector,
        _ => SortKey::Symbol,
    }
}

/// 按字段和方向稳定排序
///
/// 降序通过反转比较器实现而不是反转结果序列，
/// 保证相等元素保持原有相对顺序
pub fn sort_stocks(stocks: &mut [StockData], field: &str, order: SortOrder) {
    let key = resolve_sort_key(field);
    stocks.sort_by(|a, b| {
        let ord = match key {
            SortKey::Symbol => a.symbol.cmp(&b.symbol),
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Price => a.price.total_cmp(&b.price),
            SortKey::ChangePercent => a.change_percent.total_cmp(&b.change_percent),
            SortKey::Rsi => a.rsi.total_cmp(&b.rsi),
            SortKey::Trend => a.trend.as_str().cmp(b.trend.as_str()),
            SortKey::Signal => a.signal.as_str().cmp(b.signal.as_str()),
            SortKey::Sector => a.sector.cmp(&b.sector),
        };
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

// ==================== 缓存键 ====================

/// 集合条件排序后拼接，逻辑相同但顺序不同的请求共享同一键
fn joined_sorted(values: &[String]) -> String {
    let mut sorted: Vec<&str> = values.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(",")
}

/// 把一次查询请求编码为稳定的缓存键
///
/// 字段顺序固定：排序字段、方向、页码、页大小、搜索词、
/// RSI 区间、价格区间、各集合条件；任一字段变化键必然变化
pub fn cache_key(req: &StockListRequest) -> String {
    format!(
        "{}_{}_{}_{}_{}_{:.1}_{:.1}_{:.1}_{:.1}_{}_{}_{}_{}_{}",
        req.sort_field,
        req.sort_order.as_str(),
        req.page,
        req.page_size,
        req.search_term,
        req.rsi_min,
        req.rsi_max,
        req.price_min,
        req.price_max,
        joined_sorted(&req.sectors),
        joined_sorted(&req.signals),
        joined_sorted(&req.trend),
        joined_sorted(&req.volume_profile),
        joined_sorted(&req.equilibrium_zone),
    )
}

// ==================== 查询管道 ====================

/// 行情数据服务
///
/// 数据源和缓存均通过接口注入，自身不持有跨请求可变状态
pub struct MarketDataService {
    provider: Arc<dyn StockProvider>,
    cache: Arc<dyn CacheStore>,
    /// 列表查询缓存时长（秒级）
    list_ttl: Duration,
    /// 单只股票缓存时长（分钟级，个股数据波动低于查询组合）
    stock_ttl: Duration,
}

impl MarketDataService {
    pub fn new(
        provider: Arc<dyn StockProvider>,
        cache: Arc<dyn CacheStore>,
        list_ttl: Duration,
        stock_ttl: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            list_ttl,
            stock_ttl,
        }
    }

    /// 缓存读取，未命中/损坏/不可用统一返回 None
    async fn cache_lookup<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    log::debug!("缓存内容损坏，按未命中处理: key={} err={}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("缓存读取失败，按未命中处理: {}", e);
                None
            }
        }
    }

    /// 尽力写缓存，失败只记日志不影响请求
    async fn cache_store<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(raw) => {
                if let Err(e) = self.cache.set(key, &raw, ttl).await {
                    log::warn!("缓存写入失败，丢弃: key={} err={}", key, e);
                }
            }
            Err(e) => log::warn!("缓存序列化失败: key={} err={}", key, e),
        }
    }

    /// 查询股票列表
    ///
    /// 返回当前页数据和分页前的总记录数
    pub async fn get_stocks(
        &self,
        req: &StockListRequest,
    ) -> Result<(Vec<StockData>, usize), ServiceError> {
        // 上游应已保证，这里兜底防止分页下标越界
        if req.page < 1 || req.page_size < 1 {
            return Err(ServiceError::InvalidRequest(format!(
                "page and pageSize must be >= 1, got page={} pageSize={}",
                req.page, req.page_size
            )));
        }

        let key = format!("stocks:{}", cache_key(req));
        if let Some(cached) = self.cache_lookup::<CachedPage>(&key).await {
            log::debug!("列表查询缓存命中: {}", key);
            return Ok((cached.stocks, cached.total));
        }

        let mut stocks = self
            .provider
            .fetch_universe()
            .await
            .map_err(|e| ServiceError::SourceUnavailable(e.to_string()))?;

        // 衍生字段必须在过滤前重算，保证筛选针对最新值
        for stock in &mut stocks {
            indicators::enrich(stock);
        }

        let filter = req.to_filter();
        let mut filtered: Vec<StockData> = stocks
            .into_iter()
            .filter(|s| matches_filter(s, &filter))
            .collect();

        sort_stocks(&mut filtered, &req.sort_field, req.sort_order);

        let total = filtered.len();
        // 饱和乘法：极大页码不会溢出，只会落到集合末尾之外
        let start = (req.page - 1).saturating_mul(req.page_size);
        let page: Vec<StockData> = if start >= total {
            Vec::new()
        } else {
            filtered
                .into_iter()
                .skip(start)
                .take(req.page_size)
                .collect()
        };

        let cached = CachedPage {
            stocks: page,
            total,
        };
        self.cache_store(&key, &cached, self.list_ttl).await;

        Ok((cached.stocks, cached.total))
    }

    /// 查询单只股票
    pub async fn get_stock(&self, symbol: &str) -> Result<StockData, ServiceError> {
        let key = format!("stock:{}", symbol.to_uppercase());
        if let Some(stock) = self.cache_lookup::<StockData>(&key).await {
            return Ok(stock);
        }

        let mut stocks = self
            .provider
            .fetch_universe()
            .await
            .map_err(|e| ServiceError::SourceUnavailable(e.to_string()))?;

        for stock in &mut stocks {
            indicators::enrich(stock);
        }

        let stock = stocks
            .into_iter()
            .find(|s| s.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| ServiceError::NotFound(symbol.to_uppercase()))?;

        self.cache_store(&key, &stock, self.stock_ttl).await;
        Ok(stock)
    }

    /// 查询K线图数据（历史日K + 支撑/压力区间）
    pub async fn get_stock_chart(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<ChartResponse, ServiceError> {
        let key = format!("chart:{}:{}", symbol.to_uppercase(), days);
        if let Some(chart) = self.cache_lookup::<ChartResponse>(&key).await {
            return Ok(chart);
        }

        // 先确认代码存在，未知代码返回 NotFound 而不是编造历史数据
        let stock = self.get_stock(symbol).await?;

        let candles = self
            .provider
            .fetch_history(&stock.symbol, days)
            .await
            .map_err(|e| ServiceError::SourceUnavailable(e.to_string()))?;

        let equilibrium =
            EquilibriumCalculator::new(CHART_LOOKBACK).calculate(&candles, stock.price);

        let chart = ChartResponse {
            symbol: stock.symbol,
            days,
            candles,
            equilibrium,
        };
        self.cache_store(&key, &chart, self.stock_ttl).await;
        Ok(chart)
    }

    /// 返回全部可用板块
    pub fn get_sectors(&self) -> Vec<String> {
        SECTORS.iter().map(|s| s.to_string()).collect()
    }

    /// 全量刷新：清空缓存
    ///
    /// 唯一的全局写操作；与进行中的读请求只保证最终一致
    pub async fn refresh_all(&self) -> Result<(), ServiceError> {
        self.cache.flush_all().await?;
        log::info!("缓存已全量清空");
        Ok(())
    }
}
