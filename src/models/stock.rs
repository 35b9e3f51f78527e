//! 股票数据模型
//!
//! 定义股票筛选服务的数据结构，JSON 字段统一使用 camelCase

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 趋势分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Bullish => "bullish",
            Trend::Bearish => "bearish",
            Trend::Neutral => "neutral",
        }
    }
}

/// 交易信号分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "buy",
            Signal::Sell => "sell",
            Signal::Hold => "hold",
        }
    }
}

/// 成交量档位分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeProfile {
    High,
    Medium,
    Low,
}

impl VolumeProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeProfile::High => "high",
            VolumeProfile::Medium => "medium",
            VolumeProfile::Low => "low",
        }
    }
}

/// 均衡区间分类（由价格相对均衡位的偏离度计算得出）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquilibriumZone {
    Discount,
    Equilibrium,
    Premium,
}

impl EquilibriumZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquilibriumZone::Discount => "discount",
            EquilibriumZone::Equilibrium => "equilibrium",
            EquilibriumZone::Premium => "premium",
        }
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    /// 解析排序方向，无法识别时默认升序
    pub fn parse(s: &str) -> Self {
        match s {
            "desc" => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

/// 完整股票快照
///
/// 市场字段 + 技术指标字段由数据源提供；
/// 衍生字段（均衡位、趋势、信号、成交量档位等）由管道在返回前统一重算，
/// 不允许单独修改
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockData {
    /// 股票代码
    pub symbol: String,
    /// 公司名称
    pub name: String,
    /// 最新价
    pub price: f64,
    /// 涨跌额
    pub change: f64,
    /// 涨跌幅（百分比）
    pub change_percent: f64,
    /// 成交量
    pub volume: i64,
    /// 所属板块
    pub sector: String,
    /// 所属行业
    pub industry: String,
    /// 市值
    pub market_cap: f64,
    /// 相对强弱指数
    pub rsi: f64,
    /// 随机RSI
    pub stoch_rsi: f64,
    /// 历史RSI均值
    pub historic_rsi_avg: f64,
    /// 50日简单均线
    pub sma50: f64,
    /// 200日简单均线
    pub sma200: f64,
    /// 20日指数均线
    pub ema20: f64,
    /// MACD
    pub macd: f64,
    /// MACD 信号线
    pub macd_signal: f64,
    /// MACD 柱
    pub macd_histogram: f64,
    /// 52周最高价
    pub week52_high: f64,
    /// 52周最低价
    pub week52_low: f64,
    /// 均衡位（52周高低点中值）
    pub equilibrium_level: f64,
    /// 价格相对均衡位偏离度（百分比）
    pub price_to_equilibrium: f64,
    /// 趋势
    pub trend: Trend,
    /// 交易信号
    pub signal: Signal,
    /// 成交量档位
    pub volume_profile: VolumeProfile,
    /// 距52周最高价的距离（百分比）
    pub distance_from_52_week_high: f64,
    /// 距52周最低价的距离（百分比）
    pub distance_from_52_week_low: f64,
    /// 更新时间
    pub last_updated: DateTime<Utc>,
}

/// 筛选条件
///
/// 集合类条件为空时表示不限制
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockFilter {
    /// 搜索词（代码或名称的大小写不敏感子串）
    pub search_term: String,
    /// 板块集合
    pub sectors: Vec<String>,
    /// RSI 下限
    pub rsi_min: f64,
    /// RSI 上限
    pub rsi_max: f64,
    /// 价格下限
    pub price_min: f64,
    /// 价格上限
    pub price_max: f64,
    /// 成交量档位集合
    pub volume_profile: Vec<String>,
    /// 信号集合
    pub signals: Vec<String>,
    /// 趋势集合
    pub trend: Vec<String>,
    /// 均衡区间集合
    pub equilibrium_zone: Vec<String>,
}

/// 股票列表请求（筛选 + 排序 + 分页，已完成默认值填充）
#[derive(Debug, Clone)]
pub struct StockListRequest {
    pub search_term: String,
    pub sectors: Vec<String>,
    pub rsi_min: f64,
    pub rsi_max: f64,
    pub price_min: f64,
    pub price_max: f64,
    pub volume_profile: Vec<String>,
    pub signals: Vec<String>,
    pub trend: Vec<String>,
    pub equilibrium_zone: Vec<String>,
    pub sort_field: String,
    pub sort_order: SortOrder,
    /// 页码（从 1 开始）
    pub page: usize,
    /// 每页数量
    pub page_size: usize,
}

impl StockListRequest {
    /// 提取筛选条件部分
    pub fn to_filter(&self) -> StockFilter {
        StockFilter {
            search_term: self.search_term.clone(),
            sectors: self.sectors.clone(),
            rsi_min: self.rsi_min,
            rsi_max: self.rsi_max,
            price_min: self.price_min,
            price_max: self.price_max,
            volume_profile: self.volume_profile.clone(),
            signals: self.signals.clone(),
            trend: self.trend.clone(),
            equilibrium_zone: self.equilibrium_zone.clone(),
        }
    }
}

/// 股票列表查询参数（HTTP 层绑定用）
///
/// 集合类参数以逗号分隔字符串传入，例如 `sectors=Technology,Energy`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockListQuery {
    pub search_term: Option<String>,
    pub sectors: Option<String>,
    pub rsi_min: Option<f64>,
    pub rsi_max: Option<f64>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub volume_profile: Option<String>,
    pub signals: Option<String>,
    pub trend: Option<String>,
    pub equilibrium_zone: Option<String>,
    pub sort_field: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// 拆分逗号分隔的集合参数
fn split_list(param: Option<String>) -> Vec<String> {
    match param {
        Some(s) if !s.is_empty() => s.split(',').map(|v| v.trim().to_string()).collect(),
        _ => Vec::new(),
    }
}

impl StockListQuery {
    /// 填充默认值并转换为管道请求
    ///
    /// 默认值：page=1、pageSize=50、sortField=symbol、sortOrder=asc、
    /// RSI 范围 [0,100]、价格范围 [0,10000]
    pub fn into_request(self) -> StockListRequest {
        StockListRequest {
            search_term: self.search_term.unwrap_or_default(),
            sectors: split_list(self.sectors),
            rsi_min: self.rsi_min.unwrap_or(0.0),
            rsi_max: self.rsi_max.unwrap_or(100.0),
            price_min: self.price_min.unwrap_or(0.0),
            price_max: self.price_max.unwrap_or(10_000.0),
            volume_profile: split_list(self.volume_profile),
            signals: split_list(self.signals),
            trend: split_list(self.trend),
            equilibrium_zone: split_list(self.equilibrium_zone),
            sort_field: match self.sort_field {
                Some(f) if !f.is_empty() => f,
                _ => "symbol".to_string(),
            },
            sort_order: SortOrder::parse(self.sort_order.as_deref().unwrap_or("asc")),
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(50),
        }
    }
}

/// 股票列表响应
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockListResponse {
    /// 当前页数据
    pub stocks: Vec<StockData>,
    /// 筛选后的总记录数（分页前）
    pub total: usize,
    /// 页码
    pub page: usize,
    /// 每页数量
    pub page_size: usize,
    /// 总页数
    pub total_pages: usize,
}

/// 单日K线数据
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandlestickData {
    /// 日期（YYYY-MM-DD）
    pub date: String,
    /// 开盘价
    pub open: f64,
    /// 最高价
    pub high: f64,
    /// 最低价
    pub low: f64,
    /// 收盘价
    pub close: f64,
    /// 成交量
    pub volume: i64,
}

/// 支撑/压力区间分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceZone {
    Support,
    Resistance,
    Neutral,
}

/// 均衡区间估算结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquilibriumData {
    /// 当前价格所处区间
    pub zone: PriceZone,
    /// 区间强度
    pub strength: f64,
    /// 支撑位
    pub support: f64,
    /// 压力位
    pub resistance: f64,
}

/// K线图响应
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartResponse {
    pub symbol: String,
    pub days: usize,
    pub candles: Vec<CandlestickData>,
    pub equilibrium: EquilibriumData,
}

/// 技术指标集合
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalIndicators {
    pub rsi: f64,
    pub stoch_rsi: f64,
    pub historic_rsi_avg: f64,
    pub sma50: f64,
    pub sma200: f64,
    pub ema20: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
}

/// 指标计算请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorRequest {
    pub symbol: String,
    pub period: Option<usize>,
}

/// 板块列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct SectorList {
    pub sectors: Vec<String>,
}
