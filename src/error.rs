//! 服务错误类型
//!
//! 管道内的错误必须可区分：数据源失败不能伪装成空结果，
//! 缓存失败不能导致请求失败

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// 按代码查询时未找到对应股票
    #[error("stock not found: {0}")]
    NotFound(String),

    /// 外部行情数据源不可用
    #[error("market data source unavailable: {0}")]
    SourceUnavailable(String),

    /// 缓存不可用（读按未命中降级，写直接丢弃，仅全量刷新时上抛）
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// 非法请求参数（上游应已拦截，此处兜底）
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
