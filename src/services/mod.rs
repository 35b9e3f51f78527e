//! 业务逻辑服务模块
//!
//! 封装数据获取和查询管道逻辑

pub mod cache;       // 缓存层
pub mod indicators;  // 技术指标与衍生字段
pub mod market_data; // 行情查询管道
pub mod provider;    // 行情数据源
