//! Equilibrio 行情后端服务
//!
//! 提供股票筛选、排序、分页查询的 RESTful API，
//! 带短时缓存层吸收重复查询

mod config;   // 配置加载
mod error;    // 服务错误类型
mod handlers; // HTTP 请求处理器
mod models;   // 数据模型定义
mod services; // 业务逻辑服务

use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use crate::config::AppConfig;
use crate::services::cache::{CacheStore, MemoryCache, RedisCache};
use crate::services::market_data::MarketDataService;
use crate::services::provider::{MockProvider, StockProvider};

/// 应用程序入口
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 初始化日志系统，默认日志级别为 info
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let cfg = AppConfig::load();

    // Redis 连接失败时降级到进程内缓存，服务照常可用
    let op_timeout = Duration::from_millis(cfg.cache.op_timeout_ms);
    let cache: Arc<dyn CacheStore> = match RedisCache::connect(&cfg.cache.redis_url, op_timeout).await {
        Ok(redis) => Arc::new(redis),
        Err(e) => {
            log::warn!("Redis 连接失败（{}），使用进程内缓存", e);
            Arc::new(MemoryCache::new())
        }
    };

    let provider: Arc<dyn StockProvider> = Arc::new(MockProvider::default());
    let service = web::Data::new(MarketDataService::new(
        provider,
        cache,
        Duration::from_secs(cfg.cache.list_ttl_secs),
        Duration::from_secs(cfg.cache.stock_ttl_secs),
    ));

    let bind_addr = cfg.bind_addr();
    log::info!("启动 Equilibrio 行情后端服务: {}", bind_addr);

    // 创建并启动 HTTP 服务器
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())  // 添加请求日志中间件
            .app_data(service.clone())
            .configure(handlers::config)  // 配置路由
    })
    .bind(bind_addr)?;

    if cfg.server.workers > 0 {
        server = server.workers(cfg.server.workers);
    }

    server.run().await
}
