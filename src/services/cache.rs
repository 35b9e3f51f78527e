//! 缓存层
//!
//! `CacheStore` 以字符串键值对外提供带 TTL 的缓存能力，值为序列化后的 JSON。
//! 约定：键不存在、已过期、内容损坏对调用方一律表现为未命中；
//! 后端不可用返回 `CacheUnavailable`，由管道决定降级策略

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::time::timeout;

use crate::error::ServiceError;

/// 缓存接口
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 读取键值，未命中返回 None
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError>;

    /// 写入键值并设置过期时间
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ServiceError>;

    /// 删除键
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;

    /// 判断键是否存在
    async fn exists(&self, key: &str) -> Result<bool, ServiceError>;

    /// 清空全部缓存
    async fn flush_all(&self) -> Result<(), ServiceError>;
}

/// Redis 缓存
///
/// 所有操作都有统一的短超时，Redis 不可用时快速失败而不是拖住请求
pub struct RedisCache {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisCache {
    /// 连接 Redis
    pub async fn connect(url: &str, op_timeout: Duration) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        log::info!("Redis 缓存连接成功: {}", url);
        Ok(Self { conn, op_timeout })
    }

    fn unavailable(e: impl std::fmt::Display) -> ServiceError {
        ServiceError::CacheUnavailable(e.to_string())
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let mut conn = self.conn.clone();
        let fut = async move {
            redis::cmd("GET")
                .arg(key)
                .query_async::<_, Option<String>>(&mut conn)
                .await
        };
        match timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Self::unavailable(e)),
            Err(_) => Err(Self::unavailable("GET timed out")),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ServiceError> {
        let mut conn = self.conn.clone();
        let secs = ttl.as_secs().max(1);
        let fut = async move {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(secs)
                .query_async::<_, ()>(&mut conn)
                .await
        };
        match timeout(self.op_timeout, fut).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Self::unavailable(e)),
            Err(_) => Err(Self::unavailable("SET timed out")),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let mut conn = self.conn.clone();
        let fut = async move {
            redis::cmd("DEL")
                .arg(key)
                .query_async::<_, ()>(&mut conn)
                .await
        };
        match timeout(self.op_timeout, fut).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Self::unavailable(e)),
            Err(_) => Err(Self::unavailable("DEL timed out")),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, ServiceError> {
        let mut conn = self.conn.clone();
        let fut = async move {
            redis::cmd("EXISTS")
                .arg(key)
                .query_async::<_, bool>(&mut conn)
                .await
        };
        match timeout(self.op_timeout, fut).await {
            Ok(Ok(found)) => Ok(found),
            Ok(Err(e)) => Err(Self::unavailable(e)),
            Err(_) => Err(Self::unavailable("EXISTS timed out")),
        }
    }

    async fn flush_all(&self) -> Result<(), ServiceError> {
        let mut conn = self.conn.clone();
        let fut = async move {
            redis::cmd("FLUSHDB")
                .query_async::<_, ()>(&mut conn)
                .await
        };
        match timeout(self.op_timeout, fut).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Self::unavailable(e)),
            Err(_) => Err(Self::unavailable("FLUSHDB timed out")),
        }
    }
}

/// 进程内缓存
///
/// Redis 不可用时的兜底实现，同时供测试注入使用。过期采取惰性清理
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((value, deadline)) if Instant::now() < *deadline => Ok(Some(value.clone())),
            Some(_) => {
                // 已过期，顺手清理
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ServiceError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, ServiceError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn flush_all(&self) -> Result<(), ServiceError> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试进程内缓存的基本读写
    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = MemoryCache::new();
        cache
            .set("stocks:key", "{\"total\":1}", Duration::from_secs(30))
            .await
            .unwrap();

        assert_eq!(
            cache.get("stocks:key").await.unwrap().as_deref(),
            Some("{\"total\":1}")
        );
        assert!(cache.exists("stocks:key").await.unwrap());
        assert_eq!(cache.get("stocks:other").await.unwrap(), None);

        cache.delete("stocks:key").await.unwrap();
        assert_eq!(cache.get("stocks:key").await.unwrap(), None);
    }

    /// 测试 TTL 到期后表现为未命中
    #[tokio::test]
    async fn test_memory_cache_expiry() {
        let cache = MemoryCache::new();
        cache
            .set("stock:AAPL", "{}", Duration::from_millis(20))
            .await
            .unwrap();

        assert!(cache.exists("stock:AAPL").await.unwrap());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("stock:AAPL").await.unwrap(), None);
        assert!(!cache.exists("stock:AAPL").await.unwrap());
    }

    /// 测试全量清空
    #[tokio::test]
    async fn test_memory_cache_flush() {
        let cache = MemoryCache::new();
        cache.set("a", "1", Duration::from_secs(60)).await.unwrap();
        cache.set("b", "2", Duration::from_secs(60)).await.unwrap();

        cache.flush_all().await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), None);
        assert_eq!(cache.get("b").await.unwrap(), None);
    }
}
