//! Read-through Redis cache for listing responses.
//!
//! Keys are built from operation, actor scope and query parameters, so a
//! cached scoped listing can never serve another actor's rows. Entries use
//! a short TTL and are invalidated on any write to the affected namespace.
//! Cache trouble degrades to store reads.

use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::CacheConfig,
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct CacheService {
    client: Client,
    ttl_seconds: u64,
    enabled: bool,
}

impl CacheService {
    /// Create a new cache service and verify connectivity
    pub async fn new(config: &CacheConfig) -> AppResult<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        if config.enabled {
            let mut conn = client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

            redis::cmd("PING")
                .query_async::<_, String>(&mut conn)
                .await
                .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;
        }

        Ok(Self {
            client,
            ttl_seconds: config.ttl_seconds,
            enabled: config.enabled,
        })
    }

    /// Build a cache key from namespace, operation, actor scope and params
    pub fn key(namespace: &str, operation: &str, scope_key: &str, params: &str) -> String {
        format!("lectern:{}:{}:{}:{}", namespace, operation, scope_key, params)
    }

    /// Fetch a cached JSON value, if present
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::debug!("Cache unavailable: {}", e);
                return None;
            }
        };
        let raw: Option<String> = conn.get(key).await.ok().flatten();
        raw.and_then(|s| serde_json::from_str(&s).ok())
    }

    /// Store a JSON value with the configured TTL
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) {
        if !self.enabled {
            return;
        }
        let Ok(raw) = serde_json::to_string(value) else { return };
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::debug!("Cache unavailable: {}", e);
                return;
            }
        };
        if let Err(e) = conn.set_ex::<_, _, ()>(key, raw, self.ttl_seconds).await {
            tracing::debug!("Cache write failed for {}: {}", key, e);
        }
    }

    /// Drop every key in a namespace. Called after any write to the
    /// entity set the namespace caches.
    pub async fn invalidate_namespace(&self, namespace: &str) {
        if !self.enabled {
            return;
        }
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::debug!("Cache unavailable: {}", e);
                return;
            }
        };
        let pattern = format!("lectern:{}:*", namespace);
        let keys: Vec<String> = match conn.keys(&pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::debug!("Cache scan failed for {}: {}", pattern, e);
                return;
            }
        };
        if keys.is_empty() {
            return;
        }
        if let Err(e) = conn.del::<_, ()>(keys).await {
            tracing::debug!("Cache invalidation failed for {}: {}", pattern, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_embed_scope_and_params() {
        let librarian = CacheService::key("books", "list", "all", "page=1");
        let user = CacheService::key("books", "list", "owner:7", "page=1");
        assert_ne!(librarian, user);
        assert!(librarian.starts_with("lectern:books:"));
    }
}
