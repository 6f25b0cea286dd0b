//! Login user cache
//!
//! Token → `LoginUser` lookups for request authentication. Entries carry
//! their own TTL and are independent of the relational session records.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use tracing::debug;

use crate::session::entity::LoginUser;
use crate::shared::error::Result;

/// Key prefix for cached login users
pub const LOGIN_USER_KEY_PREFIX: &str = "login_user:";

pub fn login_user_key(token: &str) -> String {
    format!("{}{}", LOGIN_USER_KEY_PREFIX, token)
}

#[async_trait]
pub trait LoginUserCache: Send + Sync {
    async fn get(&self, token: &str) -> Result<Option<LoginUser>>;

    async fn set(&self, token: &str, login_user: &LoginUser, ttl: Duration) -> Result<()>;

    async fn delete(&self, token: &str) -> Result<()>;

    /// Drop entries whose TTL has passed. Stores with native expiry have nothing to do.
    async fn purge_expired(&self) -> Result<u64> {
        Ok(0)
    }
}

/// Redis-backed cache: `login_user:{token}` → JSON, with `EX` expiry
#[derive(Clone)]
pub struct RedisLoginUserCache {
    conn: ConnectionManager,
}

impl RedisLoginUserCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl LoginUserCache for RedisLoginUserCache {
    async fn get(&self, token: &str) -> Result<Option<LoginUser>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(login_user_key(token))
            .query_async(&mut conn)
            .await?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, token: &str, login_user: &LoginUser, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(login_user)?;
        // SET key value EX seconds
        let _: () = redis::cmd("SET")
            .arg(login_user_key(token))
            .arg(json)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        debug!(user_id = login_user.id, ttl_secs = ttl.as_secs(), "Cached login user");
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("DEL")
            .arg(login_user_key(token))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

/// Process-local cache for development and tests
#[derive(Default)]
pub struct InMemoryLoginUserCache {
    entries: DashMap<String, (LoginUser, Instant)>,
}

impl InMemoryLoginUserCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl LoginUserCache for InMemoryLoginUserCache {
    async fn get(&self, token: &str) -> Result<Option<LoginUser>> {
        let key = login_user_key(token);
        let now = Instant::now();
        if let Some(entry) = self.entries.get(&key) {
            if entry.1 > now {
                return Ok(Some(entry.0.clone()));
            }
        }
        // A concurrent set may have replaced the expired entry
        self.entries.remove_if(&key, |_, entry| entry.1 <= now);
        Ok(None)
    }

    async fn set(&self, token: &str, login_user: &LoginUser, ttl: Duration) -> Result<()> {
        self.entries
            .insert(login_user_key(token), (login_user.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.entries.remove(&login_user_key(token));
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.1 > now);
        let purged = before.saturating_sub(self.entries.len()) as u64;
        if purged > 0 {
            debug!(purged, "Purged expired login users");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ak_common::UserType;

    #[tokio::test]
    async fn test_in_memory_set_get_delete() {
        let cache = InMemoryLoginUserCache::new();
        let user = LoginUser::new(1, UserType::Admin);

        cache.set("tok", &user, Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("tok").await.unwrap(), Some(user));

        cache.delete("tok").await.unwrap();
        assert!(cache.get("tok").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_entry_expires() {
        let cache = InMemoryLoginUserCache::new();
        let user = LoginUser::new(1, UserType::Member);

        cache.set("tok", &user, Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(cache.get("tok").await.unwrap().is_none());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_in_memory_purge_drops_only_expired() {
        let cache = InMemoryLoginUserCache::new();
        let user = LoginUser::new(1, UserType::Admin);

        cache.set("stale", &user, Duration::from_millis(10)).await.unwrap();
        cache.set("live", &user, Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.purge_expired().await.unwrap(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_in_memory_get_keeps_replaced_entry() {
        let cache = InMemoryLoginUserCache::new();
        let user = LoginUser::new(1, UserType::Admin);

        cache.set("tok", &user, Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.set("tok", &user, Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("tok").await.unwrap(), Some(user));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_key_format() {
        assert_eq!(login_user_key("abc"), "login_user:abc");
    }
}
