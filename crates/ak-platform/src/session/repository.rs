//! User Session Repository

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};

use ak_common::UserType;

use crate::session::entity::{UserSession, UserSessionFilter};
use crate::shared::api_common::PageParam;
use crate::shared::db::{contains_pattern, from_millis, to_millis};
use crate::shared::error::{PlatformError, Result};

const SELECT_COLUMNS: &str = "SELECT id, token, user_id, user_type, tenant_id, username, user_ip, \
     user_agent, session_timeout, create_time, update_time FROM system_user_session";

pub struct UserSessionRepository {
    pool: SqlitePool,
}

impl UserSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS system_user_session (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token TEXT NOT NULL UNIQUE,
                user_id INTEGER NOT NULL,
                user_type INTEGER NOT NULL,
                tenant_id INTEGER NOT NULL DEFAULT 0,
                username TEXT NOT NULL DEFAULT '',
                user_ip TEXT NOT NULL DEFAULT '',
                user_agent TEXT NOT NULL DEFAULT '',
                session_timeout INTEGER NOT NULL,
                create_time INTEGER NOT NULL,
                update_time INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Index for the timeout sweep
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_user_session_timeout
            ON system_user_session (session_timeout)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert and return the assigned id
    pub async fn insert(&self, session: &UserSession) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO system_user_session (
                token, user_id, user_type, tenant_id, username, user_ip, user_agent,
                session_timeout, create_time, update_time
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.user_type.value())
        .bind(session.tenant_id)
        .bind(&session.username)
        .bind(&session.user_ip)
        .bind(&session.user_agent)
        .bind(to_millis(session.session_timeout))
        .bind(to_millis(session.create_time))
        .bind(to_millis(session.update_time))
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<UserSession>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_row).transpose()
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<UserSession>> {
        let row = sqlx::query(&format!("{} WHERE token = ?", SELECT_COLUMNS))
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_row).transpose()
    }

    /// Extend a session: new expiry, username and update time.
    /// Returns false when no record carries the token.
    pub async fn update_by_token(
        &self,
        token: &str,
        session_timeout: DateTime<Utc>,
        username: &str,
        update_time: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE system_user_session
            SET session_timeout = ?, username = ?, update_time = ?
            WHERE token = ?
            "#,
        )
        .bind(to_millis(session_timeout))
        .bind(username)
        .bind(to_millis(update_time))
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_id(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM system_user_session WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_token(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM system_user_session WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Sessions whose expiry lies strictly before `now`
    pub async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<UserSession>> {
        let rows = sqlx::query(&format!(
            "{} WHERE session_timeout < ? ORDER BY id",
            SELECT_COLUMNS
        ))
        .bind(to_millis(now))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_row).collect()
    }

    /// One page of sessions, newest first, plus the filtered total
    pub async fn find_page(
        &self,
        filter: &UserSessionFilter,
        page: &PageParam,
    ) -> Result<(Vec<UserSession>, i64)> {
        let mut count_query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM system_user_session WHERE 1 = 1");
        push_filter(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        select.push(" WHERE 1 = 1");
        push_filter(&mut select, filter);
        select.push(" ORDER BY id DESC LIMIT ");
        select.push_bind(page.limit());
        select.push(" OFFSET ");
        select.push_bind(page.offset());

        let rows = select.build().fetch_all(&self.pool).await?;
        let list = rows.iter().map(map_row).collect::<Result<Vec<_>>>()?;
        Ok((list, total))
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &UserSessionFilter) {
    if let Some(user_ids) = &filter.user_ids {
        if user_ids.is_empty() {
            query.push(" AND 1 = 0");
        } else {
            query.push(" AND user_id IN (");
            let mut separated = query.separated(", ");
            for id in user_ids {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");
        }
    }
    if let Some(ip) = filter.user_ip.as_deref().filter(|ip| !ip.is_empty()) {
        query.push(" AND user_ip LIKE ");
        query.push_bind(contains_pattern(ip));
        query.push(" ESCAPE '\\'");
    }
}

fn map_row(row: &SqliteRow) -> Result<UserSession> {
    let user_type: i32 = row.get("user_type");
    let user_type = UserType::from_value(user_type)
        .ok_or_else(|| PlatformError::internal(format!("unknown user type {}", user_type)))?;

    Ok(UserSession {
        id: row.get("id"),
        token: row.get("token"),
        user_id: row.get("user_id"),
        user_type,
        tenant_id: row.get("tenant_id"),
        username: row.get("username"),
        user_ip: row.get("user_ip"),
        user_agent: row.get("user_agent"),
        session_timeout: from_millis(row.get("session_timeout")),
        create_time: from_millis(row.get("create_time")),
        update_time: from_millis(row.get("update_time")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::entity::LoginUser;
    use crate::shared::db::connect_in_memory;
    use chrono::Duration;

    async fn repo() -> UserSessionRepository {
        let repo = UserSessionRepository::new(connect_in_memory().await.unwrap());
        repo.create_schema().await.unwrap();
        repo
    }

    fn session(token: &str, user_id: i64, ip: &str, timeout: DateTime<Utc>) -> UserSession {
        let user = LoginUser::new(user_id, UserType::Admin);
        UserSession::for_login(token, &user, ip, "test-agent", timeout)
    }

    #[tokio::test]
    async fn test_insert_find_delete() {
        let repo = repo().await;
        let id = repo
            .insert(&session("tok-1", 1, "10.0.0.1", Utc::now() + Duration::hours(1)))
            .await
            .unwrap();

        let found = repo.find_by_token("tok-1").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.user_ip, "10.0.0.1");

        assert!(repo.delete_by_token("tok-1").await.unwrap());
        assert!(repo.find_by_id(id).await.unwrap().is_none());
        assert!(!repo.delete_by_id(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_expired_is_strict() {
        let repo = repo().await;
        let now = Utc::now();
        repo.insert(&session("old", 1, "", now - Duration::days(1))).await.unwrap();
        repo.insert(&session("new", 1, "", now + Duration::days(1))).await.unwrap();

        let expired = repo.find_expired(now).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].token, "old");
    }

    #[tokio::test]
    async fn test_page_filters() {
        let repo = repo().await;
        let later = Utc::now() + Duration::hours(1);
        repo.insert(&session("a", 1, "192.168.0.10", later)).await.unwrap();
        repo.insert(&session("b", 2, "192.168.0.11", later)).await.unwrap();
        repo.insert(&session("c", 1, "10.1.1.1", later)).await.unwrap();

        let filter = UserSessionFilter {
            user_ids: Some(vec![1]),
            user_ip: Some("192.168".to_string()),
        };
        let (list, total) = repo.find_page(&filter, &PageParam::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(list[0].token, "a");

        let (list, total) = repo
            .find_page(&UserSessionFilter::default(), &PageParam::new(1, 2))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].token, "c");

        let none = UserSessionFilter {
            user_ids: Some(vec![]),
            user_ip: None,
        };
        let (list, total) = repo.find_page(&none, &PageParam::default()).await.unwrap();
        assert!(list.is_empty());
        assert_eq!(total, 0);
    }
}
