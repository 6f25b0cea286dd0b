//! Login Log Repository

use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};

use ak_common::UserType;

use crate::login_log::entity::{LoginLog, LoginLogCreate, LoginLogFilter, LoginLogType, LoginResult};
use crate::shared::api_common::PageParam;
use crate::shared::db::{contains_pattern, from_millis, to_millis};
use crate::shared::error::{PlatformError, Result};

const SELECT_COLUMNS: &str = "SELECT id, log_type, trace_id, user_id, user_type, username, result, \
     user_ip, user_agent, create_time FROM system_login_log";

pub struct LoginLogRepository {
    pool: SqlitePool,
}

impl LoginLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS system_login_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                log_type INTEGER NOT NULL,
                trace_id TEXT NOT NULL DEFAULT '',
                user_id INTEGER,
                user_type INTEGER NOT NULL,
                username TEXT NOT NULL DEFAULT '',
                result INTEGER NOT NULL,
                user_ip TEXT NOT NULL DEFAULT '',
                user_agent TEXT NOT NULL DEFAULT '',
                create_time INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert(&self, log: &LoginLogCreate) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO system_login_log (
                log_type, trace_id, user_id, user_type, username, result,
                user_ip, user_agent, create_time
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(log.log_type.value())
        .bind(&log.trace_id)
        .bind(log.user_id)
        .bind(log.user_type.value())
        .bind(&log.username)
        .bind(log.result.value())
        .bind(&log.user_ip)
        .bind(&log.user_agent)
        .bind(to_millis(chrono::Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Every entry of one type, oldest first
    pub async fn find_by_type(&self, log_type: LoginLogType) -> Result<Vec<LoginLog>> {
        let rows = sqlx::query(&format!("{} WHERE log_type = ? ORDER BY id", SELECT_COLUMNS))
            .bind(log_type.value())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_row).collect()
    }

    pub async fn find_page(
        &self,
        filter: &LoginLogFilter,
        page: &PageParam,
    ) -> Result<(Vec<LoginLog>, i64)> {
        let mut count_query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM system_login_log WHERE 1 = 1");
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

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &LoginLogFilter) {
    if let Some(ip) = filter.user_ip.as_deref().filter(|v| !v.is_empty()) {
        query.push(" AND user_ip LIKE ");
        query.push_bind(contains_pattern(ip));
        query.push(" ESCAPE '\\'");
    }
    if let Some(username) = filter.username.as_deref().filter(|v| !v.is_empty()) {
        query.push(" AND username LIKE ");
        query.push_bind(contains_pattern(username));
        query.push(" ESCAPE '\\'");
    }
    match filter.success {
        Some(true) => {
            query.push(" AND result = ");
            query.push_bind(LoginResult::Success.value());
        }
        Some(false) => {
            query.push(" AND result <> ");
            query.push_bind(LoginResult::Success.value());
        }
        None => {}
    }
}

fn map_row(row: &SqliteRow) -> Result<LoginLog> {
    let log_type: i32 = row.get("log_type");
    let log_type = LoginLogType::from_value(log_type)
        .ok_or_else(|| PlatformError::internal(format!("unknown login log type {}", log_type)))?;
    let user_type: i32 = row.get("user_type");
    let user_type = UserType::from_value(user_type)
        .ok_or_else(|| PlatformError::internal(format!("unknown user type {}", user_type)))?;

    Ok(LoginLog {
        id: row.get("id"),
        log_type,
        trace_id: row.get("trace_id"),
        user_id: row.get("user_id"),
        user_type,
        username: row.get("username"),
        result: LoginResult::from_value(row.get("result")),
        user_ip: row.get("user_ip"),
        user_agent: row.get("user_agent"),
        create_time: from_millis(row.get("create_time")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::db::connect_in_memory;

    #[tokio::test]
    async fn test_insert_and_page() {
        let repo = LoginLogRepository::new(connect_in_memory().await.unwrap());
        repo.create_schema().await.unwrap();

        let ok = LoginLogCreate::new(LoginLogType::LoginUsername, UserType::Admin, LoginResult::Success)
            .with_user(1, "admin")
            .with_client("127.0.0.1", "curl");
        let bad = LoginLogCreate::new(
            LoginLogType::LoginUsername,
            UserType::Admin,
            LoginResult::BadCredentials,
        )
        .with_client("10.0.0.9", "curl");
        repo.insert(&ok).await.unwrap();
        repo.insert(&bad).await.unwrap();

        let (list, total) = repo
            .find_page(&LoginLogFilter::default(), &PageParam::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(list[0].result, LoginResult::BadCredentials);
        assert_eq!(list[0].user_id, None);

        let failures = LoginLogFilter {
            success: Some(false),
            ..Default::default()
        };
        let (_, total) = repo.find_page(&failures, &PageParam::default()).await.unwrap();
        assert_eq!(total, 1);

        let by_name = LoginLogFilter {
            username: Some("adm".to_string()),
            ..Default::default()
        };
        let (list, _) = repo.find_page(&by_name, &PageParam::default()).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].user_id, Some(1));
    }
}
