//! Operate Log Repository

use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};

use ak_common::UserType;

use crate::operate_log::entity::{OperateLog, OperateLogCreate, OperateLogFilter, OperateType};
use crate::shared::api_common::PageParam;
use crate::shared::db::{contains_pattern, from_millis, to_millis};
use crate::shared::error::{PlatformError, Result};

const SELECT_COLUMNS: &str = "SELECT id, trace_id, user_id, user_type, module, name, operate_type, \
     content, exts, request_method, request_url, user_ip, user_agent, handler, handler_args, \
     start_time, duration, result_code, result_msg, result_data, create_time FROM system_operate_log";

pub struct OperateLogRepository {
    pool: SqlitePool,
}

impl OperateLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS system_operate_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trace_id TEXT NOT NULL DEFAULT '',
                user_id INTEGER NOT NULL,
                user_type INTEGER NOT NULL,
                module TEXT NOT NULL DEFAULT '',
                name TEXT NOT NULL DEFAULT '',
                operate_type INTEGER,
                content TEXT NOT NULL DEFAULT '',
                exts TEXT NOT NULL DEFAULT '{}',
                request_method TEXT NOT NULL DEFAULT '',
                request_url TEXT NOT NULL DEFAULT '',
                user_ip TEXT NOT NULL DEFAULT '',
                user_agent TEXT NOT NULL DEFAULT '',
                handler TEXT NOT NULL DEFAULT '',
                handler_args TEXT,
                start_time INTEGER NOT NULL,
                duration INTEGER NOT NULL,
                result_code INTEGER NOT NULL,
                result_msg TEXT NOT NULL DEFAULT '',
                result_data TEXT,
                create_time INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_operate_log_start_time
            ON system_operate_log (start_time)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert(&self, log: &OperateLogCreate) -> Result<i64> {
        let exts = serde_json::to_string(&log.exts)?;
        let result = sqlx::query(
            r#"
            INSERT INTO system_operate_log (
                trace_id, user_id, user_type, module, name, operate_type, content, exts,
                request_method, request_url, user_ip, user_agent, handler, handler_args,
                start_time, duration, result_code, result_msg, result_data, create_time
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.trace_id)
        .bind(log.user_id)
        .bind(log.user_type.value())
        .bind(&log.module)
        .bind(&log.name)
        .bind(log.operate_type.map(OperateType::value))
        .bind(&log.content)
        .bind(exts)
        .bind(&log.request_method)
        .bind(&log.request_url)
        .bind(&log.user_ip)
        .bind(&log.user_agent)
        .bind(&log.handler)
        .bind(&log.handler_args)
        .bind(to_millis(log.start_time))
        .bind(log.duration)
        .bind(log.result_code)
        .bind(&log.result_msg)
        .bind(&log.result_data)
        .bind(to_millis(chrono::Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<OperateLog>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_row).transpose()
    }

    pub async fn find_page(
        &self,
        filter: &OperateLogFilter,
        page: &PageParam,
    ) -> Result<(Vec<OperateLog>, i64)> {
        let mut count_query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM system_operate_log WHERE 1 = 1");
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

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &OperateLogFilter) {
    if let Some(module) = filter.module.as_deref().filter(|m| !m.is_empty()) {
        query.push(" AND module LIKE ");
        query.push_bind(contains_pattern(module));
        query.push(" ESCAPE '\\'");
    }
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
    if let Some(operate_type) = filter.operate_type {
        query.push(" AND operate_type = ");
        query.push_bind(operate_type.value());
    }
    match filter.success {
        Some(true) => {
            query.push(" AND result_code = 0");
        }
        Some(false) => {
            query.push(" AND result_code <> 0");
        }
        None => {}
    }
    if let Some(from) = filter.start_time_from {
        query.push(" AND start_time >= ");
        query.push_bind(to_millis(from));
    }
    if let Some(to) = filter.start_time_to {
        query.push(" AND start_time <= ");
        query.push_bind(to_millis(to));
    }
}

fn map_row(row: &SqliteRow) -> Result<OperateLog> {
    let user_type: i32 = row.get("user_type");
    let user_type = UserType::from_value(user_type)
        .ok_or_else(|| PlatformError::internal(format!("unknown user type {}", user_type)))?;
    let operate_type: Option<i32> = row.get("operate_type");
    let exts: String = row.get("exts");

    Ok(OperateLog {
        id: row.get("id"),
        trace_id: row.get("trace_id"),
        user_id: row.get("user_id"),
        user_type,
        module: row.get("module"),
        name: row.get("name"),
        operate_type: operate_type.and_then(OperateType::from_value),
        content: row.get("content"),
        exts: serde_json::from_str(&exts)?,
        request_method: row.get("request_method"),
        request_url: row.get("request_url"),
        user_ip: row.get("user_ip"),
        user_agent: row.get("user_agent"),
        handler: row.get("handler"),
        handler_args: row.get("handler_args"),
        start_time: from_millis(row.get("start_time")),
        duration: row.get("duration"),
        result_code: row.get("result_code"),
        result_msg: row.get("result_msg"),
        result_data: row.get("result_data"),
        create_time: from_millis(row.get("create_time")),
    })
}
