//! Admin User Repository

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::shared::db::{contains_pattern, from_millis, to_millis};
use crate::shared::error::Result;
use crate::user::entity::{AdminUser, UserStatus};

const SELECT_COLUMNS: &str =
    "SELECT id, username, nickname, password, status, tenant_id, create_time FROM system_users";

pub struct AdminUserRepository {
    pool: SqlitePool,
}

impl AdminUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS system_users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                nickname TEXT NOT NULL DEFAULT '',
                password TEXT NOT NULL,
                status INTEGER NOT NULL DEFAULT 0,
                tenant_id INTEGER NOT NULL DEFAULT 0,
                create_time INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert and return the assigned id
    pub async fn insert(&self, user: &AdminUser) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO system_users (username, nickname, password, status, tenant_id, create_time)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.nickname)
        .bind(&user.password)
        .bind(user.status.value())
        .bind(user.tenant_id)
        .bind(to_millis(user.create_time))
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<AdminUser>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| map_row(&r)))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        let row = sqlx::query(&format!("{} WHERE username = ?", SELECT_COLUMNS))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| map_row(&r)))
    }

    /// Accounts whose username contains `username`
    pub async fn find_by_username_like(&self, username: &str) -> Result<Vec<AdminUser>> {
        let rows = sqlx::query(&format!(
            "{} WHERE username LIKE ? ESCAPE '\\' ORDER BY id",
            SELECT_COLUMNS
        ))
        .bind(contains_pattern(username))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(map_row).collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM system_users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn map_row(row: &SqliteRow) -> AdminUser {
    AdminUser {
        id: row.get("id"),
        username: row.get("username"),
        nickname: row.get("nickname"),
        password: row.get("password"),
        status: UserStatus::from_value(row.get("status")),
        tenant_id: row.get("tenant_id"),
        create_time: from_millis(row.get("create_time")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::db::connect_in_memory;

    async fn repo() -> AdminUserRepository {
        let repo = AdminUserRepository::new(connect_in_memory().await.unwrap());
        repo.create_schema().await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = repo().await;
        let id = repo.insert(&AdminUser::new("admin", "Admin", "hash")).await.unwrap();

        let user = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.username, "admin");
        assert!(user.is_enabled());
        assert!(repo.find_by_username("admin").await.unwrap().is_some());
        assert!(repo.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_username_like() {
        let repo = repo().await;
        repo.insert(&AdminUser::new("alice", "", "h")).await.unwrap();
        repo.insert(&AdminUser::new("malice", "", "h")).await.unwrap();
        repo.insert(&AdminUser::new("bob", "", "h")).await.unwrap();

        let found = repo.find_by_username_like("lic").await.unwrap();
        let names: Vec<_> = found.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "malice"]);
        assert!(repo.find_by_username_like("%").await.unwrap().is_empty());
    }
}
