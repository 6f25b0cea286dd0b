//! Development Data Seeder
//!
//! Creates a default administrator on an empty database when running in
//! dev mode.
//!
//! Default credentials: admin / admin123

use std::sync::Arc;

use tracing::info;

use crate::auth::PasswordService;
use crate::shared::error::Result;
use crate::user::{AdminUser, AdminUserRepository};

pub const DEV_USERNAME: &str = "admin";
pub const DEV_PASSWORD: &str = "admin123";

pub struct DevDataSeeder {
    users: Arc<AdminUserRepository>,
    passwords: Arc<PasswordService>,
}

impl DevDataSeeder {
    pub fn new(users: Arc<AdminUserRepository>, passwords: Arc<PasswordService>) -> Self {
        Self { users, passwords }
    }

    /// Seed the default admin. Returns false when accounts already exist.
    pub async fn seed(&self) -> Result<bool> {
        if self.users.count().await? > 0 {
            info!("Users present, skipping dev seeding");
            return Ok(false);
        }

        let hash = self.passwords.hash_password(DEV_PASSWORD)?;
        let id = self
            .users
            .insert(&AdminUser::new(DEV_USERNAME, "Administrator", hash))
            .await?;

        info!(user_id = id, "=== DEV DATA SEEDED ===");
        info!("Default login: {} / {}", DEV_USERNAME, DEV_PASSWORD);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Argon2Config;
    use crate::shared::db::connect_in_memory;

    #[tokio::test]
    async fn test_seeds_once() {
        let users = Arc::new(AdminUserRepository::new(connect_in_memory().await.unwrap()));
        users.create_schema().await.unwrap();
        let passwords = Arc::new(PasswordService::new(Argon2Config::testing()).unwrap());
        let seeder = DevDataSeeder::new(users.clone(), passwords.clone());

        assert!(seeder.seed().await.unwrap());
        assert!(!seeder.seed().await.unwrap());

        let admin = users.find_by_username(DEV_USERNAME).await.unwrap().unwrap();
        assert!(passwords.verify_password(DEV_PASSWORD, &admin.password).unwrap());
    }
}
