//! Login Log Service

use std::sync::Arc;

use ak_common::PageResult;
use tracing::debug;

use crate::login_log::entity::{LoginLog, LoginLogCreate, LoginLogFilter};
use crate::login_log::repository::LoginLogRepository;
use crate::shared::api_common::PageParam;
use crate::shared::error::Result;

#[derive(Clone)]
pub struct LoginLogService {
    repo: Arc<LoginLogRepository>,
}

impl LoginLogService {
    pub fn new(repo: Arc<LoginLogRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_login_log(&self, log: LoginLogCreate) -> Result<i64> {
        let id = self.repo.insert(&log).await?;
        debug!(
            id,
            log_type = log.log_type.value(),
            result = log.result.value(),
            user_id = ?log.user_id,
            "Recorded login log"
        );
        Ok(id)
    }

    pub async fn get_login_log_page(
        &self,
        filter: &LoginLogFilter,
        page: &PageParam,
    ) -> Result<PageResult<LoginLog>> {
        let (list, total) = self.repo.find_page(filter, page).await?;
        Ok(PageResult::new(list, total))
    }
}
