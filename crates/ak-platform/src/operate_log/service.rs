//! Operate Log Service

use std::sync::Arc;

use ak_common::PageResult;
use tracing::{debug, error};

use crate::operate_log::entity::{OperateLog, OperateLogCreate, OperateLogFilter};
use crate::operate_log::recorder::OperateLogRecorder;
use crate::operate_log::repository::OperateLogRepository;
use crate::shared::api_common::PageParam;
use crate::shared::error::Result;

#[derive(Clone)]
pub struct OperateLogService {
    repo: Arc<OperateLogRepository>,
}

impl OperateLogService {
    pub fn new(repo: Arc<OperateLogRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_operate_log(&self, log: &OperateLogCreate) -> Result<i64> {
        self.repo.insert(log).await
    }

    pub async fn get_operate_log(&self, id: i64) -> Result<Option<OperateLog>> {
        self.repo.find_by_id(id).await
    }

    pub async fn get_operate_log_page(
        &self,
        filter: &OperateLogFilter,
        page: &PageParam,
    ) -> Result<PageResult<OperateLog>> {
        let (list, total) = self.repo.find_page(filter, page).await?;
        Ok(PageResult::new(list, total))
    }
}

impl OperateLogRecorder for OperateLogService {
    /// Persist in the background; failures are only logged
    fn record(&self, log: OperateLogCreate) {
        let service = self.clone();
        tokio::spawn(async move {
            match service.create_operate_log(&log).await {
                Ok(id) => debug!(id, module = %log.module, name = %log.name, "Recorded operate log"),
                Err(e) => error!(
                    error = %e,
                    module = %log.module,
                    name = %log.name,
                    "Failed to persist operate log"
                ),
            }
        });
    }
}
