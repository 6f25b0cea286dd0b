//! Operate Log Aggregate
//!
//! Audit trail of administrator operations, captured by a per-route tower
//! layer and persisted in the background.

pub mod api;
pub mod args;
pub mod context;
pub mod descriptor;
pub mod entity;
pub mod layer;
pub mod recorder;
pub mod repository;
pub mod service;

pub use api::{operate_logs_router, OperateLogsState};
pub use args::{ArgValue, IGNORED_ARG};
pub use context::OperateLogContext;
pub use descriptor::{ApiDoc, EndpointDescriptor, OperateLogOptions};
pub use entity::{OperateLog, OperateLogCreate, OperateLogFilter, OperateType};
pub use layer::{OperateLogInterceptor, OperateLogLayer};
pub use recorder::OperateLogRecorder;
pub use repository::OperateLogRepository;
pub use service::OperateLogService;
