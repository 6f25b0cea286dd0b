//! Destination for finished operate-log records

use crate::operate_log::entity::OperateLogCreate;

/// Accepts records from the operate-log layer.
///
/// Called on the request path after the handler has completed, so
/// implementations must return quickly and do any I/O in the background.
pub trait OperateLogRecorder: Send + Sync {
    fn record(&self, log: OperateLogCreate);
}
