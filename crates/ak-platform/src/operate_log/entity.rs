//! Operate Log Entity

use ak_common::UserType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of operation an endpoint performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum OperateType {
    Other,
    Get,
    Create,
    Update,
    Delete,
    Export,
    Import,
}

impl OperateType {
    pub fn value(self) -> i32 {
        match self {
            OperateType::Other => 0,
            OperateType::Get => 1,
            OperateType::Create => 2,
            OperateType::Update => 3,
            OperateType::Delete => 4,
            OperateType::Export => 5,
            OperateType::Import => 6,
        }
    }

    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(OperateType::Other),
            1 => Some(OperateType::Get),
            2 => Some(OperateType::Create),
            3 => Some(OperateType::Update),
            4 => Some(OperateType::Delete),
            5 => Some(OperateType::Export),
            6 => Some(OperateType::Import),
            _ => None,
        }
    }
}

impl From<OperateType> for i32 {
    fn from(value: OperateType) -> Self {
        value.value()
    }
}

impl TryFrom<i32> for OperateType {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        OperateType::from_value(value).ok_or_else(|| format!("unknown operate type: {}", value))
    }
}

/// One audited endpoint invocation, as handed to the recorder
#[derive(Debug, Clone, PartialEq)]
pub struct OperateLogCreate {
    pub trace_id: String,
    pub user_id: i64,
    pub user_type: UserType,
    pub module: String,
    pub name: String,
    pub operate_type: Option<OperateType>,
    /// Free-form description set by the handler
    pub content: String,
    /// Extra key/values set by the handler
    pub exts: serde_json::Map<String, serde_json::Value>,
    pub request_method: String,
    pub request_url: String,
    pub user_ip: String,
    pub user_agent: String,
    /// Logical handler signature, e.g. `UserSessionApi::delete_user_session`
    pub handler: String,
    /// JSON object of the handler arguments
    pub handler_args: Option<String>,
    pub start_time: DateTime<Utc>,
    /// Milliseconds
    pub duration: i64,
    pub result_code: i32,
    pub result_msg: String,
    /// JSON of the returned data
    pub result_data: Option<String>,
}

/// Persisted operate log
#[derive(Debug, Clone, PartialEq)]
pub struct OperateLog {
    pub id: i64,
    pub trace_id: String,
    pub user_id: i64,
    pub user_type: UserType,
    pub module: String,
    pub name: String,
    pub operate_type: Option<OperateType>,
    pub content: String,
    pub exts: serde_json::Map<String, serde_json::Value>,
    pub request_method: String,
    pub request_url: String,
    pub user_ip: String,
    pub user_agent: String,
    pub handler: String,
    pub handler_args: Option<String>,
    pub start_time: DateTime<Utc>,
    pub duration: i64,
    pub result_code: i32,
    pub result_msg: String,
    pub result_data: Option<String>,
    pub create_time: DateTime<Utc>,
}

impl OperateLog {
    pub fn is_success(&self) -> bool {
        self.result_code == ak_common::error_codes::SUCCESS.code
    }
}

/// Filters for the operate log page query
#[derive(Debug, Clone, Default)]
pub struct OperateLogFilter {
    /// Module contains
    pub module: Option<String>,
    /// Restrict to these user ids (`None` = no restriction)
    pub user_ids: Option<Vec<i64>>,
    pub operate_type: Option<OperateType>,
    /// `Some(true)` only `result_code = 0`, `Some(false)` only failures
    pub success: Option<bool>,
    pub start_time_from: Option<DateTime<Utc>>,
    pub start_time_to: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operate_type_values() {
        assert_eq!(OperateType::Export.value(), 5);
        assert_eq!(OperateType::from_value(4), Some(OperateType::Delete));
        assert_eq!(OperateType::from_value(7), None);
        assert_eq!(serde_json::to_string(&OperateType::Create).unwrap(), "2");
    }
}
