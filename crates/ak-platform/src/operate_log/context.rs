//! Per-request operate-log context
//!
//! The operate-log layer inserts an `OperateLogContext` into the request
//! extensions before calling the handler. Handlers extract it to attach a
//! free-form description, extension values or extra named arguments to the
//! record written for the request.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::operate_log::args::ArgValue;

#[derive(Debug, Default)]
struct ContextState {
    content: String,
    exts: Map<String, Value>,
    args: Vec<(String, ArgValue)>,
}

#[derive(Debug, Clone, Default)]
pub struct OperateLogContext {
    state: Arc<Mutex<ContextState>>,
}

impl OperateLogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_content(&self, content: impl Into<String>) {
        self.state.lock().content = content.into();
    }

    pub fn add_ext(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.state.lock().exts.insert(key.into(), value.into());
    }

    /// Record an extra handler argument under `name`
    pub fn add_arg(&self, name: impl Into<String>, value: ArgValue) {
        self.state.lock().args.push((name.into(), value));
    }

    pub fn content(&self) -> String {
        self.state.lock().content.clone()
    }

    pub fn exts(&self) -> Map<String, Value> {
        self.state.lock().exts.clone()
    }

    pub(crate) fn take_args(&self) -> Vec<(String, ArgValue)> {
        std::mem::take(&mut self.state.lock().args)
    }
}

/// Outside an audited route the handler gets a detached context whose
/// values are simply dropped.
impl<S> FromRequestParts<S> for OperateLogContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<OperateLogContext>()
            .cloned()
            .unwrap_or_default())
    }
}
