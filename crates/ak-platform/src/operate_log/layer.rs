//! Operate-log middleware
//!
//! Wraps an audited route. For administrator callers it captures the
//! request metadata and arguments, runs the handler, inspects the response
//! and hands an `OperateLogCreate` to the recorder. Recording never alters
//! the response and never fails the request.

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::{FromRequestParts, Query, RawPathParams},
    http::{header::CONTENT_LENGTH, header::CONTENT_TYPE, request, HeaderMap, Method, Request, StatusCode},
    response::Response,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tower::{Layer, Service};
use tracing::{error, warn};
use utoipa_axum::router::UtoipaMethodRouter;

use ak_common::error_codes;

use crate::operate_log::args::{args_to_json, parse_envelope, ArgValue};
use crate::operate_log::context::OperateLogContext;
use crate::operate_log::descriptor::EndpointDescriptor;
use crate::operate_log::entity::OperateLogCreate;
use crate::operate_log::recorder::OperateLogRecorder;
use crate::session::LoginUser;
use crate::shared::request_info;

const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Shared settings from which per-route layers are made
#[derive(Clone)]
pub struct OperateLogInterceptor {
    recorder: Arc<dyn OperateLogRecorder>,
    max_body_bytes: usize,
    enabled: bool,
}

impl OperateLogInterceptor {
    pub fn new(recorder: Arc<dyn OperateLogRecorder>) -> Self {
        Self {
            recorder,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            enabled: true,
        }
    }

    /// Largest request or response body buffered for the record
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Layer for one route described by `descriptor`
    pub fn layer(&self, descriptor: EndpointDescriptor) -> OperateLogLayer {
        OperateLogLayer {
            descriptor: Arc::new(descriptor),
            interceptor: self.clone(),
        }
    }

    /// Wrap a documented route, keeping its OpenAPI paths and schemas
    pub fn audited<S>(
        &self,
        route: UtoipaMethodRouter<S>,
        descriptor: EndpointDescriptor,
    ) -> UtoipaMethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let (schemas, paths, method_router) = route;
        (schemas, paths, method_router.layer(self.layer(descriptor)))
    }
}

#[derive(Clone)]
pub struct OperateLogLayer {
    descriptor: Arc<EndpointDescriptor>,
    interceptor: OperateLogInterceptor,
}

impl<S> Layer<S> for OperateLogLayer {
    type Service = OperateLogMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OperateLogMiddleware {
            inner,
            descriptor: self.descriptor.clone(),
            interceptor: self.interceptor.clone(),
        }
    }
}

#[derive(Clone)]
pub struct OperateLogMiddleware<S> {
    inner: S,
    descriptor: Arc<EndpointDescriptor>,
    interceptor: OperateLogInterceptor,
}

impl<S> Service<Request<Body>> for OperateLogMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let descriptor = self.descriptor.clone();
        let interceptor = self.interceptor.clone();

        Box::pin(async move {
            let mut inner = inner;
            let admin = req
                .extensions()
                .get::<LoginUser>()
                .filter(|user| user.is_admin())
                .cloned();
            let Some(login_user) = admin else {
                return inner.call(req).await;
            };
            if !interceptor.enabled
                || !descriptor.is_intercepted()
                || !descriptor.is_log_enable()
            {
                return inner.call(req).await;
            }

            intercept(inner, req, login_user, &descriptor, &interceptor).await
        })
    }
}

/// Request fields captured before the handler runs
struct RequestSnapshot {
    method: Method,
    url: String,
    user_ip: String,
    user_agent: String,
    trace_id: String,
}

impl RequestSnapshot {
    fn capture(parts: &request::Parts) -> Self {
        Self {
            method: parts.method.clone(),
            url: parts.uri.path().to_string(),
            user_ip: request_info::client_ip(&parts.headers, &parts.extensions).unwrap_or_default(),
            user_agent: request_info::user_agent(&parts.headers),
            trace_id: request_info::trace_id(&parts.headers, &parts.extensions).unwrap_or_default(),
        }
    }
}

async fn intercept<S>(
    mut inner: S,
    req: Request<Body>,
    login_user: LoginUser,
    descriptor: &EndpointDescriptor,
    interceptor: &OperateLogInterceptor,
) -> Result<Response, S::Error>
where
    S: Service<Request<Body>, Response = Response>,
{
    let start_time = Utc::now();
    let started = Instant::now();

    let (mut parts, body) = req.into_parts();
    let snapshot = RequestSnapshot::capture(&parts);
    let mut args = Vec::new();

    let body = if descriptor.log_args() {
        capture_uri_args(&mut parts, &mut args).await;
        if is_multipart(&parts.headers) {
            args.push(("body".to_string(), ArgValue::Upload { filename: None }));
            body
        } else if bounded_len(&body, interceptor.max_body_bytes).is_none() {
            // Unknown or over the limit: forwarded as is
            args.push(("body".to_string(), ArgValue::RawRequest));
            body
        } else {
            match to_bytes(body, interceptor.max_body_bytes).await {
                Ok(bytes) => {
                    if !bytes.is_empty() {
                        args.push(("body".to_string(), body_arg(&bytes)));
                    }
                    Body::from(bytes)
                }
                Err(e) => {
                    warn!(error = %e, url = %snapshot.url, "Failed to read request body");
                    args.push(("body".to_string(), ArgValue::RawRequest));
                    Body::empty()
                }
            }
        }
    } else {
        body
    };

    let context = OperateLogContext::new();
    parts.extensions.insert(context.clone());

    let response = inner.call(Request::from_parts(parts, body)).await?;

    let (mut response_parts, response_body) = response.into_parts();
    let inspect = is_inspectable(&response_parts.headers)
        && bounded_len(&response_body, interceptor.max_body_bytes).is_some();
    let (response_body, payload) = if inspect {
        match to_bytes(response_body, interceptor.max_body_bytes).await {
            Ok(bytes) => (Body::from(bytes.clone()), Some(bytes)),
            Err(e) => {
                error!(error = %e, url = %snapshot.url, "Failed to read response body, operate log skipped");
                response_parts.headers.remove(CONTENT_LENGTH);
                return Ok(Response::from_parts(response_parts, Body::empty()));
            }
        }
    } else {
        (response_body, None)
    };
    let duration = started.elapsed().as_millis() as i64;

    let built = catch_unwind(AssertUnwindSafe(|| {
        args.extend(context.take_args());
        build_record(BuildInput {
            descriptor,
            login_user: &login_user,
            snapshot: &snapshot,
            args: &args,
            context: &context,
            start_time,
            duration,
            status: response_parts.status,
            payload: payload.as_ref(),
        })
    }));
    match built {
        Ok(log) => {
            if catch_unwind(AssertUnwindSafe(|| interceptor.recorder.record(log))).is_err() {
                error!(handler = %descriptor.handler, "Operate log recorder panicked");
            }
        }
        Err(_) => error!(handler = %descriptor.handler, "Failed to build operate log"),
    }

    Ok(Response::from_parts(response_parts, response_body))
}

/// Path parameters and query string as `path` / `query` arguments
async fn capture_uri_args(parts: &mut request::Parts, args: &mut Vec<(String, ArgValue)>) {
    if let Ok(params) = RawPathParams::from_request_parts(parts, &()).await {
        let path: Map<String, Value> = params
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        if !path.is_empty() {
            args.push(("path".to_string(), ArgValue::Json(Value::Object(path))));
        }
    }

    if let Some(raw) = parts.uri.query().filter(|q| !q.is_empty()) {
        let query = match Query::<BTreeMap<String, String>>::try_from_uri(&parts.uri) {
            Ok(Query(map)) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            ),
            Err(_) => Value::String(raw.to_string()),
        };
        args.push(("query".to_string(), ArgValue::Json(query)));
    }
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

fn is_multipart(headers: &HeaderMap) -> bool {
    content_type(headers).is_some_and(|ct| ct.starts_with("multipart/"))
}

/// JSON and text responses are buffered; streams and binaries pass through
fn is_inspectable(headers: &HeaderMap) -> bool {
    match content_type(headers) {
        None => true,
        Some(ct) => ct.contains("json") || (ct.starts_with("text/") && !ct.starts_with("text/event-stream")),
    }
}

/// Body length when it is known not to exceed `limit`
fn bounded_len(body: &Body, limit: usize) -> Option<u64> {
    body.size_hint().upper().filter(|upper| *upper <= limit as u64)
}

fn body_arg(bytes: &Bytes) -> ArgValue {
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        return ArgValue::Json(value);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => ArgValue::Json(Value::String(text.to_string())),
        Err(_) => ArgValue::RawRequest,
    }
}

struct BuildInput<'a> {
    descriptor: &'a EndpointDescriptor,
    login_user: &'a LoginUser,
    snapshot: &'a RequestSnapshot,
    args: &'a [(String, ArgValue)],
    context: &'a OperateLogContext,
    start_time: DateTime<Utc>,
    duration: i64,
    status: StatusCode,
    payload: Option<&'a Bytes>,
}

fn build_record(input: BuildInput<'_>) -> OperateLogCreate {
    let descriptor = input.descriptor;

    let payload: Option<Value> = input.payload.filter(|b| !b.is_empty()).map(|bytes| {
        serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
    });

    let (result_code, result_msg, result_data) = match payload.as_ref().and_then(parse_envelope) {
        Some(envelope) => (envelope.code, envelope.msg, Some(envelope.data)),
        None if input.status.is_server_error() => {
            let msg = match &payload {
                Some(Value::String(text)) if !text.is_empty() => text.clone(),
                _ => input
                    .status
                    .canonical_reason()
                    .unwrap_or(error_codes::INTERNAL_SERVER_ERROR.msg)
                    .to_string(),
            };
            (error_codes::INTERNAL_SERVER_ERROR.code, msg, None)
        }
        None => (error_codes::SUCCESS.code, String::new(), payload),
    };

    OperateLogCreate {
        trace_id: input.snapshot.trace_id.clone(),
        user_id: input.login_user.id,
        user_type: input.login_user.user_type,
        module: descriptor.resolve_module(),
        name: descriptor.resolve_name(),
        operate_type: descriptor.resolve_type(),
        content: input.context.content(),
        exts: input.context.exts(),
        request_method: input.snapshot.method.to_string(),
        request_url: input.snapshot.url.clone(),
        user_ip: input.snapshot.user_ip.clone(),
        user_agent: input.snapshot.user_agent.clone(),
        handler: descriptor.handler.clone(),
        handler_args: descriptor
            .log_args()
            .then(|| args_to_json(input.args).to_string()),
        start_time: input.start_time,
        duration: input.duration,
        result_code,
        result_msg,
        result_data: if descriptor.log_result_data() {
            result_data.map(|data| data.to_string())
        } else {
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ak_common::UserType;
    use serde_json::json;

    fn snapshot() -> RequestSnapshot {
        RequestSnapshot {
            method: Method::DELETE,
            url: "/admin-api/system/user-session/delete".to_string(),
            user_ip: "10.0.0.1".to_string(),
            user_agent: "test".to_string(),
            trace_id: "trace-1".to_string(),
        }
    }

    fn build(status: StatusCode, payload: Option<&Bytes>, descriptor: &EndpointDescriptor) -> OperateLogCreate {
        let user = LoginUser::new(9, UserType::Admin);
        let snapshot = snapshot();
        let context = OperateLogContext::new();
        context.set_content("kicked");
        build_record(BuildInput {
            descriptor,
            login_user: &user,
            snapshot: &snapshot,
            args: &[("query".to_string(), ArgValue::Json(json!({"id": "3"})))],
            context: &context,
            start_time: Utc::now(),
            duration: 4,
            status,
            payload,
        })
    }

    fn descriptor() -> EndpointDescriptor {
        EndpointDescriptor::new("UserSessionApi::delete_user_session")
            .method(Method::DELETE)
            .operation("Delete session")
    }

    #[test]
    fn test_envelope_payload_records_data_only() {
        let body = Bytes::from(json!({"code": 0, "msg": "", "data": true}).to_string());
        let log = build(StatusCode::OK, Some(&body), &descriptor());

        assert_eq!(log.result_code, 0);
        assert_eq!(log.result_data.as_deref(), Some("true"));
        assert_eq!(log.handler_args.as_deref(), Some(r#"{"query":{"id":"3"}}"#));
        assert_eq!(log.content, "kicked");
        assert_eq!(log.user_id, 9);
        assert_eq!(log.name, "Delete session");
    }

    #[test]
    fn test_plain_payload_is_success() {
        let body = Bytes::from_static(b"[1,2]");
        let log = build(StatusCode::OK, Some(&body), &descriptor());
        assert_eq!(log.result_code, 0);
        assert_eq!(log.result_data.as_deref(), Some("[1,2]"));
    }

    #[test]
    fn test_server_error_without_envelope() {
        let body = Bytes::from_static(b"database exploded");
        let log = build(StatusCode::INTERNAL_SERVER_ERROR, Some(&body), &descriptor());
        assert_eq!(log.result_code, 500);
        assert_eq!(log.result_msg, "database exploded");
        assert!(log.result_data.is_none());

        let log = build(StatusCode::BAD_GATEWAY, None, &descriptor());
        assert_eq!(log.result_code, 500);
        assert_eq!(log.result_msg, "Bad Gateway");
    }

    #[test]
    fn test_options_suppress_args_and_data() {
        use crate::operate_log::descriptor::OperateLogOptions;
        let desc = descriptor().options(OperateLogOptions::new().without_args().without_result_data());
        let body = Bytes::from(json!({"code": 0, "data": 1}).to_string());
        let log = build(StatusCode::OK, Some(&body), &desc);
        assert!(log.handler_args.is_none());
        assert!(log.result_data.is_none());
    }

    #[test]
    fn test_body_arg_kinds() {
        assert_eq!(body_arg(&Bytes::from_static(b"{\"a\":1}")), ArgValue::Json(json!({"a": 1})));
        assert_eq!(body_arg(&Bytes::from_static(b"plain")), ArgValue::Json(json!("plain")));
        assert_eq!(body_arg(&Bytes::from_static(&[0xff, 0xfe])), ArgValue::RawRequest);
    }

    #[test]
    fn test_bounded_len() {
        assert_eq!(bounded_len(&Body::from("0123456789"), 16), Some(10));
        assert_eq!(bounded_len(&Body::from("0123456789"), 4), None);
        assert_eq!(bounded_len(&Body::empty(), 0), Some(0));
    }
}
