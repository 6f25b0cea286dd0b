//! Endpoint metadata for the operate-log layer
//!
//! Each audited route is registered with an `EndpointDescriptor` naming the
//! handler, its declared HTTP methods and the documentation/logging options
//! that decide whether and how it is recorded.

use axum::http::Method;

use crate::operate_log::entity::OperateType;

/// Explicit per-endpoint logging options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperateLogOptions {
    pub module: String,
    pub name: String,
    pub types: Vec<OperateType>,
    pub enable: bool,
    pub log_args: bool,
    pub log_result_data: bool,
}

impl Default for OperateLogOptions {
    fn default() -> Self {
        Self {
            module: String::new(),
            name: String::new(),
            types: Vec::new(),
            enable: true,
            log_args: true,
            log_result_data: true,
        }
    }
}

impl OperateLogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn operate_type(mut self, operate_type: OperateType) -> Self {
        self.types.push(operate_type);
        self
    }

    /// Never record this endpoint
    pub fn disabled(mut self) -> Self {
        self.enable = false;
        self
    }

    pub fn without_args(mut self) -> Self {
        self.log_args = false;
        self
    }

    pub fn without_result_data(mut self) -> Self {
        self.log_result_data = false;
        self
    }
}

/// Group-level documentation of the API an endpoint belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiDoc {
    pub value: String,
    pub tags: Vec<String>,
}

impl ApiDoc {
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            value: String::new(),
            tags: vec![tag.into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// Logical handler signature
    pub handler: String,
    /// Declared HTTP methods; empty means not logged unless options say so
    pub methods: Vec<Method>,
    /// Operation summary from the endpoint documentation
    pub operation: Option<String>,
    pub options: Option<OperateLogOptions>,
    pub api: Option<ApiDoc>,
}

impl EndpointDescriptor {
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            methods: Vec::new(),
            operation: None,
            options: None,
            api: None,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    pub fn operation(mut self, summary: impl Into<String>) -> Self {
        self.operation = Some(summary.into());
        self
    }

    pub fn options(mut self, options: OperateLogOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn api(mut self, api: ApiDoc) -> Self {
        self.api = Some(api);
        self
    }

    /// Only documented or explicitly configured endpoints are intercepted
    pub fn is_intercepted(&self) -> bool {
        self.operation.is_some() || self.options.is_some()
    }

    fn logs_mutation(&self) -> bool {
        self.methods
            .iter()
            .any(|m| *m == Method::POST || *m == Method::PUT || *m == Method::DELETE)
    }

    /// Explicit options decide; otherwise only declared mutating methods are logged
    pub fn is_log_enable(&self) -> bool {
        match &self.options {
            Some(options) => options.enable,
            None => self.logs_mutation(),
        }
    }

    pub fn log_args(&self) -> bool {
        self.options.as_ref().map_or(true, |o| o.log_args)
    }

    pub fn log_result_data(&self) -> bool {
        self.options.as_ref().map_or(true, |o| o.log_result_data)
    }

    pub fn resolve_module(&self) -> String {
        if let Some(module) = self.options.as_ref().map(|o| &o.module).filter(|m| !m.is_empty()) {
            return module.clone();
        }
        let Some(api) = &self.api else {
            return String::new();
        };
        if !api.value.is_empty() {
            return api.value.clone();
        }
        api.tags.first().cloned().unwrap_or_default()
    }

    pub fn resolve_name(&self) -> String {
        if let Some(name) = self.options.as_ref().map(|o| &o.name).filter(|n| !n.is_empty()) {
            return name.clone();
        }
        self.operation.clone().unwrap_or_default()
    }

    /// `None` when neither options nor declared methods give a type
    pub fn resolve_type(&self) -> Option<OperateType> {
        if let Some(first) = self.options.as_ref().and_then(|o| o.types.first()) {
            return Some(*first);
        }

        let methods = &self.methods;
        let method = methods
            .iter()
            .find(|m| **m == Method::POST || **m == Method::PUT || **m == Method::DELETE)
            .or_else(|| methods.iter().find(|m| **m == Method::GET))
            .or_else(|| methods.first())?;

        Some(operate_type_of(method))
    }
}

fn operate_type_of(method: &Method) -> OperateType {
    if *method == Method::GET {
        OperateType::Get
    } else if *method == Method::POST {
        OperateType::Create
    } else if *method == Method::PUT {
        OperateType::Update
    } else if *method == Method::DELETE {
        OperateType::Delete
    } else {
        OperateType::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interception_requires_docs_or_options() {
        let plain = EndpointDescriptor::new("Api::plain").method(Method::POST);
        assert!(!plain.is_intercepted());
        assert!(plain.clone().operation("Create").is_intercepted());
        assert!(plain.options(OperateLogOptions::new()).is_intercepted());
    }

    #[test]
    fn test_log_enable_defaults_to_mutating_methods() {
        let get = EndpointDescriptor::new("Api::get").method(Method::GET).operation("Get");
        assert!(!get.is_log_enable());

        let put = EndpointDescriptor::new("Api::put").method(Method::GET).method(Method::PUT);
        assert!(put.is_log_enable());

        let forced = get.clone().options(OperateLogOptions::new());
        assert!(forced.is_log_enable());

        let disabled = EndpointDescriptor::new("Api::del")
            .method(Method::DELETE)
            .options(OperateLogOptions::new().disabled());
        assert!(!disabled.is_log_enable());
    }

    #[test]
    fn test_undeclared_methods_are_not_logged() {
        let desc = EndpointDescriptor::new("Api::any").operation("Any");
        assert!(!desc.is_log_enable());
        assert_eq!(desc.resolve_type(), None);

        let desc = desc.options(OperateLogOptions::new());
        assert!(desc.is_log_enable());
        assert_eq!(desc.resolve_type(), None);

        let desc = desc.options(OperateLogOptions::new().operate_type(OperateType::Import));
        assert_eq!(desc.resolve_type(), Some(OperateType::Import));
    }

    #[test]
    fn test_module_resolution_order() {
        let api = ApiDoc {
            value: String::new(),
            tags: vec!["Sessions".to_string(), "Other".to_string()],
        };
        let desc = EndpointDescriptor::new("Api::x").api(api.clone());
        assert_eq!(desc.resolve_module(), "Sessions");

        let desc = desc.api(ApiDoc {
            value: "Session admin".to_string(),
            ..api
        });
        assert_eq!(desc.resolve_module(), "Session admin");

        let desc = desc.options(OperateLogOptions::new().module("Explicit"));
        assert_eq!(desc.resolve_module(), "Explicit");

        assert_eq!(EndpointDescriptor::new("Api::y").resolve_module(), "");
    }

    #[test]
    fn test_name_resolution_order() {
        let desc = EndpointDescriptor::new("Api::x").operation("Delete session");
        assert_eq!(desc.resolve_name(), "Delete session");
        let desc = desc.options(OperateLogOptions::new().name("Kick out"));
        assert_eq!(desc.resolve_name(), "Kick out");
    }

    #[test]
    fn test_type_resolution() {
        let desc = EndpointDescriptor::new("Api::x")
            .method(Method::GET)
            .method(Method::PUT);
        assert_eq!(desc.resolve_type(), Some(OperateType::Update));

        let desc = EndpointDescriptor::new("Api::x")
            .method(Method::PATCH)
            .method(Method::GET);
        assert_eq!(desc.resolve_type(), Some(OperateType::Get));

        let desc = desc.options(OperateLogOptions::new().operate_type(OperateType::Export));
        assert_eq!(desc.resolve_type(), Some(OperateType::Export));

        let desc = EndpointDescriptor::new("Api::x").method(Method::POST);
        assert_eq!(desc.resolve_type(), Some(OperateType::Create));
    }
}
