//! Transform helpers shared by the exporters.

use std::sync::LazyLock;

use apidock_application::VariableResolver;
use apidock_domain::{Document, Endpoint, Environment, ExportOptions, HttpMethod, ParameterType, RequestBody};
use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::debug;
use url::Url;

/// Tag given to every endpoint that lives in a folder.
pub const FOLDER_TAG: &str = "API";

#[allow(clippy::expect_used)]
static COLON_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/:([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex"));

#[allow(clippy::expect_used)]
static TEMPLATE_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}|\$\{\s*([A-Za-z0-9_.\-]+)\s*\}").expect("valid regex")
});

#[allow(clippy::expect_used)]
static PATH_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}/]+)\}").expect("valid regex"));

/// Per-call state every exporter starts from.
pub struct ExportContext<'a> {
    pub document: &'a Document,
    pub options: &'a ExportOptions,
    pub environment: Option<&'a Environment>,
    pub resolver: VariableResolver,
}

impl<'a> ExportContext<'a> {
    pub fn new(document: &'a Document, options: &'a ExportOptions) -> Self {
        let environment = document.selected_environment(options.environment_id.as_deref());
        Self {
            document,
            options,
            environment,
            resolver: VariableResolver::from_environment(environment),
        }
    }

    pub fn substitute(&self, text: &str) -> String {
        self.resolver.substitute(text)
    }

    /// Resolved collection base URL, falling back to a `base_url`
    /// environment variable.
    pub fn base_url(&self) -> Option<String> {
        let raw = self
            .document
            .collection
            .base_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| {
                self.environment
                    .and_then(|env| env.variable("base_url"))
                    .map(|v| v.value.clone())
            })?;
        let resolved = self.substitute(&raw);
        let resolved = resolved.trim_end_matches('/');
        (!resolved.is_empty()).then(|| resolved.to_string())
    }

    /// Normalised path of an endpoint, relative to the base URL when the
    /// resolved URL starts with it.
    pub fn path_of(&self, endpoint: &Endpoint) -> String {
        let url = self.substitute(&endpoint.url);
        let relative = self
            .base_url()
            .and_then(|base| url.strip_prefix(base.as_str()).map(str::to_string))
            .filter(|rest| rest.is_empty() || rest.starts_with(['/', '?', '#']));
        normalize_path(relative.as_deref().unwrap_or(&url))
    }

    /// Server URLs: the base URL when known, otherwise the distinct origins
    /// of fully resolved endpoint URLs in export order.
    pub fn server_urls(&self) -> Vec<String> {
        if let Some(base) = self.base_url() {
            return vec![base];
        }

        let mut servers: Vec<String> = Vec::new();
        for endpoint in self.document.active_endpoints() {
            let Ok(url) = Url::parse(&self.substitute(&endpoint.url)) else {
                continue;
            };
            let origin = url.origin();
            if !origin.is_tuple() {
                continue;
            }
            let origin = origin.ascii_serialization();
            if !servers.contains(&origin) {
                servers.push(origin);
            }
        }
        servers
    }
}

/// Strips scheme and host, or a leading placeholder standing in for them,
/// drops query and fragment, and rewrites `:param` and placeholder
/// segments to `{param}`.
pub fn normalize_path(url: &str) -> String {
    let url = url.split(['?', '#']).next().unwrap_or_default().trim();

    let path = if let Some((_, rest)) = url.split_once("://") {
        rest.find('/').map_or("", |i| &rest[i..])
    } else {
        strip_leading_placeholder(url).unwrap_or(url)
    };

    let mut path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    path = COLON_PARAM.replace_all(&path, "/{${1}}").into_owned();
    path = TEMPLATE_PARAM
        .replace_all(&path, |caps: &regex::Captures<'_>| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            format!("{{{name}}}")
        })
        .into_owned();

    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    path
}

fn strip_leading_placeholder(url: &str) -> Option<&str> {
    if let Some(rest) = url.strip_prefix("{{") {
        return rest.find("}}").map(|end| &rest[end + 2..]);
    }
    url.strip_prefix("${")
        .and_then(|rest| rest.find('}').map(|end| &rest[end + 1..]))
}

/// Names of `{param}` segments in a normalised path.
pub fn path_parameter_names(path: &str) -> Vec<String> {
    PATH_PARAM
        .captures_iter(path)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Path parameters present in `path` but not declared on the endpoint.
pub fn undeclared_path_parameters(path: &str, endpoint: &Endpoint) -> Vec<String> {
    path_parameter_names(path)
        .into_iter()
        .filter(|name| {
            !endpoint
                .parameters_of(ParameterType::Path)
                .any(|p| &p.key == name)
        })
        .collect()
}

/// `lowercase(method) + name` with spaces and hyphens removed.
pub fn operation_id(method: HttpMethod, name: &str) -> String {
    format!("{}{}", method.as_lower_str(), name.replace([' ', '-'], ""))
}

/// Tags of an endpoint in the flattened formats.
pub fn endpoint_tags(endpoint: &Endpoint) -> Vec<String> {
    if endpoint.folder_id.is_some() {
        vec![FOLDER_TAG.to_string()]
    } else {
        Vec::new()
    }
}

pub fn generic_object_schema() -> Value {
    json!({ "type": "object" })
}

/// Parses an embedded schema, degrading to a generic object schema.
pub fn parse_schema(definition: &str) -> Value {
    match serde_json::from_str::<Value>(definition) {
        Ok(schema @ Value::Object(_)) => schema,
        Ok(_) | Err(_) => {
            debug!("schema definition is not a JSON object, using generic schema");
            generic_object_schema()
        }
    }
}

/// Derives a JSON schema from an example value.
pub fn infer_schema(value: &Value) -> Value {
    match value {
        Value::Null => json!({}),
        Value::Bool(_) => json!({ "type": "boolean" }),
        Value::Number(n) if n.is_i64() || n.is_u64() => json!({ "type": "integer" }),
        Value::Number(_) => json!({ "type": "number" }),
        Value::String(_) => json!({ "type": "string" }),
        Value::Array(items) => json!({
            "type": "array",
            "items": items.first().map_or_else(|| json!({}), infer_schema),
        }),
        Value::Object(fields) => {
            let properties: Map<String, Value> = fields
                .iter()
                .map(|(key, value)| (key.clone(), infer_schema(value)))
                .collect();
            json!({ "type": "object", "properties": properties })
        }
    }
}

/// Schema of a request body: the declared definition, else one inferred
/// from a JSON body, else a generic object.
pub fn body_schema(body: &RequestBody, resolver: &VariableResolver) -> Value {
    if let Some(definition) = body.schema_definition.as_deref().filter(|d| !d.trim().is_empty()) {
        return parse_schema(definition);
    }
    serde_json::from_str::<Value>(&resolver.substitute(&body.body))
        .map_or_else(|_| generic_object_schema(), |example| infer_schema(&example))
}

/// Parses a body as JSON, falling back to the raw text.
pub fn example_value(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

pub fn is_json(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("json")
}
