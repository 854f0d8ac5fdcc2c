//! Endpoint snapshot types.

use serde::{Deserialize, Serialize};

use crate::method::HttpMethod;

/// Whether a header belongs to the request or to documented responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HeaderType {
    /// Sent with the request.
    #[default]
    Request,
    /// Returned by the server.
    Response,
}

/// A documented header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name.
    pub key: String,

    /// Header value, may contain placeholders.
    #[serde(default)]
    pub value: String,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the header must be present.
    #[serde(default)]
    pub is_required: bool,

    /// Request or response header.
    #[serde(default)]
    pub header_type: HeaderType,
}

impl Header {
    /// Creates an optional request header.
    #[must_use]
    pub fn request(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            description: None,
            is_required: false,
            header_type: HeaderType::Request,
        }
    }

    /// Creates a response header.
    #[must_use]
    pub fn response(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            header_type: HeaderType::Response,
            ..Self::request(key, value)
        }
    }

    /// Marks the header as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.is_required = true;
        self
    }
}

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    /// URL query string.
    #[default]
    Query,
    /// Templated path segment.
    Path,
    /// Request body field.
    Body,
    /// Request header.
    Header,
    /// Form field.
    Form,
}

impl ParameterType {
    /// The `in` value used by `OpenAPI` and Swagger, when the location has one.
    #[must_use]
    pub const fn openapi_location(self) -> Option<&'static str> {
        match self {
            Self::Query => Some("query"),
            Self::Path => Some("path"),
            Self::Header => Some("header"),
            Self::Body | Self::Form => None,
        }
    }
}

/// A documented parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub key: String,

    /// Current value, may contain placeholders.
    #[serde(default)]
    pub value: String,

    /// Default value if the caller omits the parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,

    /// Example value shown in documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared data type, `string` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,

    /// Whether the parameter must be supplied.
    #[serde(default)]
    pub is_required: bool,

    /// Where the parameter is carried.
    #[serde(default, rename = "type")]
    pub param_type: ParameterType,
}

impl Parameter {
    /// Creates an optional parameter.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>, param_type: ParameterType) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            default_value: None,
            example: None,
            description: None,
            data_type: None,
            is_required: false,
            param_type,
        }
    }

    /// Creates an optional query parameter.
    #[must_use]
    pub fn query(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, value, ParameterType::Query)
    }

    /// Creates a required path parameter.
    #[must_use]
    pub fn path(key: impl Into<String>) -> Self {
        Self::new(key, "", ParameterType::Path).required()
    }

    /// Marks the parameter as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    /// Sets the example value.
    #[must_use]
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    /// The value to document: example, then default, then current value.
    #[must_use]
    pub fn display_value(&self) -> Option<&str> {
        self.example
            .as_deref()
            .or(self.default_value.as_deref())
            .or_else(|| (!self.value.is_empty()).then_some(self.value.as_str()))
    }

    /// Declared data type, defaulting to `string`.
    #[must_use]
    pub fn data_type(&self) -> &str {
        self.data_type.as_deref().unwrap_or("string")
    }
}

/// The request body template of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBody {
    /// MIME type of the body.
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Raw body template, may contain placeholders.
    #[serde(default)]
    pub body: String,

    /// Optional JSON schema, stored as raw JSON text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_definition: Option<String>,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_content_type() -> String {
    "application/json".to_string()
}

impl RequestBody {
    /// Creates a JSON body.
    #[must_use]
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            content_type: default_content_type(),
            body: body.into(),
            schema_definition: None,
            description: None,
        }
    }

    /// Attaches a raw JSON schema.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema_definition = Some(schema.into());
        self
    }
}

/// A documented response example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code.
    pub status_code: u16,

    /// Reason phrase, e.g. `OK`.
    #[serde(default)]
    pub status_text: String,

    /// MIME type of the body.
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Raw body template.
    #[serde(default)]
    pub body: String,

    /// Whether this is the primary documented response.
    #[serde(default)]
    pub is_default: bool,
}

impl Response {
    /// Creates a JSON response.
    #[must_use]
    pub fn json(status_code: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status_code,
            status_text: status_text.into(),
            content_type: default_content_type(),
            body: body.into(),
            is_default: false,
        }
    }

    /// Marks the response as the default one.
    #[must_use]
    pub const fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Human readable description, falling back to a generic phrase.
    #[must_use]
    pub fn description(&self) -> String {
        if self.status_text.is_empty() {
            format!("Response {}", self.status_code)
        } else {
            self.status_text.clone()
        }
    }
}

/// A label attached to an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name.
    pub name: String,

    /// Optional display color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// When a script attached to an endpoint runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    /// After the response is received.
    #[default]
    Test,
    /// Before the request is sent.
    PreRequest,
}

/// A script attached to an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Test {
    /// Script name.
    pub name: String,

    /// Script source.
    pub script: String,

    /// When the script runs.
    #[serde(default)]
    pub kind: ScriptKind,

    /// Disabled scripts are never exported.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl Test {
    /// Creates an enabled test script.
    #[must_use]
    pub fn test(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            kind: ScriptKind::Test,
            enabled: true,
        }
    }

    /// Creates an enabled pre-request script.
    #[must_use]
    pub fn pre_request(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            kind: ScriptKind::PreRequest,
            ..Self::test(name, script)
        }
    }
}

/// A documented API endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Unique identifier.
    pub id: String,

    /// Owning collection.
    pub collection_id: String,

    /// Containing folder, `None` for root-level endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,

    /// Endpoint name.
    pub name: String,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// HTTP method.
    #[serde(default)]
    pub method: HttpMethod,

    /// URL template, may contain `{{var}}` or `${var}` placeholders.
    pub url: String,

    /// Position among siblings.
    #[serde(default)]
    pub sort_order: i32,

    /// Inactive endpoints are left out of every export.
    #[serde(default = "default_enabled")]
    pub is_active: bool,

    /// Request body template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,

    /// Request and response headers.
    #[serde(default)]
    pub headers: Vec<Header>,

    /// Query, path and other parameters.
    #[serde(default)]
    pub parameters: Vec<Parameter>,

    /// Documented responses.
    #[serde(default)]
    pub responses: Vec<Response>,

    /// Labels.
    #[serde(default)]
    pub tags: Vec<Tag>,

    /// Attached scripts.
    #[serde(default)]
    pub tests: Vec<Test>,
}

impl Endpoint {
    /// Creates an active root-level endpoint.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        collection_id: impl Into<String>,
        name: impl Into<String>,
        method: HttpMethod,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            collection_id: collection_id.into(),
            folder_id: None,
            name: name.into(),
            description: None,
            method,
            url: url.into(),
            sort_order: 0,
            is_active: true,
            request_body: None,
            headers: Vec::new(),
            parameters: Vec::new(),
            responses: Vec::new(),
            tags: Vec::new(),
            tests: Vec::new(),
        }
    }

    /// Places the endpoint in a folder.
    #[must_use]
    pub fn in_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the sibling position.
    #[must_use]
    pub const fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.request_body = Some(body);
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Adds a response.
    #[must_use]
    pub fn with_response(mut self, response: Response) -> Self {
        self.responses.push(response);
        self
    }

    /// Adds a script.
    #[must_use]
    pub fn with_test(mut self, test: Test) -> Self {
        self.tests.push(test);
        self
    }

    /// Marks the endpoint inactive.
    #[must_use]
    pub const fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Headers sent with the request.
    pub fn request_headers(&self) -> impl Iterator<Item = &Header> {
        self.headers
            .iter()
            .filter(|h| h.header_type == HeaderType::Request)
    }

    /// Headers documented on responses.
    pub fn response_headers(&self) -> impl Iterator<Item = &Header> {
        self.headers
            .iter()
            .filter(|h| h.header_type == HeaderType::Response)
    }

    /// Parameters of the given type.
    pub fn parameters_of(&self, param_type: ParameterType) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(move |p| p.param_type == param_type)
    }

    /// Enabled scripts of the given kind.
    pub fn scripts_of(&self, kind: ScriptKind) -> impl Iterator<Item = &Test> {
        self.tests
            .iter()
            .filter(move |t| t.enabled && t.kind == kind)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_split() {
        let endpoint = Endpoint::new("e1", "c1", "Get", HttpMethod::Get, "/x")
            .with_header(Header::request("Accept", "application/json"))
            .with_header(Header::response("X-Rate-Limit", "100"));

        assert_eq!(endpoint.request_headers().count(), 1);
        assert_eq!(endpoint.response_headers().next().unwrap().key, "X-Rate-Limit");
    }

    #[test]
    fn test_parameter_display_value_precedence() {
        let mut param = Parameter::query("page", "3");
        assert_eq!(param.display_value(), Some("3"));

        param.default_value = Some("1".to_string());
        assert_eq!(param.display_value(), Some("1"));

        let param = param.with_example("42");
        assert_eq!(param.display_value(), Some("42"));

        assert_eq!(Parameter::path("id").display_value(), None);
    }

    #[test]
    fn test_disabled_scripts_are_skipped() {
        let mut disabled = Test::test("off", "noop");
        disabled.enabled = false;
        let endpoint = Endpoint::new("e1", "c1", "Get", HttpMethod::Get, "/x")
            .with_test(disabled)
            .with_test(Test::test("status", "pm.response.to.have.status(200)"))
            .with_test(Test::pre_request("token", "pm.environment.set('t', 1)"));

        assert_eq!(endpoint.scripts_of(ScriptKind::Test).count(), 1);
        assert_eq!(endpoint.scripts_of(ScriptKind::PreRequest).count(), 1);
    }

    #[test]
    fn test_endpoint_deserialize_defaults() {
        let json = r#"{"id": "e1", "collection_id": "c1", "name": "List", "url": "/users"}"#;
        let endpoint: Endpoint = serde_json::from_str(json).unwrap();

        assert!(endpoint.is_active);
        assert_eq!(endpoint.method, HttpMethod::Get);
        assert!(endpoint.folder_id.is_none());
    }

    #[test]
    fn test_parameter_type_serde_name() {
        let json = r#"{"key": "id", "type": "path", "is_required": true}"#;
        let param: Parameter = serde_json::from_str(json).unwrap();
        assert_eq!(param.param_type, ParameterType::Path);
        assert_eq!(param.param_type.openapi_location(), Some("path"));
        assert_eq!(ParameterType::Body.openapi_location(), None);
    }
}
