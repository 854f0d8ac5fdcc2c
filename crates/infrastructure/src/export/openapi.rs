//! `OpenAPI` 3.0 format exporter.
//!
//! Flattens the folder tree into a `paths` map keyed by normalised path and
//! method. Folders only decide whether an operation carries the shared
//! `API` tag.

use std::collections::BTreeMap;

use apidock_application::{Exporter, PipelineResult};
use apidock_domain::{
    Document, Endpoint, ExportFormat, ExportOptions, ExportResult, HttpMethod, ParameterType,
};
use serde::Serialize;
use serde_json::{Value, json};

use super::common::{
    ExportContext, FOLDER_TAG, body_schema, endpoint_tags, example_value, generic_object_schema,
    infer_schema, is_json, operation_id, undeclared_path_parameters,
};
use crate::serialization::encode_document;

/// Version written when the options do not name one.
pub const DEFAULT_OPENAPI_VERSION: &str = "3.0.3";

const SECURITY_SCHEME: &str = "BearerAuth";

/// `OpenAPI` 3.0 exporter.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenApiExporter;

impl Exporter for OpenApiExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::OpenApi
    }

    fn export(&self, document: &Document, options: &ExportOptions) -> PipelineResult<ExportResult> {
        self.validate_options(Some(options))?;
        let ctx = ExportContext::new(document, options);

        let mut paths: BTreeMap<String, PathItem> = BTreeMap::new();
        for endpoint in document.active_endpoints() {
            let path = ctx.path_of(endpoint);
            let operation = create_operation(&ctx, endpoint, &path);
            paths.entry(path).or_default().set(endpoint.method, operation);
        }

        let uses_folder_tag = paths
            .values()
            .flat_map(PathItem::operations)
            .any(|op| op.tags.iter().any(|t| t == FOLDER_TAG));

        let spec = OpenApiSpec {
            openapi: options
                .spec_version
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAPI_VERSION.to_string()),
            info: Info {
                title: document.collection.name.clone(),
                description: document.collection.description.clone(),
                version: document.collection.version.clone(),
            },
            servers: if options.include_servers {
                ctx.server_urls().into_iter().map(|url| Server { url }).collect()
            } else {
                Vec::new()
            },
            tags: if uses_folder_tag {
                vec![TagObject {
                    name: FOLDER_TAG.to_string(),
                }]
            } else {
                Vec::new()
            },
            paths,
            components: options.include_security.then(|| Components {
                security_schemes: BTreeMap::from([(
                    SECURITY_SCHEME.to_string(),
                    SecurityScheme {
                        kind: "http",
                        scheme: "bearer",
                        bearer_format: "JWT",
                    },
                )]),
            }),
            security: if options.include_security {
                vec![BTreeMap::from([(SECURITY_SCHEME.to_string(), Vec::new())])]
            } else {
                Vec::new()
            },
        };

        let encoding = options.effective_encoding();
        let content = encode_document(&spec, ExportFormat::OpenApi, encoding)?;
        Ok(ExportResult::new(
            content,
            ExportFormat::OpenApi,
            encoding,
            &document.collection.name,
        ))
    }
}

fn create_operation(ctx: &ExportContext<'_>, endpoint: &Endpoint, path: &str) -> Operation {
    let include_examples = ctx.options.include_examples;

    let mut parameters: Vec<Parameter> = endpoint
        .parameters
        .iter()
        .filter_map(|param| {
            let location = param.param_type.openapi_location()?;
            Some(Parameter {
                name: param.key.clone(),
                location,
                description: param.description.clone(),
                required: param.is_required || param.param_type == ParameterType::Path,
                schema: json!({ "type": param.data_type() }),
                example: include_examples
                    .then(|| param.display_value().map(|v| Value::String(ctx.substitute(v))))
                    .flatten(),
            })
        })
        .collect();

    parameters.extend(
        undeclared_path_parameters(path, endpoint)
            .into_iter()
            .map(|name| Parameter {
                name,
                location: "path",
                description: None,
                required: true,
                schema: json!({ "type": "string" }),
                example: None,
            }),
    );

    parameters.extend(
        endpoint
            .request_headers()
            .filter(|h| !is_reserved_header(&h.key))
            .map(|h| Parameter {
                name: h.key.clone(),
                location: "header",
                description: h.description.clone(),
                required: h.is_required,
                schema: json!({ "type": "string" }),
                example: include_examples.then(|| Value::String(ctx.substitute(&h.value))),
            }),
    );

    Operation {
        tags: endpoint_tags(endpoint),
        summary: endpoint.name.clone(),
        description: endpoint.description.clone(),
        operation_id: operation_id(endpoint.method, &endpoint.name),
        parameters,
        request_body: create_request_body(ctx, endpoint),
        responses: create_responses(ctx, endpoint),
    }
}

/// Headers `OpenAPI` describes elsewhere and forbids as header parameters.
fn is_reserved_header(name: &str) -> bool {
    ["accept", "content-type", "authorization"]
        .iter()
        .any(|reserved| name.eq_ignore_ascii_case(reserved))
}

fn create_request_body(ctx: &ExportContext<'_>, endpoint: &Endpoint) -> Option<RequestBody> {
    let body = endpoint.request_body.as_ref()?;
    let content_type = body.content_type.to_ascii_lowercase();

    let media = if content_type.contains("form") {
        let properties: serde_json::Map<String, Value> = endpoint
            .parameters_of(ParameterType::Form)
            .map(|p| (p.key.clone(), json!({ "type": p.data_type() })))
            .collect();
        MediaType {
            schema: json!({ "type": "object", "properties": properties }),
            example: None,
        }
    } else {
        if body.body.trim().is_empty() && body.schema_definition.is_none() {
            return None;
        }
        MediaType {
            schema: body_schema(body, &ctx.resolver),
            example: ctx
                .options
                .include_examples
                .then(|| example_value(&ctx.substitute(&body.body)))
                .flatten(),
        }
    };

    Some(RequestBody {
        description: body.description.clone(),
        required: true,
        content: BTreeMap::from([(body.content_type.clone(), media)]),
    })
}

fn create_responses(ctx: &ExportContext<'_>, endpoint: &Endpoint) -> BTreeMap<String, Response> {
    let headers: BTreeMap<String, HeaderObject> = endpoint
        .response_headers()
        .map(|h| {
            (
                h.key.clone(),
                HeaderObject {
                    description: h.description.clone(),
                    schema: json!({ "type": "string" }),
                },
            )
        })
        .collect();

    let mut responses = BTreeMap::new();
    for response in &endpoint.responses {
        let code = response.status_code.to_string();
        if responses.contains_key(&code) && !response.is_default {
            continue;
        }

        let body = ctx.substitute(&response.body);
        let content = if body.trim().is_empty() {
            BTreeMap::new()
        } else {
            let schema = if is_json(&response.content_type) {
                serde_json::from_str::<Value>(&body)
                    .map_or_else(|_| generic_object_schema(), |v| infer_schema(&v))
            } else {
                json!({ "type": "string" })
            };
            BTreeMap::from([(
                response.content_type.clone(),
                MediaType {
                    schema,
                    example: ctx
                        .options
                        .include_examples
                        .then(|| example_value(&body))
                        .flatten(),
                },
            )])
        };

        responses.insert(
            code,
            Response {
                description: response.description(),
                headers: headers.clone(),
                content,
            },
        );
    }

    if responses.is_empty() {
        responses.insert(
            "200".to_string(),
            Response {
                description: "Successful response".to_string(),
                headers,
                content: BTreeMap::new(),
            },
        );
    }
    responses
}

// OpenAPI structs

#[derive(Serialize)]
struct OpenApiSpec {
    openapi: String,
    info: Info,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    servers: Vec<Server>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<TagObject>,
    paths: BTreeMap<String, PathItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    components: Option<Components>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    security: Vec<BTreeMap<String, Vec<String>>>,
}

#[derive(Serialize)]
struct Info {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    version: String,
}

#[derive(Serialize)]
struct Server {
    url: String,
}

#[derive(Serialize)]
struct TagObject {
    name: String,
}

#[derive(Serialize, Default)]
struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<Operation>,
}

impl PathItem {
    fn set(&mut self, method: HttpMethod, operation: Operation) {
        let slot = match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Head => &mut self.head,
            HttpMethod::Options => &mut self.options,
        };
        *slot = Some(operation);
    }

    fn operations(&self) -> impl Iterator<Item = &Operation> {
        [
            &self.get,
            &self.post,
            &self.put,
            &self.delete,
            &self.patch,
            &self.head,
            &self.options,
        ]
        .into_iter()
        .flatten()
    }
}

#[allow(clippy::struct_field_names)]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    operation_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_body: Option<RequestBody>,
    responses: BTreeMap<String, Response>,
}

#[derive(Serialize)]
struct Parameter {
    name: String,
    #[serde(rename = "in")]
    location: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    required: bool,
    schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    example: Option<Value>,
}

#[derive(Serialize)]
struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    required: bool,
    content: BTreeMap<String, MediaType>,
}

#[derive(Serialize)]
struct MediaType {
    schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    example: Option<Value>,
}

#[derive(Serialize)]
struct Response {
    description: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, HeaderObject>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    content: BTreeMap<String, MediaType>,
}

#[derive(Serialize, Clone)]
struct HeaderObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    schema: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Components {
    security_schemes: BTreeMap<String, SecurityScheme>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SecurityScheme {
    #[serde(rename = "type")]
    kind: &'static str,
    scheme: &'static str,
    bearer_format: &'static str,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use apidock_domain::{
        Collection, Environment, EnvironmentVariable, Folder, Header, OutputEncoding, Parameter as Param,
        RequestBody as Body, Response as Resp,
    };
    use pretty_assertions::assert_eq;

    fn document() -> Document {
        Document::new(Collection::new("c1", "Pet Store").with_version("2.1.0"))
            .with_folder(Folder::new("f1", "c1", "Pets"))
            .with_environment(
                Environment::new("env1", "c1", "Prod")
                    .as_default()
                    .with_variable(EnvironmentVariable::new("base_url", "https://api.example.com")),
            )
            .with_endpoint(
                Endpoint::new("e1", "c1", "List pets", HttpMethod::Get, "{{base_url}}/pets")
                    .in_folder("f1")
                    .with_parameter(Param::query("limit", "20"))
                    .with_header(Header::request("X-Trace", "abc"))
                    .with_header(Header::request("Accept", "application/json"))
                    .with_response(Resp::json(200, "OK", r#"[{"id": 1, "name": "Rex"}]"#)),
            )
            .with_endpoint(
                Endpoint::new("e2", "c1", "Create pet", HttpMethod::Post, "{{base_url}}/pets")
                    .with_body(Body::json(r#"{"name": "Rex"}"#)),
            )
            .with_endpoint(Endpoint::new(
                "e3",
                "c1",
                "Get pet",
                HttpMethod::Get,
                "{{base_url}}/pets/:petId",
            ))
    }

    fn export_json(options: &ExportOptions) -> Value {
        let result = OpenApiExporter.export(&document(), options).unwrap();
        serde_json::from_str(&result.content).unwrap()
    }

    #[test]
    fn test_document_shape() {
        let spec = export_json(&ExportOptions::new(ExportFormat::OpenApi));

        assert_eq!(spec["openapi"], "3.0.3");
        assert_eq!(spec["info"]["title"], "Pet Store");
        assert_eq!(spec["info"]["version"], "2.1.0");
        assert_eq!(spec["servers"], json!([{"url": "https://api.example.com"}]));
        assert_eq!(spec["tags"], json!([{"name": "API"}]));
        assert_eq!(
            spec["components"]["securitySchemes"]["BearerAuth"],
            json!({"type": "http", "scheme": "bearer", "bearerFormat": "JWT"})
        );
        assert_eq!(spec["security"], json!([{"BearerAuth": []}]));

        let paths = spec["paths"].as_object().unwrap();
        assert_eq!(paths.keys().collect::<Vec<_>>(), vec!["/pets", "/pets/{petId}"]);
    }

    #[test]
    fn test_operations() {
        let spec = export_json(&ExportOptions::new(ExportFormat::OpenApi));

        let list = &spec["paths"]["/pets"]["get"];
        assert_eq!(list["operationId"], "getListpets");
        assert_eq!(list["tags"], json!(["API"]));
        let params = list["parameters"].as_array().unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0]["in"], "query");
        assert_eq!(params[0]["example"], "20");
        assert_eq!(params[1]["name"], "X-Trace");
        assert_eq!(
            list["responses"]["200"]["content"]["application/json"]["schema"]["items"]["properties"]["id"],
            json!({"type": "integer"})
        );

        let create = &spec["paths"]["/pets"]["post"];
        assert!(create.get("tags").is_none());
        assert_eq!(
            create["requestBody"]["content"]["application/json"]["schema"],
            json!({"type": "object", "properties": {"name": {"type": "string"}}})
        );
        assert_eq!(create["responses"]["200"]["description"], "Successful response");

        let get = &spec["paths"]["/pets/{petId}"]["get"];
        assert_eq!(
            get["parameters"][0],
            json!({"name": "petId", "in": "path", "required": true, "schema": {"type": "string"}})
        );
    }

    #[test]
    fn test_toggles() {
        let options = ExportOptions {
            include_servers: false,
            include_security: false,
            include_examples: false,
            ..ExportOptions::new(ExportFormat::OpenApi)
        }
        .with_spec_version("3.1.0");
        let spec = export_json(&options);

        assert_eq!(spec["openapi"], "3.1.0");
        assert!(spec.get("servers").is_none());
        assert!(spec.get("components").is_none());
        assert!(spec.get("security").is_none());
        assert!(spec["paths"]["/pets"]["get"]["parameters"][0].get("example").is_none());
    }

    #[test]
    fn test_yaml_output() {
        let options = ExportOptions::new(ExportFormat::OpenApi).with_encoding(OutputEncoding::Yaml);
        let result = OpenApiExporter.export(&document(), &options).unwrap();

        assert_eq!(result.filename, "pet_store.openapi.yaml");
        assert_eq!(result.content_type, "application/x-yaml");
        let spec: serde_yaml::Value = serde_yaml::from_str(&result.content).unwrap();
        assert_eq!(spec["openapi"].as_str(), Some("3.0.3"));
    }

    #[test]
    fn test_duplicate_route_last_wins() {
        let document = Document::new(Collection::new("c1", "Dupes"))
            .with_endpoint(Endpoint::new("a", "c1", "First", HttpMethod::Get, "/x").with_sort_order(1))
            .with_endpoint(Endpoint::new("b", "c1", "Second", HttpMethod::Get, "/x").with_sort_order(2));

        let result = OpenApiExporter
            .export(&document, &ExportOptions::new(ExportFormat::OpenApi))
            .unwrap();
        let spec: Value = serde_json::from_str(&result.content).unwrap();

        assert_eq!(spec["paths"]["/x"]["get"]["summary"], "Second");
    }

    #[test]
    fn test_malformed_schema_degrades() {
        let document = Document::new(Collection::new("c1", "Broken")).with_endpoint(
            Endpoint::new("a", "c1", "Post", HttpMethod::Post, "/x")
                .with_body(Body::json("{}").with_schema("{oops")),
        );

        let result = OpenApiExporter
            .export(&document, &ExportOptions::new(ExportFormat::OpenApi))
            .unwrap();
        let spec: Value = serde_json::from_str(&result.content).unwrap();

        assert_eq!(
            spec["paths"]["/x"]["post"]["requestBody"]["content"]["application/json"]["schema"],
            json!({"type": "object"})
        );
    }
}
