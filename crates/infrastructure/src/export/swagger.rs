//! Swagger 2.0 format exporter.
//!
//! Same flattening as the `OpenAPI` exporter, expressed in 2.0 terms: host
//! and base path instead of servers, `body`/`formData` parameters instead
//! of request bodies, and a shared `Error` definition referenced by a
//! default `400` response on every operation.

use std::collections::BTreeMap;

use apidock_application::{Exporter, PipelineResult};
use apidock_domain::{
    Document, Endpoint, ExportFormat, ExportOptions, ExportResult, HttpMethod, OutputEncoding,
    ParameterType,
};
use serde::Serialize;
use serde_json::{Value, json};
use url::Url;

use super::common::{
    ExportContext, FOLDER_TAG, body_schema, endpoint_tags, example_value, generic_object_schema,
    infer_schema, is_json, operation_id, undeclared_path_parameters,
};
use crate::serialization::encode_document;

const ERROR_DEFINITION: &str = "Error";
const SECURITY_SCHEME: &str = "BearerAuth";

/// Swagger 2.0 exporter.
#[derive(Debug, Default, Clone, Copy)]
pub struct SwaggerExporter;

impl Exporter for SwaggerExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Swagger
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

        let uses_folder_tag = document
            .active_endpoints()
            .iter()
            .any(|e| endpoint_tags(e).iter().any(|t| t == FOLDER_TAG));

        let location = if options.include_servers {
            ctx.server_urls().first().and_then(|s| ServerLocation::parse(s))
        } else {
            None
        };

        let spec = SwaggerSpec {
            swagger: "2.0",
            info: Info {
                title: document.collection.name.clone(),
                description: document.collection.description.clone(),
                version: document.collection.version.clone(),
            },
            host: location.as_ref().map(|l| l.host.clone()),
            base_path: location.as_ref().and_then(|l| l.base_path.clone()),
            schemes: location.map(|l| vec![l.scheme]).unwrap_or_default(),
            tags: if uses_folder_tag {
                vec![TagObject {
                    name: FOLDER_TAG.to_string(),
                }]
            } else {
                Vec::new()
            },
            paths,
            definitions: BTreeMap::from([(
                ERROR_DEFINITION.to_string(),
                json!({
                    "type": "object",
                    "properties": {
                        "code": { "type": "integer" },
                        "message": { "type": "string" }
                    }
                }),
            )]),
            security_definitions: if options.include_security {
                BTreeMap::from([(
                    SECURITY_SCHEME.to_string(),
                    SecurityDefinition {
                        kind: "apiKey",
                        name: "Authorization",
                        location: "header",
                    },
                )])
            } else {
                BTreeMap::new()
            },
            security: if options.include_security {
                vec![BTreeMap::from([(SECURITY_SCHEME.to_string(), Vec::new())])]
            } else {
                Vec::new()
            },
        };

        let content = encode_document(&spec, ExportFormat::Swagger, OutputEncoding::Json)?;
        Ok(ExportResult::new(
            content,
            ExportFormat::Swagger,
            OutputEncoding::Json,
            &document.collection.name,
        ))
    }
}

/// `host`, `basePath` and scheme split out of a server URL.
struct ServerLocation {
    host: String,
    base_path: Option<String>,
    scheme: String,
}

impl ServerLocation {
    fn parse(server: &str) -> Option<Self> {
        let url = Url::parse(server).ok()?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return None,
        };
        let path = url.path().trim_end_matches('/');
        Some(Self {
            host,
            base_path: (!path.is_empty()).then(|| path.to_string()),
            scheme: url.scheme().to_string(),
        })
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
                kind: Some(param.data_type().to_string()),
                schema: None,
                example: include_examples
                    .then(|| param.display_value().map(|v| ctx.substitute(v)))
                    .flatten(),
            })
        })
        .collect();

    parameters.extend(
        undeclared_path_parameters(path, endpoint)
            .into_iter()
            .map(Parameter::path),
    );

    parameters.extend(
        endpoint
            .request_headers()
            .filter(|h| !h.key.eq_ignore_ascii_case("content-type"))
            .filter(|h| !h.key.eq_ignore_ascii_case("authorization"))
            .map(|h| Parameter {
                name: h.key.clone(),
                location: "header",
                description: h.description.clone(),
                required: h.is_required,
                kind: Some("string".to_string()),
                schema: None,
                example: include_examples.then(|| ctx.substitute(&h.value)),
            }),
    );

    let mut consumes = Vec::new();
    if let Some(body) = &endpoint.request_body {
        if body.content_type.to_ascii_lowercase().contains("form") {
            parameters.extend(endpoint.parameters_of(ParameterType::Form).map(|p| Parameter {
                name: p.key.clone(),
                location: "formData",
                description: p.description.clone(),
                required: p.is_required,
                kind: Some(p.data_type().to_string()),
                schema: None,
                example: None,
            }));
            consumes.push(body.content_type.clone());
        } else if !body.body.trim().is_empty() || body.schema_definition.is_some() {
            parameters.push(Parameter {
                name: "body".to_string(),
                location: "body",
                description: body.description.clone(),
                required: true,
                kind: None,
                schema: Some(body_schema(body, &ctx.resolver)),
                example: None,
            });
            consumes.push(body.content_type.clone());
        }
    }

    let mut produces: Vec<String> = Vec::new();
    for response in &endpoint.responses {
        if !response.body.trim().is_empty() && !produces.contains(&response.content_type) {
            produces.push(response.content_type.clone());
        }
    }

    Operation {
        tags: endpoint_tags(endpoint),
        summary: endpoint.name.clone(),
        description: endpoint.description.clone(),
        operation_id: operation_id(endpoint.method, &endpoint.name),
        consumes,
        produces,
        parameters,
        responses: create_responses(ctx, endpoint),
    }
}

fn create_responses(ctx: &ExportContext<'_>, endpoint: &Endpoint) -> BTreeMap<String, Response> {
    let mut responses = BTreeMap::new();

    for response in &endpoint.responses {
        let code = response.status_code.to_string();
        if responses.contains_key(&code) && !response.is_default {
            continue;
        }

        let body = ctx.substitute(&response.body);
        let (schema, examples) = if body.trim().is_empty() {
            (None, BTreeMap::new())
        } else {
            let schema = if is_json(&response.content_type) {
                serde_json::from_str::<Value>(&body)
                    .map_or_else(|_| generic_object_schema(), |v| infer_schema(&v))
            } else {
                json!({ "type": "string" })
            };
            let examples = if ctx.options.include_examples {
                example_value(&body)
                    .map(|example| BTreeMap::from([(response.content_type.clone(), example)]))
                    .unwrap_or_default()
            } else {
                BTreeMap::new()
            };
            (Some(schema), examples)
        };

        responses.insert(
            code,
            Response {
                description: response.description(),
                schema,
                examples,
            },
        );
    }

    if responses.is_empty() {
        responses.insert(
            "200".to_string(),
            Response {
                description: "Successful response".to_string(),
                schema: None,
                examples: BTreeMap::new(),
            },
        );
    }

    let error_ref = || json!({ "$ref": format!("#/definitions/{ERROR_DEFINITION}") });
    responses
        .entry("400".to_string())
        .or_insert_with(|| Response {
            description: "Bad request".to_string(),
            schema: None,
            examples: BTreeMap::new(),
        })
        .schema
        .get_or_insert_with(error_ref);

    responses
}

// Swagger 2.0 structs

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SwaggerSpec {
    swagger: &'static str,
    info: Info,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    schemes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<TagObject>,
    paths: BTreeMap<String, PathItem>,
    definitions: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    security_definitions: BTreeMap<String, SecurityDefinition>,
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
    consumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    produces: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parameters: Vec<Parameter>,
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
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<Value>,
    #[serde(rename = "x-example", skip_serializing_if = "Option::is_none")]
    example: Option<String>,
}

impl Parameter {
    fn path(name: String) -> Self {
        Self {
            name,
            location: "path",
            description: None,
            required: true,
            kind: Some("string".to_string()),
            schema: None,
            example: None,
        }
    }
}

#[derive(Serialize)]
struct Response {
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    examples: BTreeMap<String, Value>,
}

#[derive(Serialize)]
struct SecurityDefinition {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'static str,
    #[serde(rename = "in")]
    location: &'static str,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use apidock_domain::{Collection, Folder, Parameter as Param, RequestBody, Response as Resp};
    use pretty_assertions::assert_eq;

    fn document() -> Document {
        Document::new(
            Collection::new("c1", "Orders API").with_base_url("https://shop.example.com:8443/api/v2"),
        )
        .with_folder(Folder::new("f1", "c1", "Orders"))
        .with_endpoint(
            Endpoint::new(
                "e1",
                "c1",
                "Get order",
                HttpMethod::Get,
                "https://shop.example.com:8443/api/v2/orders/{{orderId}}",
            )
            .in_folder("f1")
            .with_response(Resp::json(200, "OK", r#"{"id": "o-1", "total": 12.5}"#)),
        )
        .with_endpoint(
            Endpoint::new("e2", "c1", "Create order", HttpMethod::Post, "/orders")
                .with_parameter(Param::query("dry_run", "false"))
                .with_body(RequestBody::json(r#"{"items": []}"#)),
        )
    }

    fn export(options: &ExportOptions) -> Value {
        let result = SwaggerExporter.export(&document(), options).unwrap();
        assert_eq!(result.filename, "orders_api.swagger.json");
        serde_json::from_str(&result.content).unwrap()
    }

    #[test]
    fn test_document_shape() {
        let spec = export(&ExportOptions::new(ExportFormat::Swagger));

        assert_eq!(spec["swagger"], "2.0");
        assert_eq!(spec["host"], "shop.example.com:8443");
        assert_eq!(spec["basePath"], "/api/v2");
        assert_eq!(spec["schemes"], json!(["https"]));
        assert_eq!(
            spec["definitions"]["Error"]["properties"]["message"],
            json!({"type": "string"})
        );
        assert_eq!(
            spec["securityDefinitions"]["BearerAuth"],
            json!({"type": "apiKey", "name": "Authorization", "in": "header"})
        );
        assert_eq!(
            spec["paths"].as_object().unwrap().keys().collect::<Vec<_>>(),
            vec!["/orders", "/orders/{orderId}"]
        );
    }

    #[test]
    fn test_every_operation_has_error_response() {
        let spec = export(&ExportOptions::new(ExportFormat::Swagger));

        for (path, method) in [("/orders/{orderId}", "get"), ("/orders", "post")] {
            assert_eq!(
                spec["paths"][path][method]["responses"]["400"]["schema"],
                json!({"$ref": "#/definitions/Error"})
            );
        }
    }

    #[test]
    fn test_declared_bad_request_without_body_gets_error_schema() {
        let document = document().with_endpoint(
            Endpoint::new("e3", "c1", "Cancel order", HttpMethod::Delete, "/orders/:orderId")
                .with_response(Resp::json(204, "Cancelled", ""))
                .with_response(Resp::json(400, "Not cancellable", "")),
        );
        let result = SwaggerExporter
            .export(&document, &ExportOptions::new(ExportFormat::Swagger))
            .unwrap();
        let spec: Value = serde_json::from_str(&result.content).unwrap();

        let bad_request = &spec["paths"]["/orders/{orderId}"]["delete"]["responses"]["400"];
        assert_eq!(bad_request["description"], "Not cancellable");
        assert_eq!(bad_request["schema"], json!({"$ref": "#/definitions/Error"}));
    }

    #[test]
    fn test_operation_details() {
        let spec = export(&ExportOptions::new(ExportFormat::Swagger));

        let get = &spec["paths"]["/orders/{orderId}"]["get"];
        assert_eq!(get["operationId"], "getGetorder");
        assert_eq!(get["tags"], json!(["API"]));
        assert_eq!(get["produces"], json!(["application/json"]));
        assert_eq!(
            get["parameters"][0],
            json!({"name": "orderId", "in": "path", "required": true, "type": "string"})
        );
        assert_eq!(
            get["responses"]["200"]["schema"]["properties"]["total"],
            json!({"type": "number"})
        );
        assert_eq!(get["responses"]["200"]["examples"]["application/json"]["id"], "o-1");

        let post = &spec["paths"]["/orders"]["post"];
        assert_eq!(post["consumes"], json!(["application/json"]));
        let params = post["parameters"].as_array().unwrap();
        assert_eq!(params[0]["in"], "query");
        assert_eq!(params[1]["in"], "body");
        assert_eq!(
            params[1]["schema"],
            json!({"type": "object", "properties": {"items": {"type": "array", "items": {}}}})
        );
        assert_eq!(post["responses"]["200"]["description"], "Successful response");
    }

    #[test]
    fn test_toggles() {
        let options = ExportOptions {
            include_servers: false,
            include_security: false,
            include_examples: false,
            ..ExportOptions::new(ExportFormat::Swagger)
        };
        let spec = export(&options);

        assert!(spec.get("host").is_none());
        assert!(spec.get("basePath").is_none());
        assert!(spec.get("securityDefinitions").is_none());
        assert!(spec.get("security").is_none());
        assert!(spec["definitions"].get("Error").is_some());
        assert!(
            spec["paths"]["/orders/{orderId}"]["get"]["responses"]["200"]
                .get("examples")
                .is_none()
        );
    }
}
