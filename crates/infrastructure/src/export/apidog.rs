//! Apidog v2 exporter.

use std::collections::HashSet;

use apidock_application::{Exporter, PipelineResult};
use apidock_domain::{
    Document, Endpoint, Environment, ExportFormat, ExportOptions, ExportResult, OutputEncoding,
    Parameter as DomainParameter, ParameterType,
};
use serde::Serialize;
use serde_json::{Value, json};

use super::common::{
    ExportContext, body_schema, endpoint_tags, example_value, generic_object_schema, infer_schema,
    is_json, undeclared_path_parameters,
};
use crate::serialization::encode_document;

/// Apidog import format version.
pub const APIDOG_VERSION: &str = "2.0.0";

/// Apidog v2 exporter.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApidogExporter;

impl Exporter for ApidogExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Apidog
    }

    fn export(&self, document: &Document, options: &ExportOptions) -> PipelineResult<ExportResult> {
        self.validate_options(Some(options))?;
        let ctx = ExportContext::new(document, options);
        let tree = document.tree();

        let folders: Vec<FolderEntry> = tree
            .walk_folders()
            .into_iter()
            .map(|(folder, parent)| FolderEntry {
                id: folder.id.clone(),
                name: folder.name.clone(),
                description: folder.description.clone(),
                parent_id: parent.map(|p| p.id.clone()),
                sort_order: folder.sort_order,
            })
            .collect();
        let known_folders: HashSet<&str> = folders.iter().map(|f| f.id.as_str()).collect();

        let apis = document
            .active_endpoints()
            .into_iter()
            .map(|endpoint| {
                let folder_id = endpoint
                    .folder_id
                    .clone()
                    .filter(|id| known_folders.contains(id.as_str()));
                create_api(&ctx, endpoint, folder_id)
            })
            .collect();

        let servers = if options.include_servers {
            ctx.environment
                .and_then(|env| {
                    let url = env.variable("base_url")?;
                    Some(Server {
                        name: env.name.clone(),
                        url: ctx.substitute(&url.value),
                    })
                })
                .into_iter()
                .collect()
        } else {
            Vec::new()
        };

        let export = ApidogExport {
            apidog_version: APIDOG_VERSION,
            info: Info {
                name: document.collection.name.clone(),
                description: document.collection.description.clone().unwrap_or_default(),
                version: document.collection.version.clone(),
            },
            servers,
            folders,
            apis,
            environments: document.environments.iter().map(environment_entry).collect(),
        };

        let content = encode_document(&export, ExportFormat::Apidog, OutputEncoding::Json)?;
        Ok(ExportResult::new(
            content,
            ExportFormat::Apidog,
            OutputEncoding::Json,
            &document.collection.name,
        ))
    }
}

fn create_api(ctx: &ExportContext<'_>, endpoint: &Endpoint, folder_id: Option<String>) -> Api {
    let path = ctx.path_of(endpoint);
    let param = |p: &DomainParameter| ParameterEntry {
        name: p.key.clone(),
        kind: p.data_type().to_string(),
        required: p.is_required || p.param_type == ParameterType::Path,
        description: p.description.clone().unwrap_or_default(),
        example: ctx
            .options
            .include_examples
            .then(|| p.display_value().map(|v| ctx.substitute(v)))
            .flatten(),
    };

    let mut path_params: Vec<ParameterEntry> =
        endpoint.parameters_of(ParameterType::Path).map(param).collect();
    path_params.extend(
        undeclared_path_parameters(&path, endpoint)
            .into_iter()
            .map(|name| ParameterEntry {
                name,
                kind: "string".to_string(),
                required: true,
                description: String::new(),
                example: None,
            }),
    );

    Api {
        id: endpoint.id.clone(),
        name: endpoint.name.clone(),
        description: endpoint.description.clone().unwrap_or_default(),
        method: endpoint.method.as_str(),
        path,
        folder_id,
        tags: endpoint_tags(endpoint),
        parameters: Parameters {
            path: path_params,
            query: endpoint.parameters_of(ParameterType::Query).map(param).collect(),
            header: endpoint
                .request_headers()
                .map(|h| ParameterEntry {
                    name: h.key.clone(),
                    kind: "string".to_string(),
                    required: h.is_required,
                    description: h.description.clone().unwrap_or_default(),
                    example: ctx
                        .options
                        .include_examples
                        .then(|| ctx.substitute(&h.value)),
                })
                .collect(),
        },
        request_body: create_request_body(ctx, endpoint, &param),
        responses: create_responses(ctx, endpoint),
        sort_order: endpoint.sort_order,
    }
}

fn create_request_body(
    ctx: &ExportContext<'_>,
    endpoint: &Endpoint,
    param: &dyn Fn(&DomainParameter) -> ParameterEntry,
) -> RequestBody {
    let Some(body) = endpoint.request_body.as_ref() else {
        return RequestBody::none();
    };
    let content_type = body.content_type.to_ascii_lowercase();

    if content_type.contains("form") {
        let kind = if content_type.contains("multipart") {
            "form-data"
        } else {
            "x-www-form-urlencoded"
        };
        return RequestBody {
            kind,
            content_type: Some(body.content_type.clone()),
            parameters: endpoint.parameters_of(ParameterType::Form).map(param).collect(),
            json_schema: None,
            example: None,
        };
    }

    if body.body.trim().is_empty() && body.schema_definition.is_none() {
        return RequestBody::none();
    }

    RequestBody {
        kind: if is_json(&content_type) { "json" } else { "raw" },
        content_type: Some(body.content_type.clone()),
        parameters: Vec::new(),
        json_schema: Some(body_schema(body, &ctx.resolver)),
        example: ctx
            .options
            .include_examples
            .then(|| example_value(&ctx.substitute(&body.body)))
            .flatten(),
    }
}

fn create_responses(ctx: &ExportContext<'_>, endpoint: &Endpoint) -> Vec<ResponseEntry> {
    let mut responses: Vec<ResponseEntry> = endpoint
        .responses
        .iter()
        .map(|response| {
            let body = ctx.substitute(&response.body);
            let json_schema = if body.trim().is_empty() {
                None
            } else if is_json(&response.content_type) {
                Some(
                    serde_json::from_str::<Value>(&body)
                        .map_or_else(|_| generic_object_schema(), |v| infer_schema(&v)),
                )
            } else {
                Some(json!({ "type": "string" }))
            };
            ResponseEntry {
                code: response.status_code,
                name: response.description(),
                content_type: response.content_type.clone(),
                json_schema,
                example: ctx
                    .options
                    .include_examples
                    .then(|| example_value(&body))
                    .flatten(),
            }
        })
        .collect();

    if responses.is_empty() {
        responses.push(ResponseEntry {
            code: 200,
            name: "Successful response".to_string(),
            content_type: "application/json".to_string(),
            json_schema: None,
            example: None,
        });
    }
    responses
}

fn environment_entry(environment: &Environment) -> EnvironmentEntry {
    EnvironmentEntry {
        id: environment.id.clone(),
        name: environment.name.clone(),
        is_default: environment.is_default,
        variables: environment
            .variables
            .iter()
            .map(|v| VariableEntry {
                name: v.key.clone(),
                value: v.value.clone(),
                description: v.description.clone().unwrap_or_default(),
                is_secret: v.is_secret,
            })
            .collect(),
    }
}

// Apidog v2 structs

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApidogExport {
    apidog_version: &'static str,
    info: Info,
    servers: Vec<Server>,
    folders: Vec<FolderEntry>,
    apis: Vec<Api>,
    environments: Vec<EnvironmentEntry>,
}

#[derive(Serialize)]
struct Info {
    name: String,
    description: String,
    version: String,
}

#[derive(Serialize)]
struct Server {
    name: String,
    url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FolderEntry {
    id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    parent_id: Option<String>,
    sort_order: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Api {
    id: String,
    name: String,
    description: String,
    method: &'static str,
    path: String,
    folder_id: Option<String>,
    tags: Vec<String>,
    parameters: Parameters,
    request_body: RequestBody,
    responses: Vec<ResponseEntry>,
    sort_order: i32,
}

#[derive(Serialize)]
struct Parameters {
    path: Vec<ParameterEntry>,
    query: Vec<ParameterEntry>,
    header: Vec<ParameterEntry>,
}

#[derive(Serialize)]
struct ParameterEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    required: bool,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    example: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parameters: Vec<ParameterEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    json_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    example: Option<Value>,
}

impl RequestBody {
    const fn none() -> Self {
        Self {
            kind: "none",
            content_type: None,
            parameters: Vec::new(),
            json_schema: None,
            example: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResponseEntry {
    code: u16,
    name: String,
    content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    json_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    example: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvironmentEntry {
    id: String,
    name: String,
    is_default: bool,
    variables: Vec<VariableEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VariableEntry {
    name: String,
    value: String,
    description: String,
    is_secret: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use apidock_domain::{
        Collection, EnvironmentVariable, Folder, Header, HttpMethod, Parameter, Response,
    };
    use pretty_assertions::assert_eq;

    fn document() -> Document {
        Document::new(Collection::new("c1", "Pet Store").with_version("2.1.0"))
            .with_environment(
                Environment::new("dev", "c1", "Development")
                    .as_default()
                    .with_variable(EnvironmentVariable::new("base_url", "http://localhost:8080"))
                    .with_variable(EnvironmentVariable::secret("api_key", "")),
            )
            .with_folder(Folder::new("f1", "c1", "Pets").with_sort_order(1))
            .with_folder(Folder::new("f2", "c1", "Photos").with_parent("f1"))
            .with_endpoint(
                Endpoint::new("e1", "c1", "Get pet", HttpMethod::Get, "{{base_url}}/pets/:petId")
                    .in_folder("f1")
                    .with_parameter(Parameter::query("expand", "owner"))
                    .with_header(Header::request("X-Api-Key", "{{api_key}}"))
                    .with_response(Response::json(200, "OK", r#"{"id": 7, "name": "Rex"}"#)),
            )
            .with_endpoint(
                Endpoint::new("e2", "c1", "Health", HttpMethod::Get, "{{base_url}}/health")
                    .in_folder("missing"),
            )
    }

    fn export(options: &ExportOptions) -> Value {
        let result = ApidogExporter.export(&document(), options).unwrap();
        assert_eq!(result.filename, "pet_store.apidog_collection.json");
        serde_json::from_str(&result.content).unwrap()
    }

    #[test]
    fn test_top_level() {
        let value = export(&ExportOptions::new(ExportFormat::Apidog));

        assert_eq!(value["apidogVersion"], "2.0.0");
        assert_eq!(value["info"]["name"], "Pet Store");
        assert_eq!(value["info"]["version"], "2.1.0");
        assert_eq!(
            value["servers"],
            json!([{"name": "Development", "url": "http://localhost:8080"}])
        );
        assert_eq!(
            value["folders"],
            json!([
                {"id": "f1", "name": "Pets", "parentId": null, "sortOrder": 1},
                {"id": "f2", "name": "Photos", "parentId": "f1", "sortOrder": 0}
            ])
        );
    }

    #[test]
    fn test_apis() {
        let value = export(&ExportOptions::new(ExportFormat::Apidog));
        let apis = value["apis"].as_array().unwrap();
        assert_eq!(apis.len(), 2);

        let pet = apis.iter().find(|a| a["id"] == "e1").unwrap();
        assert_eq!(pet["path"], "/pets/{petId}");
        assert_eq!(pet["method"], "GET");
        assert_eq!(pet["folderId"], "f1");
        assert_eq!(pet["tags"], json!(["API"]));
        assert_eq!(pet["parameters"]["path"][0]["name"], "petId");
        assert_eq!(pet["parameters"]["path"][0]["required"], true);
        assert_eq!(pet["parameters"]["query"][0]["example"], "owner");
        assert_eq!(pet["parameters"]["header"][0]["example"], "{{api_key}}");
        assert_eq!(pet["requestBody"], json!({"type": "none"}));
        assert_eq!(pet["responses"][0]["code"], 200);
        assert_eq!(
            pet["responses"][0]["jsonSchema"]["properties"]["id"],
            json!({"type": "integer"})
        );

        let health = apis.iter().find(|a| a["id"] == "e2").unwrap();
        assert_eq!(health["folderId"], Value::Null);
        assert_eq!(health["responses"][0]["name"], "Successful response");
    }

    #[test]
    fn test_environments_exported_verbatim() {
        let value = export(&ExportOptions::new(ExportFormat::Apidog));
        let env = &value["environments"][0];

        assert_eq!(env["isDefault"], true);
        assert_eq!(env["variables"][0]["value"], "http://localhost:8080");
        assert_eq!(env["variables"][1]["name"], "api_key");
        assert_eq!(env["variables"][1]["value"], "");
        assert_eq!(env["variables"][1]["isSecret"], true);
    }

    #[test]
    fn test_toggles() {
        let mut options = ExportOptions::new(ExportFormat::Apidog);
        options.include_servers = false;
        options.include_examples = false;
        let value = export(&options);

        assert_eq!(value["servers"], json!([]));
        let pet = &value["apis"][0];
        assert!(pet["parameters"]["query"][0].get("example").is_none());
        assert!(pet["responses"][0].get("example").is_none());
    }

    #[test]
    fn test_rejects_foreign_options() {
        let err = ApidogExporter
            .export(&document(), &ExportOptions::new(ExportFormat::Postman))
            .unwrap_err();
        assert!(err.is_client_error());
    }
}
