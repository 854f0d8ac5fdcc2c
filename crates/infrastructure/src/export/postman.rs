//! Postman Collection v2.1 exporter.
//!
//! Folders become nested item groups and endpoints become request items.
//! Collection variables carry the selected environment verbatim so the
//! collection stays usable without a separate environment file.

use apidock_application::{Exporter, PipelineResult};
use apidock_domain::{
    Document, DocumentTree, Endpoint, ExportFormat, ExportOptions, ExportResult, OutputEncoding,
    ParameterType, ScriptKind,
};
use serde::Serialize;

use super::common::{ExportContext, is_json};
use crate::serialization::encode_document;

/// Schema URL of Postman Collection v2.1.0.
pub const POSTMAN_SCHEMA: &str =
    "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

/// Postman Collection v2.1 exporter.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostmanExporter;

impl Exporter for PostmanExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Postman
    }

    fn export(&self, document: &Document, options: &ExportOptions) -> PipelineResult<ExportResult> {
        self.validate_options(Some(options))?;
        let ctx = ExportContext::new(document, options);
        let tree = document.tree();

        let collection = PostmanCollection {
            info: Info {
                postman_id: document.collection.id.clone(),
                name: document.collection.name.clone(),
                description: document.collection.description.clone(),
                version: document.collection.version.clone(),
                schema: POSTMAN_SCHEMA,
            },
            item: items_under(&ctx, &tree, None),
            variable: ctx
                .environment
                .map(|env| {
                    env.variables
                        .iter()
                        .map(|v| Variable {
                            key: v.key.clone(),
                            value: v.value.clone(),
                            kind: "string",
                            description: v.description.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        };

        let content = encode_document(&collection, ExportFormat::Postman, OutputEncoding::Json)?;
        Ok(ExportResult::new(
            content,
            ExportFormat::Postman,
            OutputEncoding::Json,
            &document.collection.name,
        ))
    }
}

fn items_under(ctx: &ExportContext<'_>, tree: &DocumentTree<'_>, parent: Option<&str>) -> Vec<Item> {
    let folders = tree.child_folders(parent).iter().map(|folder| {
        Item::Folder(FolderItem {
            name: folder.name.clone(),
            description: folder.description.clone(),
            item: items_under(ctx, tree, Some(folder.id.as_str())),
        })
    });
    let requests = tree
        .endpoints_in(parent)
        .iter()
        .map(|endpoint| Item::Request(Box::new(request_item(ctx, endpoint))));

    folders.chain(requests).collect()
}

fn request_item(ctx: &ExportContext<'_>, endpoint: &Endpoint) -> RequestItem {
    let options = ctx.options;

    let mut event = Vec::new();
    if options.include_pre_request_scripts {
        event.extend(script_event(endpoint, ScriptKind::PreRequest, "prerequest"));
    }
    if options.include_tests {
        event.extend(script_event(endpoint, ScriptKind::Test, "test"));
    }

    let response = if options.include_examples {
        endpoint
            .responses
            .iter()
            .map(|r| {
                let mut header = vec![KeyValue::text("Content-Type", r.content_type.clone())];
                header.extend(endpoint.response_headers().map(|h| KeyValue {
                    key: h.key.clone(),
                    value: ctx.substitute(&h.value),
                    description: h.description.clone(),
                    kind: "text",
                }));
                ResponseExample {
                    name: r.description(),
                    status: r.status_text.clone(),
                    code: r.status_code,
                    preview_language: if is_json(&r.content_type) { "json" } else { "text" },
                    header,
                    body: ctx.substitute(&r.body),
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    RequestItem {
        name: endpoint.name.clone(),
        request: Request {
            method: endpoint.method.as_str(),
            header: endpoint
                .request_headers()
                .map(|h| KeyValue {
                    key: h.key.clone(),
                    value: ctx.substitute(&h.value),
                    description: h.description.clone(),
                    kind: "text",
                })
                .collect(),
            body: request_body(ctx, endpoint),
            url: build_url(ctx, endpoint),
            description: endpoint.description.clone(),
        },
        response,
        event,
    }
}

fn script_event(endpoint: &Endpoint, kind: ScriptKind, listen: &'static str) -> Option<Event> {
    let exec: Vec<String> = endpoint
        .scripts_of(kind)
        .flat_map(|script| script.script.lines().map(str::to_string))
        .collect();
    (!exec.is_empty()).then_some(Event {
        listen,
        script: Script {
            kind: "text/javascript",
            exec,
        },
    })
}

fn request_body(ctx: &ExportContext<'_>, endpoint: &Endpoint) -> Option<Body> {
    let body = endpoint.request_body.as_ref()?;
    let content_type = body.content_type.to_ascii_lowercase();
    let form_fields = || -> Vec<KeyValue> {
        endpoint
            .parameters_of(ParameterType::Form)
            .map(|p| KeyValue {
                key: p.key.clone(),
                value: ctx.substitute(p.display_value().unwrap_or_default()),
                description: p.description.clone(),
                kind: "text",
            })
            .collect()
    };

    if content_type.contains("x-www-form-urlencoded") {
        return Some(Body {
            mode: "urlencoded",
            urlencoded: Some(form_fields()),
            ..Body::default()
        });
    }
    if content_type.contains("multipart/form-data") {
        return Some(Body {
            mode: "formdata",
            formdata: Some(form_fields()),
            ..Body::default()
        });
    }
    if body.body.is_empty() {
        return None;
    }

    Some(Body {
        mode: "raw",
        raw: Some(ctx.substitute(&body.body)),
        options: Some(BodyOptions {
            raw: RawOptions {
                language: if is_json(&content_type) { "json" } else { "text" },
            },
        }),
        ..Body::default()
    })
}

/// Splits the resolved URL into Postman's structured form. Declared query
/// parameters missing from the URL are appended to both `raw` and `query`.
fn build_url(ctx: &ExportContext<'_>, endpoint: &Endpoint) -> Url {
    let mut raw = ctx.substitute(&endpoint.url);

    let (base, query_string) = match raw.split_once('?') {
        Some((base, query)) => (base.to_string(), Some(query.to_string())),
        None => (raw.clone(), None),
    };

    let (protocol, rest) = match base.split_once("://") {
        Some((scheme, rest)) => (Some(scheme.to_string()), rest),
        None => (None, base.as_str()),
    };
    let has_host = protocol.is_some() || rest.starts_with("{{") || rest.starts_with("${");
    let (host_part, path_part) = if has_host {
        rest.find('/').map_or((rest, ""), |i| rest.split_at(i))
    } else {
        ("", rest)
    };

    let (host_name, port) = match host_part.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            (name, Some(port.to_string()))
        }
        _ => (host_part, None),
    };
    let host: Vec<String> = if host_name.is_empty() {
        Vec::new()
    } else if host_name.starts_with("{{") || host_name.starts_with("${") {
        vec![host_name.to_string()]
    } else {
        host_name.split('.').map(str::to_string).collect()
    };
    let path: Vec<String> = path_part
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let mut query: Vec<KeyValue> = query_string
        .iter()
        .flat_map(|q| q.split('&'))
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            KeyValue::text(key, value.to_string())
        })
        .collect();

    let mut appended = Vec::new();
    for param in endpoint.parameters_of(ParameterType::Query) {
        if query.iter().any(|q| q.key == param.key) {
            continue;
        }
        let value = ctx.substitute(param.display_value().unwrap_or_default());
        appended.push(format!("{}={}", param.key, value));
        query.push(KeyValue {
            key: param.key.clone(),
            value,
            description: param.description.clone(),
            kind: "text",
        });
    }
    if !appended.is_empty() {
        raw.push(if query_string.is_some() { '&' } else { '?' });
        raw.push_str(&appended.join("&"));
    }

    let variable = endpoint
        .parameters_of(ParameterType::Path)
        .map(|p| KeyValue {
            key: p.key.clone(),
            value: ctx.substitute(p.display_value().unwrap_or_default()),
            description: p.description.clone(),
            kind: "text",
        })
        .collect();

    Url {
        raw,
        protocol,
        host,
        port,
        path,
        query,
        variable,
    }
}

// Postman v2.1 document

#[derive(Serialize)]
struct PostmanCollection {
    info: Info,
    item: Vec<Item>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    variable: Vec<Variable>,
}

#[derive(Serialize)]
struct Info {
    #[serde(rename = "_postman_id")]
    postman_id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    version: String,
    schema: &'static str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Item {
    Folder(FolderItem),
    Request(Box<RequestItem>),
}

#[derive(Serialize)]
struct FolderItem {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    item: Vec<Item>,
}

#[derive(Serialize)]
struct RequestItem {
    name: String,
    request: Request,
    response: Vec<ResponseExample>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    event: Vec<Event>,
}

#[derive(Serialize)]
struct Request {
    method: &'static str,
    header: Vec<KeyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<Body>,
    url: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Serialize)]
struct KeyValue {
    key: String,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "type")]
    kind: &'static str,
}

impl KeyValue {
    fn text(key: &str, value: String) -> Self {
        Self {
            key: key.to_string(),
            value,
            description: None,
            kind: "text",
        }
    }
}

#[derive(Serialize, Default)]
struct Body {
    mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    urlencoded: Option<Vec<KeyValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    formdata: Option<Vec<KeyValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<BodyOptions>,
}

#[derive(Serialize)]
struct BodyOptions {
    raw: RawOptions,
}

#[derive(Serialize)]
struct RawOptions {
    language: &'static str,
}

#[derive(Serialize)]
struct Url {
    raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    protocol: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    host: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<String>,
    path: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    query: Vec<KeyValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    variable: Vec<KeyValue>,
}

#[derive(Serialize)]
struct ResponseExample {
    name: String,
    status: String,
    code: u16,
    #[serde(rename = "_postman_previewlanguage")]
    preview_language: &'static str,
    header: Vec<KeyValue>,
    body: String,
}

#[derive(Serialize)]
struct Event {
    listen: &'static str,
    script: Script,
}

#[derive(Serialize)]
struct Script {
    #[serde(rename = "type")]
    kind: &'static str,
    exec: Vec<String>,
}

#[derive(Serialize)]
struct Variable {
    key: String,
    value: String,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}
