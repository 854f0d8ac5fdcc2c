//! Insomnia export v4 exporter.
//!
//! Produces a flat `resources` list where every entry names its parent
//! through `parentId`: workspace, environments, request groups, requests.
//! Placeholders the environment cannot resolve are rewritten to Insomnia's
//! `{{ _.name }}` template syntax.

use std::collections::BTreeMap;

use apidock_application::{Exporter, PipelineResult};
use apidock_domain::{
    Document, Endpoint, Environment, ExportFormat, ExportOptions, ExportResult, OutputEncoding,
    ParameterType,
};
use serde::Serialize;

use super::common::ExportContext;
use crate::serialization::encode_document;

/// Export format version understood by Insomnia's importer.
pub const INSOMNIA_EXPORT_FORMAT: u8 = 4;

/// Insomnia v4 exporter.
#[derive(Debug, Default, Clone, Copy)]
pub struct InsomniaExporter;

impl Exporter for InsomniaExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Insomnia
    }

    fn export(&self, document: &Document, options: &ExportOptions) -> PipelineResult<ExportResult> {
        self.validate_options(Some(options))?;
        let ctx = ExportContext::new(document, options);
        let tree = document.tree();

        let workspace_id = workspace_id(document);
        let base_environment_id = format!("base_env_{}", document.collection.id);

        let mut resources = vec![
            Resource::Workspace {
                id: workspace_id.clone(),
                parent_id: None,
                name: document.collection.name.clone(),
                description: document.collection.description.clone().unwrap_or_default(),
                scope: "collection",
            },
            Resource::Environment {
                id: base_environment_id.clone(),
                parent_id: workspace_id.clone(),
                name: "Base Environment".to_string(),
                data: ctx.environment.map(environment_data).unwrap_or_default(),
                is_private: false,
            },
        ];

        resources.extend(document.environments.iter().map(|env| Resource::Environment {
            id: format!("env_{}", env.id),
            parent_id: base_environment_id.clone(),
            name: env.name.clone(),
            data: environment_data(env),
            is_private: false,
        }));

        resources.extend(tree.walk_folders().into_iter().enumerate().map(|(index, (folder, parent))| {
            Resource::RequestGroup {
                id: folder_id(&folder.id),
                parent_id: parent.map_or_else(|| workspace_id.clone(), |p| folder_id(&p.id)),
                name: folder.name.clone(),
                description: folder.description.clone().unwrap_or_default(),
                meta_sort_key: sort_key(index),
            }
        }));

        let mut requests: Vec<(&Endpoint, String)> = tree
            .endpoints_in(None)
            .iter()
            .map(|e| (*e, workspace_id.clone()))
            .collect();
        for (folder, _) in tree.walk_folders() {
            requests.extend(
                tree.endpoints_in(Some(folder.id.as_str()))
                    .iter()
                    .map(|e| (*e, folder_id(&folder.id))),
            );
        }
        resources.extend(
            requests
                .into_iter()
                .enumerate()
                .map(|(index, (endpoint, parent_id))| request_resource(&ctx, endpoint, parent_id, index)),
        );

        let export = InsomniaExport {
            kind: "export",
            export_format: INSOMNIA_EXPORT_FORMAT,
            export_source: "apidock",
            resources,
        };

        let content = encode_document(&export, ExportFormat::Insomnia, OutputEncoding::Json)?;
        Ok(ExportResult::new(
            content,
            ExportFormat::Insomnia,
            OutputEncoding::Json,
            &document.collection.name,
        ))
    }
}

fn workspace_id(document: &Document) -> String {
    format!("wrk_{}", document.collection.id)
}

fn folder_id(id: &str) -> String {
    format!("fld_{id}")
}

#[allow(clippy::cast_possible_wrap)]
fn sort_key(index: usize) -> i64 {
    (index as i64 + 1) * -1000
}

fn environment_data(environment: &Environment) -> BTreeMap<String, String> {
    environment
        .variables
        .iter()
        .map(|v| (v.key.clone(), v.value.clone()))
        .collect()
}

/// Substitutes known variables and rewrites the rest to `{{ _.name }}`.
fn template(ctx: &ExportContext<'_>, text: &str) -> String {
    ctx.resolver
        .rewrite(text, |var, _| format!("{{{{ _.{} }}}}", var.name))
        .resolved
}

fn request_resource(
    ctx: &ExportContext<'_>,
    endpoint: &Endpoint,
    parent_id: String,
    index: usize,
) -> Resource {
    let body = endpoint
        .request_body
        .as_ref()
        .map(|body| {
            if body.content_type.to_ascii_lowercase().contains("form") {
                RequestBody {
                    mime_type: Some(body.content_type.clone()),
                    text: None,
                    params: endpoint
                        .parameters_of(ParameterType::Form)
                        .map(|p| NameValue {
                            name: p.key.clone(),
                            value: template(ctx, p.display_value().unwrap_or_default()),
                            description: p.description.clone(),
                        })
                        .collect(),
                }
            } else {
                RequestBody {
                    mime_type: Some(body.content_type.clone()),
                    text: Some(template(ctx, &body.body)),
                    params: Vec::new(),
                }
            }
        })
        .unwrap_or_default();

    Resource::Request {
        id: format!("req_{}", endpoint.id),
        parent_id,
        name: endpoint.name.clone(),
        description: endpoint.description.clone().unwrap_or_default(),
        method: endpoint.method.as_str(),
        url: template(ctx, &endpoint.url),
        body,
        parameters: endpoint
            .parameters_of(ParameterType::Query)
            .map(|p| NameValue {
                name: p.key.clone(),
                value: template(ctx, p.display_value().unwrap_or_default()),
                description: p.description.clone(),
            })
            .collect(),
        headers: endpoint
            .request_headers()
            .map(|h| NameValue {
                name: h.key.clone(),
                value: template(ctx, &h.value),
                description: h.description.clone(),
            })
            .collect(),
        meta_sort_key: sort_key(index),
    }
}

// Insomnia v4 structs

#[derive(Serialize)]
struct InsomniaExport {
    #[serde(rename = "_type")]
    kind: &'static str,
    #[serde(rename = "__export_format")]
    export_format: u8,
    #[serde(rename = "__export_source")]
    export_source: &'static str,
    resources: Vec<Resource>,
}

#[derive(Serialize)]
#[serde(tag = "_type", rename_all = "snake_case")]
enum Resource {
    Workspace {
        #[serde(rename = "_id")]
        id: String,
        #[serde(rename = "parentId")]
        parent_id: Option<String>,
        name: String,
        description: String,
        scope: &'static str,
    },
    Environment {
        #[serde(rename = "_id")]
        id: String,
        #[serde(rename = "parentId")]
        parent_id: String,
        name: String,
        data: BTreeMap<String, String>,
        #[serde(rename = "isPrivate")]
        is_private: bool,
    },
    RequestGroup {
        #[serde(rename = "_id")]
        id: String,
        #[serde(rename = "parentId")]
        parent_id: String,
        name: String,
        description: String,
        #[serde(rename = "metaSortKey")]
        meta_sort_key: i64,
    },
    Request {
        #[serde(rename = "_id")]
        id: String,
        #[serde(rename = "parentId")]
        parent_id: String,
        name: String,
        description: String,
        method: &'static str,
        url: String,
        body: RequestBody,
        parameters: Vec<NameValue>,
        headers: Vec<NameValue>,
        #[serde(rename = "metaSortKey")]
        meta_sort_key: i64,
    },
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    params: Vec<NameValue>,
}

#[derive(Serialize)]
struct NameValue {
    name: String,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}
