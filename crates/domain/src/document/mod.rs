//! Read-only document snapshot handed to the export pipeline.
//!
//! A [`Document`] is assembled by the caller from its own storage and is
//! never mutated by the pipeline.

mod collection;
mod endpoint;
mod environment;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

pub use collection::{Collection, Folder};
pub use endpoint::{
    Endpoint, Header, HeaderType, Parameter, ParameterType, RequestBody, Response, ScriptKind,
    Tag, Test,
};
pub use environment::{Environment, EnvironmentVariable};

/// A fully materialised collection with its folders, endpoints and environments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Collection metadata.
    pub collection: Collection,

    /// All folders of the collection.
    #[serde(default)]
    pub folders: Vec<Folder>,

    /// All endpoints of the collection.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,

    /// All environments of the collection.
    #[serde(default)]
    pub environments: Vec<Environment>,
}

impl Document {
    /// Creates a document with no folders, endpoints or environments.
    #[must_use]
    pub const fn new(collection: Collection) -> Self {
        Self {
            collection,
            folders: Vec::new(),
            endpoints: Vec::new(),
            environments: Vec::new(),
        }
    }

    /// Adds a folder.
    #[must_use]
    pub fn with_folder(mut self, folder: Folder) -> Self {
        self.folders.push(folder);
        self
    }

    /// Adds an endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Adds an environment.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environments.push(environment);
        self
    }

    /// Picks the environment used for substitution.
    ///
    /// An explicit id wins; otherwise the environment flagged as default is
    /// used. An unknown id selects nothing.
    #[must_use]
    pub fn selected_environment(&self, environment_id: Option<&str>) -> Option<&Environment> {
        match environment_id {
            Some(id) => self.environments.iter().find(|e| e.id == id),
            None => self.environments.iter().find(|e| e.is_default),
        }
    }

    /// Active endpoints in export order.
    #[must_use]
    pub fn active_endpoints(&self) -> Vec<&Endpoint> {
        let mut endpoints: Vec<&Endpoint> = self.endpoints.iter().filter(|e| e.is_active).collect();
        endpoints.sort_by(|a, b| endpoint_order(a, b));
        endpoints
    }

    /// Number of endpoints that will appear in an export.
    #[must_use]
    pub fn active_endpoint_count(&self) -> usize {
        self.endpoints.iter().filter(|e| e.is_active).count()
    }

    /// Builds the folder hierarchy index.
    #[must_use]
    pub fn tree(&self) -> DocumentTree<'_> {
        DocumentTree::build(self)
    }
}

fn endpoint_order(a: &Endpoint, b: &Endpoint) -> std::cmp::Ordering {
    (a.sort_order, &a.name, &a.id).cmp(&(b.sort_order, &b.name, &b.id))
}

fn folder_order(a: &Folder, b: &Folder) -> std::cmp::Ordering {
    (a.sort_order, &a.name, &a.id).cmp(&(b.sort_order, &b.name, &b.id))
}

/// Parent-to-children index over a document's folders and active endpoints.
///
/// Folders whose parent does not exist, and endpoints whose folder does not
/// exist, are attached to the root. Folders that only take part in a
/// parent cycle are never reachable from the root.
#[derive(Debug)]
pub struct DocumentTree<'a> {
    folders: HashMap<Option<String>, Vec<&'a Folder>>,
    endpoints: HashMap<Option<String>, Vec<&'a Endpoint>>,
}

impl<'a> DocumentTree<'a> {
    fn build(document: &'a Document) -> Self {
        let known: HashSet<&str> = document.folders.iter().map(|f| f.id.as_str()).collect();
        let attach = |id: Option<&String>| id.filter(|id| known.contains(id.as_str())).cloned();

        let mut folders: HashMap<Option<String>, Vec<&'a Folder>> = HashMap::new();
        for folder in &document.folders {
            let parent = attach(folder.parent_id.as_ref()).filter(|p| *p != folder.id);
            folders.entry(parent).or_default().push(folder);
        }
        for children in folders.values_mut() {
            children.sort_by(|a, b| folder_order(a, b));
        }

        let mut endpoints: HashMap<Option<String>, Vec<&'a Endpoint>> = HashMap::new();
        for endpoint in document.endpoints.iter().filter(|e| e.is_active) {
            endpoints
                .entry(attach(endpoint.folder_id.as_ref()))
                .or_default()
                .push(endpoint);
        }
        for children in endpoints.values_mut() {
            children.sort_by(|a, b| endpoint_order(a, b));
        }

        Self { folders, endpoints }
    }

    /// Child folders of `parent`, `None` meaning the collection root.
    #[must_use]
    pub fn child_folders(&self, parent: Option<&str>) -> &[&'a Folder] {
        self.folders
            .get(&parent.map(str::to_string))
            .map_or(&[], Vec::as_slice)
    }

    /// Active endpoints directly inside `folder`, `None` meaning the root.
    #[must_use]
    pub fn endpoints_in(&self, folder: Option<&str>) -> &[&'a Endpoint] {
        self.endpoints
            .get(&folder.map(str::to_string))
            .map_or(&[], Vec::as_slice)
    }

    /// Folders in depth-first order, each paired with its resolved parent.
    #[must_use]
    pub fn walk_folders(&self) -> Vec<(&'a Folder, Option<&'a Folder>)> {
        let mut out = Vec::new();
        let mut stack: Vec<(&'a Folder, Option<&'a Folder>)> = self
            .child_folders(None)
            .iter()
            .rev()
            .map(|f| (*f, None))
            .collect();
        while let Some((folder, parent)) = stack.pop() {
            out.push((folder, parent));
            for child in self.child_folders(Some(folder.id.as_str())).iter().rev() {
                stack.push((*child, Some(folder)));
            }
        }
        out
    }
}
