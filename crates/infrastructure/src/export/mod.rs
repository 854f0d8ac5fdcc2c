//! Export infrastructure.
//!
//! One exporter per interchange format, all sharing the transform helpers
//! in `common`.

mod apidog;
mod common;
mod insomnia;
mod openapi;
mod postman;
mod swagger;

use std::sync::Arc;

use apidock_application::{Exporter, ExporterRegistry};

pub use apidog::{APIDOG_VERSION, ApidogExporter};
pub use insomnia::{INSOMNIA_EXPORT_FORMAT, InsomniaExporter};
pub use openapi::{DEFAULT_OPENAPI_VERSION, OpenApiExporter};
pub use postman::{POSTMAN_SCHEMA, PostmanExporter};
pub use swagger::SwaggerExporter;

/// A registry with every built-in exporter.
#[must_use]
pub fn default_registry() -> ExporterRegistry {
    let exporters: [Arc<dyn Exporter>; 5] = [
        Arc::new(PostmanExporter),
        Arc::new(OpenApiExporter),
        Arc::new(InsomniaExporter),
        Arc::new(SwaggerExporter),
        Arc::new(ApidogExporter),
    ];
    exporters
        .into_iter()
        .fold(ExporterRegistry::new(), ExporterRegistry::with)
}
