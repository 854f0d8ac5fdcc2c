//! Variable resolution module
//!
//! Provides parsing and substitution of `{{variable}}` and `${variable}`
//! placeholders in URLs, headers and bodies.
//!
//! # Usage
//!
//! ```
//! use apidock_application::variable_resolver::VariableResolver;
//! use apidock_domain::{Environment, EnvironmentVariable};
//!
//! let env = Environment::new("env1", "c1", "development")
//!     .with_variable(EnvironmentVariable::new("host", "localhost"));
//!
//! let resolver = VariableResolver::from_environment(Some(&env));
//! assert_eq!(resolver.substitute("http://{{host}}/api"), "http://localhost/api");
//! ```

pub mod engine;
pub mod parser;

pub use engine::{ResolutionResult, VariableRef, VariableResolver};
pub use parser::{
    PlaceholderSyntax, VariableReference, extract_variable_names, has_variables, parse_variables,
};
