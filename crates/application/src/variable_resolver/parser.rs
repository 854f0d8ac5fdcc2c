//! Placeholder parser for `{{variable}}` and `${variable}` syntax
//!
//! Parses strings to extract variable references with their positions.

use std::ops::Range;

/// The placeholder style a reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderSyntax {
    /// `{{name}}`
    Mustache,
    /// `${name}`
    Dollar,
}

/// Represents a parsed variable reference in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReference {
    /// The variable name, trimmed, without delimiters.
    pub name: String,

    /// How the reference was written.
    pub syntax: PlaceholderSyntax,

    /// Byte range in the original string where this reference appears.
    pub span: Range<usize>,
}

impl VariableReference {
    /// Creates a new variable reference.
    #[must_use]
    pub fn new(name: impl Into<String>, syntax: PlaceholderSyntax, span: Range<usize>) -> Self {
        Self {
            name: name.into(),
            syntax,
            span,
        }
    }
}

/// Parses a string and extracts all variable references, in order.
///
/// Supports:
/// - `{{variable_name}}`
/// - `${variable_name}`
///
/// Unclosed or empty placeholders are not references.
///
/// # Examples
///
/// ```
/// use apidock_application::variable_resolver::parser::parse_variables;
///
/// let refs = parse_variables("{{base_url}}/users/${id}");
/// assert_eq!(refs.len(), 2);
/// assert_eq!(refs[0].name, "base_url");
/// assert_eq!(refs[1].name, "id");
/// ```
#[must_use]
pub fn parse_variables(input: &str) -> Vec<VariableReference> {
    let mut references = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let rest = &input[pos..];
        let (syntax, open, close) = if rest.starts_with("{{") {
            (PlaceholderSyntax::Mustache, 2, "}}")
        } else if rest.starts_with("${") {
            (PlaceholderSyntax::Dollar, 2, "}")
        } else {
            pos += rest.chars().next().map_or(1, char::len_utf8);
            continue;
        };

        let inner_start = pos + open;
        let Some(offset) = input[inner_start..].find(close) else {
            // Unclosed, nothing after this point can close it either
            break;
        };
        let inner_end = inner_start + offset;
        let end = inner_end + close.len();
        let name = input[inner_start..inner_end].trim();

        if name.is_empty() || name.contains(['{', '}']) {
            pos += 1;
            continue;
        }

        references.push(VariableReference::new(name, syntax, pos..end));
        pos = end;
    }

    references
}

/// Returns true if the input string contains any variable references.
#[must_use]
pub fn has_variables(input: &str) -> bool {
    !parse_variables(input).is_empty()
}

/// Extracts just the variable names from the input without full parsing info.
#[must_use]
pub fn extract_variable_names(input: &str) -> Vec<String> {
    parse_variables(input).into_iter().map(|r| r.name).collect()
}
