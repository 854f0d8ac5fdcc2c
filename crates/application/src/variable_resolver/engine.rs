//! Variable resolution engine
//!
//! Substitutes `{{variable}}` and `${variable}` references with values taken
//! from the selected environment.

use std::collections::HashMap;

use apidock_domain::Environment;

use super::parser::{PlaceholderSyntax, parse_variables};

/// Result of variable resolution for a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    /// The string with every known variable substituted.
    pub resolved: String,

    /// Variable names that could not be resolved, in order of appearance.
    pub unresolved: Vec<String>,
}

impl ResolutionResult {
    /// Creates a result for input with no variables.
    #[must_use]
    pub fn no_variables(input: &str) -> Self {
        Self {
            resolved: input.to_string(),
            unresolved: Vec::new(),
        }
    }

    /// Whether all variables were resolved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Name to value map used during an export.
///
/// Built once per export call from the selected environment; unknown
/// placeholders are left exactly as written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableResolver {
    values: HashMap<String, String>,
}

impl VariableResolver {
    /// Creates a resolver with no variables.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a resolver from an environment.
    ///
    /// A variable takes part unless it is secret *and* empty, so secret
    /// values are substituted whenever they are present.
    #[must_use]
    pub fn from_environment(environment: Option<&Environment>) -> Self {
        let values = environment
            .map(|env| {
                env.variables
                    .iter()
                    .filter(|v| v.is_substitutable())
                    .map(|v| (v.key.clone(), v.value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Self { values }
    }

    /// Adds or replaces a variable.
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Looks a variable value up.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Number of known variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no variables are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolves all variables in the input string.
    #[must_use]
    pub fn resolve(&self, input: &str) -> ResolutionResult {
        self.rewrite(input, |_, span| span.to_string())
    }

    /// Substitutes known variables and returns only the text.
    #[must_use]
    pub fn substitute(&self, input: &str) -> String {
        self.resolve(input).resolved
    }

    /// Substitutes known variables and hands every unresolved reference to
    /// `unresolved`, which returns the replacement text.
    pub fn rewrite<F>(&self, input: &str, mut unresolved: F) -> ResolutionResult
    where
        F: FnMut(&VariableRef<'_>, &str) -> String,
    {
        let references = parse_variables(input);
        if references.is_empty() {
            return ResolutionResult::no_variables(input);
        }

        let mut result = String::with_capacity(input.len());
        let mut missing = Vec::new();
        let mut last_end = 0;

        for var_ref in &references {
            result.push_str(&input[last_end..var_ref.span.start]);

            if let Some(value) = self.values.get(&var_ref.name) {
                result.push_str(value);
            } else {
                let original = &input[var_ref.span.clone()];
                let view = VariableRef {
                    name: &var_ref.name,
                    syntax: var_ref.syntax,
                };
                result.push_str(&unresolved(&view, original));
                missing.push(var_ref.name.clone());
            }

            last_end = var_ref.span.end;
        }

        result.push_str(&input[last_end..]);

        ResolutionResult {
            resolved: result,
            unresolved: missing,
        }
    }
}

/// Borrowed view of an unresolved reference passed to [`VariableResolver::rewrite`].
#[derive(Debug, Clone, Copy)]
pub struct VariableRef<'a> {
    /// Variable name.
    pub name: &'a str,
    /// How the reference was written.
    pub syntax: PlaceholderSyntax,
}

#[cfg(test)]
mod tests {
    use super::*;
    use apidock_domain::EnvironmentVariable;
    use pretty_assertions::assert_eq;

    fn env() -> Environment {
        Environment::new("env1", "c1", "Dev")
            .with_variable(EnvironmentVariable::new("base_url", "https://api.example.com"))
            .with_variable(EnvironmentVariable::new("version", "v2"))
            .with_variable(EnvironmentVariable::secret("token", "s3cr3t"))
            .with_variable(EnvironmentVariable::secret("empty_secret", ""))
    }

    #[test]
    fn test_substitutes_both_syntaxes() {
        let resolver = VariableResolver::from_environment(Some(&env()));
        assert_eq!(
            resolver.substitute("{{base_url}}/${version}/users"),
            "https://api.example.com/v2/users"
        );
    }

    #[test]
    fn test_unknown_placeholders_untouched() {
        let resolver = VariableResolver::from_environment(Some(&env()));
        let result = resolver.resolve("{{base_url}}/{{missing}}/${other}");

        assert_eq!(result.resolved, "https://api.example.com/{{missing}}/${other}");
        assert_eq!(result.unresolved, vec!["missing", "other"]);
        assert!(!result.is_complete());
    }

    #[test]
    fn test_secret_inclusion_rule() {
        let resolver = VariableResolver::from_environment(Some(&env()));
        assert_eq!(resolver.value("token"), Some("s3cr3t"));
        assert_eq!(resolver.value("empty_secret"), None);
        assert_eq!(resolver.substitute("{{empty_secret}}"), "{{empty_secret}}");
    }

    #[test]
    fn test_text_without_matches_is_unchanged() {
        let resolver = VariableResolver::from_environment(Some(&env()));
        let text = "plain text {{unknown}} ${nope} }} {{";
        assert_eq!(resolver.substitute(text), text);
        assert_eq!(VariableResolver::empty().substitute(text), text);
    }

    #[test]
    fn test_no_known_placeholders_remain() {
        let resolver = VariableResolver::from_environment(Some(&env()));
        let out = resolver.substitute("{{base_url}} ${base_url} {{ version }} {{token}}");
        assert!(!out.contains("{{"));
        assert!(!out.contains("${"));
    }

    #[test]
    fn test_rewrite_unresolved() {
        let resolver = VariableResolver::empty().with_value("host", "localhost");
        let result = resolver.rewrite("{{host}}/{{id}}/${ver}", |var, original| {
            match var.syntax {
                PlaceholderSyntax::Mustache => format!("<{}>", var.name),
                PlaceholderSyntax::Dollar => original.to_string(),
            }
        });
        assert_eq!(result.resolved, "localhost/<id>/${ver}");
    }

    #[test]
    fn test_no_environment() {
        let resolver = VariableResolver::from_environment(None);
        assert!(resolver.is_empty());
        assert_eq!(resolver.len(), 0);
    }
}
