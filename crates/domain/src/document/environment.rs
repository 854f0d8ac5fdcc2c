//! Environment snapshot types

use serde::{Deserialize, Serialize};

/// A single named value in an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    /// Variable name, referenced as `{{key}}` or `${key}`.
    pub key: String,

    /// Variable value.
    #[serde(default)]
    pub value: String,

    /// Whether the value is sensitive.
    #[serde(default)]
    pub is_secret: bool,

    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EnvironmentVariable {
    /// Creates a plain variable.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            is_secret: false,
            description: None,
        }
    }

    /// Creates a secret variable.
    #[must_use]
    pub fn secret(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            is_secret: true,
            ..Self::new(key, value)
        }
    }

    /// Whether the variable takes part in placeholder substitution.
    ///
    /// A non-secret variable always does. A secret one does as soon as it
    /// carries a value.
    #[must_use]
    pub fn is_substitutable(&self) -> bool {
        !self.is_secret || !self.value.is_empty()
    }
}

/// A named set of variables belonging to a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Unique identifier.
    pub id: String,

    /// Owning collection.
    pub collection_id: String,

    /// Environment name.
    pub name: String,

    /// Whether this environment is used when none is selected.
    #[serde(default)]
    pub is_default: bool,

    /// Ordered variables.
    #[serde(default)]
    pub variables: Vec<EnvironmentVariable>,
}

impl Environment {
    /// Creates an empty environment.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        collection_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            collection_id: collection_id.into(),
            name: name.into(),
            is_default: false,
            variables: Vec::new(),
        }
    }

    /// Marks the environment as default.
    #[must_use]
    pub const fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Appends a variable.
    #[must_use]
    pub fn with_variable(mut self, variable: EnvironmentVariable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Looks a variable up by key.
    #[must_use]
    pub fn variable(&self, key: &str) -> Option<&EnvironmentVariable> {
        self.variables.iter().find(|v| v.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutable_rule() {
        assert!(EnvironmentVariable::new("host", "").is_substitutable());
        assert!(EnvironmentVariable::new("host", "localhost").is_substitutable());
        assert!(EnvironmentVariable::secret("token", "abc").is_substitutable());
        assert!(!EnvironmentVariable::secret("token", "").is_substitutable());
    }

    #[test]
    fn test_variable_lookup() {
        let env = Environment::new("env1", "c1", "Dev")
            .with_variable(EnvironmentVariable::new("base_url", "http://localhost"));

        assert!(env.variable("base_url").is_some());
        assert!(env.variable("missing").is_none());
    }
}
