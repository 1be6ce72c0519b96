//! Node identifiers of the form `<namespace>.<name>`.

use crate::errors::IdentifierError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Namespace marking externally supplied nodes.
pub const CUSTOM_NAMESPACE: &str = "custom";

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap()
    })
}

/// A two-part node key: namespace and local name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeIdentifier {
    namespace: String,
    name: String,
}

impl NodeIdentifier {
    /// Creates an identifier from its parts.
    ///
    /// # Errors
    ///
    /// Returns an error if either part is not a valid segment.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self, IdentifierError> {
        let namespace = namespace.into();
        let name = name.into();

        for (part, label) in [(&namespace, "namespace"), (&name, "name")] {
            if !segment_pattern().is_match(part) {
                return Err(IdentifierError::new(
                    format!("{namespace}.{name}"),
                    format!("{label} '{part}' must match [A-Za-z_][A-Za-z0-9_]*"),
                ));
            }
        }

        Ok(Self { namespace, name })
    }

    /// Creates an identifier for an externally supplied node.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid segment.
    pub fn custom(name: impl Into<String>) -> Result<Self, IdentifierError> {
        Self::new(CUSTOM_NAMESPACE, name)
    }

    /// Parses `<namespace>.<name>`.
    ///
    /// # Errors
    ///
    /// Returns an error unless the input has exactly two valid segments.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let mut parts = value.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(namespace), Some(name), None) => Self::new(namespace, name),
            _ => Err(IdentifierError::new(
                value,
                "expected exactly one '.' separating namespace and name",
            )),
        }
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the local name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true for externally supplied nodes.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.namespace == CUSTOM_NAMESPACE
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

impl FromStr for NodeIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NodeIdentifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NodeIdentifier> for String {
    fn from(id: NodeIdentifier) -> Self {
        id.to_string()
    }
}
