//! Schema types describing the shape of a reconciled resource.
//!
//! The engine only needs a thin view of a resource's schema: which attributes
//! exist, their types, whether they are required, computed or part of the
//! resource's addressing path. Path attributes (for example `network_id` and
//! `id`) scope list calls and are the only ones refreshed by a path-only merge.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The type of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string value.
    String,
    /// A 64-bit integer.
    Int64,
    /// A 64-bit floating point number.
    Float64,
    /// A boolean value.
    Bool,
    /// A list of values of a single type.
    List(Box<AttributeType>),
    /// A set of unique values of a single type.
    Set(Box<AttributeType>),
    /// A map from string keys to values of a single type.
    Map(Box<AttributeType>),
    /// An object with a fixed set of attributes.
    Object(HashMap<String, AttributeType>),
    /// A dynamic type that can hold any value.
    Dynamic,
}

impl AttributeType {
    /// Create a list type.
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }

    /// Create a set type.
    pub fn set(element_type: AttributeType) -> Self {
        Self::Set(Box::new(element_type))
    }

    /// Create a map type.
    pub fn map(element_type: AttributeType) -> Self {
        Self::Map(Box::new(element_type))
    }

    /// Create an object type.
    pub fn object(attributes: HashMap<String, AttributeType>) -> Self {
        Self::Object(attributes)
    }
}

/// Describes how an attribute can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// The attribute is required in configuration.
    pub required: bool,
    /// The attribute is optional in configuration.
    pub optional: bool,
    /// The attribute is computed by the remote (read-only).
    pub computed: bool,
    /// The attribute is sensitive and should be hidden in logs.
    pub sensitive: bool,
    /// The attribute is part of the resource's addressing path.
    #[serde(default)]
    pub path: bool,
}

impl AttributeFlags {
    /// Create flags for a required attribute.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Create flags for an optional attribute.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    /// Create flags for a computed attribute.
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Create flags for an optional+computed attribute.
    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Default::default()
        }
    }

    /// Mark the attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Mark the attribute as part of the addressing path.
    pub fn path(mut self) -> Self {
        self.path = true;
        self
    }

    /// Whether only the remote may set this attribute.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// Describes a single attribute in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// The type of the attribute.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Flags describing how the attribute can be used.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Human-readable description of the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Attribute {
    /// Create a new attribute with the given type and flags.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
        }
    }

    /// Create a required string attribute.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    /// Create an optional string attribute.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// Create a computed string attribute.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    /// Create a required int64 attribute.
    pub fn required_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::required())
    }

    /// Create an optional int64 attribute.
    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional())
    }

    /// Create an optional bool attribute.
    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional())
    }

    /// Create a required string that addresses the resource's parent scope.
    ///
    /// ```
    /// use hemmer_reconcile::schema::Attribute;
    ///
    /// let network_id = Attribute::path_string();
    /// assert!(network_id.flags.required);
    /// assert!(network_id.flags.path);
    /// ```
    pub fn path_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required().path())
    }

    /// Create a server-assigned identifier attribute.
    pub fn computed_id() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional_computed().path())
    }

    /// Set the description for this attribute.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark this attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }
}

/// Schema for a reconciled resource or data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The version of this schema.
    #[serde(default)]
    pub version: u64,
    /// Attributes keyed by name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Attribute>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Schema {
    /// Create a new schema with the given version.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            attributes: HashMap::new(),
            description: None,
        }
    }

    /// Create a schema at version 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Add an attribute to the schema.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Set the description for this schema.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Names of the addressing-path attributes, sorted.
    pub fn path_attributes(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .attributes
            .iter()
            .filter(|(_, attr)| attr.flags.path)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Names of the attributes only the remote may set, sorted.
    pub fn computed_only_attributes(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .attributes
            .iter()
            .filter(|(_, attr)| attr.flags.is_computed_only())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Names of the sensitive attributes, sorted.
    pub fn sensitive_attributes(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .attributes
            .iter()
            .filter(|(_, attr)| attr.flags.sensitive)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Whether the named attribute is marked sensitive.
    pub fn is_sensitive(&self, name: &str) -> bool {
        self.attributes
            .get(name)
            .map(|attr| attr.flags.sensitive)
            .unwrap_or(false)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v0()
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// An error that prevents the operation from completing.
    Error,
    /// A warning that doesn't prevent the operation.
    Warning,
}

/// A diagnostic message reported to the host framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: DiagnosticSeverity,
    /// A short summary of the issue.
    pub summary: String,
    /// A detailed description of the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// The attribute path where the issue occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Add detail to this diagnostic.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path for this diagnostic.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether this is an error diagnostic.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retention_profile() -> Schema {
        Schema::v0()
            .with_attribute("network_id", Attribute::path_string())
            .with_attribute("id", Attribute::computed_id())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("max_retention_days", Attribute::optional_int64())
            .with_attribute("created_at", Attribute::computed_string())
            .with_attribute("api_key", Attribute::optional_string().sensitive())
    }

    #[test]
    fn test_attribute_flags() {
        let path = AttributeFlags::required().path();
        assert!(path.required);
        assert!(path.path);
        assert!(!path.computed);

        let computed = AttributeFlags::computed();
        assert!(computed.is_computed_only());

        let optional_computed = AttributeFlags::optional_computed();
        assert!(!optional_computed.is_computed_only());
    }

    #[test]
    fn test_path_attributes_sorted() {
        let schema = retention_profile();
        assert_eq!(schema.path_attributes(), vec!["id", "network_id"]);
    }

    #[test]
    fn test_computed_only_attributes() {
        let schema = retention_profile();
        assert_eq!(schema.computed_only_attributes(), vec!["created_at"]);
    }

    #[test]
    fn test_sensitive_lookup() {
        let schema = retention_profile();
        assert!(schema.is_sensitive("api_key"));
        assert!(!schema.is_sensitive("name"));
        assert!(!schema.is_sensitive("missing"));
        assert_eq!(schema.sensitive_attributes(), vec!["api_key"]);
    }

    #[test]
    fn test_schema_serde_keeps_path_flag() {
        let schema = Schema::v0().with_attribute("network_id", Attribute::path_string());
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["attributes"]["network_id"]["path"], true);

        let back: Schema = serde_json::from_value(json).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_diagnostic() {
        let err = Diagnostic::error("Invalid configuration")
            .with_detail("The value must be positive")
            .with_attribute("max_retention_days");

        assert!(err.is_error());
        assert_eq!(err.summary, "Invalid configuration");
        assert_eq!(err.attribute, Some("max_retention_days".to_string()));
        assert!(!Diagnostic::warning("heads up").is_error());
    }
}
