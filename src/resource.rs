//! Static description of one reconciled resource type.

use serde_json::{Map, Value};

use crate::error::ReconcileError;
use crate::locator::field_as_id;
use crate::remote::Scope;
use crate::schema::Schema;
use crate::selector::ReadVariant;
use crate::types::REDACTED;

/// Default name of the server-assigned identifier attribute.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Default natural key attribute.
pub const DEFAULT_NATURAL_KEY: &str = "name";

/// Everything the engine needs to know about a resource type.
///
/// # Example
///
/// ```
/// use hemmer_reconcile::resource::ResourceDescriptor;
/// use hemmer_reconcile::schema::{Attribute, Schema};
/// use serde_json::json;
///
/// let descriptor = ResourceDescriptor::new(
///     "retention_profile",
///     Schema::v0()
///         .with_attribute("network_id", Attribute::path_string())
///         .with_attribute("id", Attribute::computed_id())
///         .with_attribute("name", Attribute::required_string()),
/// );
///
/// let scope = descriptor.scope(&json!({"network_id": "N1", "name": "Profile-A"})).unwrap();
/// assert_eq!(scope.get("network_id"), Some(&json!("N1")));
/// assert_eq!(descriptor.read_variants().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    /// The resource type name, used in logs and errors.
    pub type_name: String,
    /// The resource schema.
    pub schema: Schema,
    /// Attribute holding the server-assigned identifier.
    pub id_field: String,
    /// Attribute used to locate the remote object before its id is known.
    pub natural_key: String,
    /// Read variants in declaration order, least specific first.
    pub read_variants: Vec<ReadVariant>,
}

impl ResourceDescriptor {
    /// Create a descriptor with the default id field and natural key.
    pub fn new(type_name: impl Into<String>, schema: Schema) -> Self {
        Self {
            type_name: type_name.into(),
            schema,
            id_field: DEFAULT_ID_FIELD.to_string(),
            natural_key: DEFAULT_NATURAL_KEY.to_string(),
            read_variants: Vec::new(),
        }
    }

    /// Use a different identifier attribute.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Use a different natural key attribute.
    pub fn with_natural_key(mut self, natural_key: impl Into<String>) -> Self {
        self.natural_key = natural_key.into();
        self
    }

    /// Append a read variant.
    pub fn with_read_variant(mut self, variant: ReadVariant) -> Self {
        self.read_variants.push(variant);
        self
    }

    /// Path attributes other than the id, which scope list calls.
    pub fn scope_fields(&self) -> Vec<String> {
        self.schema
            .path_attributes()
            .into_iter()
            .filter(|name| *name != self.id_field)
            .collect()
    }

    /// Every addressing-path attribute, including the id.
    pub fn path_fields(&self) -> Vec<String> {
        let mut fields = self.schema.path_attributes();
        if !fields.contains(&self.id_field) {
            fields.push(self.id_field.clone());
        }
        fields
    }

    /// The declared read variants, or a list/item pair derived from the
    /// scope when none were declared.
    pub fn read_variants(&self) -> Vec<ReadVariant> {
        if !self.read_variants.is_empty() {
            return self.read_variants.clone();
        }
        let scope = self.scope_fields();
        let mut item = scope.clone();
        item.push(self.id_field.clone());
        vec![
            ReadVariant::list(format!("list_{}", self.type_name), scope),
            ReadVariant::item(format!("get_{}", self.type_name), item),
        ]
    }

    /// Extract the scope parameters from a state object.
    ///
    /// Fails with [`ReconcileError::Configuration`] if any is missing.
    pub fn scope(&self, state: &Value) -> Result<Scope, ReconcileError> {
        let mut scope = Map::new();
        let mut missing = Vec::new();
        for field in self.scope_fields() {
            match state.get(&field) {
                Some(value) if !value.is_null() => {
                    scope.insert(field, value.clone());
                }
                _ => missing.push(field),
            }
        }
        if missing.is_empty() {
            Ok(scope)
        } else {
            Err(ReconcileError::Configuration(format!(
                "{} is missing scope attribute(s): {}",
                self.type_name,
                missing.join(", ")
            )))
        }
    }

    /// The natural key value of a desired state.
    pub fn natural_key_value<'a>(&self, state: &'a Value) -> Result<&'a Value, ReconcileError> {
        match state.get(&self.natural_key) {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(ReconcileError::Configuration(format!(
                "{} has no value for its natural key '{}'",
                self.type_name, self.natural_key
            ))),
        }
    }

    /// The identifier held by a state object, if any.
    pub fn id_of(&self, state: &Value) -> Option<String> {
        field_as_id(state, &self.id_field)
    }

    /// Build a create/update request body from a desired state.
    ///
    /// Drops null attributes, computed-only attributes, the id and the scope
    /// attributes (which address the call rather than describe the object).
    pub fn request_body(&self, desired: &Value) -> Value {
        let mut skip = self.schema.computed_only_attributes();
        skip.extend(self.path_fields());

        let body = desired
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter(|(name, value)| !value.is_null() && !skip.contains(name))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect::<Map<String, Value>>()
            })
            .unwrap_or_default();
        Value::Object(body)
    }

    /// `field=value` rendering of the natural key, for messages. A sensitive
    /// natural key is rendered as [`REDACTED`].
    pub(crate) fn describe_key(&self, target: &Value) -> String {
        if self.schema.is_sensitive(&self.natural_key) {
            return format!("{}={}", self.natural_key, REDACTED);
        }
        format!("{}={}", self.natural_key, render(target))
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use crate::selector::ReadKind;
    use serde_json::json;

    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new(
            "retention_profile",
            Schema::v0()
                .with_attribute("network_id", Attribute::path_string())
                .with_attribute("id", Attribute::computed_id())
                .with_attribute("name", Attribute::required_string())
                .with_attribute("max_retention_days", Attribute::optional_int64())
                .with_attribute("created_at", Attribute::computed_string()),
        )
    }

    #[test]
    fn test_scope_fields_exclude_id() {
        let descriptor = descriptor();
        assert_eq!(descriptor.scope_fields(), vec!["network_id"]);
        assert_eq!(descriptor.path_fields(), vec!["id", "network_id"]);
    }

    #[test]
    fn test_scope_missing_is_configuration_error() {
        let err = descriptor().scope(&json!({"name": "Profile-A"})).unwrap_err();
        assert!(matches!(err, ReconcileError::Configuration(_)));
        assert!(err.to_string().contains("network_id"));
    }

    #[test]
    fn test_natural_key_value() {
        let descriptor = descriptor();
        let desired = json!({"name": "Profile-A"});
        assert_eq!(descriptor.natural_key_value(&desired).unwrap(), &json!("Profile-A"));
        assert!(descriptor.natural_key_value(&json!({})).is_err());
    }

    #[test]
    fn test_default_read_variants() {
        let variants = descriptor().read_variants();
        assert_eq!(variants[0].kind, ReadKind::List);
        assert_eq!(variants[0].required, vec!["network_id"]);
        assert_eq!(variants[1].kind, ReadKind::Item);
        assert_eq!(variants[1].required, vec!["network_id", "id"]);
    }

    #[test]
    fn test_declared_read_variants_win() {
        let descriptor = descriptor()
            .with_read_variant(ReadVariant::list("getOrganizationProfiles", ["organization_id"]));
        let variants = descriptor.read_variants();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].name, "getOrganizationProfiles");
    }

    #[test]
    fn test_request_body() {
        let body = descriptor().request_body(&json!({
            "network_id": "N1",
            "id": "Q1",
            "name": "Profile-A",
            "max_retention_days": 30,
            "created_at": "ignored",
            "unset": null
        }));
        assert_eq!(body, json!({"name": "Profile-A", "max_retention_days": 30}));
    }

    #[test]
    fn test_id_of_and_describe_key() {
        let descriptor = descriptor().with_natural_key("name");
        assert_eq!(descriptor.id_of(&json!({"id": "Q1"})), Some("Q1".to_string()));
        assert_eq!(descriptor.id_of(&json!({"id": ""})), None);
        assert_eq!(descriptor.id_of(&json!({})), None);
        assert_eq!(descriptor.describe_key(&json!("Profile-A")), "name=Profile-A");
        assert_eq!(descriptor.describe_key(&json!(7)), "name=7");
    }

    #[test]
    fn test_describe_sensitive_key() {
        let descriptor = ResourceDescriptor::new(
            "api_credential",
            Schema::v0()
                .with_attribute("id", Attribute::computed_id())
                .with_attribute("secret_name", Attribute::required_string().sensitive()),
        )
        .with_natural_key("secret_name");
        assert_eq!(
            descriptor.describe_key(&json!("prod-token")),
            "secret_name=(sensitive)"
        );
    }
}
