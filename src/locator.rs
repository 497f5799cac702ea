//! Natural-key lookup in a listed collection.
//!
//! Resources whose create call is not an upsert cannot be addressed by id
//! until after they exist. The locator finds them by a human-meaningful key
//! (usually `name`) instead. The key can be a top-level field (`name`) or a
//! field one level down (`settings.name`), so no static knowledge of the
//! element type is needed.
//!
//! When several elements share the key, the first one in list order wins.
//! Remote APIs that allow duplicate names cannot be disambiguated here, so
//! the locator only counts the duplicates and leaves reporting to the caller.

use serde::Serialize;
use serde_json::Value;

use crate::error::ReconcileError;

/// A collection element that matched the natural key.
#[derive(Debug, Clone, PartialEq)]
pub struct Located<'a> {
    /// Position of the element in the collection.
    pub index: usize,
    /// The matching element.
    pub element: &'a Value,
    /// Number of further elements that matched the same key.
    pub duplicates: usize,
}

impl Located<'_> {
    /// Read a field of the located element as a string identifier.
    ///
    /// Numeric ids are rendered with their JSON representation.
    pub fn id(&self, id_field: &str) -> Option<String> {
        field_as_id(self.element, id_field)
    }
}

/// Look up `key_field` in an element.
///
/// A top-level field of that name wins. Otherwise `parent.child` addresses a
/// field of a nested object, one level deep only.
pub fn field<'a>(element: &'a Value, key_field: &str) -> Option<&'a Value> {
    let obj = element.as_object()?;
    if let Some(value) = obj.get(key_field) {
        return Some(value);
    }
    key_field.match_indices('.').find_map(|(at, _)| {
        match obj.get(&key_field[..at])? {
            Value::Object(inner) => inner.get(&key_field[at + 1..]),
            _ => None,
        }
    })
}

/// Find the first element whose `key_field` matches `target` under `cmp`.
///
/// Returns `None` when nothing matches; that is an ordinary outcome, not an
/// error.
pub fn locate<'a, F>(
    collection: &'a [Value],
    key_field: &str,
    target: &Value,
    cmp: F,
) -> Option<Located<'a>>
where
    F: Fn(&Value, &Value) -> bool,
{
    let mut matches = collection.iter().enumerate().filter(|(_, element)| {
        field(element, key_field).is_some_and(|candidate| cmp(candidate, target))
    });

    let (index, element) = matches.next()?;
    let duplicates = matches.count();
    Some(Located {
        index,
        element,
        duplicates,
    })
}

/// [`locate`] with exact equality.
pub fn locate_exact<'a>(
    collection: &'a [Value],
    key_field: &str,
    target: &Value,
) -> Option<Located<'a>> {
    locate(collection, key_field, target, |a, b| a == b)
}

/// [`locate`] over typed elements.
///
/// Each element is converted with `serde_json::to_value` before lookup.
/// Returns the index and a clone of the matching element.
pub fn locate_typed<T, F>(
    collection: &[T],
    key_field: &str,
    target: &Value,
    cmp: F,
) -> Result<Option<(usize, T)>, ReconcileError>
where
    T: Serialize + Clone,
    F: Fn(&Value, &Value) -> bool,
{
    let values = collection
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(locate(&values, key_field, target, cmp)
        .map(|found| (found.index, collection[found.index].clone())))
}

pub(crate) fn field_as_id(element: &Value, id_field: &str) -> Option<String> {
    match field(element, id_field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::KeyComparison;
    use serde_json::json;

    fn profiles() -> Vec<Value> {
        vec![
            json!({"id": "Q1", "name": "Profile-A", "settings": {"tier": "gold"}}),
            json!({"id": "Q2", "name": "Profile-B"}),
            json!({"id": 42, "name": "Numeric"}),
        ]
    }

    #[test]
    fn test_locate_present_once() {
        let collection = profiles();
        let found = locate_exact(&collection, "name", &json!("Profile-B")).unwrap();
        assert_eq!(found.index, 1);
        assert_eq!(found.duplicates, 0);
        assert_eq!(found.id("id"), Some("Q2".to_string()));
    }

    #[test]
    fn test_locate_absent() {
        let collection = profiles();
        assert!(locate_exact(&collection, "name", &json!("Profile-Z")).is_none());
        assert!(locate_exact(&collection, "label", &json!("Profile-A")).is_none());
        assert!(locate_exact(&[], "name", &json!("Profile-A")).is_none());
    }

    #[test]
    fn test_duplicates_first_wins() {
        let collection = vec![
            json!({"id": "Q1", "name": "dup"}),
            json!({"id": "Q2", "name": "other"}),
            json!({"id": "Q3", "name": "dup"}),
        ];
        let found = locate_exact(&collection, "name", &json!("dup")).unwrap();
        assert_eq!(found.id("id"), Some("Q1".to_string()));
        assert_eq!(found.duplicates, 1);
    }

    #[test]
    fn test_nested_key_one_level() {
        let collection = profiles();
        let found = locate_exact(&collection, "settings.tier", &json!("gold")).unwrap();
        assert_eq!(found.index, 0);

        let deep = vec![json!({"a": {"b": {"c": 1}}})];
        assert!(locate_exact(&deep, "a.b.c", &json!(1)).is_none());
        assert!(locate_exact(&deep, "a.b", &json!({"c": 1})).is_some());
    }

    #[test]
    fn test_custom_comparator() {
        let collection = profiles();
        let cmp = KeyComparison::CaseInsensitive;
        let found = locate(&collection, "name", &json!("profile-a"), |a, b| cmp.matches(a, b));
        assert_eq!(found.map(|f| f.index), Some(0));
    }

    #[test]
    fn test_numeric_id() {
        let collection = profiles();
        let found = locate_exact(&collection, "name", &json!("Numeric")).unwrap();
        assert_eq!(found.id("id"), Some("42".to_string()));
    }

    #[test]
    fn test_locate_typed() {
        #[derive(Clone, Serialize, Debug, PartialEq)]
        struct Profile {
            id: String,
            name: String,
        }

        let collection = vec![
            Profile {
                id: "Q1".to_string(),
                name: "Profile-A".to_string(),
            },
            Profile {
                id: "Q2".to_string(),
                name: "Profile-B".to_string(),
            },
        ];
        let found = locate_typed(&collection, "name", &json!("Profile-B"), |a, b| a == b)
            .unwrap()
            .unwrap();
        assert_eq!(found.0, 1);
        assert_eq!(found.1.id, "Q2");
    }

    #[test]
    fn test_field_lookup_one_level() {
        let element = json!({"name": "x", "settings": {"tier": "gold"}, "a.b": 1});
        assert_eq!(field(&element, "settings.tier"), Some(&json!("gold")));
        assert_eq!(field(&element, "settings"), Some(&json!({"tier": "gold"})));
        assert_eq!(field(&element, "a.b"), Some(&json!(1)));
        assert_eq!(field(&element, "settings.missing"), None);
        assert_eq!(field(&element, "name.len"), None);
        assert_eq!(field(&json!("scalar"), "name"), None);
    }
}
