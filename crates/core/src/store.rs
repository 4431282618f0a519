//! Object store abstraction.
//!
//! Actions, validations, and completions reach configuration objects only
//! through [`ObjectStore`], so the engine can run against the controller's
//! REST store or against the in-memory [`MemoryStore`] used by the CLI and
//! the tests.

use crate::error::StoreError;
use sdnsh_grammar_tables::FieldValues;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Keyed collections of objects, one collection per object type.
pub trait ObjectStore {
    /// Fetch one object.
    fn get(&self, obj_type: &str, key: &str) -> Result<FieldValues, StoreError>;

    /// Every object of `obj_type` whose fields equal all of `filter`, in
    /// key order.
    fn query(
        &self,
        obj_type: &str,
        filter: &FieldValues,
    ) -> Result<Vec<(String, FieldValues)>, StoreError>;

    /// Insert an object, replacing any existing object with the same key.
    fn create(&mut self, obj_type: &str, key: &str, fields: FieldValues)
    -> Result<(), StoreError>;

    /// Merge `fields` into an existing object. A `null` value removes the
    /// field.
    fn update(&mut self, obj_type: &str, key: &str, fields: FieldValues)
    -> Result<(), StoreError>;

    /// Remove an object.
    fn delete(&mut self, obj_type: &str, key: &str) -> Result<(), StoreError>;

    /// Whether an object exists.
    fn exists(&self, obj_type: &str, key: &str) -> Result<bool, StoreError> {
        match self.get(obj_type, key) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Keys of every object of `obj_type`, in key order.
    fn keys(&self, obj_type: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .query(obj_type, &FieldValues::new())?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }
}

/// In-memory object store.
///
/// Serializes as `{ "<objType>": { "<key>": { fields } } }`, which is also
/// the format of the CLI's `--store` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStore {
    objects: BTreeMap<String, BTreeMap<String, FieldValues>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a store snapshot written as JSON or JSONC.
    pub fn from_jsonc(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(&sdnsh_jsonc_strip::strip_jsonc(text))
    }

    /// Builder-style insert, for fixtures.
    #[must_use]
    pub fn with_object(mut self, obj_type: &str, key: &str, fields: FieldValues) -> Self {
        self.objects
            .entry(obj_type.to_string())
            .or_default()
            .insert(key.to_string(), fields);
        self
    }

    /// Number of objects of `obj_type`.
    pub fn count(&self, obj_type: &str) -> usize {
        self.objects.get(obj_type).map_or(0, BTreeMap::len)
    }
}

fn not_found(obj_type: &str, key: &str) -> StoreError {
    StoreError::NotFound {
        obj_type: obj_type.to_string(),
        key: key.to_string(),
    }
}

impl ObjectStore for MemoryStore {
    fn get(&self, obj_type: &str, key: &str) -> Result<FieldValues, StoreError> {
        self.objects
            .get(obj_type)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| not_found(obj_type, key))
    }

    fn query(
        &self,
        obj_type: &str,
        filter: &FieldValues,
    ) -> Result<Vec<(String, FieldValues)>, StoreError> {
        let Some(objects) = self.objects.get(obj_type) else {
            return Ok(Vec::new());
        };
        Ok(objects
            .iter()
            .filter(|(_, fields)| filter.iter().all(|(k, v)| fields.get(k) == Some(v)))
            .map(|(key, fields)| (key.clone(), fields.clone()))
            .collect())
    }

    fn create(
        &mut self,
        obj_type: &str,
        key: &str,
        fields: FieldValues,
    ) -> Result<(), StoreError> {
        let fields = fields.into_iter().filter(|(_, v)| !v.is_null()).collect();
        self.objects
            .entry(obj_type.to_string())
            .or_default()
            .insert(key.to_string(), fields);
        Ok(())
    }

    fn update(
        &mut self,
        obj_type: &str,
        key: &str,
        fields: FieldValues,
    ) -> Result<(), StoreError> {
        let object = self
            .objects
            .get_mut(obj_type)
            .and_then(|objects| objects.get_mut(key))
            .ok_or_else(|| not_found(obj_type, key))?;
        for (name, value) in fields {
            if value.is_null() {
                object.remove(&name);
            } else {
                object.insert(name, value);
            }
        }
        Ok(())
    }

    fn delete(&mut self, obj_type: &str, key: &str) -> Result<(), StoreError> {
        self.objects
            .get_mut(obj_type)
            .and_then(|objects| objects.remove(key))
            .map(|_| ())
            .ok_or_else(|| not_found(obj_type, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, serde_json::Value)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn create_get_delete() {
        let mut store = MemoryStore::new();
        store
            .create("switch", "00:01", fields(&[("alias", json!("core"))]))
            .unwrap();
        assert_eq!(store.get("switch", "00:01").unwrap()["alias"], "core");
        assert!(store.exists("switch", "00:01").unwrap());
        store.delete("switch", "00:01").unwrap();
        assert!(!store.exists("switch", "00:01").unwrap());
        assert!(matches!(
            store.delete("switch", "00:01"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn update_merges_and_null_removes() {
        let mut store = MemoryStore::new().with_object(
            "switch",
            "s1",
            fields(&[("alias", json!("a")), ("core", json!(true))]),
        );
        store
            .update(
                "switch",
                "s1",
                fields(&[("alias", json!("b")), ("core", json!(null))]),
            )
            .unwrap();
        let s1 = store.get("switch", "s1").unwrap();
        assert_eq!(s1["alias"], "b");
        assert!(!s1.contains_key("core"));
        assert!(store.update("switch", "s2", FieldValues::new()).is_err());
    }

    #[test]
    fn query_filters_on_every_field() {
        let store = MemoryStore::new()
            .with_object("port", "eth1", fields(&[("vlan", json!(10))]))
            .with_object("port", "eth2", fields(&[("vlan", json!(20))]))
            .with_object("port", "eth3", fields(&[("vlan", json!(10))]));
        let hits = store
            .query("port", &fields(&[("vlan", json!(10))]))
            .unwrap();
        let keys: Vec<_> = hits.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["eth1", "eth3"]);
        assert_eq!(store.keys("port").unwrap().len(), 3);
        assert!(store.keys("vlan").unwrap().is_empty());
    }

    #[test]
    fn snapshot_format() {
        let store = MemoryStore::from_jsonc(
            r#"{ "switch": { "00:00:00:00:00:00:00:01": { "alias": "core" } } }"#,
        )
        .unwrap();
        assert_eq!(store.count("switch"), 1);
        let back = serde_json::to_value(&store).unwrap();
        assert_eq!(back["switch"]["00:00:00:00:00:00:00:01"]["alias"], "core");
    }
}
