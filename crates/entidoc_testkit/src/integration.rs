//! Model-checking harness for entity stores.
//!
//! The harness applies operations to a real [`EntityStore`] and to a plain
//! map at the same time, then checks that the store agrees with the map.

use std::collections::BTreeMap;

use entidoc_core::{Catalog, CoreError, EntityId, EntitySchema, EntityStore};

use crate::generators::StoreOperation;

/// A test harness that tracks the expected field values of every entity.
pub struct EntityHarness {
    /// The store under test.
    pub store: EntityStore,
    /// Expected fields per live entity.
    entities: BTreeMap<EntityId, BTreeMap<String, String>>,
    /// Ids in creation order, including removed ones.
    created: Vec<EntityId>,
}

impl EntityHarness {
    /// Creates a harness over a fresh in-memory document for `schema`.
    pub fn new(schema: EntitySchema) -> Self {
        let catalog = Catalog::in_memory();
        catalog
            .bootstrap(&schema)
            .expect("Failed to bootstrap document");
        Self::with_store(catalog.entities(schema).expect("Failed to open entity store"))
    }

    /// Creates a harness over an existing, empty store.
    pub fn with_store(store: EntityStore) -> Self {
        Self {
            store,
            entities: BTreeMap::new(),
            created: Vec::new(),
        }
    }

    /// Creates an entity and tracks its fields.
    pub fn create(&mut self, fields: &[(String, String)]) -> EntityId {
        let tag = self.store.schema().tag.clone();
        let borrowed: Vec<(&str, &str)> = fields
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .collect();
        let id = self
            .store
            .create(&tag, &borrowed)
            .expect("Failed to create entity");

        if let Some(last) = self.created.last() {
            assert!(id > *last, "id {id} was not greater than {last}");
        }
        self.created.push(id);
        let tracked = fields.iter().cloned().collect();
        self.entities.insert(id, tracked);
        id
    }

    /// Sets a field, expecting `FieldNotFound` when the model says the
    /// field is absent.
    pub fn set_field(&mut self, id: EntityId, field: &str, value: &str) {
        let result = self.store.set_field(id, field, value);
        match self.entities.get_mut(&id) {
            None => assert!(
                matches!(result, Err(CoreError::EntityNotFound { .. })),
                "expected EntityNotFound for {id}, got {result:?}"
            ),
            Some(fields) => match fields.get_mut(field) {
                None => assert!(
                    matches!(result, Err(CoreError::FieldNotFound { .. })),
                    "expected FieldNotFound for {id}/{field}, got {result:?}"
                ),
                Some(slot) => {
                    result.expect("Failed to set field");
                    *slot = after_update(value);
                }
            },
        }
    }

    /// Removes an entity, expecting `EntityNotFound` when already removed.
    pub fn remove(&mut self, id: EntityId) {
        let result = self.store.remove(id);
        if self.entities.remove(&id).is_some() {
            result.expect("Failed to remove entity");
        } else {
            assert!(
                matches!(result, Err(CoreError::EntityNotFound { .. })),
                "expected EntityNotFound for {id}, got {result:?}"
            );
        }
    }

    /// Applies a generated operation. Entity indexes wrap around the list of
    /// created ids so removed entities are addressed too.
    pub fn apply(&mut self, op: &StoreOperation) {
        match op {
            StoreOperation::Create { fields } => {
                self.create(fields);
            }
            StoreOperation::SetField {
                entity,
                field,
                value,
            } => {
                if let Some(id) = self.pick(*entity) {
                    let field = self.pick_field(id, *entity).unwrap_or_else(|| field.clone());
                    self.set_field(id, &field, value);
                }
            }
            StoreOperation::Remove { entity } => {
                if let Some(id) = self.pick(*entity) {
                    self.remove(id);
                }
            }
        }
    }

    fn pick(&self, index: usize) -> Option<EntityId> {
        if self.created.is_empty() {
            None
        } else {
            Some(self.created[index % self.created.len()])
        }
    }

    /// Prefers an existing field of a live entity so sets usually succeed.
    fn pick_field(&self, id: EntityId, index: usize) -> Option<String> {
        let fields = self.entities.get(&id)?;
        if fields.is_empty() || index % 4 == 0 {
            return None;
        }
        fields.keys().nth(index % fields.len()).cloned()
    }

    /// Verifies every tracked entity and field against the store.
    pub fn verify_all(&self) {
        let ids = self.store.list_ids().expect("Failed to list ids");
        let expected: Vec<EntityId> = self.entities.keys().copied().collect();
        assert_eq!(ids, expected, "live entity ids differ");

        for (id, fields) in &self.entities {
            for (name, value) in fields {
                let actual = self.store.get_field(*id, name).expect("Failed to get field");
                assert_eq!(
                    actual.as_deref(),
                    Some(value.as_str()),
                    "field {name} of entity {id} differs"
                );
            }
        }
    }

    /// Returns the count of live tracked entities.
    pub fn tracked_count(&self) -> usize {
        self.entities.len()
    }
}

/// A blank update empties the field instead of storing the blanks.
fn after_update(value: &str) -> String {
    if value.trim().is_empty() {
        String::new()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::store_operations_strategy;
    use proptest::prelude::*;

    #[test]
    fn test_harness_basic() {
        let mut harness = EntityHarness::new(EntitySchema::tags());
        let id = harness.create(&[("xpath".into(), "//a".into())]);
        harness.set_field(id, "xpath", "//b");
        harness.set_field(id, "missing", "x");
        harness.verify_all();

        let blank = harness.create(&[
            ("xpath".into(), "  ".into()),
            ("order".into(), "\r\n".into()),
        ]);
        harness.verify_all();
        harness.set_field(blank, "order", " ");
        harness.verify_all();

        harness.remove(id);
        harness.remove(id);
        harness.verify_all();
        assert_eq!(harness.tracked_count(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn store_matches_model(ops in store_operations_strategy(24)) {
            let mut harness = EntityHarness::new(EntitySchema::queries());
            for op in &ops {
                harness.apply(op);
            }
            harness.verify_all();
        }
    }
}
