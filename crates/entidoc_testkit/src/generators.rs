//! Property-based test generators using proptest.
//!
//! Provides strategies for generating names and values that exercise
//! escaping and the empty-update rewrite.

use entidoc_core::{EntityId, NewEntity};
use proptest::prelude::*;

/// Strategy for generating valid entity ids.
pub fn entity_id_strategy() -> impl Strategy<Value = EntityId> {
    (1u64..10_000).prop_map(EntityId::new)
}

/// Strategy for generating valid XML element and attribute names.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z_][a-zA-Z0-9_.-]{0,15}")
        .expect("Invalid regex")
        .prop_filter("`id` is reserved for the id attribute", |s| s != "id")
}

/// Strategy for generating nested field paths such as `info/email`.
pub fn field_path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(field_name_strategy(), 1..3).prop_map(|segments| segments.join("/"))
}

/// Strategy for generating field values, including markup characters,
/// both quote kinds and line endings.
pub fn field_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 \t\r\n<>&'\"/@=\\[\\]-]{0,32}").expect("Invalid regex")
}

/// Strategy for generating values that are non-empty after trimming.
pub fn non_blank_value_strategy() -> impl Strategy<Value = String> {
    field_value_strategy().prop_filter("value must not be blank", |s| !s.trim().is_empty())
}

/// Strategy for generating a new entity with distinct flat fields.
pub fn new_entity_strategy(tag: &'static str) -> impl Strategy<Value = NewEntity> {
    prop::collection::btree_map(field_name_strategy(), field_value_strategy(), 0..6).prop_map(
        move |fields| {
            fields
                .into_iter()
                .fold(NewEntity::new(tag), |e, (name, value)| e.field(name, value))
        },
    )
}

/// An operation against an entity store.
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// Create an entity with fields
    Create {
        /// Field names and values
        fields: Vec<(String, String)>,
    },
    /// Set a field on an entity
    SetField {
        /// Index into the created entities
        entity: usize,
        /// Field name
        field: String,
        /// New value
        value: String,
    },
    /// Remove an entity
    Remove {
        /// Index into the created entities
        entity: usize,
    },
}

/// Strategy for generating a single store operation.
pub fn store_operation_strategy() -> impl Strategy<Value = StoreOperation> {
    prop_oneof![
        prop::collection::btree_map(field_name_strategy(), field_value_strategy(), 0..4)
            .prop_map(|fields| StoreOperation::Create {
                fields: fields.into_iter().collect(),
            }),
        (any::<usize>(), field_name_strategy(), field_value_strategy()).prop_map(
            |(entity, field, value)| StoreOperation::SetField {
                entity,
                field,
                value,
            }
        ),
        any::<usize>().prop_map(|entity| StoreOperation::Remove { entity }),
    ]
}

/// Strategy for generating a sequence of store operations.
pub fn store_operations_strategy(max_ops: usize) -> impl Strategy<Value = Vec<StoreOperation>> {
    prop::collection::vec(store_operation_strategy(), 1..max_ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entidoc_core::check_name;

    proptest! {
        #[test]
        fn field_names_are_valid(name in field_name_strategy()) {
            prop_assert!(check_name(&name).is_ok());
        }

        #[test]
        fn entities_render(entity in new_entity_strategy("e"), id in entity_id_strategy()) {
            let markup = entity.render("id", id).unwrap();
            let expected_prefix = format!("<e id=\"{id}\"");
            prop_assert!(markup.starts_with(&expected_prefix));
        }
    }
}
