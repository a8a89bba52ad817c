//! Entity store for CRUD operations.

use std::sync::Arc;

use entidoc_session::{DocumentSession, DocumentStore};
use tracing::{info, warn};

use crate::allocator::next_id;
use crate::config::Config;
use crate::entity::{EntityId, FieldValue, NewEntity};
use crate::error::{CoreError, CoreResult};
use crate::fragment::{Payload, Placement, UpdateFragment};
use crate::path::{check_name, FieldPath, PathBuilder};
use crate::schema::{EntitySchema, KeyRef};

/// Opens a session on `document`, runs `f`, and closes the session.
///
/// If `f` returns `Ok`, a failing close is reported. If it returns `Err`,
/// the close is still attempted but its failure is only logged so the
/// original error reaches the caller.
pub(crate) fn with_document<F, T>(
    documents: &dyn DocumentStore,
    document: &str,
    f: F,
) -> CoreResult<T>
where
    F: FnOnce(&mut dyn DocumentSession) -> CoreResult<T>,
{
    let mut session = documents.open(document)?;
    match f(session.as_mut()) {
        Ok(result) => {
            session.close()?;
            Ok(result)
        }
        Err(e) => {
            if let Err(close_err) = session.close() {
                warn!(document, error = %close_err, "failed to close session after error");
            }
            Err(e)
        }
    }
}

/// Entity and field operations on one document.
///
/// The store composes selectors from [`PathBuilder`], mutations from
/// [`UpdateFragment`] and ids from [`next_id`]. Each public method opens
/// one session, issues its queries and mutations, and closes it.
///
/// Creation is not atomic: the id query and the append are separate
/// round trips. Concurrent creators on the same document must be
/// serialized by the caller.
pub struct EntityStore {
    documents: Arc<dyn DocumentStore>,
    schema: EntitySchema,
    paths: PathBuilder,
    strict_lookups: bool,
}

impl EntityStore {
    /// Creates an entity store over `schema.document`.
    ///
    /// No shape check is performed here; see `Catalog::entities`.
    pub fn new(documents: Arc<dyn DocumentStore>, schema: EntitySchema, config: &Config) -> Self {
        Self {
            documents,
            schema,
            paths: PathBuilder::from_config(config),
            strict_lookups: config.strict_lookups,
        }
    }

    /// Returns the schema this store was opened with.
    #[must_use]
    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    /// Returns the selector builder.
    #[must_use]
    pub fn paths(&self) -> &PathBuilder {
        &self.paths
    }

    /// Returns the document name.
    #[must_use]
    pub fn document(&self) -> &str {
        &self.schema.document
    }

    /// Executes a function within one document session.
    ///
    /// The session is closed on every exit path.
    pub fn with_session<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut dyn DocumentSession) -> CoreResult<T>,
    {
        with_document(self.documents.as_ref(), &self.schema.document, f)
    }

    fn entity(&self, id: EntityId) -> String {
        self.paths.entity_by_id(id)
    }

    fn field(&self, id: EntityId, field: &FieldPath) -> String {
        self.paths.field_of(&self.entity(id), field)
    }

    fn attribute(&self, id: EntityId, name: &str) -> CoreResult<String> {
        check_name(name)?;
        if name == self.paths.id_attribute() {
            return Err(CoreError::invalid_name(name));
        }
        Ok(self.paths.attribute_of(&self.entity(id), name))
    }

    fn mutate(&self, session: &mut dyn DocumentSession, fragment: &UpdateFragment) -> CoreResult<u64> {
        session
            .mutate(fragment.as_str())
            .map_err(|err| CoreError::from_mutation(err, fragment.selector()))
    }

    /// Builds the error for an operation that matched nothing: the entity
    /// is missing, or it exists and the field is missing.
    fn missing(
        &self,
        session: &dyn DocumentSession,
        id: EntityId,
        field: &str,
    ) -> CoreResult<CoreError> {
        if session.exists(&self.entity(id))? {
            Ok(CoreError::FieldNotFound {
                document: self.schema.document.clone(),
                id,
                field: field.to_string(),
            })
        } else {
            Ok(self.entity_not_found(id))
        }
    }

    fn entity_not_found(&self, id: EntityId) -> CoreError {
        CoreError::EntityNotFound {
            document: self.schema.document.clone(),
            id,
        }
    }

    fn unique(&self, selector: &str, ids: Vec<EntityId>) -> CoreResult<Option<EntityId>> {
        if ids.len() > 1 && self.strict_lookups {
            return Err(CoreError::AmbiguousMatch {
                document: self.schema.document.clone(),
                selector: selector.to_string(),
                count: ids.len(),
            });
        }
        Ok(ids.into_iter().next())
    }

    fn ids_of(&self, session: &dyn DocumentSession, entities: &str) -> CoreResult<Vec<EntityId>> {
        let selector = self.paths.attribute_of(entities, self.paths.id_attribute());
        session
            .query(&selector)?
            .iter()
            .map(|value| value.parse())
            .collect()
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Creates an entity with text fields and returns its new id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` for invalid tag or field names and
    /// `EntityExists` if a unique key supplied in `fields` is taken.
    pub fn create(&self, tag: &str, fields: &[(&str, &str)]) -> CoreResult<EntityId> {
        let entity = fields
            .iter()
            .fold(NewEntity::new(tag), |e, (name, value)| e.field(*name, *value));
        let keys = self.schema.key_values(&entity);
        self.append_entity(&entity, keys)
    }

    /// Creates an entity from the schema template overlaid with `entity`.
    ///
    /// # Errors
    ///
    /// Returns `EntityExists` if the schema's unique key values of `entity`
    /// are already taken.
    pub fn insert(&self, entity: NewEntity) -> CoreResult<EntityId> {
        let keys = self.schema.key_values(&entity);
        let merged = entity.over(&self.schema.template);
        self.append_entity(&merged, keys)
    }

    fn append_entity(
        &self,
        entity: &NewEntity,
        keys: Option<Vec<(KeyRef, String)>>,
    ) -> CoreResult<EntityId> {
        if let Some(keys) = &keys {
            validate_keys(keys)?;
        }

        self.with_session(|session| {
            if let Some(keys) = &keys {
                let selector = self.paths.entity_matching(Some(entity.tag()), keys);
                if session.exists(&selector)? {
                    return Err(CoreError::EntityExists {
                        document: self.schema.document.clone(),
                        description: describe_keys(keys),
                    });
                }
            }

            let id = next_id(session, &self.paths.all_ids())?;
            let markup = entity.render(self.paths.id_attribute(), id)?;
            let fragment = UpdateFragment::append(&self.paths.entities_root(), &markup);
            if self.mutate(session, &fragment)? == 0 {
                return Err(CoreError::malformed_document(
                    self.schema.document.as_str(),
                    "entities root is missing",
                ));
            }

            info!(document = %self.schema.document, tag = entity.tag(), %id, "created entity");
            Ok(id)
        })
    }

    /// Removes an entity.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if no entity has this id.
    pub fn remove(&self, id: EntityId) -> CoreResult<()> {
        self.with_session(|session| {
            let fragment = UpdateFragment::remove(&self.entity(id));
            if self.mutate(session, &fragment)? == 0 {
                return Err(self.entity_not_found(id));
            }
            info!(document = %self.schema.document, %id, "removed entity");
            Ok(())
        })
    }

    /// Removes every entity whose `field` equals `value`; returns how many.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` for an invalid field path.
    pub fn remove_where(&self, field: &str, value: &str) -> CoreResult<u64> {
        let field = FieldPath::parse(field)?;
        let selector = self
            .paths
            .entity_by_predicate(Some(&self.schema.tag), &field, value);
        self.with_session(|session| {
            let removed = self.mutate(session, &UpdateFragment::remove(&selector))?;
            info!(document = %self.schema.document, %field, removed, "removed matching entities");
            Ok(removed)
        })
    }

    /// Returns true if an entity with this id exists.
    pub fn contains(&self, id: EntityId) -> CoreResult<bool> {
        self.exists(&self.entity(id))
    }

    /// Returns true if `expr` selects anything in the document.
    pub fn exists(&self, expr: &str) -> CoreResult<bool> {
        self.with_session(|session| Ok(session.exists(expr)?))
    }

    /// Returns the ids of all entities in document order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` if a stored id is not an integer.
    pub fn list_ids(&self) -> CoreResult<Vec<EntityId>> {
        let all = self.paths.all_entities(None);
        self.with_session(|session| self.ids_of(session, &all))
    }

    /// Returns the number of entities.
    pub fn count(&self) -> CoreResult<usize> {
        let expr = format!("count({})", self.paths.all_entities(None));
        self.with_session(|session| {
            let result = session.query(&expr)?;
            let count = result.first().map(String::as_str).unwrap_or("0");
            count
                .parse()
                .map_err(|_| CoreError::malformed_document(self.schema.document.as_str(), format!("bad count `{count}`")))
        })
    }

    /// Finds the entity whose `field` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousMatch` if several match and lookups are strict.
    pub fn find(&self, field: &str, value: &str) -> CoreResult<Option<EntityId>> {
        let field = FieldPath::parse(field)?;
        let selector = self
            .paths
            .entity_by_predicate(Some(&self.schema.tag), &field, value);
        self.with_session(|session| {
            let ids = self.ids_of(session, &selector)?;
            self.unique(&selector, ids)
        })
    }

    /// Finds every entity whose `field` equals `value`.
    pub fn find_all(&self, field: &str, value: &str) -> CoreResult<Vec<EntityId>> {
        let field = FieldPath::parse(field)?;
        let selector = self
            .paths
            .entity_by_predicate(Some(&self.schema.tag), &field, value);
        self.with_session(|session| self.ids_of(session, &selector))
    }

    /// Finds the entity whose attribute `name` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousMatch` if several match and lookups are strict.
    pub fn find_by_attribute(&self, name: &str, value: &str) -> CoreResult<Option<EntityId>> {
        check_name(name)?;
        let selector = self
            .paths
            .entity_by_attribute(Some(&self.schema.tag), name, value);
        self.with_session(|session| {
            let ids = self.ids_of(session, &selector)?;
            self.unique(&selector, ids)
        })
    }

    /// Finds the entity matching every key part.
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousMatch` if several match and lookups are strict.
    pub fn find_by_key(&self, keys: &[(KeyRef, String)]) -> CoreResult<Option<EntityId>> {
        validate_keys(keys)?;
        let selector = self.paths.entity_matching(Some(&self.schema.tag), keys);
        self.with_session(|session| {
            let ids = self.ids_of(session, &selector)?;
            self.unique(&selector, ids)
        })
    }

    // ------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------

    /// Adds a text field.
    ///
    /// # Errors
    ///
    /// Returns `FieldExists` if the field is present, `EntityNotFound` if the
    /// entity is missing, and `FieldNotFound` naming the parent path if a
    /// nested field's parent is missing.
    pub fn add_field(&self, id: EntityId, field: &str, value: &str) -> CoreResult<()> {
        self.add_field_value(id, field, &FieldValue::Text(value.to_string()))
    }

    /// Adds a field holding `value`.
    ///
    /// # Errors
    ///
    /// See [`EntityStore::add_field`].
    pub fn add_field_value(&self, id: EntityId, field: &str, value: &FieldValue) -> CoreResult<()> {
        let path = FieldPath::parse(field)?;
        let markup = element_markup(path.leaf(), value);
        let parent = match path.parent() {
            Some(parent) => self.field(id, &parent),
            None => self.entity(id),
        };

        self.with_session(|session| {
            if session.exists(&self.field(id, &path))? {
                return Err(CoreError::FieldExists {
                    document: self.schema.document.clone(),
                    id,
                    field: path.to_string(),
                });
            }
            if self.mutate(session, &UpdateFragment::append(&parent, &markup))? == 0 {
                let parent_name = path.parent().map(|p| p.to_string()).unwrap_or_default();
                return Err(self.missing(session, id, &parent_name)?);
            }
            Ok(())
        })
    }

    /// Removes a field.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotFound` or `EntityNotFound` if nothing was removed.
    pub fn remove_field(&self, id: EntityId, field: &str) -> CoreResult<()> {
        let path = FieldPath::parse(field)?;
        self.with_session(|session| {
            let selector = self.field(id, &path);
            if self.mutate(session, &UpdateFragment::remove(&selector))? == 0 {
                return Err(self.missing(session, id, field)?);
            }
            Ok(())
        })
    }

    /// Returns the text of a field, or `None` if the field or entity is absent.
    pub fn get_field(&self, id: EntityId, field: &str) -> CoreResult<Option<String>> {
        let path = FieldPath::parse(field)?;
        let expr = format!("{}[1]/string()", self.field(id, &path));
        self.with_session(|session| Ok(session.query(&expr)?.into_iter().next()))
    }

    /// Returns the markup of a field element, or `None` if absent.
    pub fn get_field_markup(&self, id: EntityId, field: &str) -> CoreResult<Option<String>> {
        let path = FieldPath::parse(field)?;
        let expr = format!("{}[1]", self.field(id, &path));
        self.with_session(|session| Ok(session.query(&expr)?.into_iter().next()))
    }

    /// Replaces the text of a field.
    ///
    /// An empty (or blank) value leaves the field present with no content.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotFound` if the field is absent; it is not created.
    pub fn set_field(&self, id: EntityId, field: &str, value: &str) -> CoreResult<()> {
        self.set_field_payload(id, field, &Payload::text(value))
    }

    /// Replaces the content of a field with markup.
    ///
    /// # Errors
    ///
    /// See [`EntityStore::set_field`].
    pub fn set_field_markup(&self, id: EntityId, field: &str, markup: &str) -> CoreResult<()> {
        self.set_field_payload(id, field, &Payload::markup(markup))
    }

    fn set_field_payload(&self, id: EntityId, field: &str, payload: &Payload) -> CoreResult<()> {
        let path = FieldPath::parse(field)?;
        self.with_session(|session| {
            let selector = self.field(id, &path);
            if !session.exists(&selector)? {
                return Err(self.missing(session, id, field)?);
            }
            self.mutate(session, &UpdateFragment::update(&selector, payload))?;
            Ok(())
        })
    }

    /// Returns true if the entity has the field.
    pub fn has_field(&self, id: EntityId, field: &str) -> CoreResult<bool> {
        let path = FieldPath::parse(field)?;
        self.exists(&self.field(id, &path))
    }

    /// Returns the names of the entity's direct fields in document order.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is missing.
    pub fn field_names(&self, id: EntityId) -> CoreResult<Vec<String>> {
        let expr = format!("{}/*/name()", self.entity(id));
        self.with_session(|session| {
            let names = session.query(&expr)?;
            if names.is_empty() && !session.exists(&self.entity(id))? {
                return Err(self.entity_not_found(id));
            }
            Ok(names)
        })
    }

    /// Returns the text of `field` across all entities, in document order.
    pub fn values_of(&self, field: &str) -> CoreResult<Vec<String>> {
        let path = FieldPath::parse(field)?;
        let expr = format!(
            "{}/{}/string()",
            self.paths.all_entities(Some(&self.schema.tag)),
            path
        );
        self.with_session(|session| Ok(session.query(&expr)?))
    }

    /// Renames a field element.
    ///
    /// # Errors
    ///
    /// Returns `FieldExists` if the entity already has a sibling with the new
    /// name, and `FieldNotFound` or `EntityNotFound` if nothing was renamed.
    pub fn rename_field(&self, id: EntityId, field: &str, new_name: &str) -> CoreResult<()> {
        let path = FieldPath::parse(field)?;
        check_name(new_name)?;
        let target = match path.parent() {
            Some(parent) => FieldPath::parse(&format!("{parent}/{new_name}"))?,
            None => FieldPath::parse(new_name)?,
        };
        self.with_session(|session| {
            if session.exists(&self.field(id, &target))? {
                return Err(CoreError::FieldExists {
                    document: self.schema.document.clone(),
                    id,
                    field: target.to_string(),
                });
            }
            let fragment = UpdateFragment::rename(&self.field(id, &path), new_name);
            if self.mutate(session, &fragment)? == 0 {
                return Err(self.missing(session, id, field)?);
            }
            Ok(())
        })
    }

    /// Inserts a new text field immediately before `anchor`.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotFound` or `EntityNotFound` if `anchor` is absent.
    pub fn insert_field_before(
        &self,
        id: EntityId,
        anchor: &str,
        name: &str,
        value: &str,
    ) -> CoreResult<()> {
        self.insert_field(id, anchor, name, value, Placement::Before)
    }

    /// Inserts a new text field immediately after `anchor`.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotFound` or `EntityNotFound` if `anchor` is absent.
    pub fn insert_field_after(
        &self,
        id: EntityId,
        anchor: &str,
        name: &str,
        value: &str,
    ) -> CoreResult<()> {
        self.insert_field(id, anchor, name, value, Placement::After)
    }

    fn insert_field(
        &self,
        id: EntityId,
        anchor: &str,
        name: &str,
        value: &str,
        placement: Placement,
    ) -> CoreResult<()> {
        let anchor_path = FieldPath::parse(anchor)?;
        check_name(name)?;
        let markup = element_markup(name, &FieldValue::Text(value.to_string()));
        let selector = format!("{}[1]", self.field(id, &anchor_path));
        let fragment = match placement {
            Placement::Before => UpdateFragment::insert_before(&selector, &markup),
            _ => UpdateFragment::insert_after(&selector, &markup),
        };
        self.with_session(|session| {
            if self.mutate(session, &fragment)? == 0 {
                return Err(self.missing(session, id, anchor)?);
            }
            Ok(())
        })
    }

    /// Copies a field (with its subtree) to the end of another entity.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotFound` or `EntityNotFound` for a missing source and
    /// `EntityNotFound` for a missing destination.
    pub fn copy_field(&self, from: EntityId, field: &str, to: EntityId) -> CoreResult<()> {
        self.transfer_field(from, field, to, false)
    }

    /// Moves a field (with its subtree) to the end of another entity.
    ///
    /// # Errors
    ///
    /// See [`EntityStore::copy_field`].
    pub fn move_field(&self, from: EntityId, field: &str, to: EntityId) -> CoreResult<()> {
        self.transfer_field(from, field, to, true)
    }

    fn transfer_field(&self, from: EntityId, field: &str, to: EntityId, remove: bool) -> CoreResult<()> {
        let path = FieldPath::parse(field)?;
        let source = self.field(from, &path);
        let destination = self.entity(to);
        self.with_session(|session| {
            if !session.exists(&source)? {
                return Err(self.missing(session, from, field)?);
            }
            if !session.exists(&destination)? {
                return Err(self.entity_not_found(to));
            }
            let fragment = if remove {
                UpdateFragment::move_to(&source, &destination, Placement::Inside)
            } else {
                UpdateFragment::copy(&source, &destination, Placement::Inside)
            };
            self.mutate(session, &fragment)?;
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Returns an attribute of the entity, or `None` if absent.
    pub fn get_attribute(&self, id: EntityId, name: &str) -> CoreResult<Option<String>> {
        let selector = self.attribute(id, name)?;
        self.with_session(|session| Ok(session.query(&selector)?.into_iter().next()))
    }

    /// Adds (or overwrites) an attribute of the entity.
    ///
    /// # Errors
    ///
    /// Returns `EntityNotFound` if the entity is missing.
    pub fn add_attribute(&self, id: EntityId, name: &str, value: &str) -> CoreResult<()> {
        self.attribute(id, name)?;
        let fragment = UpdateFragment::add_attribute(&self.entity(id), name, value);
        self.with_session(|session| {
            if self.mutate(session, &fragment)? == 0 {
                return Err(self.entity_not_found(id));
            }
            Ok(())
        })
    }

    /// Updates an existing attribute; an empty value keeps it present but empty.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotFound` (naming `@name`) if the attribute is absent.
    pub fn set_attribute(&self, id: EntityId, name: &str, value: &str) -> CoreResult<()> {
        let selector = self.attribute(id, name)?;
        self.with_session(|session| {
            if !session.exists(&selector)? {
                return Err(self.missing(session, id, &format!("@{name}"))?);
            }
            self.mutate(session, &UpdateFragment::update(&selector, &Payload::text(value)))?;
            Ok(())
        })
    }

    /// Removes an attribute.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotFound` or `EntityNotFound` if nothing was removed.
    pub fn remove_attribute(&self, id: EntityId, name: &str) -> CoreResult<()> {
        let selector = self.attribute(id, name)?;
        self.with_session(|session| {
            if self.mutate(session, &UpdateFragment::remove(&selector))? == 0 {
                return Err(self.missing(session, id, &format!("@{name}"))?);
            }
            Ok(())
        })
    }
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("document", &self.schema.document)
            .field("tag", &self.schema.tag)
            .finish_non_exhaustive()
    }
}

fn element_markup(name: &str, value: &FieldValue) -> String {
    let inner = value.render();
    if inner.is_empty() {
        format!("<{name}/>")
    } else {
        format!("<{name}>{inner}</{name}>")
    }
}

fn validate_keys(keys: &[(KeyRef, String)]) -> CoreResult<()> {
    for (key, _) in keys {
        match key {
            KeyRef::Field(path) => {
                FieldPath::parse(path)?;
            }
            KeyRef::Attribute(name) => {
                check_name(name)?;
            }
        }
    }
    Ok(())
}

fn describe_keys(keys: &[(KeyRef, String)]) -> String {
    keys.iter()
        .map(|(key, value)| format!("{}={value:?}", key.selector()))
        .collect::<Vec<_>>()
        .join(", ")
}
