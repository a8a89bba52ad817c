//! Create command implementation.

use entidoc_core::{Catalog, EntityId, NewEntity};

use super::{parse_pair, store_for, CommandResult};

/// Creates the entity described by the arguments and returns its id.
///
/// Values are layered over the kind's template, and its unique key is
/// enforced.
pub fn create(
    catalog: &Catalog,
    kind: &str,
    tag: Option<&str>,
    attrs: &[String],
    fields: &[String],
) -> CommandResult<EntityId> {
    let store = store_for(catalog, kind)?;
    let mut entity = NewEntity::new(tag.unwrap_or(&store.schema().tag));
    for arg in attrs {
        let (name, value) = parse_pair(arg)?;
        entity = entity.attribute(name, value);
    }
    for arg in fields {
        let (path, value) = parse_pair(arg)?;
        entity = entity.field(path, value);
    }
    Ok(store.insert(entity)?)
}

/// Runs the create command.
pub fn run(
    catalog: &Catalog,
    kind: &str,
    tag: Option<&str>,
    attrs: &[String],
    fields: &[String],
) -> CommandResult<()> {
    let id = create(catalog, kind, tag, attrs, fields)?;
    println!("{id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use entidoc_core::{Config, EntitySchema};
    use tempfile::tempdir;

    #[test]
    fn creates_users_with_template() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::open_dir(dir.path(), Config::default()).unwrap();
        catalog.bootstrap_standard().unwrap();

        let id = create(
            &catalog,
            "users",
            None,
            &["username=alice".into()],
            &["info/email=a@x.com".into()],
        )
        .unwrap();
        assert_eq!(id, EntityId::new(1));

        let users = catalog.entities(EntitySchema::users()).unwrap();
        assert_eq!(
            users.get_field(id, "info/email").unwrap().as_deref(),
            Some("a@x.com")
        );

        let dup = create(&catalog, "users", None, &["username=alice".into()], &[]);
        assert!(dup.is_err());
    }
}
