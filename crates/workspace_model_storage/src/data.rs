//! Entity payloads.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use workspace_model_foundation::{
    EntityId, EntitySource, Error, PersistentId, Result, Value, VirtualFileUrl,
};

use crate::entity::Entity;
use crate::builder::EntityBuilder;
use crate::schema::{EntitySchema, FieldSchema};
use crate::state::StorageState;

static NULL: Value = Value::Null;

static NEXT_ORIGIN: AtomicU64 = AtomicU64::new(1);

/// Value of a field that was never set: an error if required, else the default.
pub(crate) fn read_unset(
    schema: &'static EntitySchema,
    field: &'static FieldSchema,
) -> Result<&'static Value> {
    if field.required {
        return Err(Error::uninitialized_field(schema.name, field.name));
    }
    Ok(field.default.as_ref().unwrap_or(&NULL))
}

/// Scalar fields and provenance of one entity.
///
/// Committed data is immutable and shared between snapshots behind an
/// `Arc`. An unset field is absent from the map; reading it is an error for
/// required fields and yields the schema default for optional ones.
///
/// Every entity carries an origin tag assigned when it is first added. The
/// tag survives modification and snapshotting, so builders can tell whether
/// a storage holds the very entity they created or merely one at the same id.
#[derive(Clone)]
pub struct EntityData {
    schema: &'static EntitySchema,
    source: EntitySource,
    fields: im::OrdMap<&'static str, Value>,
    origin: u64,
}

impl EntityData {
    pub(crate) fn new(
        schema: &'static EntitySchema,
        source: EntitySource,
        fields: im::OrdMap<&'static str, Value>,
    ) -> Self {
        Self {
            schema,
            source,
            fields,
            origin: NEXT_ORIGIN.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Returns a copy with overridden source and fields, keeping the origin.
    pub(crate) fn with_overrides(
        &self,
        source: Option<&EntitySource>,
        overrides: &im::OrdMap<&'static str, Value>,
    ) -> Self {
        Self {
            schema: self.schema,
            source: source.cloned().unwrap_or_else(|| self.source.clone()),
            fields: overrides.clone().union(self.fields.clone()),
            origin: self.origin,
        }
    }

    pub(crate) fn origin(&self) -> u64 {
        self.origin
    }

    /// Returns the schema of this entity.
    #[must_use]
    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    /// Returns the entity type name.
    #[must_use]
    pub fn entity_type(&self) -> &'static str {
        self.schema.name
    }

    /// Returns the provenance tag.
    #[must_use]
    pub fn source(&self) -> &EntitySource {
        &self.source
    }

    /// Reads a scalar field.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` if the schema declares no such field and
    /// `UninitializedField` if a required field was never set.
    pub fn get(&self, field: &str) -> Result<&Value> {
        let schema = self.schema.expect_field(field)?;
        match self.fields.get(field) {
            Some(value) => Ok(value),
            None => read_unset(self.schema, schema),
        }
    }

    /// Returns true if the field has been set.
    #[must_use]
    pub fn is_initialized(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Iterates over the set fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    /// Verifies that every required field is set.
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` naming the first unset field.
    pub fn check_initialized(&self) -> Result<()> {
        match self
            .schema
            .fields
            .iter()
            .find(|f| f.required && !self.fields.contains_key(f.name))
        {
            Some(missing) => Err(Error::missing_required_field(self.schema.name, missing.name)),
            None => Ok(()),
        }
    }

    /// Computes the persistent id, if the type has one.
    ///
    /// # Errors
    ///
    /// Propagates errors of the schema's id function, typically an
    /// uninitialized component field.
    pub fn persistent_id(&self) -> Result<Option<PersistentId>> {
        self.schema.persistent_id.map(|f| f(self)).transpose()
    }

    /// Collects every persistent id this entity links to.
    #[must_use]
    pub fn soft_links(&self) -> BTreeSet<PersistentId> {
        self.fields
            .values()
            .flat_map(Value::linked_ids)
            .collect()
    }

    /// Collects the urls of indexed fields, per field.
    #[must_use]
    pub fn indexed_urls(&self) -> Vec<(&'static str, Vec<VirtualFileUrl>)> {
        self.schema
            .indexed_fields()
            .map(|f| {
                let urls = self.fields.get(f.name).map(Value::urls).unwrap_or_default();
                (f.name, urls)
            })
            .collect()
    }

    /// Replaces every link to `old` with a link to `new`.
    ///
    /// Returns true if any field changed.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if a rewritten field no longer fits its type,
    /// e.g. an `Id("ArtifactId")` field asked to hold a module id. The data
    /// is left unchanged in that case.
    pub fn update_link(&mut self, old: &PersistentId, new: &PersistentId) -> Result<bool> {
        let mut fields = self.fields.clone();
        let mut changed = false;
        for (field, value) in &self.fields {
            let Some(replaced) = value.replace_id(old, new) else {
                continue;
            };
            if let Some(schema) = self.schema.field(field) {
                if !schema.ty.accepts(&replaced) {
                    return Err(Error::type_mismatch(
                        self.schema.name,
                        field,
                        schema.ty.clone(),
                        replaced.type_name().to_string(),
                    ));
                }
            }
            fields.insert(*field, replaced);
            changed = true;
        }
        self.fields = fields;
        Ok(changed)
    }

    /// Iterates over set fields whose value does not fit the field type.
    pub fn mistyped_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.schema.fields.iter().filter_map(|f| match self.fields.get(f.name) {
            Some(value) if !f.ty.accepts(value) => Some(f.name),
            _ => None,
        })
    }

    /// Returns the names of fields that differ from `other`.
    #[must_use]
    pub fn changed_fields(&self, other: &EntityData) -> Vec<&'static str> {
        self.schema
            .fields
            .iter()
            .map(|f| f.name)
            .filter(|name| self.fields.get(name) != other.fields.get(name))
            .collect()
    }

    /// Structural equality ignoring provenance.
    #[must_use]
    pub fn equals_ignoring_entity_source(&self, other: &EntityData) -> bool {
        self.schema.name == other.schema.name && self.fields == other.fields
    }

    /// Creates a builder that modifies this entity.
    ///
    /// Only the source is copied eagerly; fields read through to `data`
    /// until they are overwritten.
    pub(crate) fn wrap_as_modifiable(
        data: &Arc<EntityData>,
        id: EntityId,
        base_refs: BTreeMap<&'static str, im::Vector<EntityId>>,
    ) -> EntityBuilder {
        EntityBuilder::modifying(id, Arc::clone(data), base_refs)
    }

    /// Creates a read view of this data bound to a storage.
    #[must_use]
    pub fn create_entity<'s>(&'s self, id: EntityId, state: &'s StorageState) -> Entity<'s> {
        Entity::new(id, self, state)
    }
}

impl PartialEq for EntityData {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.equals_ignoring_entity_source(other)
    }
}

impl Eq for EntityData {}

impl fmt::Debug for EntityData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.schema.name);
        for (name, value) in &self.fields {
            s.field(name, value);
        }
        s.field("source", &self.source).finish()
    }
}
