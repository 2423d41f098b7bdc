//! Typed views over storage entities.
//!
//! Every project-model entity type gets a thin `Copy` wrapper around
//! [`Entity`] with getters named after its fields. The wrappers carry no
//! data of their own; they only fix the entity type at compile time.

use workspace_model_foundation::{EntityId, PersistentId, Result};
use workspace_model_storage::{Entity, ReadStorage};

/// A typed view of one entity type, or of an abstract supertype.
pub trait TypedEntity<'s>: Sized + Copy {
    /// Entity type name; abstract for hierarchy roots.
    const ENTITY_TYPE: &'static str;

    /// Wraps an entity without checking its type.
    fn wrap(entity: Entity<'s>) -> Self;

    /// Returns the wrapped entity.
    fn entity(&self) -> Entity<'s>;

    /// Wraps an entity if its type is [`ENTITY_TYPE`](Self::ENTITY_TYPE) or a subtype.
    fn cast(entity: Entity<'s>) -> Option<Self> {
        entity
            .data()
            .schema()
            .is_subtype_of(Self::ENTITY_TYPE)
            .then(|| Self::wrap(entity))
    }

    /// Returns the entity id.
    fn id(&self) -> EntityId {
        self.entity().id()
    }
}

/// Returns every entity of type `T`, in id order.
///
/// # Errors
///
/// Returns `UnknownEntityType` if the storage does not register `T`.
pub fn all<'s, T, S>(storage: &'s S) -> Result<Vec<T>>
where
    T: TypedEntity<'s>,
    S: ReadStorage + ?Sized,
{
    Ok(cast_all(storage.entities_of_type(T::ENTITY_TYPE)?))
}

/// Returns the entity with the given id if it has type `T`.
///
/// # Errors
///
/// Returns an error if the id is not live.
pub fn get<'s, T, S>(storage: &'s S, id: EntityId) -> Result<Option<T>>
where
    T: TypedEntity<'s>,
    S: ReadStorage + ?Sized,
{
    Ok(T::cast(storage.entity(id)?))
}

/// Resolves a persistent id to an entity of type `T`.
pub fn resolve<'s, T, S>(storage: &'s S, pid: &PersistentId) -> Option<T>
where
    T: TypedEntity<'s>,
    S: ReadStorage + ?Sized,
{
    storage.resolve(pid).and_then(T::cast)
}

pub(crate) fn cast_all<'s, T: TypedEntity<'s>>(entities: Vec<Entity<'s>>) -> Vec<T> {
    entities.into_iter().filter_map(T::cast).collect()
}

macro_rules! typed_entity {
    ($(#[$meta:meta])* $name:ident => $entity_type:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq)]
        pub struct $name<'s>(workspace_model_storage::Entity<'s>);

        impl<'s> $crate::typed::TypedEntity<'s> for $name<'s> {
            const ENTITY_TYPE: &'static str = $entity_type;

            fn wrap(entity: workspace_model_storage::Entity<'s>) -> Self {
                Self(entity)
            }

            fn entity(&self) -> workspace_model_storage::Entity<'s> {
                self.0
            }
        }
    };
}

pub(crate) use typed_entity;
