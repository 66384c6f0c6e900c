use crate::Timestamp;
use crate::field::{FieldType, Fields};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Identity of an entity: comparable, orderable, hashable and convertible from a raw string.
pub trait EntityId:
    FieldType + Debug + Display + Clone + Ord + Hash + Send + Sync + Serialize + DeserializeOwned + 'static
{
}

impl<T> EntityId for T where
    T: FieldType
        + Debug
        + Display
        + Clone
        + Ord
        + Hash
        + Send
        + Sync
        + Serialize
        + DeserializeOwned
        + 'static
{
}

/// A uniquely identified record the service layer can manage generically.
///
/// `Default` provides the bare shell used for single-property updates.
/// Serialization must emit fields in the same order as [`Entity::fields`].
pub trait Entity:
    Debug + Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Id: EntityId;

    /// Type name, used to key related-entity collections.
    const NAME: &'static str;

    /// A secondary unique text field, searched by name-based lookups.
    const ALTERNATE_KEY: Option<&'static str> = None;

    fn id(&self) -> &Self::Id;

    fn set_id(&mut self, id: Self::Id);

    fn fields() -> &'static Fields<Self>;

    /// Called by repositories on create, so creation audit fields can be filled in.
    fn stamp_created(&mut self, _at: Timestamp) {}
}
