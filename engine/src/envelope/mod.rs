//! The wire wrapper around one entity and whatever related entities were attached to it.
//!
//! Field order is fixed by the `Serialize` impls below, not by derive, because
//! consumers compare the serialized bytes.
use crate::Entity;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::value::RawValue;

mod serializer;

pub use serializer::{to_json, to_json_string};

/// An entity from another service, carried as already-serialized JSON.
#[derive(Debug, Clone)]
pub struct RelatedEntity {
    id: String,
    object: Box<RawValue>,
    uri: Option<String>,
}

impl RelatedEntity {
    /// `json` is kept byte for byte, whitespace included.
    pub fn new(id: impl Into<String>, json: impl Into<String>) -> serde_json::Result<Self> {
        Ok(Self {
            id: id.into(),
            object: RawValue::from_string(json.into())?,
            uri: None,
        })
    }

    pub fn from_entity<R: Entity>(entity: &R) -> serde_json::Result<Self> {
        Ok(Self {
            id: entity.id().to_string(),
            object: serde_json::value::to_raw_value(entity)?,
            uri: None,
        })
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn json(&self) -> &str {
        self.object.get()
    }
}

impl Serialize for RelatedEntity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("RelatedEntity", 3)?;
        s.serialize_field("Id", &self.id)?;
        s.serialize_field("Object", &self.object)?;
        s.serialize_field("Uri", &self.uri)?;
        s.end()
    }
}

/// Related entities of one type, attached to one owning entity for one response.
#[derive(Debug, Clone)]
pub struct RelatedEntityCollection {
    entity: String,
    entity_id: String,
    related_entity: String,
    related_entities: Vec<RelatedEntity>,
}

impl RelatedEntityCollection {
    pub fn new(
        entity: impl Into<String>,
        entity_id: impl Into<String>,
        related_entity: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            entity_id: entity_id.into(),
            related_entity: related_entity.into(),
            related_entities: Vec::new(),
        }
    }

    pub fn push(&mut self, related: RelatedEntity) {
        self.related_entities.push(related);
    }

    /// Name of the owning entity type.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Name of the relation.
    pub fn related_entity(&self) -> &str {
        &self.related_entity
    }

    pub fn related_entities(&self) -> &[RelatedEntity] {
        &self.related_entities
    }

    pub fn count(&self) -> usize {
        self.related_entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.related_entities.is_empty()
    }
}

impl Extend<RelatedEntity> for RelatedEntityCollection {
    fn extend<T: IntoIterator<Item = RelatedEntity>>(&mut self, iter: T) {
        self.related_entities.extend(iter);
    }
}

impl Serialize for RelatedEntityCollection {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("RelatedEntityCollection", 3)?;
        s.serialize_field("Count", &self.count())?;
        s.serialize_field("RelatedEntity", &self.related_entity)?;
        s.serialize_field("RelatedEntities", &self.related_entities)?;
        s.end()
    }
}

/// One entity on the wire. `object` is only `None` when the lookup missed.
#[derive(Debug, Clone)]
pub struct Envelope<E: Entity> {
    id: E::Id,
    object: Option<E>,
    related: Vec<RelatedEntityCollection>,
    uri: Option<String>,
}

impl<E: Entity> Envelope<E> {
    pub fn new(entity: E) -> Self {
        Self {
            id: entity.id().clone(),
            object: Some(entity),
            related: Vec::new(),
            uri: None,
        }
    }

    /// An envelope for an id that didn't resolve to an entity.
    pub fn missing(id: E::Id) -> Self {
        Self {
            id,
            object: None,
            related: Vec::new(),
            uri: None,
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_related(mut self, related: Vec<RelatedEntityCollection>) -> Self {
        self.related = related;
        self
    }

    pub fn id(&self) -> &E::Id {
        &self.id
    }

    pub fn object(&self) -> Option<&E> {
        self.object.as_ref()
    }

    pub fn related(&self) -> &[RelatedEntityCollection] {
        &self.related
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }
}

impl<E: Entity> Serialize for Envelope<E> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = if self.related.is_empty() { 3 } else { 4 };
        let mut s = serializer.serialize_struct("Envelope", len)?;
        s.serialize_field("Id", &self.id)?;
        s.serialize_field("Object", &self.object)?;
        if self.related.is_empty() {
            s.skip_field("RelatedEntityCollection")?;
        } else {
            s.serialize_field("RelatedEntityCollection", &self.related)?;
        }
        s.serialize_field("Uri", &self.uri)?;
        s.end()
    }
}
