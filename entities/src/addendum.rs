use engine::field::Fields;
use engine::{Entity, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A free-form property/value pair attached to some other entity,
/// identified by that entity's type name and id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Addendum {
    pub id: i64,
    pub create_date: Timestamp,
    pub created_by: i64,
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    pub last_updated: Option<Timestamp>,
    pub last_updated_by: Option<i64>,
    pub property: String,
    pub value: String,
}

impl Addendum {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    /// Attach this addendum to the entity `entity` with id `entity_id`.
    pub fn on(mut self, entity: impl Into<String>, entity_id: impl ToString) -> Self {
        self.entity = Some(entity.into());
        self.entity_id = Some(entity_id.to_string());
        self
    }
}

static FIELDS: LazyLock<Fields<Addendum>> = LazyLock::new(|| {
    Fields::builder()
        .identity("Id", |a: &Addendum| &a.id, |a: &mut Addendum| &mut a.id)
        .field(
            "CreateDate",
            |a: &Addendum| &a.create_date,
            |a: &mut Addendum| &mut a.create_date,
        )
        .field(
            "CreatedBy",
            |a: &Addendum| &a.created_by,
            |a: &mut Addendum| &mut a.created_by,
        )
        .field("Entity", |a: &Addendum| &a.entity, |a: &mut Addendum| &mut a.entity)
        .field(
            "EntityId",
            |a: &Addendum| &a.entity_id,
            |a: &mut Addendum| &mut a.entity_id,
        )
        .field(
            "LastUpdated",
            |a: &Addendum| &a.last_updated,
            |a: &mut Addendum| &mut a.last_updated,
        )
        .field(
            "LastUpdatedBy",
            |a: &Addendum| &a.last_updated_by,
            |a: &mut Addendum| &mut a.last_updated_by,
        )
        .field("Property", |a: &Addendum| &a.property, |a: &mut Addendum| &mut a.property)
        .field("Value", |a: &Addendum| &a.value, |a: &mut Addendum| &mut a.value)
        .build()
});

impl Entity for Addendum {
    type Id = i64;
    const NAME: &'static str = "Addendum";

    fn id(&self) -> &i64 {
        &self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn fields() -> &'static Fields<Self> {
        &FIELDS
    }

    fn stamp_created(&mut self, at: Timestamp) {
        if self.create_date.is_min() {
            self.create_date = at;
        }
    }
}
