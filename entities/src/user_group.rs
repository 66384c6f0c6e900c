use engine::field::Fields;
use engine::{Entity, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A named group of users, keyed alternately by its unique name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserGroup {
    pub id: i32,
    pub create_date: Timestamp,
    pub created_by: i32,
    pub last_updated: Option<Timestamp>,
    pub last_updated_by: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

impl UserGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

static FIELDS: LazyLock<Fields<UserGroup>> = LazyLock::new(|| {
    Fields::builder()
        .identity("Id", |g: &UserGroup| &g.id, |g: &mut UserGroup| &mut g.id)
        .field(
            "CreateDate",
            |g: &UserGroup| &g.create_date,
            |g: &mut UserGroup| &mut g.create_date,
        )
        .field(
            "CreatedBy",
            |g: &UserGroup| &g.created_by,
            |g: &mut UserGroup| &mut g.created_by,
        )
        .field(
            "LastUpdated",
            |g: &UserGroup| &g.last_updated,
            |g: &mut UserGroup| &mut g.last_updated,
        )
        .field(
            "LastUpdatedBy",
            |g: &UserGroup| &g.last_updated_by,
            |g: &mut UserGroup| &mut g.last_updated_by,
        )
        .field("Name", |g: &UserGroup| &g.name, |g: &mut UserGroup| &mut g.name)
        .field(
            "Description",
            |g: &UserGroup| &g.description,
            |g: &mut UserGroup| &mut g.description,
        )
        .field("Active", |g: &UserGroup| &g.active, |g: &mut UserGroup| &mut g.active)
        .build()
});

impl Entity for UserGroup {
    type Id = i32;
    const NAME: &'static str = "UserGroup";
    const ALTERNATE_KEY: Option<&'static str> = Some("Name");

    fn id(&self) -> &i32 {
        &self.id
    }

    fn set_id(&mut self, id: i32) {
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
