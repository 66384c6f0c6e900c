use engine::field::Fields;
use engine::{Entity, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct User {
    pub id: i64,
    pub create_date: Timestamp,
    pub created_by: i64,
    pub last_updated: Option<Timestamp>,
    pub last_updated_by: Option<i64>,
    pub username: String,
    pub organization_id: Option<String>,
    pub external_auth: bool,
    pub active: bool,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            active: true,
            ..Default::default()
        }
    }
}

static FIELDS: LazyLock<Fields<User>> = LazyLock::new(|| {
    Fields::builder()
        .identity("Id", |u: &User| &u.id, |u: &mut User| &mut u.id)
        .field("CreateDate", |u: &User| &u.create_date, |u: &mut User| &mut u.create_date)
        .field("CreatedBy", |u: &User| &u.created_by, |u: &mut User| &mut u.created_by)
        .field("LastUpdated", |u: &User| &u.last_updated, |u: &mut User| &mut u.last_updated)
        .field(
            "LastUpdatedBy",
            |u: &User| &u.last_updated_by,
            |u: &mut User| &mut u.last_updated_by,
        )
        .field("Username", |u: &User| &u.username, |u: &mut User| &mut u.username)
        .field(
            "OrganizationId",
            |u: &User| &u.organization_id,
            |u: &mut User| &mut u.organization_id,
        )
        .field(
            "ExternalAuth",
            |u: &User| &u.external_auth,
            |u: &mut User| &mut u.external_auth,
        )
        .field("Active", |u: &User| &u.active, |u: &mut User| &mut u.active)
        .build()
});

impl Entity for User {
    type Id = i64;
    const NAME: &'static str = "User";
    const ALTERNATE_KEY: Option<&'static str> = Some("Username");

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

#[cfg(test)]
mod tests {
    use super::*;
    use engine::field::FieldValue;

    #[test]
    fn alternate_key_is_a_registered_text_field() {
        let key = User::ALTERNATE_KEY.unwrap();
        let field = User::fields().get(key).unwrap();
        assert_eq!("Username", field.name());
        assert_eq!(
            FieldValue::Text("jdoe".into()),
            field.read(&User::new("jdoe"))
        );
    }

    #[test]
    fn deserializes_partial_payload_with_defaults() {
        let user: User = serde_json::from_str(r#"{"Username":"jdoe","Active":true}"#).unwrap();
        assert_eq!(0, user.id);
        assert_eq!("jdoe", user.username);
        assert!(user.create_date.is_min());
        assert_eq!(None, user.organization_id);
    }

    #[test]
    fn serializes_identity_then_audit_then_domain_fields() {
        let user = User {
            id: 3,
            ..User::new("jdoe")
        };
        assert_eq!(
            r#"{"Id":3,"CreateDate":"0001-01-01T00:00:00","CreatedBy":0,"LastUpdated":null,"LastUpdatedBy":null,"Username":"jdoe","OrganizationId":null,"ExternalAuth":false,"Active":true}"#,
            serde_json::to_string(&user).unwrap()
        );
    }
}
