use serde::Deserialize;

/// Body of a partial update: the entity plus the names of the properties to write.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PatchRequest<E> {
    pub entity: E,
    pub changed_properties: Vec<String>,
}
