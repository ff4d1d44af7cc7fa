use serde_json::{Map, Value, json};

use super::{Relationship, ResourceIdentifier};

/// Builder for a create/update request body.
///
/// ```
/// use xbe_core::document::ResourceObject;
///
/// let body = ResourceObject::new("material-types")
///     .attribute("name", "Gravel")
///     .to_one("broker", "brokers", "12")
///     .to_value();
/// assert_eq!(body["data"]["attributes"]["name"], "Gravel");
/// assert_eq!(body["data"]["relationships"]["broker"]["data"]["id"], "12");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceObject {
    resource_type: String,
    id: Option<String>,
    attributes: Map<String, Value>,
    relationships: Map<String, Value>,
}

impl ResourceObject {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            ..Default::default()
        }
    }

    /// Set the id; required for updates.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn to_one(self, name: impl Into<String>, resource_type: &str, id: &str) -> Self {
        let rel = Relationship::ToOne(Some(ResourceIdentifier::new(resource_type, id)));
        self.relationship(name, rel)
    }

    /// Clear a to-one relationship (`{"data": null}`).
    pub fn to_one_null(self, name: impl Into<String>) -> Self {
        self.relationship(name, Relationship::ToOne(None))
    }

    pub fn to_many<S: AsRef<str>>(self, name: impl Into<String>, resource_type: &str, ids: &[S]) -> Self {
        let identifiers = ids
            .iter()
            .map(|id| ResourceIdentifier::new(resource_type, id.as_ref()))
            .collect();
        self.relationship(name, Relationship::ToMany(identifiers))
    }

    fn relationship(mut self, name: impl Into<String>, rel: Relationship) -> Self {
        self.relationships.insert(name.into(), json!({ "data": rel }));
        self
    }

    /// The `{"data": {...}}` envelope. Empty sections are omitted.
    pub fn to_value(&self) -> Value {
        let mut data = Map::new();
        data.insert("type".to_string(), Value::String(self.resource_type.clone()));
        if let Some(id) = &self.id {
            data.insert("id".to_string(), Value::String(id.clone()));
        }
        if !self.attributes.is_empty() {
            data.insert("attributes".to_string(), Value::Object(self.attributes.clone()));
        }
        if !self.relationships.is_empty() {
            data.insert(
                "relationships".to_string(),
                Value::Object(self.relationships.clone()),
            );
        }
        json!({ "data": data })
    }

    /// Serialized request body.
    pub fn to_body(&self) -> Vec<u8> {
        self.to_value().to_string().into_bytes()
    }
}
