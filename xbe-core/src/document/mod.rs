//! JSON:API document model and decoder.
//!
//! A response body decodes into a [`Document`]: the primary data (one
//! resource, none, or a list), the `included` resources indexed by
//! [`ResourceIdentifier`], and the top-level `meta` and `links` objects.
//!
//! Attributes stay untyped ([`Attributes`] is a JSON object). The accessor
//! functions in [`attrs`] read them with zero-value defaults, so a response
//! that is missing a field or sends it with an unexpected type never fails
//! the caller.
//!
//! # Example
//!
//! ```
//! use xbe_core::document::{self, attrs};
//!
//! let body = br#"{
//!     "data": [{
//!         "type": "material-types", "id": "7",
//!         "attributes": { "name": "Gravel" },
//!         "relationships": {
//!             "parent-material-type": { "data": { "type": "material-types", "id": "2" } }
//!         }
//!     }],
//!     "included": [{ "type": "material-types", "id": "2", "attributes": { "name": "Aggregate" } }]
//! }"#;
//!
//! let doc = document::decode(body).unwrap();
//! let gravel = &doc.resources()[0];
//! assert_eq!(attrs::string_attr(&gravel.attributes, "name"), "Gravel");
//!
//! let parent = doc.related(gravel, "parent-material-type").unwrap();
//! assert_eq!(attrs::string_attr(&parent.attributes, "name"), "Aggregate");
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod attrs;
mod body;
mod errors;

pub use body::ResourceObject;
pub use errors::{ApiError, decode_errors};

/// Untyped attribute map of a resource.
pub type Attributes = Map<String, Value>;

/// Error type for document decoding.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The body is JSON but not a JSON:API document.
    #[error("unexpected document shape: {message}")]
    Shape { message: String },
}

impl DecodeError {
    fn shape(message: impl Into<String>) -> Self {
        Self::Shape {
            message: message.into(),
        }
    }
}

/// The `(type, id)` identity of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceIdentifier {
    /// Resource type, e.g. `material-types`.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource id.
    pub id: String,
}

impl ResourceIdentifier {
    /// Create an identifier.
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Parse a resource identifier object; `None` when type or id is missing.
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let resource_type = obj.get("type").and_then(Value::as_str)?;
        let id = obj.get("id").and_then(id_string)?;
        if resource_type.is_empty() || id.is_empty() {
            return None;
        }
        Some(Self::new(resource_type, id))
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

/// Ids are strings on the wire, but numeric ids are accepted.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A relationship's linkage, decided from the JSON shape of its `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Relationship {
    /// `{"data": null}`, `{"data": {...}}`, or no `data` member at all.
    ToOne(Option<ResourceIdentifier>),
    /// `{"data": [...]}`.
    ToMany(Vec<ResourceIdentifier>),
}

impl Relationship {
    /// Decode a relationship object. Never fails; malformed linkage is empty.
    fn from_value(value: &Value) -> Self {
        match value.get("data") {
            Some(Value::Array(items)) => {
                Self::ToMany(items.iter().filter_map(ResourceIdentifier::from_value).collect())
            }
            Some(data @ Value::Object(_)) => Self::ToOne(ResourceIdentifier::from_value(data)),
            _ => Self::ToOne(None),
        }
    }

    /// The to-one target, if this is a non-null to-one relationship.
    pub fn as_one(&self) -> Option<&ResourceIdentifier> {
        match self {
            Self::ToOne(identifier) => identifier.as_ref(),
            Self::ToMany(_) => None,
        }
    }

    /// The to-many targets; empty for to-one relationships.
    pub fn as_many(&self) -> &[ResourceIdentifier] {
        match self {
            Self::ToMany(identifiers) => identifiers,
            Self::ToOne(_) => &[],
        }
    }

    /// Every target regardless of cardinality.
    pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
        match self {
            Self::ToOne(identifier) => identifier.iter().collect(),
            Self::ToMany(identifiers) => identifiers.iter().collect(),
        }
    }
}

/// One resource object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    /// Resource id (empty for client-side resources without one).
    pub id: String,
    /// Resource type.
    pub resource_type: String,
    /// Untyped attributes.
    pub attributes: Attributes,
    /// Relationships by name.
    pub relationships: HashMap<String, Relationship>,
}

impl Resource {
    /// Decode a resource object.
    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let obj = value
            .as_object()
            .ok_or_else(|| DecodeError::shape("resource is not a JSON object"))?;

        let resource_type = obj
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let id = obj.get("id").and_then(id_string).unwrap_or_default();

        let attributes = match obj.get("attributes") {
            Some(Value::Object(map)) => map.clone(),
            _ => Attributes::new(),
        };

        let relationships = match obj.get("relationships") {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(name, rel)| (name.clone(), Relationship::from_value(rel)))
                .collect(),
            _ => HashMap::new(),
        };

        Ok(Self {
            id,
            resource_type,
            attributes,
            relationships,
        })
    }

    /// This resource's identity.
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(&self.resource_type, &self.id)
    }

    /// Look up a relationship by name.
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.get(name)
    }

    /// Id of a to-one relationship; empty when absent, null, or to-many.
    pub fn relationship_id(&self, name: &str) -> String {
        attrs::relationship_id(&self.relationships, name)
    }

    /// Ids of a relationship; a to-one relationship yields its single id.
    pub fn relationship_ids(&self, name: &str) -> Vec<String> {
        attrs::relationship_ids(&self.relationships, name)
    }
}

/// Primary data of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryData {
    /// `"data": {...}` or `"data": null`.
    One(Option<Resource>),
    /// `"data": [...]`.
    Many(Vec<Resource>),
}

impl PrimaryData {
    /// View the primary data as a slice of zero, one, or many resources.
    pub fn as_slice(&self) -> &[Resource] {
        match self {
            Self::One(Some(resource)) => std::slice::from_ref(resource),
            Self::One(None) => &[],
            Self::Many(resources) => resources,
        }
    }

    /// Whether the server sent a collection.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Many(_))
    }
}

/// `included` resources indexed by identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncludedIndex {
    resources: Vec<Resource>,
    by_id: HashMap<ResourceIdentifier, usize>,
}

impl IncludedIndex {
    /// Index a list of resources. On duplicate identities the first one wins.
    pub fn new(resources: Vec<Resource>) -> Self {
        let mut by_id = HashMap::with_capacity(resources.len());
        for (position, resource) in resources.iter().enumerate() {
            by_id.entry(resource.identifier()).or_insert(position);
        }
        Self { resources, by_id }
    }

    /// Look up a resource by identity.
    pub fn get(&self, identifier: &ResourceIdentifier) -> Option<&Resource> {
        self.by_id.get(identifier).map(|&i| &self.resources[i])
    }

    /// Look up a resource by type and id.
    pub fn find(&self, resource_type: &str, id: &str) -> Option<&Resource> {
        self.get(&ResourceIdentifier::new(resource_type, id))
    }

    /// All included resources in wire order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Number of included resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check whether nothing was included.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// A decoded JSON:API document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Primary data.
    pub data: PrimaryData,
    /// Included resources.
    pub included: IncludedIndex,
    /// Top-level `meta` (empty when absent).
    pub meta: Map<String, Value>,
    /// Top-level `links` (empty when absent).
    pub links: Map<String, Value>,
}

impl Document {
    /// Primary resources as a slice, whatever the wire shape.
    pub fn resources(&self) -> &[Resource] {
        self.data.as_slice()
    }

    /// The first primary resource, for show/create/update responses.
    pub fn single(&self) -> Option<&Resource> {
        self.resources().first()
    }

    /// Dereference a to-one relationship through the included index.
    pub fn related(&self, resource: &Resource, relationship: &str) -> Option<&Resource> {
        let identifier = resource.relationship(relationship)?.as_one()?;
        self.included.get(identifier)
    }

    /// Dereference every target of a relationship that was included.
    pub fn related_many(&self, resource: &Resource, relationship: &str) -> Vec<&Resource> {
        resource
            .relationship(relationship)
            .map(|rel| {
                rel.identifiers()
                    .into_iter()
                    .filter_map(|identifier| self.included.get(identifier))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Attributes of an included resource, for turning a foreign key into a label.
    pub fn related_attributes(&self, identifier: &ResourceIdentifier) -> Option<&Attributes> {
        self.included.get(identifier).map(|r| &r.attributes)
    }
}

/// Decode a response body into a [`Document`].
///
/// Fails when the body is not JSON, is not an object, has no `data` member,
/// or has primary data that is not an object, array, or null. Malformed
/// entries in `included` are skipped.
pub fn decode(bytes: &[u8]) -> Result<Document, DecodeError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let Value::Object(mut root) = value else {
        return Err(DecodeError::shape("document is not a JSON object"));
    };

    let data = match root.remove("data") {
        None => return Err(DecodeError::shape("missing top-level \"data\" member")),
        Some(Value::Null) => PrimaryData::One(None),
        Some(value @ Value::Object(_)) => PrimaryData::One(Some(Resource::from_value(&value)?)),
        Some(Value::Array(items)) => PrimaryData::Many(
            items
                .iter()
                .map(Resource::from_value)
                .collect::<Result<_, _>>()?,
        ),
        Some(other) => {
            return Err(DecodeError::shape(format!(
                "\"data\" must be an object, array, or null, got {}",
                json_type(&other)
            )));
        }
    };

    let included = match root.remove("included") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| Resource::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    };

    Ok(Document {
        data,
        included: IncludedIndex::new(included),
        meta: take_object(&mut root, "meta"),
        links: take_object(&mut root, "links"),
    })
}

fn take_object(root: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match root.remove(key) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
