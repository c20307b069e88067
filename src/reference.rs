//! # Resource References
//!
//! A reference is the lightweight `{ "type": "...", "id": "..." }` stub that stands in for a
//! related resource inside a document. The `type` is a compound identity of the form
//! `entityTypeId--bundleId`, which is split to build the fetch address
//! `/{entityTypeId}/{bundleId}/{id}`.

use crate::error::ResolverError;
use crate::path::Path;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Separator between the entity type and the bundle in a compound type.
pub const COMPOUND_SEPARATOR: &str = "--";

/// Identity of a referenced resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(rename = "type")]
    pub compound_type: String,
    pub id: String,
}

impl ResourceRef {
    pub fn new(compound_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            compound_type: compound_type.into(),
            id: id.into(),
        }
    }

    /// Reads a reference from a raw stub found at `path`.
    ///
    /// Numeric ids are accepted and rendered as strings.
    pub fn from_stub(stub: &Value, path: &Path) -> Result<Self, ResolverError> {
        let malformed = |reason: &str| ResolverError::MalformedReference {
            path: path.clone(),
            reason: reason.to_string(),
        };

        let compound_type = stub
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing string 'type'"))?;
        let id = match stub.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err(malformed("missing 'id'")),
        };

        Ok(Self::new(compound_type, id))
    }

    /// Splits the compound type into `(entityTypeId, bundleId)`.
    pub fn split_type(&self) -> Option<(&str, &str)> {
        self.compound_type.split_once(COMPOUND_SEPARATOR)
    }

    /// Builds the fetch address for this reference.
    pub fn address(&self, path: &Path) -> Result<ResourceAddress, ResolverError> {
        let (entity_type_id, bundle_id) =
            self.split_type()
                .ok_or_else(|| ResolverError::MalformedReference {
                    path: path.clone(),
                    reason: format!(
                        "type '{}' is not of the form entity{}bundle",
                        self.compound_type, COMPOUND_SEPARATOR
                    ),
                })?;

        Ok(ResourceAddress::new(entity_type_id, bundle_id, self.id.as_str()))
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.compound_type, self.id)
    }
}

/// Where a [`ResourceFetcher`](crate::ResourceFetcher) finds a resource.
///
/// Renders as `/{entity_type_id}/{bundle_id}/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceAddress {
    pub entity_type_id: String,
    pub bundle_id: String,
    pub id: String,
}

impl ResourceAddress {
    pub fn new(
        entity_type_id: impl Into<String>,
        bundle_id: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            entity_type_id: entity_type_id.into(),
            bundle_id: bundle_id.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}/{}", self.entity_type_id, self.bundle_id, self.id)
    }
}
