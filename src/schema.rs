//! # Field Schemas
//!
//! The resolver is driven by a declarative schema: for every output type, an ordered list of
//! [`FieldSpec`]s naming the fields that hold references. Schemas live in an explicit
//! [`SchemaTable`] owned by the caller and handed to the service, so there is no process-wide
//! registry.
//!
//! ```rust
//! use entity_resolver::{FieldSpec, NameCasing, SchemaRegistry, SchemaTable, TypeSchema};
//!
//! struct Viewer { is_admin: bool }
//!
//! let schema = SchemaTable::<Viewer>::new()
//!     .register(
//!         "Article",
//!         TypeSchema::new()
//!             .reference(FieldSpec::single("author", "Person"))
//!             .reference(FieldSpec::array("comments", "Comment"))
//!             .reference(
//!                 FieldSpec::single("reviewer", "Person")
//!                     .when(|viewer: &Viewer, _meta, _index| viewer.is_admin),
//!             )
//!             .expose_all(["title", "author", "comments", "reviewer"], NameCasing::AsIs),
//!     )
//!     .register("Person", TypeSchema::new().expose_all(["name"], NameCasing::AsIs))
//!     .register("Comment", TypeSchema::new().expose_all(["text"], NameCasing::AsIs));
//!
//! assert_eq!(schema.field_specs("Article").len(), 3);
//! assert!(schema.field_specs("Unknown").is_empty());
//! ```

use crate::marshal::NameCasing;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Default discriminator property of union fields.
pub const DEFAULT_DISCRIMINATOR: &str = "type";

/// Predicate deciding whether a reference should be resolved.
///
/// Receives the caller context, the reference's metadata (an empty object when the stub has
/// none) and, for array elements, the element index.
pub type ConditionalResolver<C> = Arc<dyn Fn(&C, &Value, Option<usize>) -> bool + Send + Sync>;

/// Whether a reference field holds one reference or a list of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Single,
    Array,
}

/// The concrete type(s) a reference field resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    Concrete(String),
    Union {
        discriminator_property: String,
        /// Ordered `(discriminator value, concrete type)` pairs.
        subtypes: Vec<(String, String)>,
    },
}

impl FieldTarget {
    /// Picks the concrete type for a raw reference.
    ///
    /// Returns `Err` with the discriminator value (empty when missing) if a union has no
    /// matching subtype.
    pub fn concrete_for<'s>(&'s self, raw: &Value) -> Result<&'s str, String> {
        match self {
            FieldTarget::Concrete(type_name) => Ok(type_name),
            FieldTarget::Union {
                discriminator_property,
                subtypes,
            } => {
                let discriminator = raw
                    .get(discriminator_property)
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                subtypes
                    .iter()
                    .find(|(value, _)| value == discriminator)
                    .map(|(_, type_name)| type_name.as_str())
                    .ok_or_else(|| discriminator.to_string())
            }
        }
    }
}

/// Declaration of one reference field of an output type.
pub struct FieldSpec<C> {
    property: String,
    wire_name: Option<String>,
    kind: FieldKind,
    target: FieldTarget,
    parent_entity_holder: bool,
    conditional: Option<ConditionalResolver<C>>,
}

impl<C> FieldSpec<C> {
    fn new(property: impl Into<String>, kind: FieldKind, target: FieldTarget) -> Self {
        Self {
            property: property.into(),
            wire_name: None,
            kind,
            target,
            parent_entity_holder: false,
            conditional: None,
        }
    }

    /// A field holding one reference to `target_type`.
    pub fn single(property: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self::new(
            property,
            FieldKind::Single,
            FieldTarget::Concrete(target_type.into()),
        )
    }

    /// A field holding a list of references to `target_type`.
    pub fn array(property: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self::new(
            property,
            FieldKind::Array,
            FieldTarget::Concrete(target_type.into()),
        )
    }

    /// A field holding one reference whose type depends on its discriminator.
    pub fn single_union<I, K, V>(property: impl Into<String>, subtypes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(property, FieldKind::Single, union_target(subtypes))
    }

    /// A field holding a list of references whose types depend on their discriminators.
    pub fn array_union<I, K, V>(property: impl Into<String>, subtypes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(property, FieldKind::Array, union_target(subtypes))
    }

    /// Reads the field from `wire_name` instead of the property name.
    pub fn wire_name(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = Some(wire_name.into());
        self
    }

    /// Uses `property` instead of `type` as the union discriminator. No effect on
    /// non-union fields.
    pub fn discriminator(mut self, property: impl Into<String>) -> Self {
        if let FieldTarget::Union {
            discriminator_property,
            ..
        } = &mut self.target
        {
            *discriminator_property = property.into();
        }
        self
    }

    /// The referenced payload is embedded in the parent and must not be fetched.
    pub fn parent_entity_holder(mut self) -> Self {
        self.parent_entity_holder = true;
        self
    }

    /// Only resolves the reference when `predicate` returns `true`.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&C, &Value, Option<usize>) -> bool + Send + Sync + 'static,
    {
        self.conditional = Some(Arc::new(predicate));
        self
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    /// Key under which the reference is found in raw data; `None` if both the explicit wire
    /// name and the property name are empty.
    pub fn resolved_wire_name(&self) -> Option<&str> {
        self.wire_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| Some(self.property.as_str()).filter(|name| !name.is_empty()))
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn target(&self) -> &FieldTarget {
        &self.target
    }

    pub fn is_parent_entity_holder(&self) -> bool {
        self.parent_entity_holder
    }

    /// Evaluates the conditional gate; fields without one always resolve.
    pub fn should_resolve(&self, context: &C, meta: &Value, index: Option<usize>) -> bool {
        self.conditional
            .as_ref()
            .map_or(true, |predicate| predicate(context, meta, index))
    }
}

fn union_target<I, K, V>(subtypes: I) -> FieldTarget
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    FieldTarget::Union {
        discriminator_property: DEFAULT_DISCRIMINATOR.to_string(),
        subtypes: subtypes
            .into_iter()
            .map(|(value, type_name)| (value.into(), type_name.into()))
            .collect(),
    }
}

impl<C> Clone for FieldSpec<C> {
    fn clone(&self) -> Self {
        Self {
            property: self.property.clone(),
            wire_name: self.wire_name.clone(),
            kind: self.kind,
            target: self.target.clone(),
            parent_entity_holder: self.parent_entity_holder,
            conditional: self.conditional.clone(),
        }
    }
}

impl<C> fmt::Debug for FieldSpec<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("property", &self.property)
            .field("wire_name", &self.wire_name)
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("parent_entity_holder", &self.parent_entity_holder)
            .field("conditional", &self.conditional.is_some())
            .finish()
    }
}

/// One output-visible field: `property` is the output key, `wire` the key in raw data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposedField {
    pub property: String,
    pub wire: String,
}

/// Which fields of a type the marshaller keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exposure {
    /// Every key is kept under its own name.
    Passthrough,
    /// Only the listed fields are kept.
    Fields(Vec<ExposedField>),
}

/// Schema of one output type: its reference fields and its output exposure.
pub struct TypeSchema<C> {
    references: Vec<FieldSpec<C>>,
    exposure: Exposure,
}

impl<C> Default for TypeSchema<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> TypeSchema<C> {
    /// A type with no reference fields that exposes nothing.
    pub fn new() -> Self {
        Self {
            references: Vec::new(),
            exposure: Exposure::Fields(Vec::new()),
        }
    }

    /// Appends a reference field. Order of calls is resolution order.
    pub fn reference(mut self, spec: FieldSpec<C>) -> Self {
        self.references.push(spec);
        self
    }

    /// Exposes one field read from `wire`.
    pub fn expose_as(mut self, property: impl Into<String>, wire: impl Into<String>) -> Self {
        let field = ExposedField {
            property: property.into(),
            wire: wire.into(),
        };
        match &mut self.exposure {
            Exposure::Fields(fields) => fields.push(field),
            Exposure::Passthrough => self.exposure = Exposure::Fields(vec![field]),
        }
        self
    }

    /// Exposes every listed property, deriving each wire name with `casing`.
    pub fn expose_all<I, S>(mut self, properties: I, casing: NameCasing) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for property in properties {
            let property = property.into();
            let wire = casing.apply(&property);
            self = self.expose_as(property, wire);
        }
        self
    }

    /// Keeps every key of the type as-is.
    pub fn passthrough(mut self) -> Self {
        self.exposure = Exposure::Passthrough;
        self
    }

    pub fn references(&self) -> &[FieldSpec<C>] {
        &self.references
    }

    pub fn exposure(&self) -> &Exposure {
        &self.exposure
    }

    /// The reference field read from `wire`, if any.
    pub fn reference_at(&self, wire: &str) -> Option<&FieldSpec<C>> {
        self.references
            .iter()
            .find(|spec| spec.resolved_wire_name() == Some(wire))
    }
}

/// Source of field schemas for the resolver and the marshaller.
pub trait SchemaRegistry<C>: Send + Sync {
    /// The full schema of `type_name`, if registered.
    fn type_schema(&self, type_name: &str) -> Option<&TypeSchema<C>>;

    /// Ordered reference fields of `type_name`; empty for unknown types and leaves.
    fn field_specs(&self, type_name: &str) -> &[FieldSpec<C>] {
        self.type_schema(type_name)
            .map(TypeSchema::references)
            .unwrap_or(&[])
    }
}

/// Static schema table keyed by type name.
pub struct SchemaTable<C> {
    types: HashMap<String, TypeSchema<C>>,
}

impl<C> Default for SchemaTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> SchemaTable<C> {
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Registers `schema` under `type_name`, replacing any previous entry.
    pub fn register(mut self, type_name: impl Into<String>, schema: TypeSchema<C>) -> Self {
        self.types.insert(type_name.into(), schema);
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl<C: Send + Sync> SchemaRegistry<C> for SchemaTable<C> {
    fn type_schema(&self, type_name: &str) -> Option<&TypeSchema<C>> {
        self.types.get(type_name)
    }
}
