//! # Output Marshalling
//!
//! After a pass has rebuilt the raw tree, a [`Marshaller`] turns it into the output shape of the
//! requested type. The default [`SchemaMarshaller`] keeps only the fields each type exposes (see
//! [`Exposure`]), reading them from their wire names and writing them under their property
//! names, and descends into exposed reference fields using their target types.
//!
//! Raw output (`raw_output = true` on [`resolve`](crate::ResolutionService::resolve)) skips this
//! step entirely.

use crate::error::ResolverError;
use crate::schema::{Exposure, FieldKind, FieldSpec, SchemaRegistry};
use serde_json::{Map, Value};

/// Naming convention used to derive wire names from property names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameCasing {
    #[default]
    AsIs,
    Camel,
    Snake,
}

impl NameCasing {
    /// Converts `name` to this casing.
    ///
    /// Words are split on non-alphanumeric characters, lower-to-upper transitions, the end of
    /// an acronym (`XMLHttp` is `XML` + `Http`) and letter/digit boundaries.
    pub fn apply(&self, name: &str) -> String {
        match self {
            NameCasing::AsIs => name.to_string(),
            NameCasing::Camel => {
                let mut out = String::with_capacity(name.len());
                for (position, word) in split_words(name).iter().enumerate() {
                    let lower = word.to_lowercase();
                    if position == 0 {
                        out.push_str(&lower);
                    } else {
                        let mut chars = lower.chars();
                        if let Some(first) = chars.next() {
                            out.extend(first.to_uppercase());
                            out.push_str(chars.as_str());
                        }
                    }
                }
                out
            }
            NameCasing::Snake => split_words(name)
                .iter()
                .map(|word| word.to_lowercase())
                .collect::<Vec<_>>()
                .join("_"),
        }
    }
}

fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && ch.is_uppercase())
                || (prev.is_alphabetic() != ch.is_alphabetic())
                || (prev.is_uppercase()
                    && ch.is_uppercase()
                    && next.is_some_and(char::is_lowercase));
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Converts a rebuilt raw tree into the output shape of a type.
pub trait Marshaller<C>: Send + Sync {
    fn marshal(
        &self,
        registry: &dyn SchemaRegistry<C>,
        type_name: &str,
        tree: Value,
    ) -> Result<Value, ResolverError>;
}

/// Marshaller driven by the [`Exposure`] declared on each [`TypeSchema`](crate::TypeSchema).
///
/// Types missing from the registry expose nothing. Union references whose discriminator has no
/// declared subtype are filtered out of arrays and become `null` in single fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaMarshaller;

impl SchemaMarshaller {
    fn marshal_node<C>(registry: &dyn SchemaRegistry<C>, type_name: &str, node: &Value) -> Value {
        let Some(object) = node.as_object() else {
            return node.clone();
        };
        let Some(schema) = registry.type_schema(type_name) else {
            return Value::Object(Map::new());
        };

        match schema.exposure() {
            Exposure::Passthrough => {
                let mut out = object.clone();
                for spec in schema.references() {
                    let Some(wire) = spec.resolved_wire_name() else {
                        continue;
                    };
                    if let Some(raw) = object.get(wire) {
                        let marshalled = Self::marshal_reference(registry, spec, raw);
                        out.insert(wire.to_string(), marshalled);
                    }
                }
                Value::Object(out)
            }
            Exposure::Fields(fields) => {
                let mut out = Map::new();
                for field in fields {
                    let Some(raw) = object.get(&field.wire) else {
                        continue;
                    };
                    let value = match schema.reference_at(&field.wire) {
                        Some(spec) => Self::marshal_reference(registry, spec, raw),
                        None => raw.clone(),
                    };
                    out.insert(field.property.clone(), value);
                }
                Value::Object(out)
            }
        }
    }

    fn marshal_reference<C>(
        registry: &dyn SchemaRegistry<C>,
        spec: &FieldSpec<C>,
        raw: &Value,
    ) -> Value {
        match (spec.kind(), raw) {
            (FieldKind::Array, Value::Array(items)) => Value::Array(
                items
                    .iter()
                    .filter_map(|item| {
                        let target = spec.target().concrete_for(item).ok()?;
                        Some(Self::marshal_node(registry, target, item))
                    })
                    .collect(),
            ),
            (FieldKind::Single, Value::Object(_)) => match spec.target().concrete_for(raw) {
                Ok(target) => Self::marshal_node(registry, target, raw),
                Err(_) => Value::Null,
            },
            _ => raw.clone(),
        }
    }
}

impl<C> Marshaller<C> for SchemaMarshaller {
    fn marshal(
        &self,
        registry: &dyn SchemaRegistry<C>,
        type_name: &str,
        tree: Value,
    ) -> Result<Value, ResolverError> {
        if !tree.is_object() {
            return Err(ResolverError::Marshal {
                type_name: type_name.to_string(),
                reason: "root document is not an object".to_string(),
            });
        }
        Ok(Self::marshal_node(registry, type_name, &tree))
    }
}
