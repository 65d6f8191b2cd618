//! Schema-bound value container.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::schema::{FieldSpec, Schema};
use crate::value::{Element, Value};

/// A [`Schema`] plus one slot per declared field.
///
/// A slot is either *unset* or holds a [`Value`] whose basic type and rank
/// match the declaration. Unset is a distinct state: it is never filled
/// with a zero, and [`is_set`](Self::is_set) is the authoritative presence
/// check. Two typed values are equal when their schemas, their set fields
/// and those fields' values are all equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TypedValueRepr")]
pub struct TypedValue {
    schema: Arc<Schema>,
    slots: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
struct TypedValueRepr {
    schema: Arc<Schema>,
    slots: BTreeMap<String, Value>,
}

impl TryFrom<TypedValueRepr> for TypedValue {
    type Error = BridgeError;

    fn try_from(repr: TypedValueRepr) -> Result<Self, Self::Error> {
        let mut value = TypedValue::new(repr.schema);
        for (name, slot) in repr.slots {
            value.set(name, slot)?;
        }
        Ok(value)
    }
}

impl TypedValue {
    /// An empty value: every declared field starts unset.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            slots: BTreeMap::new(),
        }
    }

    /// Build a value whose schema is derived from the supplied fields.
    ///
    /// # Errors
    ///
    /// [`BridgeError::DuplicateField`] if a name repeats.
    pub fn from_fields<K, I>(fields: I) -> Result<Self, BridgeError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut builder = Schema::builder();
        let mut slots = BTreeMap::new();
        for (name, value) in fields {
            let name = name.into();
            builder.declare(name.clone(), value.spec())?;
            slots.insert(name, value);
        }
        Ok(Self {
            schema: Arc::new(builder.build()),
            slots,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Assign `value` to the declared field `name`.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::UnknownField`] – `name` is not declared.
    /// * [`BridgeError::TypeMismatch`] – the value's basic type or rank
    ///   differs from the declaration.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Result<(), BridgeError> {
        let name = name.into();
        let Some(expected) = self.schema.field(&name) else {
            return Err(BridgeError::UnknownField(name));
        };
        let found = value.spec();
        if found != expected {
            return Err(BridgeError::TypeMismatch {
                field: name,
                expected,
                found,
            });
        }
        self.slots.insert(name, value);
        Ok(())
    }

    /// Clear a field back to unset, returning its previous value.
    pub fn unset(&mut self, name: &str) -> Option<Value> {
        self.slots.remove(name)
    }

    /// The value of `name`, or `None` when it is unset or undeclared.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slots.get(name)
    }

    /// Like [`get`](Self::get) but distinguishes the two `None` cases.
    ///
    /// # Errors
    ///
    /// [`BridgeError::UnknownField`] for an undeclared name,
    /// [`BridgeError::MissingField`] for a declared but unset one.
    pub fn require(&self, name: &str) -> Result<&Value, BridgeError> {
        if !self.schema.contains(name) {
            return Err(BridgeError::UnknownField(name.to_string()));
        }
        self.slots
            .get(name)
            .ok_or_else(|| BridgeError::MissingField(name.to_string()))
    }

    /// Shorthand for reading a scalar field of element type `T`.
    pub fn scalar<T: Element>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(Value::as_scalar::<T>)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// The declaration of `name`, whether or not it is set.
    pub fn spec(&self, name: &str) -> Option<FieldSpec> {
        self.schema.field(name)
    }

    /// Set fields only, in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of set fields.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
