//! Field declarations.
//!
//! A [`Schema`] maps unique field names to a [`FieldSpec`]. Order carries
//! no meaning (lookup is by name); fields are kept sorted so iteration and
//! serialisation are deterministic. A schema is immutable once built.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::basic::{BasicType, Rank};
use crate::error::BridgeError;

/// The declared kind of one field: element type plus number of dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldSpec {
    pub basic_type: BasicType,
    pub dimensions: usize,
}

impl FieldSpec {
    pub fn new(basic_type: BasicType, rank: Rank) -> Self {
        Self::with_dimensions(basic_type, rank.dimensions())
    }

    /// A declaration with an arbitrary number of dimensions. Anything above
    /// two is valid locally but will be skipped on encode.
    pub fn with_dimensions(basic_type: BasicType, dimensions: usize) -> Self {
        Self {
            basic_type,
            dimensions,
        }
    }

    /// The bridgeable rank, or `None` when `dimensions > 2`.
    pub fn rank(&self) -> Option<Rank> {
        Rank::from_dimensions(self.dimensions)
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rank() {
            Some(rank) => write!(f, "{} {}", self.basic_type, rank),
            None => write!(f, "{} rank-{} array", self.basic_type, self.dimensions),
        }
    }
}

/// Immutable mapping from field name to [`FieldSpec`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: BTreeMap<String, FieldSpec>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn field(&self, name: &str) -> Option<FieldSpec> {
        self.fields.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), *spec))
    }
}

/// Accumulates field declarations for a [`Schema`].
///
/// # Example
///
/// ```
/// use paramlink_types::{BasicType, Rank, Schema};
///
/// let schema = Schema::builder()
///     .field("current", BasicType::Float64, Rank::Scalar)?
///     .field("profile", BasicType::Float32, Rank::Vector)?
///     .build();
/// assert_eq!(schema.len(), 2);
/// # Ok::<(), paramlink_types::BridgeError>(())
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: BTreeMap<String, FieldSpec>,
}

impl SchemaBuilder {
    /// Chainable form of [`declare`](Self::declare).
    pub fn field(
        mut self,
        name: impl Into<String>,
        basic_type: BasicType,
        rank: Rank,
    ) -> Result<Self, BridgeError> {
        self.declare(name, FieldSpec::new(basic_type, rank))?;
        Ok(self)
    }

    /// Declare `name` with `spec`.
    ///
    /// # Errors
    ///
    /// [`BridgeError::DuplicateField`] if `name` was already declared.
    pub fn declare(&mut self, name: impl Into<String>, spec: FieldSpec) -> Result<(), BridgeError> {
        let name = name.into();
        if self.fields.contains_key(&name) {
            return Err(BridgeError::DuplicateField(name));
        }
        self.fields.insert(name, spec);
        Ok(())
    }

    pub fn build(self) -> Schema {
        Schema {
            fields: self.fields,
        }
    }
}
