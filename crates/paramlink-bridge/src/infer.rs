//! Schema inference from a foreign map value.

use std::sync::Arc;

use paramlink_types::{BridgeError, FieldSpec, Rank, Schema};

use crate::foreign::{MapParameterValue, SimpleValue};
use crate::type_map::TypeMap;

/// The rank a foreign value reports for itself.
pub fn rank_of(value: &SimpleValue) -> Rank {
    if value.is_array_2d() {
        Rank::Matrix
    } else if value.is_array() {
        Rank::Vector
    } else {
        Rank::Scalar
    }
}

/// Builds the minimal [`Schema`] able to hold a foreign map value.
#[derive(Debug, Clone)]
pub struct SchemaInferer {
    type_map: Arc<TypeMap>,
}

impl SchemaInferer {
    pub fn new(type_map: Arc<TypeMap>) -> Self {
        Self { type_map }
    }

    /// One field per entry, typed from the entry's foreign kind and rank.
    ///
    /// # Errors
    ///
    /// [`BridgeError::UnsupportedType`] as soon as any entry has an
    /// unmappable kind. No partial schema is ever returned.
    pub fn infer(&self, value: &MapParameterValue) -> Result<Schema, BridgeError> {
        let mut builder = Schema::builder();
        for (name, entry) in value.iter() {
            let basic_type = self.type_map.foreign_to_basic(entry.value_type())?;
            builder.declare(name, FieldSpec::new(basic_type, rank_of(entry)))?;
        }
        Ok(builder.build())
    }
}
