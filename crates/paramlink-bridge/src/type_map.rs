//! Foreign kind ↔ basic type lookup and the typed accessor table.
//!
//! | Foreign kind | Basic type | Rust element |
//! |---|---|---|
//! | `Boolean` | `BOOL` | `bool` |
//! | `Byte` | `INT8` | `i8` |
//! | `Short` | `INT16` | `i16` |
//! | `Int` | `INT32` | `i32` |
//! | `Long` | `INT64` | `i64` |
//! | `Float` | `FLOAT32` | `f32` |
//! | `Double` | `FLOAT64` | `f64` |
//! | `String` | `STRING` | `String` |
//!
//! Every other foreign kind is unsupported. The four unsigned basic types
//! have accessors so local code can address them, but both halves of those
//! accessors reject: the foreign model has no unsigned integers.

use std::collections::HashMap;
use std::fmt;

use paramlink_types::{BasicType, BridgeError, Element, Rank, Value};

use crate::foreign::{ForeignElement, SimpleValue, ValueType};

/// Converts one foreign value into a local [`Value`].
pub type ReadFn = fn(&SimpleValue) -> Result<Value, BridgeError>;

/// Converts one local [`Value`] into a foreign value.
pub type WriteFn = fn(&Value) -> Result<SimpleValue, BridgeError>;

/// Key of the accessor table. Renders as the accessor suffix, e.g.
/// `"int8"`, `"float_array"` or `"double_array_2D"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessorId {
    pub basic_type: BasicType,
    pub rank: Rank,
}

impl fmt::Display for AccessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.rank {
            Rank::Scalar => "",
            Rank::Vector => "_array",
            Rank::Matrix => "_array_2D",
        };
        write!(f, "{}{}", self.basic_type.name(), suffix)
    }
}

/// The typed read/write pair for one (basic type, rank) combination.
#[derive(Debug, Clone, Copy)]
pub struct Accessor {
    pub id: AccessorId,
    pub read: ReadFn,
    pub write: WriteFn,
}

/// Read-only lookup tables, built once and shared behind an `Arc`.
#[derive(Debug)]
pub struct TypeMap {
    to_basic: HashMap<ValueType, BasicType>,
    to_foreign: HashMap<BasicType, ValueType>,
    accessors: HashMap<AccessorId, Accessor>,
}

impl Default for TypeMap {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeMap {
    pub fn new() -> Self {
        let pairs = [
            (ValueType::Boolean, BasicType::Bool),
            (ValueType::Byte, BasicType::Int8),
            (ValueType::Short, BasicType::Int16),
            (ValueType::Int, BasicType::Int32),
            (ValueType::Long, BasicType::Int64),
            (ValueType::Float, BasicType::Float32),
            (ValueType::Double, BasicType::Float64),
            (ValueType::String, BasicType::String),
        ];

        let mut accessors = HashMap::new();
        register::<bool>(&mut accessors);
        register::<i8>(&mut accessors);
        register::<i16>(&mut accessors);
        register::<i32>(&mut accessors);
        register::<i64>(&mut accessors);
        register::<f32>(&mut accessors);
        register::<f64>(&mut accessors);
        register::<String>(&mut accessors);
        for basic_type in BasicType::ALL.into_iter().filter(|t| t.is_unsigned()) {
            for rank in Rank::ALL {
                let id = AccessorId { basic_type, rank };
                accessors.insert(
                    id,
                    Accessor {
                        id,
                        read: reject_read,
                        write: reject_write,
                    },
                );
            }
        }

        Self {
            to_basic: pairs.iter().copied().collect(),
            to_foreign: pairs.iter().map(|&(f, b)| (b, f)).collect(),
            accessors,
        }
    }

    /// # Errors
    ///
    /// [`BridgeError::UnsupportedType`] for any kind outside the eight
    /// supported ones, [`ValueType::Undefined`] included.
    pub fn foreign_to_basic(&self, kind: ValueType) -> Result<BasicType, BridgeError> {
        self.to_basic
            .get(&kind)
            .copied()
            .ok_or_else(|| BridgeError::UnsupportedType(format!("foreign kind {kind:?}")))
    }

    /// # Errors
    ///
    /// [`BridgeError::UnsupportedType`] for the unsigned kinds.
    pub fn basic_to_foreign(&self, basic_type: BasicType) -> Result<ValueType, BridgeError> {
        self.to_foreign.get(&basic_type).copied().ok_or_else(|| {
            BridgeError::UnsupportedType(format!("{basic_type} has no foreign counterpart"))
        })
    }

    /// Resolve a basic type and a dimension count to an accessor id.
    ///
    /// # Errors
    ///
    /// [`BridgeError::UnsupportedType`] when `dimensions` is above 2.
    pub fn accessor_suffix(
        &self,
        basic_type: BasicType,
        dimensions: usize,
    ) -> Result<AccessorId, BridgeError> {
        let rank = Rank::from_dimensions(dimensions).ok_or_else(|| {
            BridgeError::UnsupportedType(format!("{basic_type} with {dimensions} dimensions"))
        })?;
        Ok(AccessorId { basic_type, rank })
    }

    pub fn accessor(&self, basic_type: BasicType, rank: Rank) -> Result<&Accessor, BridgeError> {
        let id = AccessorId { basic_type, rank };
        self.accessors
            .get(&id)
            .ok_or_else(|| BridgeError::UnsupportedType(format!("no accessor {id}")))
    }
}

fn register<T: Element + ForeignElement>(table: &mut HashMap<AccessorId, Accessor>) {
    let entries: [(Rank, ReadFn, WriteFn); 3] = [
        (Rank::Scalar, read_scalar::<T>, write_scalar::<T>),
        (Rank::Vector, read_vector::<T>, write_vector::<T>),
        (Rank::Matrix, read_matrix::<T>, write_matrix::<T>),
    ];
    for (rank, read, write) in entries {
        let id = AccessorId {
            basic_type: T::BASIC_TYPE,
            rank,
        };
        table.insert(id, Accessor { id, read, write });
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Accessor functions
// ────────────────────────────────────────────────────────────────────────────

fn cannot_read<T: Element>(rank: Rank, value: &SimpleValue) -> BridgeError {
    BridgeError::UnsupportedType(format!(
        "{} accessor cannot read a {:?} {:?}",
        AccessorId {
            basic_type: T::BASIC_TYPE,
            rank
        },
        value.value_type(),
        value.shape()
    ))
}

fn cannot_write<T: Element>(rank: Rank, value: &Value) -> BridgeError {
    BridgeError::UnsupportedType(format!(
        "{} accessor cannot write a {}",
        AccessorId {
            basic_type: T::BASIC_TYPE,
            rank
        },
        value.spec()
    ))
}

/// Scalars are read through their declared element type, never guessed
/// from the payload.
fn read_scalar<T: Element + ForeignElement>(value: &SimpleValue) -> Result<Value, BridgeError> {
    if value.is_array() || value.is_array_2d() {
        return Err(cannot_read::<T>(Rank::Scalar, value));
    }
    match value.array_1d::<T>() {
        Some([element]) => Ok(Value::scalar(element.clone())),
        _ => Err(cannot_read::<T>(Rank::Scalar, value)),
    }
}

fn read_vector<T: Element + ForeignElement>(value: &SimpleValue) -> Result<Value, BridgeError> {
    match value.array_1d::<T>() {
        Some(elements) if value.is_array() => Ok(Value::vector(elements.to_vec())),
        _ => Err(cannot_read::<T>(Rank::Vector, value)),
    }
}

fn read_matrix<T: Element + ForeignElement>(value: &SimpleValue) -> Result<Value, BridgeError> {
    match value.array_1d::<T>() {
        Some(elements) if value.is_array_2d() => {
            Value::matrix(value.row_count(), value.column_count(), elements.to_vec())
        }
        _ => Err(cannot_read::<T>(Rank::Matrix, value)),
    }
}

fn write_scalar<T: Element + ForeignElement>(value: &Value) -> Result<SimpleValue, BridgeError> {
    value
        .as_scalar::<T>()
        .map(|element| SimpleValue::scalar(element.clone()))
        .ok_or_else(|| cannot_write::<T>(Rank::Scalar, value))
}

fn write_vector<T: Element + ForeignElement>(value: &Value) -> Result<SimpleValue, BridgeError> {
    value
        .as_vector::<T>()
        .map(|elements| SimpleValue::array(elements.to_vec()))
        .ok_or_else(|| cannot_write::<T>(Rank::Vector, value))
}

fn write_matrix<T: Element + ForeignElement>(value: &Value) -> Result<SimpleValue, BridgeError> {
    let matrix = value
        .as_matrix::<T>()
        .ok_or_else(|| cannot_write::<T>(Rank::Matrix, value))?;
    SimpleValue::array_2d(matrix.data().to_vec(), matrix.rows(), matrix.cols())
}

fn reject_read(value: &SimpleValue) -> Result<Value, BridgeError> {
    Err(BridgeError::UnsupportedType(format!(
        "foreign {:?} values have no unsigned counterpart",
        value.value_type()
    )))
}

fn reject_write(value: &Value) -> Result<SimpleValue, BridgeError> {
    Err(BridgeError::UnsupportedType(format!(
        "{} has no foreign counterpart",
        value.basic_type()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_foreign_kinds_map_one_to_one() {
        let map = TypeMap::new();
        assert_eq!(map.foreign_to_basic(ValueType::Byte).unwrap(), BasicType::Int8);
        assert_eq!(map.foreign_to_basic(ValueType::Float).unwrap(), BasicType::Float32);
        for basic_type in BasicType::ALL.into_iter().filter(|t| !t.is_unsigned()) {
            let foreign = map.basic_to_foreign(basic_type).unwrap();
            assert_eq!(map.foreign_to_basic(foreign).unwrap(), basic_type);
        }
    }

    #[test]
    fn unsupported_foreign_kinds_are_rejected() {
        let map = TypeMap::new();
        for kind in [ValueType::Enum, ValueType::DiscreteFunction, ValueType::Undefined] {
            assert!(matches!(
                map.foreign_to_basic(kind),
                Err(BridgeError::UnsupportedType(_))
            ));
        }
    }

    #[test]
    fn unsigned_kinds_have_no_foreign_counterpart() {
        let map = TypeMap::new();
        assert!(map.basic_to_foreign(BasicType::UInt32).is_err());

        let accessor = map.accessor(BasicType::UInt8, Rank::Vector).unwrap();
        let err = (accessor.write)(&Value::vector(vec![1u8, 2])).unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedType(_)));
    }

    #[test]
    fn accessor_suffixes() {
        let map = TypeMap::new();
        let suffix = |t, d| map.accessor_suffix(t, d).unwrap().to_string();
        assert_eq!(suffix(BasicType::Int8, 0), "int8");
        assert_eq!(suffix(BasicType::Float32, 1), "float_array");
        assert_eq!(suffix(BasicType::Float64, 2), "double_array_2D");
        assert_eq!(suffix(BasicType::String, 1), "str_array");
        assert_eq!(suffix(BasicType::UInt16, 0), "uint16");
        assert!(map.accessor_suffix(BasicType::Bool, 3).is_err());
    }

    #[test]
    fn every_supported_pair_has_an_accessor() {
        let map = TypeMap::new();
        for basic_type in BasicType::ALL {
            for rank in Rank::ALL {
                let accessor = map.accessor(basic_type, rank).unwrap();
                assert_eq!(accessor.id, AccessorId { basic_type, rank });
            }
        }
    }

    #[test]
    fn matrix_accessor_keeps_row_major_layout() {
        let map = TypeMap::new();
        let accessor = map.accessor(BasicType::Int16, Rank::Matrix).unwrap();
        let foreign = SimpleValue::array_2d(vec![1i16, 2, 3, 4, 5, 6], 3, 2).unwrap();

        let local = (accessor.read)(&foreign).unwrap();
        assert_eq!(local.shape(), &[3, 2]);
        assert_eq!(
            local.as_matrix::<i16>().unwrap().row(2),
            Some(&[5i16, 6][..])
        );
        assert_eq!((accessor.write)(&local).unwrap(), foreign);
    }

    #[test]
    fn scalar_accessor_refuses_arrays() {
        let map = TypeMap::new();
        let accessor = map.accessor(BasicType::Int32, Rank::Scalar).unwrap();
        assert!((accessor.read)(&SimpleValue::array(vec![1i32])).is_err());
        assert!((accessor.read)(&SimpleValue::scalar(1i64)).is_err());
    }
}
