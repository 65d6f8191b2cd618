//! Typed element buffers and shaped values.
//!
//! A [`Value`] is a flattened, row-major [`Buffer`] plus a shape:
//!
//! | shape | rank |
//! |---|---|
//! | `[]` | scalar (exactly one element) |
//! | `[n]` | vector |
//! | `[rows, cols]` | matrix |
//!
//! Higher ranks are representable locally (for example to mirror a local
//! schema that declares them) but cannot cross the bridge.

use serde::{Deserialize, Serialize};

use crate::basic::BasicType;
use crate::error::BridgeError;
use crate::schema::FieldSpec;

// ────────────────────────────────────────────────────────────────────────────
// Buffer
// ────────────────────────────────────────────────────────────────────────────

/// A flattened element buffer, one variant per [`BasicType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Buffer {
    String(Vec<String>),
    Bool(Vec<bool>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    #[serde(rename = "UINT8")]
    UInt8(Vec<u8>),
    #[serde(rename = "UINT16")]
    UInt16(Vec<u16>),
    #[serde(rename = "UINT32")]
    UInt32(Vec<u32>),
    #[serde(rename = "UINT64")]
    UInt64(Vec<u64>),
}

macro_rules! each_buffer {
    ($buffer:expr, $values:ident => $body:expr) => {
        match $buffer {
            Buffer::String($values) => $body,
            Buffer::Bool($values) => $body,
            Buffer::Float32($values) => $body,
            Buffer::Float64($values) => $body,
            Buffer::Int8($values) => $body,
            Buffer::Int16($values) => $body,
            Buffer::Int32($values) => $body,
            Buffer::Int64($values) => $body,
            Buffer::UInt8($values) => $body,
            Buffer::UInt16($values) => $body,
            Buffer::UInt32($values) => $body,
            Buffer::UInt64($values) => $body,
        }
    };
}

impl Buffer {
    /// The element kind held by this buffer.
    pub fn basic_type(&self) -> BasicType {
        match self {
            Buffer::String(_) => BasicType::String,
            Buffer::Bool(_) => BasicType::Bool,
            Buffer::Float32(_) => BasicType::Float32,
            Buffer::Float64(_) => BasicType::Float64,
            Buffer::Int8(_) => BasicType::Int8,
            Buffer::Int16(_) => BasicType::Int16,
            Buffer::Int32(_) => BasicType::Int32,
            Buffer::Int64(_) => BasicType::Int64,
            Buffer::UInt8(_) => BasicType::UInt8,
            Buffer::UInt16(_) => BasicType::UInt16,
            Buffer::UInt32(_) => BasicType::UInt32,
            Buffer::UInt64(_) => BasicType::UInt64,
        }
    }

    pub fn len(&self) -> usize {
        each_buffer!(self, values => values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Element
// ────────────────────────────────────────────────────────────────────────────

/// A Rust type that can be stored in a [`Buffer`].
///
/// Implemented for `String`, `bool`, `f32`, `f64` and the signed and
/// unsigned integers from 8 to 64 bits.
pub trait Element: Clone + PartialEq + Send + Sync + 'static {
    /// The basic type this Rust type represents.
    const BASIC_TYPE: BasicType;

    /// Wrap `values` in the matching buffer variant.
    fn into_buffer(values: Vec<Self>) -> Buffer;

    /// Borrow the elements of `buffer` if it holds this type.
    fn view(buffer: &Buffer) -> Option<&[Self]>;
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const BASIC_TYPE: BasicType = BasicType::$variant;

                fn into_buffer(values: Vec<Self>) -> Buffer {
                    Buffer::$variant(values)
                }

                fn view(buffer: &Buffer) -> Option<&[Self]> {
                    match buffer {
                        Buffer::$variant(values) => Some(values),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_element! {
    String => String,
    bool => Bool,
    f32 => Float32,
    f64 => Float64,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
}

// ────────────────────────────────────────────────────────────────────────────
// Value
// ────────────────────────────────────────────────────────────────────────────

/// A shaped, typed value held in one field of a
/// [`TypedValue`][crate::TypedValue].
///
/// The buffer length always equals the product of the shape (1 for a
/// scalar); constructors reject anything else with
/// [`BridgeError::ShapeMismatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ValueRepr")]
pub struct Value {
    buffer: Buffer,
    shape: Vec<usize>,
}

#[derive(Deserialize)]
struct ValueRepr {
    buffer: Buffer,
    shape: Vec<usize>,
}

impl TryFrom<ValueRepr> for Value {
    type Error = BridgeError;

    fn try_from(repr: ValueRepr) -> Result<Self, Self::Error> {
        Value::from_parts(repr.buffer, repr.shape)
    }
}

impl Value {
    /// Build a value from a raw buffer and shape.
    ///
    /// # Errors
    ///
    /// [`BridgeError::ShapeMismatch`] when the buffer length differs from
    /// the number of elements the shape describes, or when that number
    /// overflows `usize`.
    pub fn from_parts(buffer: Buffer, shape: Vec<usize>) -> Result<Self, BridgeError> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim));
        if expected != Some(buffer.len()) {
            return Err(BridgeError::ShapeMismatch {
                shape,
                // Overflowing shapes report a saturated count.
                expected: expected.unwrap_or(usize::MAX),
                actual: buffer.len(),
            });
        }
        Ok(Self { buffer, shape })
    }

    pub fn scalar<T: Element>(value: T) -> Self {
        Self {
            buffer: T::into_buffer(vec![value]),
            shape: Vec::new(),
        }
    }

    pub fn vector<T: Element>(values: Vec<T>) -> Self {
        let len = values.len();
        Self {
            buffer: T::into_buffer(values),
            shape: vec![len],
        }
    }

    /// A `rows × cols` matrix from its row-major flattened elements.
    pub fn matrix<T: Element>(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, BridgeError> {
        Self::from_parts(T::into_buffer(data), vec![rows, cols])
    }

    /// A matrix from nested rows. Ragged input is a shape mismatch.
    pub fn from_rows<T: Element>(rows: Vec<Vec<T>>) -> Result<Self, BridgeError> {
        let row_count = rows.len();
        let col_count = rows.first().map_or(0, Vec::len);
        if let Some(ragged) = rows.iter().find(|row| row.len() != col_count) {
            return Err(BridgeError::ShapeMismatch {
                shape: vec![row_count, col_count],
                expected: col_count,
                actual: ragged.len(),
            });
        }
        Self::matrix(row_count, col_count, rows.into_iter().flatten().collect())
    }

    /// An array of arbitrary rank from row-major elements.
    pub fn array<T: Element>(shape: Vec<usize>, data: Vec<T>) -> Result<Self, BridgeError> {
        Self::from_parts(T::into_buffer(data), shape)
    }

    pub fn basic_type(&self) -> BasicType {
        self.buffer.basic_type()
    }

    /// Number of dimensions (0 for a scalar).
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// The (basic type, rank) pair this value satisfies.
    pub fn spec(&self) -> FieldSpec {
        FieldSpec::with_dimensions(self.basic_type(), self.rank())
    }

    /// The element of a rank-0 value of type `T`.
    pub fn as_scalar<T: Element>(&self) -> Option<&T> {
        if !self.shape.is_empty() {
            return None;
        }
        T::view(&self.buffer).and_then(<[T]>::first)
    }

    /// The elements of a rank-1 value of type `T`.
    pub fn as_vector<T: Element>(&self) -> Option<&[T]> {
        if self.shape.len() != 1 {
            return None;
        }
        T::view(&self.buffer)
    }

    /// A row-major view of a rank-2 value of type `T`.
    pub fn as_matrix<T: Element>(&self) -> Option<MatrixRef<'_, T>> {
        match self.shape.as_slice() {
            [rows, cols] => T::view(&self.buffer).map(|data| MatrixRef {
                rows: *rows,
                cols: *cols,
                data,
            }),
            _ => None,
        }
    }

    /// The flattened elements regardless of rank.
    pub fn as_flat<T: Element>(&self) -> Option<&[T]> {
        T::view(&self.buffer)
    }
}

impl<T: Element> From<T> for Value {
    fn from(value: T) -> Self {
        Value::scalar(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::scalar(value.to_string())
    }
}

/// Borrowed row-major view of a matrix value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixRef<'a, T> {
    rows: usize,
    cols: usize,
    data: &'a [T],
}

impl<'a, T: Clone> MatrixRef<'a, T> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The flattened row-major elements.
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    pub fn row(&self, index: usize) -> Option<&'a [T]> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.cols;
        self.data.get(start..start + self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&'a T> {
        if col >= self.cols {
            return None;
        }
        self.row(row).and_then(|r| r.get(col))
    }

    pub fn to_rows(&self) -> Vec<Vec<T>> {
        (0..self.rows)
            .filter_map(|i| self.row(i).map(<[T]>::to_vec))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_has_empty_shape_and_one_element() {
        let v = Value::scalar(127i8);
        assert_eq!(v.rank(), 0);
        assert_eq!(v.basic_type(), BasicType::Int8);
        assert_eq!(v.as_scalar::<i8>(), Some(&127));
        assert_eq!(v.as_vector::<i8>(), None);
        assert_eq!(v.as_scalar::<i16>(), None, "wrong element type must not match");
    }

    #[test]
    fn matrix_is_row_major() {
        let v = Value::matrix(2, 3, vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let m = v.as_matrix::<f64>().unwrap();
        assert_eq!((m.rows(), m.cols()), (2, 3));
        assert_eq!(m.row(1), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(m.get(0, 2), Some(&3.0));
        assert_eq!(m.get(0, 3), None);
        assert_eq!(m.to_rows(), vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn matrix_with_wrong_element_count_is_rejected() {
        let err = Value::matrix(2, 3, vec![1i32, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::ShapeMismatch { expected: 6, actual: 3, .. }
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Value::from_rows(vec![vec![true, false], vec![true]]).unwrap_err();
        assert!(matches!(err, BridgeError::ShapeMismatch { .. }));
    }

    #[test]
    fn from_rows_matches_flattened_constructor() {
        let nested = Value::from_rows(vec![vec![1i64, 2], vec![3, 4]]).unwrap();
        let flat = Value::matrix(2, 2, vec![1i64, 2, 3, 4]).unwrap();
        assert_eq!(nested, flat);
    }

    #[test]
    fn higher_rank_arrays_are_representable() {
        let v = Value::array(vec![2, 2, 2], vec![0u8; 8]).unwrap();
        assert_eq!(v.rank(), 3);
        assert_eq!(v.as_matrix::<u8>(), None);
        assert_eq!(v.as_flat::<u8>().map(<[u8]>::len), Some(8));
    }

    #[test]
    fn deserializing_an_inconsistent_shape_fails() {
        let json = r#"{"buffer":{"type":"INT32","data":[1,2,3]},"shape":[2,2]}"#;
        assert!(serde_json::from_str::<Value>(json).is_err());

        let ok = r#"{"buffer":{"type":"INT32","data":[1,2,3,4]},"shape":[2,2]}"#;
        let v: Value = serde_json::from_str(ok).unwrap();
        assert_eq!(v.as_matrix::<i32>().map(|m| m.rows()), Some(2));
    }

    #[test]
    fn overflowing_shape_is_rejected() {
        let err = Value::array(vec![usize::MAX / 2 + 1, 2], Vec::<i32>::new()).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::ShapeMismatch { expected: usize::MAX, actual: 0, .. }
        ));

        let json = r#"{"buffer":{"type":"INT32","data":[]},"shape":[18446744073709551615,2]}"#;
        assert!(serde_json::from_str::<Value>(json).is_err());
    }
}
