//! Element kinds and ranks of the local data model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of element kinds a local field can hold.
///
/// The four unsigned kinds exist only on the local side: the foreign
/// middleware has no unsigned integers, so they can be declared and filled
/// locally but never encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BasicType {
    String,
    Bool,
    Float32,
    Float64,
    Int8,
    Int16,
    Int32,
    Int64,
    #[serde(rename = "UINT8")]
    UInt8,
    #[serde(rename = "UINT16")]
    UInt16,
    #[serde(rename = "UINT32")]
    UInt32,
    #[serde(rename = "UINT64")]
    UInt64,
}

impl BasicType {
    /// Every basic type, in declaration order.
    pub const ALL: [BasicType; 12] = [
        BasicType::String,
        BasicType::Bool,
        BasicType::Float32,
        BasicType::Float64,
        BasicType::Int8,
        BasicType::Int16,
        BasicType::Int32,
        BasicType::Int64,
        BasicType::UInt8,
        BasicType::UInt16,
        BasicType::UInt32,
        BasicType::UInt64,
    ];

    /// `true` for the local-only unsigned kinds.
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            BasicType::UInt8 | BasicType::UInt16 | BasicType::UInt32 | BasicType::UInt64
        )
    }

    /// Short lowercase name, also used as the accessor-suffix stem
    /// (`"int8"`, `"float"`, `"double"`, `"str"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            BasicType::String => "str",
            BasicType::Bool => "bool",
            BasicType::Float32 => "float",
            BasicType::Float64 => "double",
            BasicType::Int8 => "int8",
            BasicType::Int16 => "int16",
            BasicType::Int32 => "int32",
            BasicType::Int64 => "int64",
            BasicType::UInt8 => "uint8",
            BasicType::UInt16 => "uint16",
            BasicType::UInt32 => "uint32",
            BasicType::UInt64 => "uint64",
        }
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dimensionality that both sides of the bridge understand.
///
/// Matrices are row-major; their row and column counts travel next to the
/// flattened buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rank {
    Scalar,
    Vector,
    Matrix,
}

impl Rank {
    pub const ALL: [Rank; 3] = [Rank::Scalar, Rank::Vector, Rank::Matrix];

    /// Number of dimensions: 0, 1 or 2.
    pub fn dimensions(self) -> usize {
        match self {
            Rank::Scalar => 0,
            Rank::Vector => 1,
            Rank::Matrix => 2,
        }
    }

    /// The rank with `dimensions` dimensions, or `None` above 2.
    pub fn from_dimensions(dimensions: usize) -> Option<Rank> {
        match dimensions {
            0 => Some(Rank::Scalar),
            1 => Some(Rank::Vector),
            2 => Some(Rank::Matrix),
            _ => None,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Scalar => f.write_str("scalar"),
            Rank::Vector => f.write_str("vector"),
            Rank::Matrix => f.write_str("matrix"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_four_unsigned_kinds_are_unsigned() {
        let unsigned: Vec<_> = BasicType::ALL.iter().filter(|t| t.is_unsigned()).collect();
        assert_eq!(
            unsigned,
            [&BasicType::UInt8, &BasicType::UInt16, &BasicType::UInt32, &BasicType::UInt64]
        );
    }

    #[test]
    fn rank_dimensions_roundtrip() {
        for rank in Rank::ALL {
            assert_eq!(Rank::from_dimensions(rank.dimensions()), Some(rank));
        }
        assert_eq!(Rank::from_dimensions(3), None);
    }

    #[test]
    fn basic_type_serializes_as_screaming_case() {
        assert_eq!(serde_json::to_string(&BasicType::UInt16).unwrap(), "\"UINT16\"");
        assert_eq!(serde_json::to_string(&BasicType::Float64).unwrap(), "\"FLOAT64\"");
    }
}
