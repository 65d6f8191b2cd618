//! Field-by-field conversion between foreign map values and [`TypedValue`]s.
//!
//! # Decoding
//!
//! Each foreign entry is read through the accessor selected by its own
//! foreign kind and self-reported rank, then assigned to the field of the
//! same name. Declared fields with no foreign entry stay unset. An entry
//! that cannot be converted or assigned is skipped with a warning, unless
//! the codec is strict.
//!
//! Without a caller-supplied schema the codec infers one first; inference
//! is all-or-nothing.
//!
//! # Encoding
//!
//! Only set fields are encoded. A field whose rank is above 2 is skipped
//! with a warning. An unsigned field fails the whole call.

use std::sync::Arc;

use paramlink_types::{BridgeError, Schema, TypedValue};
use tracing::warn;

use crate::foreign::{MapParameterValue, ParameterValue, SimpleValue};
use crate::infer::{SchemaInferer, rank_of};
use crate::type_map::TypeMap;

#[derive(Debug, Clone)]
pub struct ValueCodec {
    type_map: Arc<TypeMap>,
    inferer: SchemaInferer,
    strict: bool,
}

impl ValueCodec {
    pub fn new(type_map: Arc<TypeMap>) -> Self {
        Self {
            inferer: SchemaInferer::new(Arc::clone(&type_map)),
            type_map,
            strict: false,
        }
    }

    /// Fail on the first undecodable entry instead of skipping it.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn type_map(&self) -> &Arc<TypeMap> {
        &self.type_map
    }

    pub fn inferer(&self) -> &SchemaInferer {
        &self.inferer
    }

    /// Convert `value` under `schema`, inferring a schema when none is given.
    ///
    /// # Errors
    ///
    /// * [`BridgeError::UnsupportedType`] – inference met an unmappable
    ///   entry.
    /// * Any per-entry error, when the codec is strict.
    pub fn decode(
        &self,
        value: &MapParameterValue,
        schema: Option<&Arc<Schema>>,
    ) -> Result<TypedValue, BridgeError> {
        let schema = match schema {
            Some(schema) => Arc::clone(schema),
            None => Arc::new(self.inferer.infer(value)?),
        };
        let mut typed = TypedValue::new(schema);
        for (name, entry) in value.iter() {
            if let Err(error) = self.decode_entry(&mut typed, name, entry) {
                if self.strict {
                    return Err(error);
                }
                warn!(field = %name, error = %error, "skipping undecodable field");
            }
        }
        Ok(typed)
    }

    /// [`decode`](Self::decode) for either shape of foreign value.
    pub fn decode_parameter_value(
        &self,
        value: ParameterValue,
        schema: Option<&Arc<Schema>>,
    ) -> Result<TypedValue, BridgeError> {
        self.decode(&value.into_map(), schema)
    }

    fn decode_entry(
        &self,
        typed: &mut TypedValue,
        name: &str,
        entry: &SimpleValue,
    ) -> Result<(), BridgeError> {
        let basic_type = self.type_map.foreign_to_basic(entry.value_type())?;
        let accessor = self.type_map.accessor(basic_type, rank_of(entry))?;
        let local = (accessor.read)(entry)?;
        typed.set(name, local)
    }

    /// Convert every set field of `value` into a foreign map value.
    ///
    /// # Errors
    ///
    /// [`BridgeError::UnsupportedType`] when a set field has an unsigned
    /// basic type.
    pub fn encode(&self, value: &TypedValue) -> Result<MapParameterValue, BridgeError> {
        let mut map = MapParameterValue::new();
        for (name, field) in value.iter() {
            let spec = value.spec(name).unwrap_or_else(|| field.spec());
            let Some(rank) = spec.rank() else {
                let error = BridgeError::UnsupportedDimensionality {
                    field: name.to_string(),
                    rank: spec.dimensions,
                };
                warn!(field = %name, error = %error, "skipping unencodable field");
                continue;
            };
            let accessor = self.type_map.accessor(spec.basic_type, rank)?;
            map.put(name, (accessor.write)(field)?);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use paramlink_types::{BasicType, FieldSpec, Rank, Value};

    use super::*;
    use crate::foreign::{EnumItem, SIMPLE_VALUE_FIELD, ValueType};

    fn codec() -> ValueCodec {
        ValueCodec::new(Arc::new(TypeMap::new()))
    }

    #[test]
    fn decode_infers_and_fills() {
        let foreign = MapParameterValue::new()
            .with("a", SimpleValue::scalar(127i8))
            .with("b", SimpleValue::scalar(2i16));
        let typed = codec().decode(&foreign, None).unwrap();

        assert_eq!(typed.scalar::<i8>("a"), Some(&127));
        assert_eq!(typed.scalar::<i16>("b"), Some(&2));
        assert_eq!(typed.schema().len(), 2);
    }

    #[test]
    fn declared_but_absent_fields_stay_unset() {
        let schema = Arc::new(
            Schema::builder()
                .field("a", BasicType::Int8, Rank::Scalar)
                .and_then(|b| b.field("missing", BasicType::Bool, Rank::Scalar))
                .unwrap()
                .build(),
        );
        let foreign = MapParameterValue::new().with("a", SimpleValue::scalar(1i8));
        let typed = codec().decode(&foreign, Some(&schema)).unwrap();

        assert!(typed.is_set("a"));
        assert!(!typed.is_set("missing"));
    }

    #[test]
    fn lenient_decode_skips_unmappable_entries() {
        let schema = Arc::new(
            Schema::builder()
                .field("ok", BasicType::Int32, Rank::Scalar)
                .unwrap()
                .build(),
        );
        let foreign = MapParameterValue::new()
            .with("ok", SimpleValue::scalar(5i32))
            .with("curve", SimpleValue::discrete_function(vec![(0.0, 1.0)]))
            .with(
                "mode",
                SimpleValue::enumeration(EnumItem {
                    code: 2,
                    symbol: "STANDBY".into(),
                }),
            );
        let typed = codec().decode(&foreign, Some(&schema)).unwrap();
        assert_eq!(typed.scalar::<i32>("ok"), Some(&5));
        assert_eq!(typed.len(), 1);
    }

    #[test]
    fn strict_decode_fails_on_mismatch() {
        let schema = Arc::new(
            Schema::builder()
                .field("ok", BasicType::Int64, Rank::Scalar)
                .unwrap()
                .build(),
        );
        let foreign = MapParameterValue::new().with("ok", SimpleValue::scalar(5i32));
        let err = codec().strict(true).decode(&foreign, Some(&schema)).unwrap_err();
        assert!(matches!(err, BridgeError::TypeMismatch { .. }));
    }

    #[test]
    fn simple_values_decode_under_value_field() {
        let typed = codec()
            .decode_parameter_value(ParameterValue::Simple(SimpleValue::scalar(42i64)), None)
            .unwrap();
        assert_eq!(typed.scalar::<i64>(SIMPLE_VALUE_FIELD), Some(&42));
    }

    #[test]
    fn matrix_encode_keeps_flattened_buffer_and_shape() {
        let data = vec![1.5f64, -2.0, 3.25, 4.0, 0.0, 6.5];
        let typed =
            TypedValue::from_fields([("m", Value::matrix(2, 3, data.clone()).unwrap())]).unwrap();
        let foreign = codec().encode(&typed).unwrap();

        let m = foreign.get("m").unwrap();
        assert_eq!(m.value_type(), ValueType::Double);
        assert!(m.is_array_2d());
        assert_eq!((m.row_count(), m.column_count()), (2, 3));
        assert_eq!(m.array_1d::<f64>(), Some(data.as_slice()));

        let back = codec().decode(&foreign, Some(typed.schema())).unwrap();
        assert_eq!(back, typed);
    }

    #[test]
    fn float32_round_trip_preserves_widened_value() {
        let typed = TypedValue::from_fields([("f", Value::scalar(0.1f32))]).unwrap();
        let foreign = codec().encode(&typed).unwrap();
        assert_eq!(foreign.value_type("f"), Some(ValueType::Float));

        let back = codec().decode(&foreign, None).unwrap();
        let widened = f64::from(*back.scalar::<f32>("f").unwrap());
        assert_eq!(widened, 0.10000000149011612);
        assert_ne!(widened, 0.1);
    }

    #[test]
    fn representative_round_trips() {
        let typed = TypedValue::from_fields([
            ("s", Value::from("text")),
            ("flags", Value::vector(vec![true, false, true])),
            ("bytes", Value::from_rows(vec![vec![1i8, -1], vec![0, 127]]).unwrap()),
            ("counts", Value::vector(vec![i32::MIN, 0, i32::MAX])),
            ("stamp", Value::scalar(i64::MAX)),
            ("names", Value::vector(vec!["a".to_string(), "b".to_string()])),
        ])
        .unwrap();
        let codec = codec();
        let foreign = codec.encode(&typed).unwrap();
        assert_eq!(foreign.size(), 6);
        assert_eq!(codec.decode(&foreign, Some(typed.schema())).unwrap(), typed);
        assert_eq!(codec.encode(&codec.decode(&foreign, None).unwrap()).unwrap(), foreign);
    }

    /// One local value and its foreign twin for every supported type and rank.
    fn paired_cases() -> Vec<(&'static str, Value, SimpleValue)> {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        vec![
            ("bool", Value::scalar(true), SimpleValue::scalar(true)),
            ("bool[]", Value::vector(vec![true, false]), SimpleValue::array(vec![true, false])),
            (
                "bool[][]",
                Value::matrix(2, 2, vec![true, false, false, true]).unwrap(),
                SimpleValue::array_2d(vec![true, false, false, true], 2, 2).unwrap(),
            ),
            ("i8", Value::scalar(-128i8), SimpleValue::scalar(-128i8)),
            ("i8[]", Value::vector(vec![1i8, -1]), SimpleValue::array(vec![1i8, -1])),
            (
                "i8[][]",
                Value::matrix(1, 3, vec![1i8, 2, 3]).unwrap(),
                SimpleValue::array_2d(vec![1i8, 2, 3], 1, 3).unwrap(),
            ),
            ("i16", Value::scalar(i16::MAX), SimpleValue::scalar(i16::MAX)),
            ("i16[]", Value::vector(vec![i16::MIN, 0]), SimpleValue::array(vec![i16::MIN, 0])),
            (
                "i16[][]",
                Value::matrix(3, 1, vec![7i16, 8, 9]).unwrap(),
                SimpleValue::array_2d(vec![7i16, 8, 9], 3, 1).unwrap(),
            ),
            ("i32", Value::scalar(i32::MIN), SimpleValue::scalar(i32::MIN)),
            ("i32[]", Value::vector(vec![4i32, 5, 6]), SimpleValue::array(vec![4i32, 5, 6])),
            (
                "i32[][]",
                Value::matrix(2, 2, vec![1i32, 2, 3, 4]).unwrap(),
                SimpleValue::array_2d(vec![1i32, 2, 3, 4], 2, 2).unwrap(),
            ),
            ("i64", Value::scalar(i64::MIN), SimpleValue::scalar(i64::MIN)),
            ("i64[]", Value::vector(vec![i64::MAX, -1]), SimpleValue::array(vec![i64::MAX, -1])),
            (
                "i64[][]",
                Value::matrix(2, 1, vec![10i64, 20]).unwrap(),
                SimpleValue::array_2d(vec![10i64, 20], 2, 1).unwrap(),
            ),
            ("f32", Value::scalar(0.1f32), SimpleValue::scalar(0.1f32)),
            ("f32[]", Value::vector(vec![0.1f32, 0.2]), SimpleValue::array(vec![0.1f32, 0.2])),
            (
                "f32[][]",
                Value::matrix(2, 2, vec![0.1f32, 0.2, 0.3, 0.4]).unwrap(),
                SimpleValue::array_2d(vec![0.1f32, 0.2, 0.3, 0.4], 2, 2).unwrap(),
            ),
            ("f64", Value::scalar(-2.5f64), SimpleValue::scalar(-2.5f64)),
            ("f64[]", Value::vector(vec![0.1f64, 1e300]), SimpleValue::array(vec![0.1f64, 1e300])),
            (
                "f64[][]",
                Value::matrix(1, 2, vec![0.5f64, -0.5]).unwrap(),
                SimpleValue::array_2d(vec![0.5f64, -0.5], 1, 2).unwrap(),
            ),
            ("str", Value::from("text"), SimpleValue::scalar("text".to_string())),
            ("str[]", Value::vector(strings(&["a", "b"])), SimpleValue::array(strings(&["a", "b"]))),
            (
                "str[][]",
                Value::matrix(2, 2, strings(&["a", "b", "c", "d"])).unwrap(),
                SimpleValue::array_2d(strings(&["a", "b", "c", "d"]), 2, 2).unwrap(),
            ),
        ]
    }

    #[test]
    fn every_type_and_rank_round_trips_both_ways() {
        let codec = codec();
        let cases = paired_cases();
        assert_eq!(cases.len(), 24);

        for (name, local, foreign) in cases {
            let typed = TypedValue::from_fields([(name, local)]).unwrap();
            let map = MapParameterValue::new().with(name, foreign);

            let encoded = codec.encode(&typed).unwrap();
            assert_eq!(encoded, map, "{name}: encode");
            assert_eq!(codec.decode(&encoded, None).unwrap(), typed, "{name}: decode(encode)");

            let decoded = codec.decode(&map, None).unwrap();
            assert_eq!(decoded, typed, "{name}: decode");
            assert_eq!(codec.encode(&decoded).unwrap(), map, "{name}: encode(decode)");
        }
    }

    #[test]
    fn float32_arrays_widen_exactly() {
        let codec = codec();
        let source = [0.1f32, 0.2, 0.3, 0.4];
        let map = MapParameterValue::new()
            .with("trace", SimpleValue::array(source.to_vec()))
            .with("image", SimpleValue::array_2d(source.to_vec(), 2, 2).unwrap());
        let typed = codec.decode(&map, None).unwrap();

        let expected: Vec<f64> = source.iter().copied().map(f64::from).collect();
        let trace = typed.get("trace").and_then(|v| v.as_vector::<f32>()).unwrap();
        let widened: Vec<f64> = trace.iter().copied().map(f64::from).collect();
        assert_eq!(widened, expected);
        assert_ne!(widened[0], 0.1);

        let image = typed.get("image").and_then(|v| v.as_matrix::<f32>()).unwrap();
        assert_eq!((image.rows(), image.cols()), (2, 2));
        let widened: Vec<f64> = image.data().iter().copied().map(f64::from).collect();
        assert_eq!(widened, expected);
    }

    #[test]
    fn unsigned_fields_cannot_be_encoded() {
        let typed = TypedValue::from_fields([("u", Value::scalar(7u16))]).unwrap();
        let err = codec().encode(&typed).unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedType(_)));
    }

    #[test]
    fn rank_three_fields_are_skipped() {
        let mut builder = Schema::builder();
        builder
            .declare("cube", FieldSpec::with_dimensions(BasicType::Float64, 3))
            .unwrap();
        builder
            .declare("x", FieldSpec::new(BasicType::Int32, Rank::Scalar))
            .unwrap();
        let mut typed = TypedValue::new(Arc::new(builder.build()));
        typed
            .set("cube", Value::array(vec![2, 2, 2], vec![0.0f64; 8]).unwrap())
            .unwrap();
        typed.set("x", Value::scalar(9i32)).unwrap();

        let foreign = codec().encode(&typed).unwrap();
        assert_eq!(foreign.names().collect::<Vec<_>>(), ["x"]);
    }
}
