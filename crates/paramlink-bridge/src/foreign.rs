//! The foreign middleware model, as seen from the bridge.
//!
//! These types describe the boundary of the control-system middleware
//! client: its dynamically typed values, its value headers, its exception
//! type and the three traits through which parameters are accessed
//! ([`ParameterFactory`], [`Parameter`], [`SubscriptionHandle`]) and
//! through which results come back ([`ParameterValueListener`]).
//!
//! Listener methods are invoked on threads owned by the middleware.
//! Implementations must never block them.

use std::sync::Arc;

use paramlink_types::BridgeError;
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Values
// ────────────────────────────────────────────────────────────────────────────

/// Element kinds of the foreign value model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Enum,
    DiscreteFunction,
    /// Explicit "no type" sentinel.
    Undefined,
}

/// One item of a foreign enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumItem {
    pub code: i64,
    pub symbol: String,
}

/// A flattened foreign element buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum ForeignData {
    Booleans(Vec<bool>),
    Bytes(Vec<i8>),
    Shorts(Vec<i16>),
    Ints(Vec<i32>),
    Longs(Vec<i64>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
    Strings(Vec<String>),
    Enums(Vec<EnumItem>),
    /// `(x, y)` points of a discrete function.
    Points(Vec<(f64, f64)>),
}

impl ForeignData {
    pub fn value_type(&self) -> ValueType {
        match self {
            ForeignData::Booleans(_) => ValueType::Boolean,
            ForeignData::Bytes(_) => ValueType::Byte,
            ForeignData::Shorts(_) => ValueType::Short,
            ForeignData::Ints(_) => ValueType::Int,
            ForeignData::Longs(_) => ValueType::Long,
            ForeignData::Floats(_) => ValueType::Float,
            ForeignData::Doubles(_) => ValueType::Double,
            ForeignData::Strings(_) => ValueType::String,
            ForeignData::Enums(_) => ValueType::Enum,
            ForeignData::Points(_) => ValueType::DiscreteFunction,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ForeignData::Booleans(v) => v.len(),
            ForeignData::Bytes(v) => v.len(),
            ForeignData::Shorts(v) => v.len(),
            ForeignData::Ints(v) => v.len(),
            ForeignData::Longs(v) => v.len(),
            ForeignData::Floats(v) => v.len(),
            ForeignData::Doubles(v) => v.len(),
            ForeignData::Strings(v) => v.len(),
            ForeignData::Enums(v) => v.len(),
            ForeignData::Points(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A Rust type with a direct foreign element counterpart.
pub trait ForeignElement: Clone + Sized {
    const VALUE_TYPE: ValueType;

    fn wrap(values: Vec<Self>) -> ForeignData;

    fn view(data: &ForeignData) -> Option<&[Self]>;
}

macro_rules! impl_foreign_element {
    ($($ty:ty => $kind:ident / $variant:ident),* $(,)?) => {
        $(
            impl ForeignElement for $ty {
                const VALUE_TYPE: ValueType = ValueType::$kind;

                fn wrap(values: Vec<Self>) -> ForeignData {
                    ForeignData::$variant(values)
                }

                fn view(data: &ForeignData) -> Option<&[Self]> {
                    match data {
                        ForeignData::$variant(values) => Some(values),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_foreign_element! {
    bool => Boolean / Booleans,
    i8 => Byte / Bytes,
    i16 => Short / Shorts,
    i32 => Int / Ints,
    i64 => Long / Longs,
    f32 => Float / Floats,
    f64 => Double / Doubles,
    String => String / Strings,
}

/// Self-reported shape of a foreign value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Array(usize),
    Array2D { rows: usize, cols: usize },
}

impl Shape {
    /// `None` when `rows * cols` overflows.
    fn element_count(self) -> Option<usize> {
        match self {
            Shape::Scalar => Some(1),
            Shape::Array(len) => Some(len),
            Shape::Array2D { rows, cols } => rows.checked_mul(cols),
        }
    }
}

/// A single typed foreign value: scalar, 1-D array or 2-D array.
///
/// 2-D arrays are stored flattened (row-major) with explicit row and
/// column counts.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleValue {
    data: ForeignData,
    shape: Shape,
}

impl SimpleValue {
    /// # Errors
    ///
    /// [`BridgeError::ShapeMismatch`] when `data` does not hold exactly the
    /// number of elements `shape` describes, or when that number overflows.
    pub fn new(data: ForeignData, shape: Shape) -> Result<Self, BridgeError> {
        let expected = shape.element_count();
        if expected != Some(data.len()) {
            let dims = match shape {
                Shape::Scalar => Vec::new(),
                Shape::Array(len) => vec![len],
                Shape::Array2D { rows, cols } => vec![rows, cols],
            };
            return Err(BridgeError::ShapeMismatch {
                shape: dims,
                expected: expected.unwrap_or(usize::MAX),
                actual: data.len(),
            });
        }
        Ok(Self { data, shape })
    }

    pub fn scalar<T: ForeignElement>(value: T) -> Self {
        Self {
            data: T::wrap(vec![value]),
            shape: Shape::Scalar,
        }
    }

    pub fn array<T: ForeignElement>(values: Vec<T>) -> Self {
        let len = values.len();
        Self {
            data: T::wrap(values),
            shape: Shape::Array(len),
        }
    }

    /// A 2-D array from its flattened row-major elements.
    pub fn array_2d<T: ForeignElement>(
        values: Vec<T>,
        rows: usize,
        cols: usize,
    ) -> Result<Self, BridgeError> {
        Self::new(T::wrap(values), Shape::Array2D { rows, cols })
    }

    pub fn enumeration(item: EnumItem) -> Self {
        Self {
            data: ForeignData::Enums(vec![item]),
            shape: Shape::Scalar,
        }
    }

    pub fn discrete_function(points: Vec<(f64, f64)>) -> Self {
        let len = points.len();
        Self {
            data: ForeignData::Points(points),
            shape: Shape::Array(len),
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.data.value_type()
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn is_array(&self) -> bool {
        matches!(self.shape, Shape::Array(_))
    }

    pub fn is_array_2d(&self) -> bool {
        matches!(self.shape, Shape::Array2D { .. })
    }

    pub fn row_count(&self) -> usize {
        match self.shape {
            Shape::Array2D { rows, .. } => rows,
            _ => 0,
        }
    }

    pub fn column_count(&self) -> usize {
        match self.shape {
            Shape::Array2D { cols, .. } => cols,
            _ => 0,
        }
    }

    /// The flattened element buffer.
    pub fn data(&self) -> &ForeignData {
        &self.data
    }

    /// The flattened elements as `T`, whatever the shape.
    pub fn array_1d<T: ForeignElement>(&self) -> Option<&[T]> {
        T::view(&self.data)
    }
}

/// Field name under which a [`SimpleValue`] acquisition is exposed.
pub const SIMPLE_VALUE_FIELD: &str = "value";

/// Named foreign entries, kept in the order they were inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapParameterValue {
    entries: Vec<(String, SimpleValue)>,
}

impl MapParameterValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `name`. A replaced entry keeps its position.
    pub fn put(&mut self, name: impl Into<String>, value: SimpleValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: SimpleValue) -> Self {
        self.put(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&SimpleValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn value_type(&self, name: &str) -> Option<ValueType> {
        self.get(name).map(SimpleValue::value_type)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SimpleValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A value delivered by or sent to the middleware.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Map(MapParameterValue),
    Simple(SimpleValue),
}

impl ParameterValue {
    /// View as a map; a simple value becomes a single entry named
    /// [`SIMPLE_VALUE_FIELD`].
    pub fn into_map(self) -> MapParameterValue {
        match self {
            ParameterValue::Map(map) => map,
            ParameterValue::Simple(value) => MapParameterValue::new().with(SIMPLE_VALUE_FIELD, value),
        }
    }
}

impl From<SimpleValue> for ParameterValue {
    fn from(value: SimpleValue) -> Self {
        ParameterValue::Simple(value)
    }
}

impl From<MapParameterValue> for ParameterValue {
    fn from(value: MapParameterValue) -> Self {
        ParameterValue::Map(value)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Headers
// ────────────────────────────────────────────────────────────────────────────

/// The four header shapes the middleware produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderShape {
    SettingImmediateUpdate,
    SettingFirstUpdate,
    AcquisitionRegularUpdate,
    AcquisitionImmediateUpdate,
}

/// Metadata attached to every delivered value.
///
/// Stamps of `0` mean "absent", as on the wire; an empty selector means "no
/// selector".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueHeader {
    shape: HeaderShape,
    acquisition_stamp: i64,
    cycle_stamp: i64,
    set_stamp: i64,
    selector: Option<String>,
}

impl ValueHeader {
    fn build(
        shape: HeaderShape,
        acquisition_stamp: i64,
        cycle_stamp: i64,
        set_stamp: i64,
        selector: &str,
    ) -> Self {
        Self {
            shape,
            acquisition_stamp,
            cycle_stamp,
            set_stamp,
            selector: (!selector.is_empty()).then(|| selector.to_string()),
        }
    }

    /// Immediate update following a setting, without stamps.
    pub fn setting_immediate_update(selector: &str) -> Self {
        Self::build(HeaderShape::SettingImmediateUpdate, 0, 0, 0, selector)
    }

    /// Immediate update following a multiplexed setting.
    pub fn setting_immediate_update_stamped(
        acquisition_stamp: i64,
        set_stamp: i64,
        selector: &str,
    ) -> Self {
        Self::build(
            HeaderShape::SettingImmediateUpdate,
            acquisition_stamp,
            0,
            set_stamp,
            selector,
        )
    }

    pub fn setting_first_update(acquisition_stamp: i64, set_stamp: i64, selector: &str) -> Self {
        Self::build(
            HeaderShape::SettingFirstUpdate,
            acquisition_stamp,
            0,
            set_stamp,
            selector,
        )
    }

    pub fn acquisition_regular_update(
        acquisition_stamp: i64,
        cycle_stamp: i64,
        selector: &str,
    ) -> Self {
        Self::build(
            HeaderShape::AcquisitionRegularUpdate,
            acquisition_stamp,
            cycle_stamp,
            0,
            selector,
        )
    }

    pub fn acquisition_immediate_update(
        acquisition_stamp: i64,
        cycle_stamp: i64,
        selector: &str,
    ) -> Self {
        Self::build(
            HeaderShape::AcquisitionImmediateUpdate,
            acquisition_stamp,
            cycle_stamp,
            0,
            selector,
        )
    }

    pub fn shape(&self) -> HeaderShape {
        self.shape
    }

    pub fn acquisition_stamp(&self) -> i64 {
        self.acquisition_stamp
    }

    pub fn cycle_stamp(&self) -> i64 {
        self.cycle_stamp
    }

    pub fn set_stamp(&self) -> i64 {
        self.set_stamp
    }

    pub fn has_acquisition_stamp(&self) -> bool {
        self.acquisition_stamp != 0
    }

    pub fn has_cycle_stamp(&self) -> bool {
        self.cycle_stamp != 0
    }

    pub fn has_set_stamp(&self) -> bool {
        self.set_stamp != 0
    }

    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }
}

/// A value together with the header it arrived with.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredParameterValue {
    pub parameter_name: String,
    pub header: ValueHeader,
    pub value: ParameterValue,
}

/// Failure raised by the middleware.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ParameterException {
    message: String,
    header: Option<ValueHeader>,
}

impl ParameterException {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            header: None,
        }
    }

    pub fn with_header(message: impl Into<String>, header: ValueHeader) -> Self {
        Self {
            message: message.into(),
            header: Some(header),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn header(&self) -> Option<&ValueHeader> {
        self.header.as_ref()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Selectors
// ────────────────────────────────────────────────────────────────────────────

/// Which cycle (and optionally which server-side filter) an access targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForeignSelector {
    id: Option<String>,
    data_filter: Option<MapParameterValue>,
}

impl ForeignSelector {
    /// The "no selector" sentinel.
    pub fn no_selector() -> Self {
        Self::default()
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            data_filter: None,
        }
    }

    pub fn with_filter(id: impl Into<String>, data_filter: MapParameterValue) -> Self {
        Self {
            id: Some(id.into()),
            data_filter: Some(data_filter),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn data_filter(&self) -> Option<&MapParameterValue> {
        self.data_filter.as_ref()
    }

    pub fn is_no_selector(&self) -> bool {
        self.id.is_none() && self.data_filter.is_none()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Access traits
// ────────────────────────────────────────────────────────────────────────────

/// The two callback slots of a middleware request.
pub trait ParameterValueListener: Send + Sync {
    fn value_received(&self, parameter_name: &str, value: AcquiredParameterValue);

    fn exception_occurred(
        &self,
        parameter_name: &str,
        description: &str,
        error: Arc<ParameterException>,
    );
}

/// A live subscription created by [`Parameter::create_subscription`].
pub trait SubscriptionHandle: Send + Sync {
    fn start_monitoring(&self);

    fn stop_monitoring(&self);

    fn is_monitoring(&self) -> bool;
}

/// A named device property exposed by the middleware.
pub trait Parameter: Send + Sync {
    fn name(&self) -> &str;

    /// Request one value; the answer arrives on `listener`.
    fn get_value(&self, selector: &ForeignSelector, listener: Arc<dyn ParameterValueListener>);

    /// Write `value`; the acknowledgement arrives on `listener`.
    ///
    /// # Errors
    ///
    /// Failures detected before the request leaves the client are returned
    /// directly instead of through `listener`.
    fn set_value(
        &self,
        selector: &ForeignSelector,
        value: ParameterValue,
        listener: Arc<dyn ParameterValueListener>,
    ) -> Result<(), Arc<ParameterException>>;

    /// Create a subscription that delivers to `listener` while monitoring.
    fn create_subscription(
        &self,
        selector: &ForeignSelector,
        listener: Arc<dyn ParameterValueListener>,
    ) -> Box<dyn SubscriptionHandle>;
}

/// Resolves parameter names (`"device/property"`) to [`Parameter`]s.
pub trait ParameterFactory: Send + Sync {
    fn new_parameter(&self, name: &str) -> Result<Arc<dyn Parameter>, Arc<ParameterException>>;
}
