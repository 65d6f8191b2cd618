//! What a request addresses.

use std::sync::Arc;

use paramlink_types::{Schema, TypedValue};

/// A device property access: which property, under which selector, with
/// which optional server-side filters and expected schema.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyQuery {
    pub device: String,
    pub property: String,
    /// Cycle selector. `None` or empty falls back to the configured default.
    pub selector: Option<String>,
    /// Filter values sent along with the selector.
    pub data_filters: Option<TypedValue>,
    /// Schema to decode into. Inferred per value when absent.
    pub schema: Option<Arc<Schema>>,
}

impl PropertyQuery {
    pub fn new(device: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            property: property.into(),
            selector: None,
            data_filters: None,
            schema: None,
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_data_filters(mut self, filters: TypedValue) -> Self {
        self.data_filters = Some(filters);
        self
    }

    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// `"{device}/{property}"`, the name the middleware resolves.
    pub fn parameter_name(&self) -> String {
        format!("{}/{}", self.device, self.property)
    }
}
