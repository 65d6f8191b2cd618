//! Get / set / subscribe entry points.
//!
//! A [`Provider`] resolves a [`PropertyQuery`] to a foreign parameter and
//! selector, installs the matching notification bridge as the listener and
//! hands the consumer half back to the caller. Nothing here retries; a
//! failed request surfaces once, as an error response.

use std::sync::Arc;

use paramlink_types::{BridgeError, TypedValue};
use tracing::{debug, instrument};

use crate::codec::ValueCodec;
use crate::config::BridgeConfig;
use crate::foreign::{ForeignSelector, Parameter, ParameterFactory, ParameterValue};
use crate::notification::{OneShotBridge, ResultFuture, StreamBridge};
use crate::query::PropertyQuery;
use crate::response::{AcquiredData, ResponseBuilder};
use crate::type_map::TypeMap;

pub struct Provider {
    factory: Arc<dyn ParameterFactory>,
    codec: Arc<ValueCodec>,
    config: BridgeConfig,
}

impl Provider {
    pub fn new(factory: Arc<dyn ParameterFactory>, config: BridgeConfig) -> Self {
        let codec = ValueCodec::new(Arc::new(TypeMap::new())).strict(config.strict_decode);
        Self {
            factory,
            codec: Arc::new(codec),
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn codec(&self) -> &Arc<ValueCodec> {
        &self.codec
    }

    /// Request one value without blocking.
    ///
    /// # Errors
    ///
    /// [`BridgeError::ForeignOperationFailed`] when the parameter cannot be
    /// resolved, or any error from encoding the query's data filters.
    #[instrument(skip(self), fields(parameter = %query.parameter_name()))]
    pub fn get(&self, query: PropertyQuery) -> Result<ResultFuture<AcquiredData>, BridgeError> {
        let (parameter, selector, builder) = self.prepare(query)?;
        let (bridge, future) = OneShotBridge::retrieval(builder);
        parameter.get_value(&selector, bridge);
        Ok(future)
    }

    /// Write `value` without blocking. A failure raised while sending is
    /// delivered through the returned future, like an asynchronous one.
    ///
    /// # Errors
    ///
    /// As for [`get`](Self::get), plus [`BridgeError::UnsupportedType`] when
    /// `value` has an unsigned field.
    #[instrument(skip(self, value), fields(parameter = %query.parameter_name()))]
    pub fn set(
        &self,
        query: PropertyQuery,
        value: &TypedValue,
    ) -> Result<ResultFuture<()>, BridgeError> {
        let encoded = ParameterValue::Map(self.codec.encode(value)?);
        let (parameter, selector, builder) = self.prepare(query)?;
        let (bridge, future) = OneShotBridge::update(builder);
        if let Err(error) = parameter.set_value(&selector, encoded, bridge.clone()) {
            debug!(error = %error, "set rejected before sending");
            bridge.on_failure(error);
        }
        Ok(future)
    }

    /// Create a subscription. It starts monitoring immediately when
    /// `auto_start_subscriptions` is set; otherwise call
    /// [`StreamBridge::start`].
    ///
    /// # Errors
    ///
    /// As for [`get`](Self::get).
    #[instrument(skip(self), fields(parameter = %query.parameter_name()))]
    pub fn subscribe(&self, query: PropertyQuery) -> Result<StreamBridge, BridgeError> {
        let (parameter, selector, builder) = self.prepare(query)?;
        let stream = StreamBridge::subscribe(parameter.as_ref(), &selector, builder);
        if self.config.auto_start_subscriptions {
            stream.start()?;
        }
        Ok(stream)
    }

    /// The foreign selector for `query`.
    ///
    /// No selector and no filters gives the "no selector" sentinel. An
    /// empty selector counts as none and falls back to the configured
    /// default.
    ///
    /// # Errors
    ///
    /// Any error from encoding the data filters.
    pub fn create_selector(&self, query: &PropertyQuery) -> Result<ForeignSelector, BridgeError> {
        let id = query
            .selector
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(self.config.default_selector.as_str());
        let filters = query.data_filters.as_ref().filter(|f| !f.is_empty());

        match filters {
            Some(filters) => Ok(ForeignSelector::with_filter(id, self.codec.encode(filters)?)),
            None if id.is_empty() => Ok(ForeignSelector::no_selector()),
            None => Ok(ForeignSelector::new(id)),
        }
    }

    fn prepare(
        &self,
        query: PropertyQuery,
    ) -> Result<(Arc<dyn Parameter>, ForeignSelector, ResponseBuilder), BridgeError> {
        let name = query.parameter_name();
        let parameter = self.factory.new_parameter(&name).map_err(|error| {
            let message = error.message().to_string();
            BridgeError::foreign(message, error)
        })?;
        let selector = self.create_selector(&query)?;
        let builder = ResponseBuilder::new(Arc::new(query), Arc::clone(&self.codec));
        Ok((parameter, selector, builder))
    }
}
