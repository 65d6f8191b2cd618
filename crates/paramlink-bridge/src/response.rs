//! Uniform responses delivered to callers.
//!
//! Successes and failures travel through the same [`PropertyResponse`]
//! type; only its `result` differs. A foreign failure becomes
//! [`BridgeError::ForeignOperationFailed`] carrying the foreign message and
//! the original [`ParameterException`] as its source.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use paramlink_types::{BridgeError, ForeignCause, NotificationContext, NotificationKind, TypedValue};
use uuid::Uuid;

use crate::codec::ValueCodec;
use crate::foreign::{AcquiredParameterValue, ParameterException};
use crate::header;
use crate::query::PropertyQuery;

/// A decoded acquisition and the context it was produced in.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredData {
    pub value: TypedValue,
    pub context: NotificationContext,
}

#[derive(Debug, Clone)]
pub struct PropertyResponse<T> {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub query: Arc<PropertyQuery>,
    /// `None` only for failures raised without a header.
    pub notification_kind: Option<NotificationKind>,
    pub result: Result<T, BridgeError>,
}

/// Response to a get or a subscription update.
pub type RetrievalResponse = PropertyResponse<AcquiredData>;

/// Response to a set.
pub type UpdateResponse = PropertyResponse<()>;

impl<T> PropertyResponse<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&BridgeError> {
        self.result.as_ref().err()
    }

    pub fn into_result(self) -> Result<T, BridgeError> {
        self.result
    }
}

/// Builds responses for one query.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    query: Arc<PropertyQuery>,
    codec: Arc<ValueCodec>,
}

impl ResponseBuilder {
    pub fn new(query: Arc<PropertyQuery>, codec: Arc<ValueCodec>) -> Self {
        Self { query, codec }
    }

    pub fn query(&self) -> &Arc<PropertyQuery> {
        &self.query
    }

    fn respond<T>(
        &self,
        notification_kind: Option<NotificationKind>,
        result: Result<T, BridgeError>,
    ) -> PropertyResponse<T> {
        PropertyResponse {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            query: Arc::clone(&self.query),
            notification_kind,
            result,
        }
    }

    /// Decode a delivered value under the query's schema.
    pub fn retrieval(&self, acquired: AcquiredParameterValue) -> RetrievalResponse {
        let (context, kind) = header::translate(&acquired.header);
        let result = self
            .codec
            .decode_parameter_value(acquired.value, self.query.schema.as_ref())
            .map(|value| AcquiredData { value, context });
        self.respond(Some(kind), result)
    }

    /// Acknowledge a set; the echoed value is not decoded.
    pub fn update(&self, acquired: AcquiredParameterValue) -> UpdateResponse {
        let (_, kind) = header::translate(&acquired.header);
        self.respond(Some(kind), Ok(()))
    }

    pub fn failure<T>(&self, error: Arc<ParameterException>) -> PropertyResponse<T> {
        let kind = error.header().map(|h| header::translate(h).1);
        let message = error.message().to_string();
        let cause: ForeignCause = error;
        self.respond(kind, Err(BridgeError::foreign(message, cause)))
    }
}
