//! Callback → future / stream adapters.
//!
//! The middleware reports results by invoking one of two listener methods
//! on a thread it owns. This module turns those invocations into the two
//! shapes callers consume:
//!
//! | Adapter | States | Consumer side |
//! |---|---|---|
//! | [`OneShotBridge`] | pending → resolved | [`ResultFuture`] |
//! | [`StreamBridge`] | created → monitoring ⇄ paused → stopped | [`StreamBridge::next`] |
//!
//! Neither adapter ever blocks the calling middleware thread: the one-shot
//! slot is a `tokio::sync::oneshot` channel and the stream queue is an
//! unbounded `tokio::sync::mpsc` channel.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use paramlink_types::BridgeError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::foreign::{
    AcquiredParameterValue, ForeignSelector, Parameter, ParameterException,
    ParameterValueListener, SubscriptionHandle,
};
use crate::response::{AcquiredData, PropertyResponse, ResponseBuilder, RetrievalResponse};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ────────────────────────────────────────────────────────────────────────────
// One-shot
// ────────────────────────────────────────────────────────────────────────────

type Convert<T> = fn(&ResponseBuilder, AcquiredParameterValue) -> PropertyResponse<T>;

/// Resolves a [`ResultFuture`] from the first listener invocation.
///
/// Later invocations are protocol violations; they are logged and ignored.
pub struct OneShotBridge<T> {
    builder: ResponseBuilder,
    convert: Convert<T>,
    slot: Mutex<Option<oneshot::Sender<PropertyResponse<T>>>>,
}

impl OneShotBridge<AcquiredData> {
    /// A bridge for a get: values are decoded under the query's schema.
    pub fn retrieval(builder: ResponseBuilder) -> (Arc<Self>, ResultFuture<AcquiredData>) {
        Self::with_converter(builder, ResponseBuilder::retrieval)
    }
}

impl OneShotBridge<()> {
    /// A bridge for a set: values only acknowledge completion.
    pub fn update(builder: ResponseBuilder) -> (Arc<Self>, ResultFuture<()>) {
        Self::with_converter(builder, ResponseBuilder::update)
    }
}

impl<T: Send + 'static> OneShotBridge<T> {
    fn with_converter(builder: ResponseBuilder, convert: Convert<T>) -> (Arc<Self>, ResultFuture<T>) {
        let (tx, rx) = oneshot::channel();
        let bridge = Arc::new(Self {
            builder,
            convert,
            slot: Mutex::new(Some(tx)),
        });
        (bridge, ResultFuture { rx })
    }

    pub fn is_resolved(&self) -> bool {
        lock(&self.slot).is_none()
    }

    /// Resolve with a delivered value. Returns `false` if already resolved.
    pub fn on_success(&self, value: AcquiredParameterValue) -> bool {
        let Some(tx) = lock(&self.slot).take() else {
            warn!(
                parameter = %value.parameter_name,
                "value delivered to an already resolved request; ignoring"
            );
            return false;
        };
        self.resolve(tx, (self.convert)(&self.builder, value));
        true
    }

    /// Resolve with a foreign failure. Returns `false` if already resolved.
    pub fn on_failure(&self, error: Arc<ParameterException>) -> bool {
        let Some(tx) = lock(&self.slot).take() else {
            warn!(
                error = %error,
                "failure delivered to an already resolved request; ignoring"
            );
            return false;
        };
        self.resolve(tx, self.builder.failure(error));
        true
    }

    fn resolve(&self, tx: oneshot::Sender<PropertyResponse<T>>, response: PropertyResponse<T>) {
        if tx.send(response).is_err() {
            debug!(
                parameter = %self.builder.query().parameter_name(),
                "result future dropped before resolution"
            );
        }
    }
}

impl<T: Send + 'static> ParameterValueListener for OneShotBridge<T> {
    fn value_received(&self, _parameter_name: &str, value: AcquiredParameterValue) {
        self.on_success(value);
    }

    fn exception_occurred(
        &self,
        parameter_name: &str,
        description: &str,
        error: Arc<ParameterException>,
    ) {
        debug!(parameter = %parameter_name, description, "request failed");
        self.on_failure(error);
    }
}

/// The consumer half of a [`OneShotBridge`].
///
/// Resolves to [`BridgeError::Disconnected`] if the bridge is dropped
/// without ever being resolved.
pub struct ResultFuture<T> {
    rx: oneshot::Receiver<PropertyResponse<T>>,
}

impl<T> ResultFuture<T> {
    /// Block the current thread until the response arrives.
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_wait(self) -> Result<PropertyResponse<T>, BridgeError> {
        self.rx.blocking_recv().map_err(|_| BridgeError::Disconnected)
    }
}

impl<T> Future for ResultFuture<T> {
    type Output = Result<PropertyResponse<T>, BridgeError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.map_err(|_| BridgeError::Disconnected))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stream
// ────────────────────────────────────────────────────────────────────────────

/// Lifecycle of a [`StreamBridge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Created,
    Monitoring,
    Paused,
    /// Terminal.
    Stopped,
}

struct Gate {
    state: StreamState,
    tx: Option<mpsc::UnboundedSender<RetrievalResponse>>,
}

struct StreamListener {
    builder: ResponseBuilder,
    gate: Mutex<Gate>,
}

impl StreamListener {
    /// Enqueue while monitoring. The gate stays locked during conversion so
    /// a concurrent `stop` either precedes the enqueue or follows it.
    fn deliver(&self, make: impl FnOnce(&ResponseBuilder) -> RetrievalResponse) {
        let gate = lock(&self.gate);
        let (StreamState::Monitoring, Some(tx)) = (gate.state, gate.tx.as_ref()) else {
            debug!(
                parameter = %self.builder.query().parameter_name(),
                state = ?gate.state,
                "dropping notification outside monitoring"
            );
            return;
        };
        if tx.send(make(&self.builder)).is_err() {
            debug!("stream consumer gone; dropping notification");
        }
    }
}

impl ParameterValueListener for StreamListener {
    fn value_received(&self, _parameter_name: &str, value: AcquiredParameterValue) {
        self.deliver(|builder| builder.retrieval(value));
    }

    fn exception_occurred(
        &self,
        parameter_name: &str,
        description: &str,
        error: Arc<ParameterException>,
    ) {
        debug!(parameter = %parameter_name, description, "subscription reported a failure");
        self.deliver(|builder| builder.failure(error));
    }
}

/// A restartable, pull-based stream over one subscription.
///
/// Responses are yielded in the order the middleware delivered them.
/// Failures arrive in the same sequence as values, as responses whose
/// `result` is an error. Once [`stop`](Self::stop) has been called every
/// pull fails with [`BridgeError::StreamClosed`]; anything still queued is
/// discarded.
pub struct StreamBridge {
    listener: Arc<StreamListener>,
    handle: Box<dyn SubscriptionHandle>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<RetrievalResponse>>,
}

impl StreamBridge {
    /// Create the subscription. Nothing is delivered until
    /// [`start`](Self::start).
    pub fn subscribe(
        parameter: &dyn Parameter,
        selector: &ForeignSelector,
        builder: ResponseBuilder,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = Arc::new(StreamListener {
            builder,
            gate: Mutex::new(Gate {
                state: StreamState::Created,
                tx: Some(tx),
            }),
        });
        let handle = parameter.create_subscription(selector, listener.clone());
        Self {
            listener,
            handle,
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    pub fn state(&self) -> StreamState {
        lock(&self.listener.gate).state
    }

    /// Arm the subscription.
    ///
    /// # Errors
    ///
    /// [`BridgeError::StreamClosed`] once stopped.
    pub fn start(&self) -> Result<(), BridgeError> {
        {
            let mut gate = lock(&self.listener.gate);
            match gate.state {
                StreamState::Stopped => return Err(BridgeError::StreamClosed),
                StreamState::Monitoring => return Ok(()),
                StreamState::Created | StreamState::Paused => {
                    gate.state = StreamState::Monitoring;
                }
            }
        }
        // The gate must be open before arming: a first update may be
        // delivered synchronously.
        self.handle.start_monitoring();
        Ok(())
    }

    /// Disarm the subscription until the next [`start`](Self::start).
    /// Values delivered while paused are dropped.
    ///
    /// # Errors
    ///
    /// [`BridgeError::StreamClosed`] once stopped.
    pub fn pause(&self) -> Result<(), BridgeError> {
        {
            let mut gate = lock(&self.listener.gate);
            match gate.state {
                StreamState::Stopped => return Err(BridgeError::StreamClosed),
                StreamState::Created | StreamState::Paused => return Ok(()),
                StreamState::Monitoring => gate.state = StreamState::Paused,
            }
        }
        self.handle.stop_monitoring();
        Ok(())
    }

    /// Disarm permanently and wake any pending [`next`](Self::next).
    /// Idempotent.
    pub fn stop(&self) {
        let previous = {
            let mut gate = lock(&self.listener.gate);
            gate.tx = None;
            std::mem::replace(&mut gate.state, StreamState::Stopped)
        };
        if previous != StreamState::Stopped {
            self.handle.stop_monitoring();
            debug!(
                parameter = %self.listener.builder.query().parameter_name(),
                "subscription stopped"
            );
        }
    }

    /// Wait for the next response.
    ///
    /// # Errors
    ///
    /// [`BridgeError::StreamClosed`] once stopped, including when the stop
    /// happens while waiting.
    pub async fn next(&self) -> Result<RetrievalResponse, BridgeError> {
        if self.state() == StreamState::Stopped {
            return Err(BridgeError::StreamClosed);
        }
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(response) if self.state() != StreamState::Stopped => Ok(response),
            _ => Err(BridgeError::StreamClosed),
        }
    }

    /// Blocking form of [`next`](Self::next), for use outside a runtime.
    pub fn blocking_next(&self) -> Result<RetrievalResponse, BridgeError> {
        if self.state() == StreamState::Stopped {
            return Err(BridgeError::StreamClosed);
        }
        let mut rx = self.rx.blocking_lock();
        match rx.blocking_recv() {
            Some(response) if self.state() != StreamState::Stopped => Ok(response),
            _ => Err(BridgeError::StreamClosed),
        }
    }

    /// Adapt into a `Stream` that ends when the bridge is stopped.
    pub fn into_stream(self) -> BoxStream<'static, RetrievalResponse> {
        stream::unfold(self, |bridge| async move {
            match bridge.next().await {
                Ok(response) => Some((response, bridge)),
                Err(_) => None,
            }
        })
        .boxed()
    }
}

impl Drop for StreamBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for StreamBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBridge")
            .field("parameter", &self.listener.builder.query().parameter_name())
            .field("state", &self.state())
            .finish()
    }
}
