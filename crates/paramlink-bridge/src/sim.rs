//! In-process simulated middleware for tests and demos.
//!
//! [`SimulatedMiddleware`] implements [`ParameterFactory`] and hands out
//! [`SimParameter`]s that answer gets with canned values, record sets and
//! feed subscriptions from [`SimParameter::publish`]. Get and set results
//! are delivered on a separate thread, the way the real middleware calls
//! back from threads it owns; published values are delivered synchronously
//! on the publishing thread.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use paramlink_bridge::foreign::{SimpleValue, ValueHeader};
//! use paramlink_bridge::sim::SimulatedMiddleware;
//!
//! let middleware = SimulatedMiddleware::new();
//! middleware
//!     .parameter("PS.MAGNET/Acquisition")
//!     .when_get_then(ValueHeader::acquisition_regular_update(1, 2, "CPS.USER.ALL"), SimpleValue::scalar(1.5f64));
//! assert_eq!(middleware.parameter_count(), 1);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::debug;

use crate::foreign::{
    AcquiredParameterValue, ForeignSelector, Parameter, ParameterException, ParameterFactory,
    ParameterValue, ParameterValueListener, SubscriptionHandle, ValueHeader,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What a simulated get delivers.
#[derive(Debug, Clone)]
pub enum SimAnswer {
    Value(ValueHeader, ParameterValue),
    Exception(Arc<ParameterException>),
}

// ────────────────────────────────────────────────────────────────────────────
// Parameter
// ────────────────────────────────────────────────────────────────────────────

/// A simulated device property.
pub struct SimParameter {
    name: String,
    get_answer: Mutex<Option<SimAnswer>>,
    sync_set_failure: Mutex<Option<Arc<ParameterException>>>,
    async_set_failure: Mutex<Option<Arc<ParameterException>>>,
    sets: Mutex<Vec<(ForeignSelector, ParameterValue)>>,
    subscriptions: Mutex<Vec<Arc<SimSubscription>>>,
}

impl SimParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            get_answer: Mutex::new(None),
            sync_set_failure: Mutex::new(None),
            async_set_failure: Mutex::new(None),
            sets: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Answer every get with `value` under `header`.
    pub fn when_get_then(&self, header: ValueHeader, value: impl Into<ParameterValue>) -> &Self {
        *lock(&self.get_answer) = Some(SimAnswer::Value(header, value.into()));
        self
    }

    /// Answer every get with a failure callback.
    pub fn when_get_fail(&self, exception: ParameterException) -> &Self {
        *lock(&self.get_answer) = Some(SimAnswer::Exception(Arc::new(exception)));
        self
    }

    /// Make `set_value` fail before the request is sent.
    pub fn fail_sets_with(&self, exception: ParameterException) -> &Self {
        *lock(&self.sync_set_failure) = Some(Arc::new(exception));
        self
    }

    /// Accept sets but report `exception` through the listener.
    pub fn reject_sets_with(&self, exception: ParameterException) -> &Self {
        *lock(&self.async_set_failure) = Some(Arc::new(exception));
        self
    }

    /// Every accepted set, oldest first.
    pub fn recorded_sets(&self) -> Vec<(ForeignSelector, ParameterValue)> {
        lock(&self.sets).clone()
    }

    pub fn subscription_count(&self) -> usize {
        lock(&self.subscriptions).len()
    }

    pub fn monitoring_count(&self) -> usize {
        lock(&self.subscriptions)
            .iter()
            .filter(|s| s.monitoring.load(Ordering::SeqCst))
            .count()
    }

    /// Deliver `value` to every monitoring subscription.
    pub fn publish(&self, header: ValueHeader, value: impl Into<ParameterValue>) {
        let acquired = AcquiredParameterValue {
            parameter_name: self.name.clone(),
            header,
            value: value.into(),
        };
        for subscription in self.monitoring() {
            subscription
                .listener
                .value_received(&self.name, acquired.clone());
        }
    }

    /// Deliver `exception` to every monitoring subscription.
    pub fn publish_exception(&self, exception: ParameterException) {
        let exception = Arc::new(exception);
        for subscription in self.monitoring() {
            subscription.listener.exception_occurred(
                &self.name,
                "subscription failure",
                Arc::clone(&exception),
            );
        }
    }

    fn monitoring(&self) -> Vec<Arc<SimSubscription>> {
        lock(&self.subscriptions)
            .iter()
            .filter(|s| s.monitoring.load(Ordering::SeqCst))
            .cloned()
            .collect()
    }
}

impl Parameter for SimParameter {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_value(&self, _selector: &ForeignSelector, listener: Arc<dyn ParameterValueListener>) {
        let name = self.name.clone();
        let answer = lock(&self.get_answer).clone().unwrap_or_else(|| {
            SimAnswer::Exception(Arc::new(ParameterException::new(format!(
                "no value available for {name}"
            ))))
        });
        thread::spawn(move || match answer {
            SimAnswer::Value(header, value) => listener.value_received(
                &name,
                AcquiredParameterValue {
                    parameter_name: name.clone(),
                    header,
                    value,
                },
            ),
            SimAnswer::Exception(exception) => {
                listener.exception_occurred(&name, "get failed", exception)
            }
        });
    }

    fn set_value(
        &self,
        selector: &ForeignSelector,
        value: ParameterValue,
        listener: Arc<dyn ParameterValueListener>,
    ) -> Result<(), Arc<ParameterException>> {
        if let Some(exception) = lock(&self.sync_set_failure).clone() {
            return Err(exception);
        }
        lock(&self.sets).push((selector.clone(), value.clone()));

        let name = self.name.clone();
        let failure = lock(&self.async_set_failure).clone();
        let header = ValueHeader::setting_immediate_update(selector.id().unwrap_or_default());
        thread::spawn(move || match failure {
            Some(exception) => listener.exception_occurred(&name, "set failed", exception),
            None => listener.value_received(
                &name,
                AcquiredParameterValue {
                    parameter_name: name.clone(),
                    header,
                    value,
                },
            ),
        });
        Ok(())
    }

    fn create_subscription(
        &self,
        selector: &ForeignSelector,
        listener: Arc<dyn ParameterValueListener>,
    ) -> Box<dyn SubscriptionHandle> {
        let subscription = Arc::new(SimSubscription {
            parameter: self.name.clone(),
            selector: selector.clone(),
            listener,
            monitoring: AtomicBool::new(false),
        });
        lock(&self.subscriptions).push(Arc::clone(&subscription));
        Box::new(SimSubscriptionHandle(subscription))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Subscriptions
// ────────────────────────────────────────────────────────────────────────────

struct SimSubscription {
    parameter: String,
    selector: ForeignSelector,
    listener: Arc<dyn ParameterValueListener>,
    monitoring: AtomicBool,
}

struct SimSubscriptionHandle(Arc<SimSubscription>);

impl SubscriptionHandle for SimSubscriptionHandle {
    fn start_monitoring(&self) {
        self.0.monitoring.store(true, Ordering::SeqCst);
        debug!(
            parameter = %self.0.parameter,
            selector = ?self.0.selector.id(),
            "simulated subscription armed"
        );
    }

    fn stop_monitoring(&self) {
        self.0.monitoring.store(false, Ordering::SeqCst);
    }

    fn is_monitoring(&self) -> bool {
        self.0.monitoring.load(Ordering::SeqCst)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Factory
// ────────────────────────────────────────────────────────────────────────────

/// A [`ParameterFactory`] over simulated parameters, created on first use.
#[derive(Default)]
pub struct SimulatedMiddleware {
    parameters: Mutex<HashMap<String, Arc<SimParameter>>>,
}

impl SimulatedMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// The parameter called `name`, created if needed.
    pub fn parameter(&self, name: &str) -> Arc<SimParameter> {
        Arc::clone(
            lock(&self.parameters)
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(SimParameter::new(name))),
        )
    }

    pub fn parameter_count(&self) -> usize {
        lock(&self.parameters).len()
    }
}

impl ParameterFactory for SimulatedMiddleware {
    fn new_parameter(&self, name: &str) -> Result<Arc<dyn Parameter>, Arc<ParameterException>> {
        match name.split_once('/') {
            Some((device, property)) if !device.is_empty() && !property.is_empty() => {
                Ok(self.parameter(name))
            }
            _ => Err(Arc::new(ParameterException::new(format!(
                "invalid parameter name '{name}': expected device/property"
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::foreign::SimpleValue;

    /// Forwards every callback into a channel.
    struct Recorder(Mutex<mpsc::Sender<Result<AcquiredParameterValue, String>>>);

    impl ParameterValueListener for Recorder {
        fn value_received(&self, _name: &str, value: AcquiredParameterValue) {
            let _ = lock(&self.0).send(Ok(value));
        }

        fn exception_occurred(&self, _name: &str, _description: &str, error: Arc<ParameterException>) {
            let _ = lock(&self.0).send(Err(error.message().to_string()));
        }
    }

    fn recorder() -> (Arc<Recorder>, mpsc::Receiver<Result<AcquiredParameterValue, String>>) {
        let (tx, rx) = mpsc::channel();
        (Arc::new(Recorder(Mutex::new(tx))), rx)
    }

    #[test]
    fn malformed_names_are_rejected() {
        let middleware = SimulatedMiddleware::new();
        assert!(middleware.new_parameter("no-slash").is_err());
        assert!(middleware.new_parameter("/prop").is_err());
        assert!(middleware.new_parameter("DEV/Prop").is_ok());
        assert_eq!(middleware.parameter_count(), 1);
    }

    #[test]
    fn get_answers_on_another_thread() {
        let parameter = SimParameter::new("DEV/Prop");
        parameter.when_get_then(
            ValueHeader::acquisition_regular_update(5, 6, "SEL"),
            SimpleValue::scalar(4i64),
        );
        let (listener, rx) = recorder();
        parameter.get_value(&ForeignSelector::new("SEL"), listener);

        let delivered = rx.recv_timeout(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(delivered.parameter_name, "DEV/Prop");
        assert_eq!(delivered.header.cycle_stamp(), 6);
    }

    #[test]
    fn unconfigured_get_fails() {
        let parameter = SimParameter::new("DEV/Prop");
        let (listener, rx) = recorder();
        parameter.get_value(&ForeignSelector::no_selector(), listener);
        let delivered = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(delivered.is_err());
    }

    #[test]
    fn sets_are_recorded_and_acknowledged() {
        let parameter = SimParameter::new("DEV/Prop");
        let (listener, rx) = recorder();
        parameter
            .set_value(
                &ForeignSelector::new("SEL"),
                SimpleValue::scalar(true).into(),
                listener,
            )
            .unwrap();

        let ack = rx.recv_timeout(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(ack.header.selector(), Some("SEL"));
        assert_eq!(parameter.recorded_sets().len(), 1);
    }

    #[test]
    fn publish_reaches_monitoring_subscriptions_only() {
        let parameter = SimParameter::new("DEV/Prop");
        let (listener, rx) = recorder();
        let handle = parameter.create_subscription(&ForeignSelector::no_selector(), listener);

        parameter.publish(ValueHeader::setting_immediate_update(""), SimpleValue::scalar(1i32));
        assert!(rx.try_recv().is_err());

        handle.start_monitoring();
        assert!(handle.is_monitoring());
        parameter.publish(ValueHeader::setting_immediate_update(""), SimpleValue::scalar(2i32));
        parameter.publish_exception(ParameterException::new("lost"));
        assert!(rx.try_recv().unwrap().is_ok());
        assert_eq!(rx.try_recv().unwrap().unwrap_err(), "lost");

        handle.stop_monitoring();
        assert_eq!(parameter.monitoring_count(), 0);
        assert_eq!(parameter.subscription_count(), 1);
    }
}
