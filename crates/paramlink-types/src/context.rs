//! Notification contexts and kinds.
//!
//! Every response delivered by the bridge carries a [`NotificationContext`]
//! describing *when* the data was produced, and a [`NotificationKind`]
//! describing *why* it was delivered.
//!
//! A context built from a header without a selector is still valid; only
//! reading its selector fails, with [`BridgeError::MissingSelector`].

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

fn require_selector(selector: &Option<String>) -> Result<&str, BridgeError> {
    selector.as_deref().ok_or(BridgeError::MissingSelector)
}

fn normalize(selector: Option<String>) -> Option<String> {
    selector.filter(|s| !s.is_empty())
}

/// Plain context without any timing information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    selector: Option<String>,
}

impl Context {
    /// An empty `selector` is stored as "no selector".
    pub fn new(selector: Option<String>) -> Self {
        Self {
            selector: normalize(selector),
        }
    }

    pub fn selector(&self) -> Result<&str, BridgeError> {
        require_selector(&self.selector)
    }
}

/// Context of an acquisition that is not bound to a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionContext {
    selector: Option<String>,
    acquisition_stamp: i64,
}

impl AcquisitionContext {
    pub fn new(selector: Option<String>, acquisition_stamp: i64) -> Self {
        Self {
            selector: normalize(selector),
            acquisition_stamp,
        }
    }

    pub fn selector(&self) -> Result<&str, BridgeError> {
        require_selector(&self.selector)
    }

    pub fn acquisition_stamp(&self) -> i64 {
        self.acquisition_stamp
    }
}

/// Context of an acquisition produced within a specific cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleBoundAcquisitionContext {
    selector: Option<String>,
    acquisition_stamp: i64,
    cycle_stamp: i64,
}

impl CycleBoundAcquisitionContext {
    pub fn new(selector: Option<String>, acquisition_stamp: i64, cycle_stamp: i64) -> Self {
        Self {
            selector: normalize(selector),
            acquisition_stamp,
            cycle_stamp,
        }
    }

    pub fn selector(&self) -> Result<&str, BridgeError> {
        require_selector(&self.selector)
    }

    pub fn acquisition_stamp(&self) -> i64 {
        self.acquisition_stamp
    }

    pub fn cycle_stamp(&self) -> i64 {
        self.cycle_stamp
    }
}

/// Context of a multiplexed setting: the acquisition it was observed in
/// plus the stamp of the set operation that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplexedSettingContext {
    selector: Option<String>,
    acquisition_stamp: i64,
    set_stamp: i64,
}

impl MultiplexedSettingContext {
    pub fn new(selector: Option<String>, acquisition_stamp: i64, set_stamp: i64) -> Self {
        Self {
            selector: normalize(selector),
            acquisition_stamp,
            set_stamp,
        }
    }

    pub fn selector(&self) -> Result<&str, BridgeError> {
        require_selector(&self.selector)
    }

    pub fn acquisition_stamp(&self) -> i64 {
        self.acquisition_stamp
    }

    pub fn set_stamp(&self) -> i64 {
        self.set_stamp
    }
}

/// Context of a setting; carries the selector only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingContext {
    selector: Option<String>,
}

impl SettingContext {
    pub fn new(selector: Option<String>) -> Self {
        Self {
            selector: normalize(selector),
        }
    }

    pub fn selector(&self) -> Result<&str, BridgeError> {
        require_selector(&self.selector)
    }
}

/// The five context variants a notification can carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NotificationContext {
    Context(Context),
    Acquisition(AcquisitionContext),
    CycleBoundAcquisition(CycleBoundAcquisitionContext),
    MultiplexedSetting(MultiplexedSettingContext),
    Setting(SettingContext),
}

impl NotificationContext {
    /// The selector of whichever variant this is.
    ///
    /// # Errors
    ///
    /// [`BridgeError::MissingSelector`] when the originating header carried
    /// none.
    pub fn selector(&self) -> Result<&str, BridgeError> {
        match self {
            NotificationContext::Context(c) => c.selector(),
            NotificationContext::Acquisition(c) => c.selector(),
            NotificationContext::CycleBoundAcquisition(c) => c.selector(),
            NotificationContext::MultiplexedSetting(c) => c.selector(),
            NotificationContext::Setting(c) => c.selector(),
        }
    }

    pub fn acquisition_stamp(&self) -> Option<i64> {
        match self {
            NotificationContext::Acquisition(c) => Some(c.acquisition_stamp()),
            NotificationContext::CycleBoundAcquisition(c) => Some(c.acquisition_stamp()),
            NotificationContext::MultiplexedSetting(c) => Some(c.acquisition_stamp()),
            NotificationContext::Context(_) | NotificationContext::Setting(_) => None,
        }
    }

    pub fn cycle_stamp(&self) -> Option<i64> {
        match self {
            NotificationContext::CycleBoundAcquisition(c) => Some(c.cycle_stamp()),
            _ => None,
        }
    }

    pub fn set_stamp(&self) -> Option<i64> {
        match self {
            NotificationContext::MultiplexedSetting(c) => Some(c.set_stamp()),
            _ => None,
        }
    }
}

/// Why a notification was delivered.
///
/// Derived from the shape of the foreign header only, never from the
/// payload. Acquisition-originated updates are currently labelled
/// [`SettingUpdate`](Self::SettingUpdate) as well; see the header
/// translator for the full table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// The first value delivered after a subscription is armed.
    FirstUpdate,
    /// A value produced by, or delivered immediately after, a setting.
    SettingUpdate,
    /// A value pushed by the server because it changed.
    ServerUpdate,
}
