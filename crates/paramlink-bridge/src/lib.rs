//! `paramlink-bridge` – typed access to a control-system middleware.
//!
//! Converts the middleware's dynamically typed parameter values into
//! schema-bound [`TypedValue`][paramlink_types::TypedValue]s and back, and
//! turns its push callbacks into futures and pull-based streams.
//!
//! # Modules
//!
//! | Module | Role |
//! |---|---|
//! | [`foreign`] | The middleware's value model and access traits |
//! | [`type_map`] | Foreign kind ↔ basic type lookup and typed accessors |
//! | [`infer`] | Schema inference from a foreign value |
//! | [`codec`] | Foreign map value ↔ `TypedValue` conversion |
//! | [`header`] | Value header → (context, kind) translation |
//! | [`notification`] | One-shot and streaming callback adapters |
//! | [`query`], [`response`] | What a request addresses and what it returns |
//! | [`provider`] | Get / set / subscribe entry points |
//! | [`sim`] | In-process simulated middleware |
//! | [`config`] | TOML configuration with env overrides |
//! | [`telemetry`] | Tracing subscriber and OTLP export |

pub mod codec;
pub mod config;
pub mod foreign;
pub mod header;
pub mod infer;
pub mod notification;
pub mod provider;
pub mod query;
pub mod response;
pub mod sim;
pub mod telemetry;
pub mod type_map;

pub use codec::ValueCodec;
pub use config::{BridgeConfig, ConfigError};
pub use infer::SchemaInferer;
pub use notification::{OneShotBridge, ResultFuture, StreamBridge, StreamState};
pub use provider::Provider;
pub use query::PropertyQuery;
pub use response::{AcquiredData, PropertyResponse, RetrievalResponse, UpdateResponse};
pub use type_map::TypeMap;
