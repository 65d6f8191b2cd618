//! `paramlink-types` – the local, strongly-typed data model.
//!
//! Everything the conversion core produces or consumes on the *local* side
//! of the bridge lives here. The crate has no I/O and no threads; the
//! foreign middleware model and the conversion logic live in
//! `paramlink-bridge`.
//!
//! # Modules
//!
//! - [`basic`] – [`BasicType`] (the twelve element kinds) and [`Rank`]
//!   (scalar / vector / matrix).
//! - [`value`] – [`Value`]: a typed, row-major element [`Buffer`] plus its
//!   shape, with the [`Element`] trait tying Rust types to basic types.
//! - [`schema`] – [`Schema`] and [`FieldSpec`]: name → (basic type, rank).
//! - [`typed_value`] – [`TypedValue`]: a schema plus one optional slot per
//!   declared field.
//! - [`context`] – [`NotificationContext`] variants and
//!   [`NotificationKind`].
//! - [`error`] – [`BridgeError`], the error type shared by the workspace.

pub mod basic;
pub mod context;
pub mod error;
pub mod schema;
pub mod typed_value;
pub mod value;

pub use basic::{BasicType, Rank};
pub use context::{
    AcquisitionContext, Context, CycleBoundAcquisitionContext, MultiplexedSettingContext,
    NotificationContext, NotificationKind, SettingContext,
};
pub use error::{BridgeError, ForeignCause, ForeignFailure};
pub use schema::{FieldSpec, Schema, SchemaBuilder};
pub use typed_value::TypedValue;
pub use value::{Buffer, Element, MatrixRef, Value};
