// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime support for bindings generated by `vbind-gen`.
//!
//! Generated modules depend on this crate for three things:
//!
//! - **Extern records**: [`Extern`] marks types that can be materialized from
//!   native bytes; [`CallbackPayload`] adds the callback id and a per-field
//!   offset/size table.
//! - **Callback decoding**: [`decode_payload`] reinterprets a callback buffer
//!   (fast path). In diagnostic builds (`debug_assertions` or the `validate`
//!   feature) it also rebuilds the record field by field and logs any
//!   disagreement, so incorrect layout facts surface before release.
//! - **Layout checks**: [`assert_layout!`] and [`assert_offset!`] pin the layout at compile
//!   time and [`layout::cross_check`] compares against the native shim.
//!
//! # Example
//!
//! ```ignore
//! let raw = unsafe { vbind::RawCallback::from_raw(msg.m_iCallback, msg.m_pubParam, msg.m_cubParam as usize) };
//! if let Some(cb) = raw.decode::<bindings::CallbackUnion>() {
//!     println!("{cb:?}");
//! }
//! ```

extern crate self as vbind;

pub mod decode;
pub mod layout;
pub mod payload;

pub use decode::{decode_payload, from_slice, DecodeError};
#[cfg(any(debug_assertions, feature = "validate"))]
pub use decode::{from_slice_validated, validate_payload, ValidationReport};
pub use layout::{cross_check, LayoutDiscrepancy, NativeIntrospection};
pub use payload::{CallbackPayload, CallbackSet, Extern, FieldSpan, RawCallback};

pub use vbind_codegen::{CallbackPayload, Extern};
