// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Layout verification.
//!
//! [`assert_layout!`](crate::assert_layout) pins the size and alignment of a
//! generated record at compile time. [`cross_check`] compares a payload's
//! derived field table against the native shim at runtime.

use std::mem::{align_of, size_of};

use crate::payload::CallbackPayload;

/// Compile-time size/alignment check for a generated record.
///
/// A mismatch fails the build with
/// `expected an array with a size of <expected>, found one with a size of <actual>`.
///
/// ```
/// #[repr(C)]
/// struct Pair {
///     a: u32,
///     b: u32,
/// }
/// vbind::assert_layout!(Pair, size = 8, align = 4);
/// vbind::assert_layout!(Pair, size = if cfg!(windows) { 8 } else { 8 }, align = 4);
/// ```
#[macro_export]
macro_rules! assert_layout {
    ($ty:ty, size = $size:expr, align = $align:expr $(,)?) => {
        const _: [(); { $size }] = [(); ::core::mem::size_of::<$ty>()];
        const _: [(); { $align }] = [(); ::core::mem::align_of::<$ty>()];
    };
}

/// Compile-time field offset check, reported the same way as
/// [`assert_layout!`](crate::assert_layout).
///
/// ```
/// #[repr(C, packed(4))]
/// struct Foo {
///     a: i32,
///     b: u64,
/// }
/// vbind::assert_offset!(Foo, b, 4);
/// ```
#[macro_export]
macro_rules! assert_offset {
    ($ty:ty, $field:ident, $offset:expr $(,)?) => {
        const _: [(); { $offset }] = [(); ::core::mem::offset_of!($ty, $field)];
    };
}

/// Layout introspection exported by the generated native shim.
///
/// Each method returns 0 when the shim does not know the callback id or
/// field index.
pub trait NativeIntrospection {
    fn payload_size(&self, callback_id: i32) -> usize;
    fn payload_align(&self, callback_id: i32) -> usize;
    fn field_size(&self, callback_id: i32, field: usize) -> usize;
    fn field_align(&self, callback_id: i32, field: usize) -> usize;
}

/// A disagreement between the generated declaration and the native library.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutDiscrepancy {
    #[error("{payload}: not known to the native shim")]
    Unknown { payload: &'static str },

    #[error("{payload}: size is {declared}, native size is {native}")]
    Size {
        payload: &'static str,
        declared: usize,
        native: usize,
    },

    #[error("{payload}: alignment is {declared}, native alignment is {native}")]
    Align {
        payload: &'static str,
        declared: usize,
        native: usize,
    },

    #[error("{payload}.{field}: size is {declared}, native size is {native}")]
    FieldSize {
        payload: &'static str,
        field: &'static str,
        declared: usize,
        native: usize,
    },

    #[error("{payload}.{field}: alignment is {declared}, native alignment is {native}")]
    FieldAlign {
        payload: &'static str,
        field: &'static str,
        declared: usize,
        native: usize,
    },
}

/// Compare `T`'s layout with what the native library reports.
pub fn cross_check<T: CallbackPayload>(native: &impl NativeIntrospection) -> Vec<LayoutDiscrepancy> {
    let id = T::CALLBACK_ID;
    let native_size = native.payload_size(id);
    if native_size == 0 {
        return vec![LayoutDiscrepancy::Unknown { payload: T::NAME }];
    }

    let mut found = Vec::new();
    if native_size != size_of::<T>() {
        found.push(LayoutDiscrepancy::Size {
            payload: T::NAME,
            declared: size_of::<T>(),
            native: native_size,
        });
    }
    let native_align = native.payload_align(id);
    if native_align != align_of::<T>() {
        found.push(LayoutDiscrepancy::Align {
            payload: T::NAME,
            declared: align_of::<T>(),
            native: native_align,
        });
    }

    for (index, field) in T::FIELDS.iter().enumerate() {
        let size = native.field_size(id, index);
        if size != field.size {
            found.push(LayoutDiscrepancy::FieldSize {
                payload: T::NAME,
                field: field.name,
                declared: field.size,
                native: size,
            });
        }
        if let Some(declared) = field.align {
            let align = native.field_align(id, index);
            if align != declared {
                found.push(LayoutDiscrepancy::FieldAlign {
                    payload: T::NAME,
                    field: field.name,
                    declared,
                    native: align,
                });
            }
        }
    }

    if !found.is_empty() {
        log::debug!("[vbind] {} layout discrepancies for {}", found.len(), T::NAME);
    }
    found
}
