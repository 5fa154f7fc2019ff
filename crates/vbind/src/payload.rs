// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Extern record and callback payload traits.

/// A flat, `repr(C)`-compatible record that can be built from native bytes.
///
/// # Safety
///
/// Implementors must have no drop glue, must accept the all-zero bit pattern,
/// and must accept every bit pattern the native library writes for them.
/// Use `#[derive(Extern)]` rather than implementing this by hand.
pub unsafe trait Extern: Copy + 'static {}

macro_rules! impl_extern {
    ($($t:ty),* $(,)?) => {
        $(unsafe impl Extern for $t {})*
    };
}

impl_extern!(bool, u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, usize, isize);

unsafe impl<T: ?Sized + 'static> Extern for *const T {}
unsafe impl<T: ?Sized + 'static> Extern for *mut T {}
unsafe impl<T: Extern, const N: usize> Extern for [T; N] {}

macro_rules! impl_extern_fn {
    ($($arg:ident),*) => {
        unsafe impl<R: 'static $(, $arg: 'static)*> Extern
            for Option<unsafe extern "C" fn($($arg),*) -> R> {}
    };
}

impl_extern_fn!();
impl_extern_fn!(A);
impl_extern_fn!(A, B);
impl_extern_fn!(A, B, C);
impl_extern_fn!(A, B, C, D);
impl_extern_fn!(A, B, C, D, E);
impl_extern_fn!(A, B, C, D, E, F);
impl_extern_fn!(A, B, C, D, E, F, G);
impl_extern_fn!(A, B, C, D, E, F, G, H);

/// Declared position and extent of one payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpan {
    pub name: &'static str,
    pub offset: usize,
    pub size: usize,
    /// Reconciled alignment, `None` when no layout fact existed.
    pub align: Option<usize>,
}

impl FieldSpan {
    pub const fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// A callback payload registered under a numeric callback id.
pub trait CallbackPayload: Extern {
    const CALLBACK_ID: i32;
    const NAME: &'static str;
    const FIELDS: &'static [FieldSpan];

    /// Decode a payload buffer, see [`crate::decode_payload`].
    fn decode(bytes: &[u8]) -> Self {
        crate::decode::decode_payload(bytes)
    }
}

/// The closed set of callbacks a generated module knows about.
pub trait CallbackSet: Sized {
    /// Decode `bytes` as the payload registered for `id`.
    ///
    /// Returns `None` for ids outside the set, whatever the buffer length.
    fn decode(id: i32, bytes: &[u8]) -> Option<Self>;

    fn callback_id(&self) -> i32;
}

/// A callback as delivered by the native dispatcher: id plus raw payload.
#[derive(Debug, Clone, Copy)]
pub struct RawCallback<'a> {
    pub id: i32,
    pub payload: &'a [u8],
}

impl<'a> RawCallback<'a> {
    pub fn new(id: i32, payload: &'a [u8]) -> Self {
        Self { id, payload }
    }

    /// Wrap a native `(id, pointer, length)` triple.
    ///
    /// # Safety
    ///
    /// `data` must be null or point to `len` readable bytes that stay valid
    /// and unmodified for `'a`.
    pub unsafe fn from_raw(id: i32, data: *const u8, len: usize) -> Self {
        let payload = if data.is_null() || len == 0 {
            &[][..]
        } else {
            unsafe { std::slice::from_raw_parts(data, len) }
        };
        Self { id, payload }
    }

    pub fn decode<S: CallbackSet>(&self) -> Option<S> {
        S::decode(self.id, self.payload)
    }
}
