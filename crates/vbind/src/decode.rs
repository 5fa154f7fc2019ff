// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Callback payload decoding.
//!
//! Two strategies build a payload record from a callback buffer:
//!
//! - **fast path** ([`from_slice`]): copy the first
//!   `min(size_of::<T>(), len)` bytes over a zeroed record. This is the
//!   production contract.
//! - **validating path** ([`from_slice_validated`], diagnostic builds only):
//!   copy every declared field from its declared offset, ignoring padding,
//!   and fail when the buffer ends inside a field.
//!
//! [`decode_payload`] always returns the fast-path record. In diagnostic
//! builds it also runs the validating path and logs a warning with hex dumps
//! when the two disagree or the buffer length differs from the record size.

use std::mem::{size_of, MaybeUninit};

use crate::payload::{CallbackPayload, Extern};

/// Errors raised by the validating decoder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error(
        "truncated callback payload {payload}: field `{field}` ends at byte {end}, buffer has {len}"
    )]
    TruncatedCallbackPayload {
        payload: &'static str,
        field: &'static str,
        end: usize,
        len: usize,
    },
}

/// A zeroed record under construction.
///
/// Only byte-level writes happen before [`Staging::into_inner`], so every
/// byte (padding included) stays initialized and can be read back.
struct Staging<T> {
    slot: MaybeUninit<T>,
}

impl<T: Extern> Staging<T> {
    fn zeroed() -> Self {
        Self {
            slot: MaybeUninit::zeroed(),
        }
    }

    #[cfg(any(debug_assertions, feature = "validate"))]
    fn as_bytes(&self) -> &[u8] {
        // SAFETY: the slot was zeroed and only written through `as_bytes_mut`.
        unsafe { std::slice::from_raw_parts(self.slot.as_ptr().cast::<u8>(), size_of::<T>()) }
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above; `T: Extern` has no invariants beyond its bytes.
        unsafe {
            std::slice::from_raw_parts_mut(self.slot.as_mut_ptr().cast::<u8>(), size_of::<T>())
        }
    }

    fn into_inner(self) -> T {
        // SAFETY: `Extern` types accept zero bytes and native-written bytes.
        unsafe { self.slot.assume_init() }
    }
}

fn stage_fast<T: Extern>(bytes: &[u8]) -> Staging<T> {
    let mut staging = Staging::<T>::zeroed();
    let n = bytes.len().min(size_of::<T>());
    staging.as_bytes_mut()[..n].copy_from_slice(&bytes[..n]);
    staging
}

#[cfg(any(debug_assertions, feature = "validate"))]
fn stage_validated<T: CallbackPayload>(bytes: &[u8]) -> Result<Staging<T>, DecodeError> {
    let mut staging = Staging::<T>::zeroed();
    for field in T::FIELDS {
        let end = field.end();
        if end > bytes.len() {
            return Err(DecodeError::TruncatedCallbackPayload {
                payload: T::NAME,
                field: field.name,
                end,
                len: bytes.len(),
            });
        }
        staging.as_bytes_mut()[field.offset..end].copy_from_slice(&bytes[field.offset..end]);
    }
    Ok(staging)
}

/// Canonical byte representation: declared field bytes in order, no padding.
#[cfg(any(debug_assertions, feature = "validate"))]
fn canonical_bytes<T: CallbackPayload>(staging: &Staging<T>) -> Vec<u8> {
    let raw = staging.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    for field in T::FIELDS {
        if let Some(bytes) = raw.get(field.offset..field.end()) {
            out.extend_from_slice(bytes);
        }
    }
    out
}

/// Fast path: reinterpret the leading bytes of `bytes` as a `T`.
///
/// Bytes past the end of a short buffer are left zeroed; extra trailing bytes
/// are ignored.
pub fn from_slice<T: Extern>(bytes: &[u8]) -> T {
    stage_fast::<T>(bytes).into_inner()
}

/// Validating path: copy each declared field individually.
#[cfg(any(debug_assertions, feature = "validate"))]
pub fn from_slice_validated<T: CallbackPayload>(bytes: &[u8]) -> Result<T, DecodeError> {
    stage_validated::<T>(bytes).map(Staging::into_inner)
}

/// Outcome of cross-checking the fast path against the validating path.
#[cfg(any(debug_assertions, feature = "validate"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub payload: &'static str,
    pub callback_id: i32,
    /// `size_of::<T>()`.
    pub expected_len: usize,
    pub actual_len: usize,
    pub truncated: Option<DecodeError>,
    pub fast: Vec<u8>,
    /// Empty when the validating path failed.
    pub slow: Vec<u8>,
}

#[cfg(any(debug_assertions, feature = "validate"))]
impl ValidationReport {
    pub fn length_mismatch(&self) -> bool {
        self.expected_len != self.actual_len
    }

    pub fn representation_mismatch(&self) -> bool {
        self.truncated.is_none() && self.fast != self.slow
    }

    pub fn is_clean(&self) -> bool {
        !self.length_mismatch() && self.truncated.is_none() && !self.representation_mismatch()
    }
}

/// Run both decoders over `bytes` and compare their canonical bytes.
#[cfg(any(debug_assertions, feature = "validate"))]
pub fn validate_payload<T: CallbackPayload>(bytes: &[u8]) -> ValidationReport {
    let fast = stage_fast::<T>(bytes);
    validate_staged(&fast, bytes)
}

#[cfg(any(debug_assertions, feature = "validate"))]
fn validate_staged<T: CallbackPayload>(fast: &Staging<T>, bytes: &[u8]) -> ValidationReport {
    let (slow, truncated) = match stage_validated::<T>(bytes) {
        Ok(slow) => (canonical_bytes(&slow), None),
        Err(err) => (Vec::new(), Some(err)),
    };
    ValidationReport {
        payload: T::NAME,
        callback_id: T::CALLBACK_ID,
        expected_len: size_of::<T>(),
        actual_len: bytes.len(),
        truncated,
        fast: canonical_bytes(fast),
        slow,
    }
}

/// Decode a callback payload.
///
/// Always returns the fast-path record. Diagnostic builds additionally
/// validate it and log a warning instead of failing.
pub fn decode_payload<T: CallbackPayload>(bytes: &[u8]) -> T {
    let fast = stage_fast::<T>(bytes);

    #[cfg(any(debug_assertions, feature = "validate"))]
    {
        let report = validate_staged(&fast, bytes);
        if !report.is_clean() {
            log_report(&report, fast.as_bytes(), bytes);
        }
    }

    fast.into_inner()
}

#[cfg(any(debug_assertions, feature = "validate"))]
fn log_report(report: &ValidationReport, record: &[u8], message: &[u8]) {
    if let Some(err) = &report.truncated {
        log::warn!("[vbind] callback {}: {}", report.callback_id, err);
    }
    log::warn!(
        "[vbind] layout check failed for {} (callback {}): expected {} bytes, got {}\n    struct: {}\n   message: {}\n      slow: {}\n      fast: {}",
        report.payload,
        report.callback_id,
        report.expected_len,
        report.actual_len,
        hex(record),
        hex(message),
        hex(&report.slow),
        hex(&report.fast),
    );
}

#[cfg(any(debug_assertions, feature = "validate"))]
fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(any(debug_assertions, feature = "validate"))]
    #[test]
    fn test_hex_lowercase() {
        assert_eq!(hex(&[0x00, 0xab, 0x7f]), "00ab7f");
        assert_eq!(hex(&[]), "");
    }

    #[test]
    fn test_from_slice_primitive() {
        let v: u32 = from_slice(&[0x01, 0x00, 0x00, 0x00, 0xff]);
        assert_eq!(v, u32::from_ne_bytes([1, 0, 0, 0]));
    }

    #[test]
    fn test_from_slice_short_buffer_zero_fills() {
        let v: u64 = from_slice(&[0xff]);
        assert_eq!(v.to_ne_bytes()[0], 0xff);
        assert_eq!(&v.to_ne_bytes()[1..], &[0u8; 7]);
    }
}
