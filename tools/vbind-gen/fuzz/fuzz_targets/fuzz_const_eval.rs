// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fuzz target for constant expression evaluation (must not panic)

#![no_main]

use libfuzzer_sys::fuzz_target;
use vbind_gen::codegen::consts::{eval_integer, float_const, integer_const, string_const};
use vbind_gen::codegen::Primitive;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let _ = eval_integer(input);
    for p in [Primitive::U8, Primitive::I32, Primitive::U64, Primitive::Bool] {
        let _ = integer_const("k_fuzz", input, p);
    }
    let _ = float_const("k_fuzz", input);
    let _ = string_const("k_fuzz", input);
});
