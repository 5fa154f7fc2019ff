// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fuzz target for the C type resolver and parameter shape inference
//!
//! - `resolve`: arbitrary type strings (must not panic)
//! - a canonical rendering that resolves again must give the same type
//! - `infer_shapes`: parameter lists of `type|name` pairs split on `;`

#![no_main]

use libfuzzer_sys::fuzz_target;
use vbind_gen::codegen::rust_backend::rust_type;
use vbind_gen::codegen::{infer_shapes, resolve, ParamInput, ParamRole, ResolveContext};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    for ctx in [ResolveContext::VALUE, ResolveContext::SIGNATURE] {
        let Ok(ty) = resolve(input, ctx) else {
            continue;
        };
        let _ = rust_type(&ty);

        let canonical = ty.to_string();
        if let Ok(again) = resolve(&canonical, ctx) {
            assert_eq!(ty, again, "round trip through {canonical:?}");
        }
    }

    let params: Vec<ParamInput> = input
        .split(';')
        .filter_map(|entry| {
            let (raw, name) = entry.split_once('|')?;
            let ty = resolve(raw, ResolveContext::SIGNATURE).ok()?;
            let count_type = ty.as_primitive().filter(|p| p.is_integer());
            Some(ParamInput {
                name: name.to_string(),
                ty,
                array_count: None,
                count_type,
            })
        })
        .collect();
    let len = params.len();
    let shaped = infer_shapes(params);
    assert_eq!(shaped.len(), len);
    for p in &shaped {
        if let ParamRole::SliceLength { head } | ParamRole::Elided { head } = p.role {
            assert!(matches!(shaped[head].role, ParamRole::SliceHead { .. }));
        }
    }
});
