// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! C type grammar resolver.
//!
//! Turns the raw type strings of the API descriptor into [`TypeExpr`]s.
//! Rules are tried in order and the first match wins:
//!
//! 1. function pointers, `R (*)(A, B)`
//! 2. fixed arrays, `T[n]` and `T[n][m]` (a raw pointer in signature position)
//! 3. primitive spellings
//! 4. `Owner::Name` qualified enum names
//! 5. pointer and reference forms, most specific first
//! 6. a bare identifier becomes [`TypeExpr::Named`]
//!
//! Platform-width spellings (`long`, `wchar_t`, ...) are rejected.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use super::types::{Primitive, TypeExpr};
use crate::error::UnsupportedType;

/// Where the type string appears.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveContext {
    /// Function parameter or return position; arrays decay to pointers.
    pub signature: bool,
}

impl ResolveContext {
    pub const VALUE: Self = Self { signature: false };
    pub const SIGNATURE: Self = Self { signature: true };
}

const PLATFORM_WIDTH: &[&str] = &[
    "long",
    "long int",
    "signed long",
    "unsigned long",
    "unsigned long int",
    "long double",
    "wchar_t",
];

fn primitive(spelling: &str) -> Option<Primitive> {
    let p = match spelling {
        "bool" => Primitive::Bool,
        "char" | "unsigned char" | "uint8_t" => Primitive::U8,
        "signed char" | "int8_t" => Primitive::I8,
        "short" | "signed short" | "int16_t" => Primitive::I16,
        "unsigned short" | "uint16_t" => Primitive::U16,
        "int" | "signed" | "signed int" | "int32_t" => Primitive::I32,
        "unsigned" | "unsigned int" | "uint32_t" => Primitive::U32,
        "long long" | "signed long long" | "int64_t" => Primitive::I64,
        "unsigned long long" | "uint64_t" => Primitive::U64,
        "float" => Primitive::F32,
        "double" => Primitive::F64,
        "intptr_t" | "ssize_t" => Primitive::Isize,
        "size_t" | "uintptr_t" => Primitive::Usize,
        _ => return None,
    };
    Some(p)
}

/// Collapse whitespace and space out the punctuation tokens, so
/// `const char*`, `const char *` and `const  char  *` all read the same.
pub fn normalize(raw: &str) -> String {
    let mut spaced = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '*' | '&' | '(' | ')' | ',' | '[' | ']' => {
                spaced.push(' ');
                spaced.push(ch);
                spaced.push(' ');
            }
            c if c.is_whitespace() => spaced.push(' '),
            c => spaced.push(c),
        }
    }
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

struct Patterns {
    function_pointer: Regex,
    pointer_to_array: Regex,
    array: Regex,
    dimension: Regex,
    identifier: Regex,
    qualified: Regex,
    pointer_forms: Vec<(Regex, PointerForm)>,
}

#[derive(Debug, Clone, Copy)]
enum PointerForm {
    /// `const T **`
    ConstDoubleInner,
    /// `T *const *`
    ConstDoubleOuter,
    Double,
    ConstRef,
    Ref,
    ConstPtr,
    Ptr,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        const T: &str = r"([A-Za-z_][\w:]*(?: [A-Za-z_][\w:]*)*)";
        let form = |pattern: &str| {
            Regex::new(&pattern.replace("{T}", T)).expect("static resolver pattern")
        };
        Patterns {
            function_pointer: form(r"^(.+?) \( \* \) \( (.*)\)$"),
            pointer_to_array: form(r"^(.+?) \( \* \)((?: \[ \d+ \])+)$"),
            array: form(r"^(.+?)((?: \[ \d+ \])+)$"),
            dimension: form(r"\d+"),
            identifier: form(r"^[A-Za-z_]\w*(?:::[A-Za-z_]\w*)*$"),
            qualified: form(r"^[A-Za-z_]\w*(?:::[A-Za-z_]\w*)+$"),
            pointer_forms: vec![
                (form(r"^const {T} \* \*$"), PointerForm::ConstDoubleInner),
                (form(r"^{T} \* const \*$"), PointerForm::ConstDoubleOuter),
                (form(r"^{T} \* \*$"), PointerForm::Double),
                (form(r"^const {T} &$"), PointerForm::ConstRef),
                (form(r"^{T} &$"), PointerForm::Ref),
                (form(r"^const {T} \*$"), PointerForm::ConstPtr),
                (form(r"^{T} \*$"), PointerForm::Ptr),
            ],
        }
    })
}

/// Resolve a raw C type string.
pub fn resolve(raw: &str, ctx: ResolveContext) -> Result<TypeExpr, UnsupportedType> {
    let norm = normalize(raw);
    resolve_normalized(&norm, ctx).ok_or_else(|| UnsupportedType(raw.trim().to_string()))
}

/// Resolve a return type; `void` is `None`.
pub fn resolve_return(raw: &str, ctx: ResolveContext) -> Result<Option<TypeExpr>, UnsupportedType> {
    if normalize(raw) == "void" {
        return Ok(None);
    }
    resolve(raw, ctx).map(Some)
}

fn resolve_normalized(t: &str, ctx: ResolveContext) -> Option<TypeExpr> {
    let pats = patterns();

    if let Some(caps) = pats.function_pointer.captures(t) {
        let ret = match caps[1].trim() {
            "void" => None,
            ret => Some(Box::new(resolve_normalized(ret, ResolveContext::SIGNATURE)?)),
        };
        let mut params = Vec::new();
        for param in split_params(caps[2].trim()) {
            params.push(resolve_normalized(param, ResolveContext::SIGNATURE)?);
        }
        return Some(TypeExpr::FunctionPointer {
            params,
            ret,
            nullable: true,
        });
    }

    if let Some(caps) = pats.pointer_to_array.captures(t) {
        let (is_const, element) = match caps[1].strip_prefix("const ") {
            Some(rest) => (true, rest),
            None => (false, &caps[1]),
        };
        let element = resolve_normalized(element, ResolveContext::VALUE)?;
        let dims = dimensions(&pats.dimension, &caps[2])?;
        return Some(TypeExpr::pointer(nest_arrays(element, &dims), is_const));
    }

    if let Some(caps) = pats.array.captures(t) {
        let dims = dimensions(&pats.dimension, &caps[2])?;
        let element = resolve_normalized(caps[1].trim(), ResolveContext::VALUE)?;
        let (_, inner) = dims.split_first()?;
        // A parameter array decays to a pointer to its first element.
        return Some(if ctx.signature {
            TypeExpr::pointer(nest_arrays(element, inner), false)
        } else {
            nest_arrays(element, &dims)
        });
    }

    let has_indirection = t.contains('*') || t.contains('&');
    if !has_indirection {
        return resolve_value(t);
    }

    for (re, form) in &pats.pointer_forms {
        let Some(caps) = re.captures(t) else {
            continue;
        };
        let target = pointee(&caps[1])?;
        let ty = match form {
            PointerForm::ConstDoubleInner => {
                TypeExpr::pointer(TypeExpr::pointer(target, true), false)
            }
            PointerForm::ConstDoubleOuter => {
                TypeExpr::pointer(TypeExpr::pointer(target, false), true)
            }
            PointerForm::Double => TypeExpr::pointer(TypeExpr::pointer(target, false), false),
            PointerForm::ConstRef => TypeExpr::reference(target, true),
            PointerForm::Ref => TypeExpr::reference(target, false),
            PointerForm::ConstPtr => TypeExpr::pointer(target, true),
            PointerForm::Ptr => TypeExpr::pointer(target, false),
        };
        return Some(ty);
    }
    None
}

fn dimensions(dimension: &Regex, list: &str) -> Option<Vec<usize>> {
    dimension
        .find_iter(list)
        .map(|m| m.as_str().parse::<usize>().ok())
        .collect()
}

/// `T` with `[2][3]` is an array of 2 arrays of 3 `T`.
fn nest_arrays(element: TypeExpr, dims: &[usize]) -> TypeExpr {
    dims.iter()
        .rev()
        .fold(element, |acc, len| TypeExpr::array(acc, *len))
}

/// Value types: primitives, qualified enum names and identifiers.
fn resolve_value(t: &str) -> Option<TypeExpr> {
    if let Some(rest) = t.strip_prefix("const ") {
        return resolve_value(rest);
    }
    for keyword in ["struct ", "enum "] {
        if let Some(rest) = t.strip_prefix(keyword) {
            return resolve_value(rest);
        }
    }
    if PLATFORM_WIDTH.contains(&t) {
        return None;
    }
    if let Some(p) = primitive(t) {
        return Some(TypeExpr::Primitive(p));
    }
    let pats = patterns();
    if pats.qualified.is_match(t) {
        return Some(TypeExpr::named(t));
    }
    if t != "void" && pats.identifier.is_match(t) {
        return Some(TypeExpr::named(t));
    }
    None
}

fn pointee(t: &str) -> Option<TypeExpr> {
    if t == "void" {
        return Some(TypeExpr::Primitive(Primitive::U8));
    }
    resolve_value(t)
}

/// Split a normalized parameter list on top-level commas.
fn split_params(list: &str) -> Vec<&str> {
    if list.is_empty() || list == "void" {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in list.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(list[start..].trim());
    out
}

/// Resolver with the configured raw-string overrides applied first.
#[derive(Debug, Clone, Default)]
pub struct TypeResolver {
    overrides: BTreeMap<String, String>,
}

impl TypeResolver {
    pub fn new(overrides: &BTreeMap<String, String>) -> Self {
        Self {
            overrides: overrides
                .iter()
                .map(|(from, to)| (normalize(from), to.clone()))
                .collect(),
        }
    }

    fn apply_override<'a>(&'a self, raw: &'a str) -> &'a str {
        self.overrides
            .get(&normalize(raw))
            .map(String::as_str)
            .unwrap_or(raw)
    }

    pub fn resolve(&self, raw: &str, ctx: ResolveContext) -> Result<TypeExpr, UnsupportedType> {
        resolve(self.apply_override(raw), ctx)
    }

    pub fn resolve_return(
        &self,
        raw: &str,
        ctx: ResolveContext,
    ) -> Result<Option<TypeExpr>, UnsupportedType> {
        resolve_return(self.apply_override(raw), ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(raw: &str) -> TypeExpr {
        resolve(raw, ResolveContext::VALUE).unwrap_or_else(|e| panic!("{e}"))
    }

    fn prim(p: Primitive) -> TypeExpr {
        TypeExpr::Primitive(p)
    }

    #[test]
    fn test_primitive_table() {
        let cases = [
            ("bool", Primitive::Bool),
            ("char", Primitive::U8),
            ("unsigned char", Primitive::U8),
            ("signed char", Primitive::I8),
            ("short", Primitive::I16),
            ("unsigned short", Primitive::U16),
            ("int", Primitive::I32),
            ("unsigned int", Primitive::U32),
            ("long long", Primitive::I64),
            ("unsigned long long", Primitive::U64),
            ("int64_t", Primitive::I64),
            ("float", Primitive::F32),
            ("double", Primitive::F64),
            ("intptr_t", Primitive::Isize),
            ("size_t", Primitive::Usize),
        ];
        for (raw, expected) in cases {
            assert_eq!(value(raw), prim(expected), "{raw}");
        }
    }

    #[test]
    fn test_platform_width_rejected() {
        for raw in ["long", "unsigned long", "long double", "wchar_t", "const wchar_t *"] {
            assert_eq!(
                resolve(raw, ResolveContext::VALUE),
                Err(UnsupportedType(raw.to_string()))
            );
        }
    }

    #[test]
    fn test_whitespace_and_const_value() {
        assert_eq!(value("  unsigned   int "), prim(Primitive::U32));
        assert_eq!(value("const int"), prim(Primitive::I32));
        assert_eq!(
            value("const char*"),
            TypeExpr::pointer(prim(Primitive::U8), true)
        );
    }

    #[test]
    fn test_pointer_forms() {
        let foo = || TypeExpr::named("servernetadr_t");
        assert_eq!(
            value("const char **"),
            TypeExpr::pointer(TypeExpr::pointer(prim(Primitive::U8), true), false)
        );
        assert_eq!(
            value("SteamNetworkingMessage_t *const *"),
            TypeExpr::pointer(
                TypeExpr::pointer(TypeExpr::named("SteamNetworkingMessage_t"), false),
                true
            )
        );
        assert_eq!(
            value("int **"),
            TypeExpr::pointer(TypeExpr::pointer(prim(Primitive::I32), false), false)
        );
        assert_eq!(value("const servernetadr_t &"), TypeExpr::reference(foo(), true));
        assert_eq!(value("servernetadr_t &"), TypeExpr::reference(foo(), false));
        assert_eq!(value("const servernetadr_t *"), TypeExpr::pointer(foo(), true));
        assert_eq!(value("servernetadr_t *"), TypeExpr::pointer(foo(), false));
    }

    #[test]
    fn test_void_pointer_is_byte_pointer() {
        assert_eq!(value("void *"), TypeExpr::pointer(prim(Primitive::U8), false));
        assert_eq!(
            value("const void *"),
            TypeExpr::pointer(prim(Primitive::U8), true)
        );
        assert!(resolve("void", ResolveContext::VALUE).is_err());
    }

    #[test]
    fn test_fixed_arrays() {
        assert_eq!(value("char [128]"), TypeExpr::array(prim(Primitive::U8), 128));
        assert_eq!(
            value("uint8[2][16]"),
            TypeExpr::array(TypeExpr::array(TypeExpr::named("uint8"), 16), 2)
        );
        assert_eq!(
            resolve("char[33]", ResolveContext::SIGNATURE),
            Ok(TypeExpr::pointer(prim(Primitive::U8), false))
        );
    }

    #[test]
    fn test_function_pointer() {
        let ty = value("void (*)(int, const char *)");
        assert_eq!(
            ty,
            TypeExpr::FunctionPointer {
                params: vec![
                    prim(Primitive::I32),
                    TypeExpr::pointer(prim(Primitive::U8), true)
                ],
                ret: None,
                nullable: true,
            }
        );
        let ty = value("bool (*)(void)");
        assert_eq!(
            ty,
            TypeExpr::FunctionPointer {
                params: Vec::new(),
                ret: Some(Box::new(prim(Primitive::Bool))),
                nullable: true,
            }
        );
    }

    #[test]
    fn test_named_and_qualified() {
        assert_eq!(value("EResult"), TypeExpr::named("EResult"));
        assert_eq!(
            value("ISteamHTMLSurface::EHTMLMouseButton"),
            TypeExpr::named("ISteamHTMLSurface::EHTMLMouseButton")
        );
        assert_eq!(
            value("const ISteamHTMLSurface::EHTMLKeyModifiers *"),
            TypeExpr::pointer(TypeExpr::named("ISteamHTMLSurface::EHTMLKeyModifiers"), true)
        );
    }

    #[test]
    fn test_unsupported_syntax() {
        for raw in ["", "int ***", "template<int>", "int (*)[n]", "int (**)[4]", "char [n]"] {
            assert!(resolve(raw, ResolveContext::VALUE).is_err(), "{raw}");
        }
    }

    #[test]
    fn test_canonical_rendering_round_trips() {
        let raws = [
            "int",
            "unsigned char",
            "const char *",
            "const char **",
            "SteamNetworkingMessage_t *const *",
            "servernetadr_t &",
            "const servernetadr_t &",
            "void *",
            "char [128]",
            "uint8[2][16]",
            "int (*)[4]",
            "const char (*)[2][3]",
            "void (*)(int, const char *)",
            "bool (*)(const void *, unsigned int)",
            "ISteamHTMLSurface::EHTMLMouseButton",
        ];
        for raw in raws {
            let first = value(raw);
            let rendered = first.to_string();
            let second = value(&rendered);
            assert_eq!(first, second, "{raw} -> {rendered}");
            assert_eq!(value(raw), first, "{raw} is not deterministic");
        }

        // Parameter arrays decay; the decayed form must read back as-is.
        for raw in ["uint8[2][16]", "char [128]", "void (*)(int [4][2])"] {
            let first = resolve(raw, ResolveContext::SIGNATURE).expect(raw);
            let rendered = first.to_string();
            assert_eq!(resolve(&rendered, ResolveContext::SIGNATURE), Ok(first), "{raw} -> {rendered}");
        }
    }

    #[test]
    fn test_pointer_to_array() {
        let decayed = resolve("uint8[2][16]", ResolveContext::SIGNATURE).expect("decays");
        assert_eq!(
            decayed,
            TypeExpr::pointer(TypeExpr::array(TypeExpr::named("uint8"), 16), false)
        );
        assert_eq!(decayed.to_string(), "uint8 (*)[16]");
        assert_eq!(
            value("const int (*)[2][3]"),
            TypeExpr::pointer(
                TypeExpr::array(TypeExpr::array(prim(Primitive::I32), 3), 2),
                true
            )
        );
    }

    #[test]
    fn test_resolve_return_void() {
        assert_eq!(resolve_return(" void ", ResolveContext::SIGNATURE), Ok(None));
        assert_eq!(
            resolve_return("int", ResolveContext::SIGNATURE),
            Ok(Some(prim(Primitive::I32)))
        );
    }

    #[test]
    fn test_overrides_apply_first() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "const ScePadTriggerEffectParam *".to_string(),
            "const void *".to_string(),
        );
        let resolver = TypeResolver::new(&overrides);
        assert_eq!(
            resolver.resolve("const ScePadTriggerEffectParam*", ResolveContext::SIGNATURE),
            Ok(TypeExpr::pointer(prim(Primitive::U8), true))
        );
    }
}
