// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Canonical type expressions.

use std::fmt;

/// Fixed-width primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Isize,
    Usize,
}

impl Primitive {
    pub fn rust_name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::U8 => "u8",
            Primitive::I8 => "i8",
            Primitive::U16 => "u16",
            Primitive::I16 => "i16",
            Primitive::U32 => "u32",
            Primitive::I32 => "i32",
            Primitive::U64 => "u64",
            Primitive::I64 => "i64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Isize => "isize",
            Primitive::Usize => "usize",
        }
    }

    /// Canonical C spelling; resolves back to the same primitive.
    pub fn c_name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::U8 => "uint8_t",
            Primitive::I8 => "int8_t",
            Primitive::U16 => "uint16_t",
            Primitive::I16 => "int16_t",
            Primitive::U32 => "uint32_t",
            Primitive::I32 => "int32_t",
            Primitive::U64 => "uint64_t",
            Primitive::I64 => "int64_t",
            Primitive::F32 => "float",
            Primitive::F64 => "double",
            Primitive::Isize => "intptr_t",
            Primitive::Usize => "size_t",
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, Primitive::Bool | Primitive::F32 | Primitive::F64)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Primitive::U8 | Primitive::U16 | Primitive::U32 | Primitive::U64 | Primitive::Usize
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64)
    }
}

/// A resolved C type.
///
/// `Slice` and `ZeroTerminatedPointer` are produced only by parameter shape
/// inference, never by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Primitive(Primitive),
    Pointer {
        target: Box<TypeExpr>,
        nullable: bool,
        is_const: bool,
    },
    FixedArray {
        element: Box<TypeExpr>,
        len: usize,
    },
    /// Const pointer to a zero-terminated run of `element`.
    ZeroTerminatedPointer { element: Box<TypeExpr> },
    Slice {
        element: Box<TypeExpr>,
        is_const: bool,
    },
    FunctionPointer {
        params: Vec<TypeExpr>,
        /// `None` is `void`.
        ret: Option<Box<TypeExpr>>,
        nullable: bool,
    },
    /// A typedef, struct, enum or interface name, possibly `Owner::`-qualified.
    Named(String),
}

impl TypeExpr {
    pub fn pointer(target: TypeExpr, is_const: bool) -> Self {
        TypeExpr::Pointer {
            target: Box::new(target),
            nullable: true,
            is_const,
        }
    }

    pub fn reference(target: TypeExpr, is_const: bool) -> Self {
        TypeExpr::Pointer {
            target: Box::new(target),
            nullable: false,
            is_const,
        }
    }

    pub fn array(element: TypeExpr, len: usize) -> Self {
        TypeExpr::FixedArray {
            element: Box::new(element),
            len,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }

    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            TypeExpr::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_pointer_like(&self) -> bool {
        matches!(
            self,
            TypeExpr::Pointer { .. }
                | TypeExpr::ZeroTerminatedPointer { .. }
                | TypeExpr::Slice { .. }
                | TypeExpr::FunctionPointer { .. }
        )
    }

    /// Single-level nullable data pointer, the only shape a buffer can take.
    pub fn is_single_nullable_pointer(&self) -> bool {
        match self {
            TypeExpr::Pointer {
                target, nullable, ..
            } => *nullable && !target.is_pointer_like(),
            _ => false,
        }
    }

    /// Every `Named` reference, depth first.
    pub fn named_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_named(&mut out);
        out
    }

    fn collect_named<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeExpr::Primitive(_) => {}
            TypeExpr::Named(name) => out.push(name),
            TypeExpr::Pointer { target, .. } => target.collect_named(out),
            TypeExpr::FixedArray { element, .. }
            | TypeExpr::ZeroTerminatedPointer { element }
            | TypeExpr::Slice { element, .. } => element.collect_named(out),
            TypeExpr::FunctionPointer { params, ret, .. } => {
                for p in params {
                    p.collect_named(out);
                }
                if let Some(ret) = ret {
                    ret.collect_named(out);
                }
            }
        }
    }

    /// Rewrite every `Named` reference in place.
    pub fn map_named(&mut self, f: &mut impl FnMut(&str) -> Option<String>) {
        match self {
            TypeExpr::Primitive(_) => {}
            TypeExpr::Named(name) => {
                if let Some(renamed) = f(name) {
                    *name = renamed;
                }
            }
            TypeExpr::Pointer { target, .. } => target.map_named(f),
            TypeExpr::FixedArray { element, .. }
            | TypeExpr::ZeroTerminatedPointer { element }
            | TypeExpr::Slice { element, .. } => element.map_named(f),
            TypeExpr::FunctionPointer { params, ret, .. } => {
                for p in params {
                    p.map_named(f);
                }
                if let Some(ret) = ret {
                    ret.map_named(f);
                }
            }
        }
    }
}

/// Leading element and dimensions of a (possibly nested) fixed array.
fn array_dims(ty: &TypeExpr) -> (&TypeExpr, Vec<usize>) {
    let mut dims = Vec::new();
    let mut base = ty;
    while let TypeExpr::FixedArray { element, len } = base {
        dims.push(*len);
        base = element;
    }
    (base, dims)
}

/// Canonical C rendering.
///
/// For every output of the resolver, resolving the rendering in the same
/// context yields the same expression. A pointer to an array renders in
/// declarator form, `T (*)[n]`.
impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Primitive(p) => f.write_str(p.c_name()),
            TypeExpr::Named(name) => f.write_str(name),
            TypeExpr::Pointer {
                target,
                nullable,
                is_const,
            } => {
                let sigil = if *nullable { "*" } else { "&" };
                let cv = if *is_const { "const " } else { "" };
                match target.as_ref() {
                    TypeExpr::Pointer { .. } => write!(f, "{target}{cv}{sigil}"),
                    TypeExpr::FixedArray { .. } => {
                        let (base, dims) = array_dims(target);
                        write!(f, "{cv}{base} ({sigil})")?;
                        for len in dims {
                            write!(f, "[{len}]")?;
                        }
                        Ok(())
                    }
                    _ => write!(f, "{cv}{target} {sigil}"),
                }
            }
            TypeExpr::FixedArray { .. } => {
                let (base, dims) = array_dims(self);
                write!(f, "{base}")?;
                for len in dims {
                    write!(f, "[{len}]")?;
                }
                Ok(())
            }
            TypeExpr::ZeroTerminatedPointer { element } => write!(f, "const {element} *"),
            TypeExpr::Slice { element, is_const } => {
                let cv = if *is_const { "const " } else { "" };
                write!(f, "{cv}{element} *")
            }
            TypeExpr::FunctionPointer { params, ret, .. } => {
                match ret {
                    Some(ret) => write!(f, "{ret} (*)(")?,
                    None => f.write_str("void (*)(")?,
                }
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                f.write_str(")")
            }
        }
    }
}
