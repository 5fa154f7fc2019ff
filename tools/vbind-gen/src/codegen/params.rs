// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Parameter shape inference.
//!
//! Hungarian-style names pair buffer pointers with their element counts:
//! `pvData` + `cbData`, `pubDest` + `cubDest`, `pchName` + `cchNameMax`.
//! Paired buffers become slices in the wrapper signature and the count is
//! computed from the slice. `psz` buffers are zero-terminated strings.

use std::sync::OnceLock;

use regex::Regex;

use super::types::{Primitive, TypeExpr};

/// Inferred role of a parameter. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRole {
    Plain,
    SliceHead {
        /// Index of the count parameter.
        length: Option<usize>,
        zero_terminated: bool,
    },
    /// Count of an explicit-length slice.
    SliceLength { head: usize },
    /// Count of a zero-terminated head, the string length without terminator.
    Elided { head: usize },
}

impl ParamRole {
    /// The parameter is computed and absent from the wrapper signature.
    pub fn is_computed(&self) -> bool {
        matches!(self, ParamRole::SliceLength { .. } | ParamRole::Elided { .. })
    }
}

/// A parameter before inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamInput {
    pub name: String,
    pub ty: TypeExpr,
    pub array_count: Option<String>,
    /// Integer primitive the type reduces to; only these can be counts.
    pub count_type: Option<Primitive>,
}

/// A parameter after inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: String,
    /// Native type.
    pub ty: TypeExpr,
    pub role: ParamRole,
    /// Type in the wrapper signature, `None` for computed parameters.
    pub public: Option<TypeExpr>,
    pub count_type: Option<Primitive>,
}

/// Split of a buffer parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferName<'a> {
    pub prefix: &'a str,
    pub logical: &'a str,
    pub zero_terminated: bool,
}

fn buffer_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| Regex::new(r"^(p(?:v|ch?|sz|ub)?)[A-Z]").expect("static buffer pattern"))
}

/// `pszName` -> (`psz`, `Name`, zero-terminated).
pub fn match_buffer_name(name: &str) -> Option<BufferName<'_>> {
    let caps = buffer_prefix().captures(name)?;
    let prefix = caps.get(1)?.as_str();
    Some(BufferName {
        prefix,
        logical: &name[prefix.len()..],
        zero_terminated: prefix.contains('z'),
    })
}

const COUNT_PREFIXES: &[&str] = &["n", "cub", "cch", "cbMax", "cb"];

/// Whether `candidate` names the count of the buffer called `logical`.
pub fn is_count_companion(logical: &str, candidate: &str) -> bool {
    COUNT_PREFIXES.iter().any(|prefix| {
        candidate
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with(logical))
    })
}

/// Assign roles and wrapper types; order is preserved.
pub fn infer_shapes(params: Vec<ParamInput>) -> Vec<ParameterDescriptor> {
    let roles = assign_roles(&params);
    let mut out: Vec<ParameterDescriptor> = params
        .into_iter()
        .zip(roles)
        .map(|(p, role)| ParameterDescriptor {
            name: p.name,
            ty: p.ty,
            role,
            public: None,
            count_type: p.count_type,
        })
        .collect();

    for i in 0..out.len() {
        let public = match out[i].role {
            ParamRole::Plain => Some(out[i].ty.clone()),
            ParamRole::SliceHead {
                length,
                zero_terminated,
            } => match head_type(&out[i].ty, length.is_some(), zero_terminated) {
                Some(ty) => Some(ty),
                None => {
                    // no usable wrapper: fall back to the raw pointer
                    out[i].role = ParamRole::Plain;
                    if let Some(j) = length {
                        out[j].role = ParamRole::Plain;
                        out[j].public = Some(out[j].ty.clone());
                    }
                    Some(out[i].ty.clone())
                }
            },
            ParamRole::SliceLength { .. } | ParamRole::Elided { .. } => None,
        };
        out[i].public = public;
    }
    out
}

fn assign_roles(params: &[ParamInput]) -> Vec<ParamRole> {
    let mut roles = vec![ParamRole::Plain; params.len()];
    let mut consumed = vec![false; params.len()];

    for (i, param) in params.iter().enumerate() {
        if roles[i] != ParamRole::Plain || !param.ty.is_single_nullable_pointer() {
            continue;
        }
        let Some(buffer) = match_buffer_name(&param.name) else {
            continue;
        };

        let companion = params.iter().enumerate().position(|(j, candidate)| {
            j != i
                && !consumed[j]
                && candidate.count_type.is_some()
                && (param.array_count.as_deref() == Some(candidate.name.as_str())
                    || is_count_companion(buffer.logical, &candidate.name))
        });

        match companion {
            Some(j) => {
                consumed[j] = true;
                roles[i] = ParamRole::SliceHead {
                    length: Some(j),
                    zero_terminated: buffer.zero_terminated,
                };
                roles[j] = if buffer.zero_terminated {
                    ParamRole::Elided { head: i }
                } else {
                    ParamRole::SliceLength { head: i }
                };
            }
            None if buffer.zero_terminated => {
                roles[i] = ParamRole::SliceHead {
                    length: None,
                    zero_terminated: true,
                };
            }
            None => {}
        }
    }
    roles
}

/// Wrapper type of a slice head, if it has one.
fn head_type(ty: &TypeExpr, has_length: bool, zero_terminated: bool) -> Option<TypeExpr> {
    let TypeExpr::Pointer {
        target, is_const, ..
    } = ty
    else {
        return None;
    };
    let is_byte = matches!(**target, TypeExpr::Primitive(Primitive::U8));
    if zero_terminated && *is_const && is_byte {
        return Some(TypeExpr::ZeroTerminatedPointer {
            element: target.clone(),
        });
    }
    if zero_terminated && !has_length {
        return None;
    }
    Some(TypeExpr::Slice {
        element: target.clone(),
        is_const: *is_const,
    })
}

/// Wrapper name for a flat symbol: the part after `{owner}_`.
///
/// `None` unless the remainder is a plain identifier.
pub fn wrapper_name(owner: &str, flat: &str) -> Option<String> {
    let marker = format!("{owner}_");
    let at = flat.find(&marker)?;
    let rest = &flat[at + marker.len()..];
    let mut chars = rest.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    plain.then(|| rest.to_string())
}

/// One method, planned once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodPlan {
    /// Flat C symbol.
    pub flat_name: String,
    /// Wrapper method name, `None` when no valid name could be derived.
    pub wrapper_name: Option<String>,
    pub params: Vec<ParameterDescriptor>,
    /// `None` is `void`.
    pub ret: Option<TypeExpr>,
}

impl MethodPlan {
    pub fn public_params(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.params.iter().filter(|p| !p.role.is_computed())
    }
}
