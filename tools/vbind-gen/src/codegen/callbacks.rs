// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Callback tagging: the closed set of callback payloads behind
//! `CallbackUnion`.

use std::collections::BTreeMap;

use crate::descriptor::{DescriptorIndex, NameKind};
use crate::error::GenError;

use super::rust_backend::StructSpec;
use super::types::TypeExpr;

/// One variant of the generated callback union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPlan {
    pub id: i32,
    /// Payload struct name.
    pub name: String,
    pub variant: String,
    /// Field names in declaration order, indexed by the shim.
    pub fields: Vec<String>,
    /// `false` when the shim must leave this callback commented out.
    pub shim_enabled: bool,
}

/// `GameOverlayActivated_t` -> `GameOverlayActivated`.
pub fn variant_name(struct_name: &str) -> String {
    struct_name
        .strip_suffix("_t")
        .filter(|s| !s.is_empty())
        .unwrap_or(struct_name)
        .to_string()
}

/// A field type the fast decode path cannot materialize from bytes.
fn is_non_extern(ty: &TypeExpr, index: &DescriptorIndex) -> bool {
    match ty {
        TypeExpr::Slice { .. } | TypeExpr::ZeroTerminatedPointer { .. } => true,
        TypeExpr::FixedArray { element, .. } => is_non_extern(element, index),
        TypeExpr::Named(name) => matches!(
            index.kind(name),
            Some(NameKind::Interface) | Some(NameKind::Opaque)
        ),
        _ => false,
    }
}

/// Outcome of planning the callback set.
#[derive(Debug, Clone, Default)]
pub struct CallbackPlanning {
    pub plans: Vec<CallbackPlan>,
    /// Struct name and reason, for callbacks left out of the union.
    pub rejected: Vec<(String, GenError)>,
}

/// Plan the union over `structs`, in descriptor order.
///
/// Field types must not yet have interface pointers rewritten to handles.
pub fn plan_callbacks(structs: &[StructSpec], index: &DescriptorIndex, deny: &[String]) -> CallbackPlanning {
    let mut planning = CallbackPlanning::default();
    let mut by_id: BTreeMap<i32, &str> = BTreeMap::new();

    for spec in structs {
        let Some(id) = spec.callback_id else {
            continue;
        };
        if let Some(first) = by_id.get(&id) {
            planning.rejected.push((
                spec.name.clone(),
                GenError::DuplicateCallbackId {
                    id,
                    first: first.to_string(),
                    second: spec.name.clone(),
                },
            ));
            continue;
        }
        if let Some(field) = spec.fields.iter().find(|f| is_non_extern(&f.ty, index)) {
            planning.rejected.push((
                spec.name.clone(),
                GenError::NonExternPayload {
                    name: spec.name.clone(),
                    field: field.name.clone(),
                    ty: field.ty.to_string(),
                },
            ));
            continue;
        }

        by_id.insert(id, &spec.name);
        planning.plans.push(CallbackPlan {
            id,
            name: spec.name.clone(),
            variant: variant_name(&spec.name),
            fields: spec.fields.iter().map(|f| f.name.clone()).collect(),
            shim_enabled: !deny.contains(&spec.name),
        });
    }
    planning
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::layout::{PlatformValue, ReconciledLayout};
    use crate::codegen::rust_backend::FieldSpec;
    use crate::codegen::types::Primitive;
    use crate::descriptor::{ApiDescriptor, InterfaceDescriptor};

    fn spec(name: &str, id: i32, fields: Vec<FieldSpec>) -> StructSpec {
        StructSpec {
            name: name.into(),
            layout: ReconciledLayout {
                name: name.into(),
                size: PlatformValue::Literal(4),
                align: PlatformValue::Literal(4),
                fields: Vec::new(),
                filler: false,
                diagnostics: Vec::new(),
            },
            fields,
            consts: Vec::new(),
            methods: Vec::new(),
            callback_id: Some(id),
        }
    }

    fn field(name: &str, ty: TypeExpr) -> FieldSpec {
        FieldSpec {
            name: name.into(),
            ty,
            default: String::new(),
        }
    }

    fn index() -> DescriptorIndex {
        let api = ApiDescriptor {
            interfaces: vec![InterfaceDescriptor {
                classname: "ISteamUser".into(),
                accessors: Vec::new(),
                methods: Vec::new(),
                enums: Vec::new(),
            }],
            ..ApiDescriptor::default()
        };
        DescriptorIndex::build(&api, &BTreeMap::new(), &["Opaque_t".to_string()])
    }

    #[test]
    fn test_variant_name() {
        assert_eq!(variant_name("FooCallback_t"), "FooCallback");
        assert_eq!(variant_name("Plain"), "Plain");
        assert_eq!(variant_name("_t"), "_t");
    }

    #[test]
    fn test_duplicate_id_keeps_first() {
        let i32_ty = TypeExpr::Primitive(Primitive::I32);
        let structs = vec![
            spec("First_t", 7, vec![field("m_a", i32_ty.clone())]),
            spec("Second_t", 7, vec![field("m_a", i32_ty)]),
        ];
        let planning = plan_callbacks(&structs, &index(), &[]);
        assert_eq!(planning.plans.len(), 1);
        assert_eq!(planning.plans[0].variant, "First");
        assert_eq!(
            planning.rejected,
            vec![(
                "Second_t".to_string(),
                GenError::DuplicateCallbackId {
                    id: 7,
                    first: "First_t".into(),
                    second: "Second_t".into()
                }
            )]
        );
    }

    #[test]
    fn test_interface_value_is_not_extern() {
        let structs = vec![
            spec("Bad_t", 1, vec![field("m_user", TypeExpr::named("ISteamUser"))]),
            spec("Blob_t", 2, vec![field("m_blob", TypeExpr::array(TypeExpr::named("Opaque_t"), 2))]),
            spec(
                "Ok_t",
                3,
                vec![field(
                    "m_pUser",
                    TypeExpr::pointer(TypeExpr::named("ISteamUser"), false),
                )],
            ),
        ];
        let planning = plan_callbacks(&structs, &index(), &[]);
        let names: Vec<_> = planning.plans.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Ok_t"]);
        assert_eq!(planning.rejected.len(), 2);
        assert!(matches!(
            &planning.rejected[0].1,
            GenError::NonExternPayload { field, .. } if field == "m_user"
        ));
    }

    #[test]
    fn test_deny_list_disables_shim_only() {
        let structs = vec![spec("Denied_t", 9, vec![field("m_a", TypeExpr::Primitive(Primitive::U8))])];
        let planning = plan_callbacks(&structs, &index(), &["Denied_t".to_string()]);
        assert_eq!(planning.plans.len(), 1);
        assert!(!planning.plans[0].shim_enabled);
        assert_eq!(planning.plans[0].fields, ["m_a"]);
    }
}
