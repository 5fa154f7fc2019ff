// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Input models: the JSON API descriptor and the per-platform layout reports.
//!
//! Both are deserialized as-is; unknown keys are ignored.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::codegen::resolver::{ResolveContext, TypeResolver};
use crate::codegen::types::{Primitive, TypeExpr};

/// Top-level API descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiDescriptor {
    #[serde(default)]
    pub callback_structs: Vec<StructDescriptor>,
    #[serde(default)]
    pub consts: Vec<ConstDescriptor>,
    #[serde(default)]
    pub enums: Vec<EnumDescriptor>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceDescriptor>,
    #[serde(default)]
    pub structs: Vec<StructDescriptor>,
    #[serde(default)]
    pub typedefs: Vec<TypedefDescriptor>,
}

impl ApiDescriptor {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructDescriptor {
    #[serde(rename = "struct")]
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub consts: Vec<ConstDescriptor>,
    #[serde(default)]
    pub enums: Vec<EnumDescriptor>,
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
    /// Present on callback structs only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub fieldname: String,
    pub fieldtype: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub methodname: String,
    pub methodname_flat: String,
    pub returntype: String,
    #[serde(default)]
    pub params: Vec<ParamDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub paramname: String,
    pub paramtype: String,
    /// Name of the parameter holding this buffer's element count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_count: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    pub classname: String,
    #[serde(default)]
    pub accessors: Vec<AccessorDescriptor>,
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
    #[serde(default)]
    pub enums: Vec<EnumDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessorDescriptor {
    pub kind: String,
    pub name: String,
    pub name_flat: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDescriptor {
    pub enumname: String,
    #[serde(default)]
    pub values: Vec<EnumValueDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumValueDescriptor {
    pub name: String,
    pub value: RawValue,
}

/// Enumerator values appear both as JSON numbers and as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Int(i64),
    UInt(u64),
    Text(String),
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawValue::Int(v) => write!(f, "{v}"),
            RawValue::UInt(v) => write!(f, "{v}"),
            RawValue::Text(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstDescriptor {
    pub constname: String,
    pub consttype: String,
    pub constval: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedefDescriptor {
    pub typedef: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Per-field fact from one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFact {
    pub field: String,
    pub size: usize,
    pub align: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

/// Per-struct fact from one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructFact {
    pub size: usize,
    pub align: usize,
    #[serde(default)]
    pub fields: Vec<FieldFact>,
}

impl StructFact {
    pub fn field(&self, name: &str) -> Option<&FieldFact> {
        self.fields.iter().find(|f| f.field == name)
    }
}

/// One platform's layout report, keyed by struct name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutReport {
    pub structs: BTreeMap<String, StructFact>,
}

impl LayoutReport {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn get(&self, name: &str) -> Option<&StructFact> {
        self.structs.get(name)
    }
}

/// What a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Struct,
    Enum,
    Typedef,
    Interface,
    Opaque,
}

/// Name lookup over the whole descriptor set.
///
/// Nested enums are registered under both `Owner::EName` and the flattened
/// `Owner_EName`.
#[derive(Debug, Clone, Default)]
pub struct DescriptorIndex {
    names: BTreeMap<String, NameKind>,
    typedefs: BTreeMap<String, String>,
    nested: BTreeSet<String>,
}

pub(crate) const MAX_TYPEDEF_DEPTH: usize = 16;

impl DescriptorIndex {
    pub fn build(
        api: &ApiDescriptor,
        extra_typedefs: &BTreeMap<String, String>,
        opaque_types: &[String],
    ) -> Self {
        let mut index = Self::default();
        for s in api.structs.iter().chain(&api.callback_structs) {
            index.names.insert(s.name.clone(), NameKind::Struct);
            for e in &s.enums {
                index.add_nested_enum(&s.name, &e.enumname);
            }
        }
        for e in &api.enums {
            index.names.insert(e.enumname.clone(), NameKind::Enum);
        }
        for i in &api.interfaces {
            index.names.insert(i.classname.clone(), NameKind::Interface);
            for e in &i.enums {
                index.add_nested_enum(&i.classname, &e.enumname);
            }
        }
        for t in &api.typedefs {
            index.names.insert(t.typedef.clone(), NameKind::Typedef);
            index.typedefs.insert(t.typedef.clone(), t.ty.clone());
        }
        for (name, ty) in extra_typedefs {
            index.names.insert(name.clone(), NameKind::Typedef);
            index.typedefs.insert(name.clone(), ty.clone());
        }
        for name in opaque_types {
            index.names.insert(name.clone(), NameKind::Opaque);
        }
        index
    }

    fn add_nested_enum(&mut self, owner: &str, name: &str) {
        let qualified = format!("{owner}::{name}");
        self.names.insert(flatten_name(&qualified), NameKind::Enum);
        self.nested.insert(qualified.clone());
        self.names.insert(qualified, NameKind::Enum);
    }

    pub fn kind(&self, name: &str) -> Option<NameKind> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn is_interface(&self, name: &str) -> bool {
        self.kind(name) == Some(NameKind::Interface)
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.kind(name) == Some(NameKind::Enum)
    }

    pub fn typedef_target(&self, name: &str) -> Option<&str> {
        self.typedefs.get(name).map(String::as_str)
    }

    /// Qualify names that refer to an enum nested in `owner`.
    pub fn qualify(&self, owner: &str, ty: &mut TypeExpr) {
        ty.map_named(&mut |name| {
            let qualified = format!("{owner}::{name}");
            (!self.contains(name) && self.nested.contains(&qualified)).then_some(qualified)
        });
    }

    /// First `Named` reference with no definition.
    pub fn first_unresolved<'a>(&self, ty: &'a TypeExpr) -> Option<&'a str> {
        ty.named_refs().into_iter().find(|name| !self.contains(name))
    }

    /// Follow typedefs until a non-`Named` type, or give up.
    pub fn expand(&self, ty: &TypeExpr, resolver: &TypeResolver) -> Option<TypeExpr> {
        let mut current = ty.clone();
        for _ in 0..MAX_TYPEDEF_DEPTH {
            current = match current {
                TypeExpr::Named(name) => {
                    let target = self.typedef_target(&name)?;
                    resolver.resolve(target, ResolveContext::VALUE).ok()?
                }
                other => return Some(other),
            };
        }
        None
    }

    /// The integer primitive `ty` reduces to through typedefs, if any.
    pub fn integer_primitive(&self, ty: &TypeExpr, resolver: &TypeResolver) -> Option<Primitive> {
        self.expand(ty, resolver)?
            .as_primitive()
            .filter(|p| p.is_integer())
    }

    /// A `Named` typedef to a fixed array decays to a pointer to its element
    /// in signature position.
    pub fn decay_array_typedef(&self, ty: TypeExpr, resolver: &TypeResolver) -> TypeExpr {
        if let TypeExpr::Named(name) = &ty {
            if self.kind(name) == Some(NameKind::Typedef) {
                if let Some(TypeExpr::FixedArray { element, .. }) = self.expand(&ty, resolver) {
                    return TypeExpr::pointer(*element, false);
                }
            }
        }
        ty
    }
}

/// `Owner::EName` -> `Owner_EName`.
pub fn flatten_name(name: &str) -> String {
    name.replace("::", "_")
}
