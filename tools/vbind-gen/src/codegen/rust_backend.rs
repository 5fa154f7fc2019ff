// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rust emission for the bindings module.
//!
//! Every entity is a plain spec value with a `render` method; the module is
//! assembled in a fixed order so output is byte-identical across runs.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::descriptor::flatten_name;

use super::callbacks::CallbackPlan;
use super::consts::EnumValueSpec;
use super::layout::{FieldAlignment, PlatformValue, ReconciledLayout};
use super::params::{MethodPlan, ParamRole, ParameterDescriptor};
use super::types::{Primitive, TypeExpr};

/// Name of the pack-size constant in the prelude.
pub const PACK_SIZE_CONST: &str = "STRUCT_PLATFORM_PACK_SIZE";

/// Settings shared by every render call.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// `cfg` predicate selecting platform A.
    pub platform_cfg: &'a str,
    pub pack_a: usize,
    pub pack_b: usize,
    pub shim_prefix: &'a str,
    pub link_name: Option<&'a str>,
    /// Root interface returned by the shim's root accessor, when configured.
    pub root_interface: Option<&'a str>,
    pub has_root_accessor: bool,
}

impl RenderContext<'_> {
    fn value_expr(&self, value: &PlatformValue) -> String {
        match value {
            PlatformValue::Literal(n) => n.to_string(),
            PlatformValue::Conditional { a, b } => {
                format!("if cfg!({}) {{ {a} }} else {{ {b} }}", self.platform_cfg)
            }
            PlatformValue::PackSize => PACK_SIZE_CONST.to_string(),
        }
    }

    fn repr_attrs(&self, align: &PlatformValue) -> String {
        let (a, b) = match *align {
            PlatformValue::Literal(n) => return format!("#[repr(C, packed({n}))]\n"),
            PlatformValue::Conditional { a, b } => (a, b),
            PlatformValue::PackSize => (self.pack_a, self.pack_b),
        };
        format!(
            "#[cfg_attr({cfg}, repr(C, packed({a})))]\n#[cfg_attr(not({cfg}), repr(C, packed({b})))]\n",
            cfg = self.platform_cfg
        )
    }
}

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do", "dyn",
    "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in", "let", "loop",
    "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "static",
    "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual",
    "where", "while", "yield",
];

/// Make `name` usable as a Rust identifier.
pub fn escape_ident(name: &str) -> String {
    match name {
        "self" | "Self" | "super" | "crate" => format!("{name}_"),
        _ if KEYWORDS.contains(&name) => format!("r#{name}"),
        _ => name.to_string(),
    }
}

/// Rust spelling of a type.
pub fn rust_type(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Primitive(p) => p.rust_name().to_string(),
        TypeExpr::Named(name) => flatten_name(name),
        TypeExpr::Pointer {
            target, is_const, ..
        } => {
            let cv = if *is_const { "const" } else { "mut" };
            format!("*{cv} {}", rust_type(target))
        }
        TypeExpr::FixedArray { element, len } => format!("[{}; {len}]", rust_type(element)),
        TypeExpr::ZeroTerminatedPointer { .. } => "&::core::ffi::CStr".to_string(),
        TypeExpr::Slice { element, is_const } => {
            let cv = if *is_const { "" } else { "mut " };
            format!("&{cv}[{}]", rust_type(element))
        }
        TypeExpr::FunctionPointer { params, ret, .. } => {
            let params: Vec<String> = params.iter().map(rust_type).collect();
            let ret = ret
                .as_ref()
                .map(|r| format!(" -> {}", rust_type(r)))
                .unwrap_or_default();
            format!("Option<unsafe extern \"C\" fn({}){ret}>", params.join(", "))
        }
    }
}

fn ret_suffix(ret: Option<&TypeExpr>) -> String {
    ret.map(|r| format!(" -> {}", rust_type(r))).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedefSpec {
    pub name: String,
    pub ty: TypeExpr,
}

impl TypedefSpec {
    pub fn render(&self) -> String {
        format!("pub type {} = {};\n", flatten_name(&self.name), rust_type(&self.ty))
    }
}

/// Newtype enum over `i32`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSpec {
    /// Flattened name.
    pub name: String,
    pub values: Vec<EnumValueSpec>,
}

impl EnumSpec {
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("#[repr(transparent)]\n");
        out.push_str("#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::vbind::Extern)]\n");
        let _ = writeln!(out, "pub struct {}(pub i32);", self.name);
        if !self.values.is_empty() {
            let _ = writeln!(out, "\nimpl {} {{", self.name);
            for v in &self.values {
                let _ = writeln!(out, "    pub const {}: Self = Self({});", escape_ident(&v.name), v.expr);
            }
            out.push_str("}\n");
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstSpec {
    pub name: String,
    /// Rust type, already rendered.
    pub ty: String,
    pub value: String,
}

impl ConstSpec {
    fn render(&self, indent: &str) -> String {
        format!(
            "{indent}pub const {}: {} = {};\n",
            escape_ident(&self.name),
            self.ty,
            self.value
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: TypeExpr,
    /// Expression used by the generated `Default` impl.
    pub default: String,
}

/// A struct or callback struct with a reconciled layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructSpec {
    pub name: String,
    pub layout: ReconciledLayout,
    pub fields: Vec<FieldSpec>,
    pub consts: Vec<ConstSpec>,
    pub methods: Vec<MethodPlan>,
    pub callback_id: Option<i32>,
}

impl StructSpec {
    pub fn render(&self, ctx: &RenderContext<'_>) -> String {
        let name = &self.name;
        let mut out = String::new();
        out.push_str(&ctx.repr_attrs(&self.layout.align));
        match self.callback_id {
            Some(id) => {
                out.push_str(
                    "#[derive(Clone, Copy, Debug, ::vbind::Extern, ::vbind::CallbackPayload)]\n",
                );
                let _ = writeln!(out, "#[vbind(callback_id = {id})]");
            }
            None => out.push_str("#[derive(Clone, Copy, Debug, ::vbind::Extern)]\n"),
        }
        let _ = writeln!(out, "pub struct {name} {{");
        for field in &self.fields {
            out.push_str(&self.render_field(field, ctx));
        }
        if self.layout.filler {
            out.push_str("    pub _padding: u8,\n");
        }
        out.push_str("}\n\n");

        let _ = writeln!(
            out,
            "::vbind::assert_layout!({name}, size = {}, align = {});",
            ctx.value_expr(&self.layout.size),
            ctx.value_expr(&self.layout.align)
        );
        for field in &self.layout.fields {
            if let (FieldAlignment::Resolved(_), Some(offset)) = (&field.align, &field.offset) {
                let _ = writeln!(
                    out,
                    "::vbind::assert_offset!({name}, {}, {});",
                    escape_ident(&field.name),
                    ctx.value_expr(offset)
                );
            }
        }

        out.push_str(&self.render_default());

        if !self.consts.is_empty() || self.methods.iter().any(|m| m.wrapper_name.is_some()) {
            let _ = writeln!(out, "\nimpl {name} {{");
            for c in &self.consts {
                out.push_str(&c.render("    "));
            }
            for method in self.methods.iter().filter(|m| m.wrapper_name.is_some()) {
                out.push_str(&render_wrapper(method, WrapperReceiver::Struct));
            }
            out.push_str("}\n");
        }
        out
    }

    fn render_default(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\nimpl Default for {} {{", self.name);
        out.push_str("    fn default() -> Self {\n        Self {\n");
        for field in &self.fields {
            let _ = writeln!(out, "            {}: {},", escape_ident(&field.name), field.default);
        }
        if self.layout.filler {
            out.push_str("            _padding: 0,\n");
        }
        out.push_str("        }\n    }\n}\n");
        out
    }

    fn render_field(&self, field: &FieldSpec, ctx: &RenderContext<'_>) -> String {
        let mut out = String::new();
        match self.layout.field(&field.name).map(|f| f.align) {
            Some(FieldAlignment::Resolved(align)) => {
                if self.callback_id.is_some() {
                    let _ = writeln!(out, "    #[vbind(align = {})]", ctx.value_expr(&align));
                }
            }
            _ => {
                let _ = writeln!(
                    out,
                    "    #[deprecated(note = \"unresolved alignment of `{}::{}`\")]",
                    self.name, field.name
                );
            }
        }
        let _ = writeln!(
            out,
            "    pub {}: {},",
            escape_ident(&field.name),
            rust_type(&field.ty)
        );
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorSpec {
    pub name: String,
    pub name_flat: String,
}

/// An interface: opaque handle, accessor functions, method wrappers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    pub name: String,
    pub accessors: Vec<AccessorSpec>,
    pub methods: Vec<MethodPlan>,
}

impl InterfaceSpec {
    pub fn render(&self) -> String {
        let name = &self.name;
        let mut out = String::new();
        out.push_str("#[repr(transparent)]\n");
        out.push_str("#[derive(Clone, Copy, Debug, ::vbind::Extern)]\n");
        let _ = writeln!(out, "pub struct {name} {{\n    pub ptr: *mut ::core::ffi::c_void,\n}}");

        let _ = writeln!(out, "\nimpl {name} {{");
        out.push_str("    pub fn is_null(&self) -> bool {\n        self.ptr.is_null()\n    }\n");
        for method in self.methods.iter().filter(|m| m.wrapper_name.is_some()) {
            out.push_str(&render_wrapper(method, WrapperReceiver::Interface));
        }
        out.push_str("}\n");

        for accessor in &self.accessors {
            let _ = write!(
                out,
                "\npub unsafe fn {}() -> {name} {{\n    unsafe {{ {}() }}\n}}\n",
                escape_ident(&accessor.name),
                accessor.name_flat
            );
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WrapperReceiver {
    Struct,
    Interface,
}

/// Argument expression for a computed count.
fn count_arg(head: &ParameterDescriptor, count: &ParameterDescriptor) -> String {
    let head_name = escape_ident(&head.name);
    let len = match head.public {
        Some(TypeExpr::ZeroTerminatedPointer { .. }) => format!("{head_name}.to_bytes().len()"),
        _ => format!("{head_name}.len()"),
    };
    match count.count_type {
        Some(Primitive::Usize) | None => len,
        Some(p) => {
            let t = p.rust_name();
            format!("{t}::try_from({len}).unwrap_or({t}::MAX)")
        }
    }
}

fn call_arg(params: &[ParameterDescriptor], param: &ParameterDescriptor) -> String {
    let name = escape_ident(&param.name);
    match param.role {
        ParamRole::SliceLength { head } | ParamRole::Elided { head } => {
            count_arg(&params[head], param)
        }
        ParamRole::SliceHead { .. } => match &param.public {
            Some(TypeExpr::ZeroTerminatedPointer { .. }) => format!("{name}.as_ptr().cast()"),
            Some(TypeExpr::Slice { is_const: false, .. }) => format!("{name}.as_mut_ptr()"),
            _ => format!("{name}.as_ptr()"),
        },
        ParamRole::Plain => name,
    }
}

fn render_wrapper(method: &MethodPlan, receiver: WrapperReceiver) -> String {
    let Some(wrapper) = &method.wrapper_name else {
        return String::new();
    };
    let mut sig = vec![match receiver {
        WrapperReceiver::Struct => "&mut self".to_string(),
        WrapperReceiver::Interface => "self".to_string(),
    }];
    for p in method.public_params() {
        if let Some(ty) = &p.public {
            sig.push(format!("{}: {}", escape_ident(&p.name), rust_type(ty)));
        }
    }
    let mut args = vec![match receiver {
        WrapperReceiver::Struct => "self as *mut Self as *mut ::core::ffi::c_void".to_string(),
        WrapperReceiver::Interface => "self.ptr".to_string(),
    }];
    args.extend(method.params.iter().map(|p| call_arg(&method.params, p)));

    format!(
        "\n    pub unsafe fn {wrapper}({}){} {{\n        unsafe {{ {}({}) }}\n    }}\n",
        sig.join(", "),
        ret_suffix(method.ret.as_ref()),
        method.flat_name,
        args.join(", ")
    )
}

fn extern_decl(method: &MethodPlan) -> String {
    let mut params = vec!["self_: *mut ::core::ffi::c_void".to_string()];
    params.extend(
        method
            .params
            .iter()
            .map(|p| format!("{}: {}", escape_ident(&p.name), rust_type(&p.ty))),
    );
    format!(
        "    pub fn {}({}){};\n",
        method.flat_name,
        params.join(", "),
        ret_suffix(method.ret.as_ref())
    )
}

/// Everything the bindings module contains, in emission order.
#[derive(Debug, Clone, Default)]
pub struct BindingsModule {
    pub extra_typedefs: Vec<TypedefSpec>,
    pub opaque_types: Vec<String>,
    pub typedefs: Vec<TypedefSpec>,
    pub enums: Vec<EnumSpec>,
    pub consts: Vec<ConstSpec>,
    pub callback_structs: Vec<StructSpec>,
    pub structs: Vec<StructSpec>,
    pub interfaces: Vec<InterfaceSpec>,
    pub callbacks: Vec<CallbackPlan>,
}

const HEADER: &str = "\
// Generated by vbind-gen. Do not edit.

#![allow(
    non_camel_case_types,
    non_snake_case,
    non_upper_case_globals,
    dead_code,
    deprecated,
    clippy::all
)]
";

impl BindingsModule {
    pub fn render(&self, ctx: &RenderContext<'_>) -> String {
        let mut out = String::from(HEADER);

        section(&mut out, "prelude");
        let _ = writeln!(
            out,
            "pub const {PACK_SIZE_CONST}: usize = if cfg!({}) {{ {} }} else {{ {} }};",
            ctx.platform_cfg, ctx.pack_a, ctx.pack_b
        );
        for t in &self.extra_typedefs {
            out.push_str(&t.render());
        }
        for name in &self.opaque_types {
            let _ = write!(
                out,
                "\n#[repr(C)]\npub struct {} {{\n    _opaque: [u8; 0],\n}}\n",
                flatten_name(name)
            );
        }

        if !self.typedefs.is_empty() {
            section(&mut out, "typedefs");
            for t in &self.typedefs {
                out.push_str(&t.render());
            }
        }

        blocks(&mut out, "enums", self.enums.iter().map(EnumSpec::render));

        if !self.consts.is_empty() {
            section(&mut out, "constants");
            for c in &self.consts {
                out.push_str(&c.render(""));
            }
        }

        blocks(
            &mut out,
            "callback structs",
            self.callback_structs.iter().map(|s| s.render(ctx)),
        );
        blocks(&mut out, "structs", self.structs.iter().map(|s| s.render(ctx)));
        blocks(&mut out, "interfaces", self.interfaces.iter().map(InterfaceSpec::render));

        out.push_str(&self.render_extern_block(ctx));
        out.push_str(&self.render_callback_union());
        out.push_str(&self.render_shim(ctx));
        out
    }

    fn render_extern_block(&self, ctx: &RenderContext<'_>) -> String {
        let mut seen = BTreeSet::new();
        let mut decls = String::new();
        let struct_methods = self
            .callback_structs
            .iter()
            .chain(&self.structs)
            .flat_map(|s| &s.methods);
        let iface_methods = self.interfaces.iter().flat_map(|i| &i.methods);
        for method in struct_methods.chain(iface_methods) {
            if seen.insert(method.flat_name.clone()) {
                decls.push_str(&extern_decl(method));
            }
        }
        for iface in &self.interfaces {
            for accessor in &iface.accessors {
                if seen.insert(accessor.name_flat.clone()) {
                    let _ = writeln!(decls, "    pub fn {}() -> {};", accessor.name_flat, iface.name);
                }
            }
        }
        if decls.is_empty() {
            return String::new();
        }

        let mut out = String::new();
        section(&mut out, "flat functions");
        if let Some(link) = ctx.link_name {
            let _ = writeln!(out, "#[link(name = \"{link}\")]");
        }
        let _ = write!(out, "extern \"C\" {{\n{decls}}}\n");
        out
    }

    fn render_callback_union(&self) -> String {
        let mut out = String::new();
        section(&mut out, "callbacks");
        out.push_str("#[derive(Clone, Copy, Debug)]\npub enum CallbackUnion {\n");
        for cb in &self.callbacks {
            let _ = writeln!(out, "    {}({}),", cb.variant, cb.name);
        }
        out.push_str("}\n\nimpl ::vbind::CallbackSet for CallbackUnion {\n");

        out.push_str("    fn decode(id: i32, bytes: &[u8]) -> Option<Self> {\n");
        if self.callbacks.is_empty() {
            out.push_str("        let _ = (id, bytes);\n        None\n");
        } else {
            out.push_str("        match id {\n");
            for cb in &self.callbacks {
                let _ = writeln!(
                    out,
                    "            {} => Some(Self::{}(::vbind::decode_payload(bytes))),",
                    cb.id, cb.variant
                );
            }
            out.push_str("            _ => None,\n        }\n");
        }
        out.push_str("    }\n\n    fn callback_id(&self) -> i32 {\n");
        if self.callbacks.is_empty() {
            out.push_str("        match *self {}\n");
        } else {
            out.push_str("        match self {\n");
            for cb in &self.callbacks {
                let _ = writeln!(out, "            Self::{}(_) => {},", cb.variant, cb.id);
            }
            out.push_str("        }\n");
        }
        out.push_str("    }\n}\n");
        out
    }

    fn render_shim(&self, ctx: &RenderContext<'_>) -> String {
        let p = ctx.shim_prefix;
        let mut out = String::new();
        section(&mut out, "native shim");
        out.push_str("extern \"C\" {\n");
        if ctx.has_root_accessor {
            let root = ctx.root_interface.unwrap_or("*mut ::core::ffi::c_void");
            let _ = writeln!(out, "    pub fn {p}_root_client() -> {root};");
        }
        let _ = writeln!(out, "    fn {p}_callback_size(id: i32) -> i32;");
        let _ = writeln!(out, "    fn {p}_callback_align(id: i32) -> i32;");
        let _ = writeln!(out, "    fn {p}_callback_field_size(id: i32, field: i32) -> i32;");
        let _ = writeln!(out, "    fn {p}_callback_field_align(id: i32, field: i32) -> i32;");
        out.push_str("}\n\n");

        out.push_str("/// Layout facts reported by the compiled native shim.\n");
        out.push_str("#[derive(Clone, Copy, Debug, Default)]\npub struct NativeShim;\n\n");
        out.push_str("impl ::vbind::NativeIntrospection for NativeShim {\n");
        let _ = write!(
            out,
            "    fn payload_size(&self, callback_id: i32) -> usize {{
        usize::try_from(unsafe {{ {p}_callback_size(callback_id) }}).unwrap_or(0)
    }}

    fn payload_align(&self, callback_id: i32) -> usize {{
        usize::try_from(unsafe {{ {p}_callback_align(callback_id) }}).unwrap_or(0)
    }}

    fn field_size(&self, callback_id: i32, field: usize) -> usize {{
        let Ok(field) = i32::try_from(field) else {{
            return 0;
        }};
        usize::try_from(unsafe {{ {p}_callback_field_size(callback_id, field) }}).unwrap_or(0)
    }}

    fn field_align(&self, callback_id: i32, field: usize) -> usize {{
        let Ok(field) = i32::try_from(field) else {{
            return 0;
        }};
        usize::try_from(unsafe {{ {p}_callback_field_align(callback_id, field) }}).unwrap_or(0)
    }}
}}
"
        );

        out.push_str("\n/// Cross-check every callback payload against the native shim.\n");
        out.push_str("pub fn cross_check_all() -> Vec<::vbind::LayoutDiscrepancy> {\n");
        if self.callbacks.is_empty() {
            out.push_str("    Vec::new()\n}\n");
        } else {
            out.push_str("    let shim = NativeShim;\n    let mut found = Vec::new();\n");
            for cb in &self.callbacks {
                let _ = writeln!(
                    out,
                    "    found.extend(::vbind::cross_check::<{}>(&shim));",
                    cb.name
                );
            }
            out.push_str("    found\n}\n");
        }
        out
    }
}

fn section(out: &mut String, title: &str) {
    let _ = write!(out, "\n// {title}\n\n");
}

fn blocks(out: &mut String, title: &str, items: impl Iterator<Item = String>) {
    let mut first = true;
    for item in items {
        if first {
            section(out, title);
            first = false;
        } else {
            out.push('\n');
        }
        out.push_str(&item);
    }
}
