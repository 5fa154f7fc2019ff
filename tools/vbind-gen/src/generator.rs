// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binding generator.
//!
//! Stages run in a fixed order over read-only inputs: index, reconcile,
//! typedefs, enums, constants, structs, callbacks, interfaces, emit. Entity
//! errors are collected in the [`GenerationReport`]; only I/O, configuration
//! and template failures abort the run.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;

use crate::codegen::callbacks::plan_callbacks;
use crate::codegen::consts::{self, normalize_enum};
use crate::codegen::layout::{LayoutTable, PlatformReports};
use crate::codegen::params::{infer_shapes, wrapper_name, MethodPlan, ParamInput};
use crate::codegen::resolver::{ResolveContext, TypeResolver};
use crate::codegen::rust_backend::{
    escape_ident, rust_type, AccessorSpec, BindingsModule, ConstSpec, EnumSpec, FieldSpec,
    InterfaceSpec, RenderContext, StructSpec, TypedefSpec,
};
use crate::codegen::shim::{ShimOptions, ShimRenderer};
use crate::codegen::types::{Primitive, TypeExpr};
use crate::config::GenConfig;
use crate::descriptor::{
    flatten_name, ApiDescriptor, ConstDescriptor, DescriptorIndex, EnumDescriptor, LayoutReport,
    MethodDescriptor, NameKind, StructDescriptor, MAX_TYPEDEF_DEPTH,
};
use crate::error::GenError;

/// An error attached to the entity it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityError {
    pub entity: String,
    pub error: GenError,
}

/// Outcome of one generation run.
///
/// `errors` lists entities left out of the output, each with its reason.
/// Everything that refers to a left-out entity is left out as well and
/// listed on its own. `diagnostics` lists entities emitted in degraded form,
/// such as a field whose alignment could not be reconciled. The counters
/// cover only what reached the bindings module. `--strict` fails the run
/// when `errors` is not empty.
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Entities left out of the output.
    pub errors: Vec<EntityError>,
    /// Entities emitted in degraded form.
    pub diagnostics: Vec<EntityError>,
    /// Values that differ between the two platforms.
    pub conditional_notes: Vec<String>,
    pub typedefs_emitted: usize,
    pub enums_emitted: usize,
    pub consts_emitted: usize,
    pub structs_emitted: usize,
    pub callbacks_emitted: usize,
    pub interfaces_emitted: usize,
    pub methods_emitted: usize,
    pub files_written: Vec<PathBuf>,
}

impl GenerationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entity error, routed by severity.
    pub fn record(&mut self, entity: impl Into<String>, error: GenError) {
        let entity = entity.into();
        tracing::warn!(entity = %entity, "{}", error);
        let entry = EntityError { entity, error };
        if entry.error.is_fatal() {
            self.errors.push(entry);
        } else {
            self.diagnostics.push(entry);
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn summary(&self) {
        println!("\n{}", "=".repeat(60));
        println!("  Binding Generation Report");
        println!("{}", "=".repeat(60));
        println!();
        println!("  [OK] Typedefs:         {}", self.typedefs_emitted);
        println!("  [OK] Enums:            {}", self.enums_emitted);
        println!("  [OK] Constants:        {}", self.consts_emitted);
        println!("  [OK] Structs:          {}", self.structs_emitted);
        println!("  [OK] Callbacks:        {}", self.callbacks_emitted);
        println!("  [OK] Interfaces:       {}", self.interfaces_emitted);
        println!("  [OK] Flat functions:   {}", self.methods_emitted);
        println!();

        if !self.conditional_notes.is_empty() {
            println!("  Platform-conditional values: {}", self.conditional_notes.len());
            for note in &self.conditional_notes {
                println!("    - {note}");
            }
            println!();
        }
        if !self.diagnostics.is_empty() {
            println!("  [WARN] Diagnostics: {}", self.diagnostics.len());
            for d in &self.diagnostics {
                println!("    - {}", d.error);
            }
            println!();
        }
        if !self.errors.is_empty() {
            println!("  [ERROR] Entities skipped: {}", self.errors.len());
            for e in &self.errors {
                println!("    - {}: {}", e.entity, e.error);
            }
            println!();
        }
        if !self.files_written.is_empty() {
            println!("  Generated:");
            for path in &self.files_written {
                println!("    - {}", path.display());
            }
            println!();
        }
        println!("{}", "=".repeat(60));
    }
}

/// Rendered outputs of one run.
#[derive(Debug)]
pub struct GeneratedOutput {
    pub rust: String,
    pub shim: String,
    pub report: GenerationReport,
}

/// Compiled field-type patch.
struct FieldPatcher {
    pattern: Regex,
    from_type: String,
    to_type: String,
}

/// Per-run state shared by every stage.
struct Stage<'a> {
    config: &'a GenConfig,
    index: DescriptorIndex,
    resolver: TypeResolver,
    patches: Vec<FieldPatcher>,
    /// Entities left out so far; references to them do not resolve.
    dropped: BTreeSet<String>,
    report: GenerationReport,
}

impl<'a> Stage<'a> {
    fn new(config: &'a GenConfig, api: &ApiDescriptor) -> Result<Self> {
        let mut patches = Vec::with_capacity(config.field_patches.len());
        for patch in &config.field_patches {
            let pattern = Regex::new(&patch.pattern)
                .with_context(|| format!("Invalid field patch pattern {:?}", patch.pattern))?;
            patches.push(FieldPatcher {
                pattern,
                from_type: patch.from_type.clone(),
                to_type: patch.to_type.clone(),
            });
        }
        Ok(Self {
            config,
            index: DescriptorIndex::build(api, &config.extra_typedefs, &config.opaque_types),
            resolver: TypeResolver::new(&config.type_overrides),
            patches,
            dropped: BTreeSet::new(),
            report: GenerationReport::new(),
        })
    }

    /// Resolve `raw` for `entity`, qualifying nested enums of `owner`.
    fn resolve(
        &self,
        entity: &str,
        owner: Option<&str>,
        raw: &str,
        ctx: ResolveContext,
    ) -> Result<TypeExpr, GenError> {
        let mut ty = self
            .resolver
            .resolve(raw, ctx)
            .map_err(|e| GenError::unsupported(entity, e))?;
        if let Some(owner) = owner {
            self.index.qualify(owner, &mut ty);
        }
        self.check_names(entity, &ty)?;
        Ok(ty)
    }

    fn check_names(&self, entity: &str, ty: &TypeExpr) -> Result<(), GenError> {
        let missing = self
            .index
            .first_unresolved(ty)
            .or_else(|| first_dropped(ty, &self.dropped));
        match missing {
            Some(name) => Err(GenError::UnresolvedNamedType {
                entity: entity.to_string(),
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn typedefs<'t>(&mut self, entries: impl Iterator<Item = (&'t str, &'t str)>) -> Vec<TypedefSpec> {
        let mut out = Vec::new();
        for (name, raw) in entries {
            match self.resolve(name, None, raw, ResolveContext::VALUE) {
                Ok(mut ty) => {
                    to_handles(&mut ty, &self.index);
                    out.push(TypedefSpec {
                        name: name.to_string(),
                        ty,
                    });
                }
                Err(e) => {
                    self.dropped.insert(name.to_string());
                    self.report.record(name, e);
                }
            }
        }
        out
    }

    fn enum_spec(&mut self, owner: Option<&str>, e: &EnumDescriptor) -> EnumSpec {
        let name = match owner {
            Some(owner) => format!("{owner}_{}", e.enumname),
            None => e.enumname.clone(),
        };
        let (values, errors) = normalize_enum(&name, e);
        for error in errors {
            self.report.record(name.as_str(), error);
        }
        tracing::debug!("Emitting enum {}", name);
        EnumSpec { name, values }
    }

    fn enums(&mut self, api: &ApiDescriptor) -> Vec<EnumSpec> {
        let mut out = Vec::new();
        for e in &api.enums {
            out.push(self.enum_spec(None, e));
        }
        for s in api.callback_structs.iter().chain(&api.structs) {
            for e in &s.enums {
                out.push(self.enum_spec(Some(&s.name), e));
            }
        }
        for i in &api.interfaces {
            for e in &i.enums {
                out.push(self.enum_spec(Some(&i.classname), e));
            }
        }
        let mut seen = BTreeSet::new();
        out.retain(|e| seen.insert(e.name.clone()));
        out
    }

    fn const_spec(&mut self, owner: Option<&str>, c: &ConstDescriptor) -> Option<ConstSpec> {
        if self.config.filters.skip_constants.contains(&c.constname) {
            tracing::debug!("Skipping constant {}", c.constname);
            return None;
        }
        let entity = match owner {
            Some(owner) => format!("{owner}::{}", c.constname),
            None => c.constname.clone(),
        };
        match self.const_value(&entity, owner, c) {
            Ok(spec) => Some(spec),
            Err(e) => {
                self.report.record(entity, e);
                None
            }
        }
    }

    fn const_value(&self, entity: &str, owner: Option<&str>, c: &ConstDescriptor) -> Result<ConstSpec, GenError> {
        let ty = self.resolve(entity, owner, &c.consttype, ResolveContext::VALUE)?;
        let name = c.constname.clone();
        let raw = c.constval.as_str();

        if let TypeExpr::Pointer { target, .. } = &ty {
            if matches!(**target, TypeExpr::Primitive(Primitive::U8 | Primitive::I8)) {
                return Ok(ConstSpec {
                    value: consts::string_const(&name, raw)?,
                    ty: "&::core::ffi::CStr".to_string(),
                    name,
                });
            }
        }
        if let TypeExpr::Named(enum_name) = &ty {
            if self.index.is_enum(enum_name) {
                let enum_name = flatten_name(enum_name);
                return Ok(ConstSpec {
                    value: consts::enum_const(&name, raw, &enum_name)?,
                    ty: enum_name,
                    name,
                });
            }
        }
        let primitive = self
            .index
            .expand(&ty, &self.resolver)
            .and_then(|t| t.as_primitive());
        let value = match primitive {
            Some(p) if p.is_float() => consts::float_const(&name, raw)?,
            Some(p) => consts::integer_const(&name, raw, p)?,
            None => {
                return Err(GenError::InvalidConstant {
                    name,
                    value: raw.to_string(),
                })
            }
        };
        Ok(ConstSpec {
            name,
            ty: rust_type(&ty),
            value,
        })
    }

    /// Declared field type after the naming patches.
    fn patched_field_type<'f>(&'f self, name: &str, raw: &'f str) -> &'f str {
        let trimmed = raw.trim();
        self.patches
            .iter()
            .find(|p| p.from_type == trimmed && p.pattern.is_match(name))
            .map(|p| p.to_type.as_str())
            .unwrap_or(raw)
    }

    fn field_spec(&self, owner: &str, name: &str, raw: &str) -> Result<FieldSpec, GenError> {
        let entity = format!("{owner}.{name}");
        let raw = self.patched_field_type(name, raw);
        let mut ty = self.resolve(&entity, Some(owner), raw, ResolveContext::VALUE)?;
        if name.starts_with(&self.config.naming.bool_field_prefix) {
            let byte = self
                .index
                .expand(&ty, &self.resolver)
                .and_then(|t| t.as_primitive())
                .is_some_and(|p| matches!(p, Primitive::Bool | Primitive::U8 | Primitive::I8));
            if byte {
                ty = TypeExpr::Primitive(Primitive::Bool);
            }
        }
        Ok(FieldSpec {
            name: name.to_string(),
            ty,
            default: String::new(),
        })
    }

    fn method_plan(&self, owner: &str, m: &MethodDescriptor) -> Result<MethodPlan, GenError> {
        let entity = format!("{owner}::{}", m.methodname);
        let mut params = Vec::with_capacity(m.params.len());
        for p in &m.params {
            let param_entity = format!("{entity}({})", p.paramname);
            let ty = self.resolve(&param_entity, Some(owner), &p.paramtype, ResolveContext::SIGNATURE)?;
            let mut ty = self.index.decay_array_typedef(ty, &self.resolver);
            to_handles(&mut ty, &self.index);
            let count_type = self.index.integer_primitive(&ty, &self.resolver);
            params.push(ParamInput {
                name: p.paramname.clone(),
                ty,
                array_count: p.array_count.clone(),
                count_type,
            });
        }

        let mut ret = self
            .resolver
            .resolve_return(&m.returntype, ResolveContext::SIGNATURE)
            .map_err(|e| GenError::unsupported(entity.as_str(), e))?;
        if let Some(ty) = ret.as_mut() {
            self.index.qualify(owner, ty);
            self.check_names(&entity, ty)?;
            to_handles(ty, &self.index);
        }

        Ok(MethodPlan {
            flat_name: m.methodname_flat.clone(),
            wrapper_name: wrapper_name(owner, &m.methodname_flat).map(|n| escape_ident(&n)),
            params: infer_shapes(params),
            ret,
        })
    }

    fn methods(&mut self, owner: &str, methods: &[MethodDescriptor]) -> Vec<MethodPlan> {
        let mut names = BTreeSet::new();
        let mut out = Vec::new();
        for m in methods {
            match self.method_plan(owner, m) {
                Ok(mut plan) => {
                    if let Some(name) = &plan.wrapper_name {
                        if !names.insert(name.clone()) {
                            tracing::debug!("Duplicate wrapper name {}::{}", owner, name);
                            plan.wrapper_name = None;
                        }
                    }
                    out.push(plan);
                }
                Err(e) => {
                    let entity = format!("{owner}::{}", m.methodname);
                    self.report.record(entity, e);
                }
            }
        }
        out
    }

    fn struct_spec(&mut self, layouts: &LayoutTable, s: &StructDescriptor) -> Option<StructSpec> {
        let layout = match layouts.get(&s.name)? {
            Ok(layout) => layout.clone(),
            Err(e) => {
                self.report.record(s.name.as_str(), e.clone());
                return None;
            }
        };

        let mut fields = Vec::with_capacity(s.fields.len());
        for f in &s.fields {
            match self.field_spec(&s.name, &f.fieldname, &f.fieldtype) {
                Ok(field) => fields.push(field),
                Err(e) => {
                    self.report.record(s.name.as_str(), e);
                    return None;
                }
            }
        }

        for d in &layout.diagnostics {
            self.report.record(s.name.as_str(), d.clone());
        }
        let consts = s
            .consts
            .iter()
            .filter_map(|c| self.const_spec(Some(&s.name), c))
            .collect();
        let methods = self.methods(&s.name, &s.methods);

        Some(StructSpec {
            name: s.name.clone(),
            layout,
            fields,
            consts,
            methods,
            callback_id: s.callback_id,
        })
    }
}

/// A pointer to an interface is passed as the interface handle.
fn interface_target(ty: &TypeExpr, index: &DescriptorIndex) -> Option<String> {
    match ty {
        TypeExpr::Pointer { target, .. } => match target.as_ref() {
            TypeExpr::Named(name) if index.is_interface(name) => Some(name.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn to_handles(ty: &mut TypeExpr, index: &DescriptorIndex) {
    if let Some(name) = interface_target(ty, index) {
        *ty = TypeExpr::Named(name);
        return;
    }
    match ty {
        TypeExpr::Pointer { target, .. } => to_handles(target, index),
        TypeExpr::FixedArray { element, .. } => to_handles(element, index),
        TypeExpr::FunctionPointer { params, ret, .. } => {
            for p in params {
                to_handles(p, index);
            }
            if let Some(ret) = ret {
                to_handles(ret, index);
            }
        }
        _ => {}
    }
}

/// Default value expression for a field of type `ty`, after handle rewriting.
///
/// Enums default to their zero value, structs to their own `Default`, and
/// typedefs to the default of the type they name.
fn default_value(ty: &TypeExpr, index: &DescriptorIndex, resolver: &TypeResolver, depth: usize) -> String {
    const FALLBACK: &str = "::core::default::Default::default()";
    let inner = |ty: &TypeExpr| default_value(ty, index, resolver, depth + 1);
    match ty {
        TypeExpr::Primitive(Primitive::Bool) => "false".to_string(),
        TypeExpr::Primitive(p) if p.is_float() => "0.0".to_string(),
        TypeExpr::Primitive(_) => "0".to_string(),
        TypeExpr::Pointer { is_const: true, .. } => "::core::ptr::null()".to_string(),
        TypeExpr::Pointer { .. } => "::core::ptr::null_mut()".to_string(),
        TypeExpr::FixedArray { element, len } => format!("[{}; {len}]", inner(element)),
        TypeExpr::FunctionPointer { .. } => "None".to_string(),
        TypeExpr::ZeroTerminatedPointer { .. } | TypeExpr::Slice { .. } => FALLBACK.to_string(),
        TypeExpr::Named(name) => match index.kind(name) {
            Some(NameKind::Struct) => format!("{}::default()", flatten_name(name)),
            Some(NameKind::Enum) => format!("{}(0)", flatten_name(name)),
            Some(NameKind::Interface) => {
                format!("{} {{ ptr: ::core::ptr::null_mut() }}", flatten_name(name))
            }
            Some(NameKind::Typedef) if depth < MAX_TYPEDEF_DEPTH => index
                .typedef_target(name)
                .and_then(|raw| resolver.resolve(raw, ResolveContext::VALUE).ok())
                .map(|mut target| {
                    to_handles(&mut target, index);
                    inner(&target)
                })
                .unwrap_or_else(|| FALLBACK.to_string()),
            _ => FALLBACK.to_string(),
        },
    }
}

/// First name in `ty` that refers to an entity left out of the output.
fn first_dropped<'t>(ty: &'t TypeExpr, dropped: &BTreeSet<String>) -> Option<&'t str> {
    ty.named_refs().into_iter().find(|name| dropped.contains(*name))
}

fn unresolved(entity: &str, name: &str) -> GenError {
    GenError::UnresolvedNamedType {
        entity: entity.to_string(),
        name: name.to_string(),
    }
}

/// Remove every typedef and struct that names a dropped entity, by value or
/// through a pointer, until nothing changes. Methods naming a dropped entity
/// are removed from the surviving structs afterwards.
fn prune_dropped(
    typedefs: [&mut Vec<TypedefSpec>; 2],
    structs: [&mut Vec<StructSpec>; 2],
    dropped: &mut BTreeSet<String>,
    report: &mut GenerationReport,
) {
    let [extra_typedefs, typedefs] = typedefs;
    let [callback_specs, struct_specs] = structs;
    loop {
        let mut removed = Vec::new();
        for list in [&mut *extra_typedefs, &mut *typedefs] {
            list.retain(|t| match first_dropped(&t.ty, dropped) {
                Some(name) => {
                    report.record(t.name.as_str(), unresolved(&t.name, name));
                    removed.push(t.name.clone());
                    false
                }
                None => true,
            });
        }
        for list in [&mut *callback_specs, &mut *struct_specs] {
            list.retain(|spec| {
                let missing = spec.fields.iter().find_map(|f| first_dropped(&f.ty, dropped));
                match missing {
                    Some(name) => {
                        report.record(spec.name.as_str(), unresolved(&spec.name, name));
                        removed.push(spec.name.clone());
                        false
                    }
                    None => true,
                }
            });
        }
        if removed.is_empty() {
            break;
        }
        dropped.extend(removed);
    }

    for spec in callback_specs.iter_mut().chain(struct_specs.iter_mut()) {
        let owner = spec.name.as_str();
        spec.methods.retain(|m| {
            let missing = m
                .params
                .iter()
                .map(|p| &p.ty)
                .chain(m.ret.as_ref())
                .find_map(|ty| first_dropped(ty, dropped));
            match missing {
                Some(name) => {
                    let entity = format!("{owner}::{}", m.flat_name);
                    report.record(entity.as_str(), unresolved(&entity, name));
                    false
                }
                None => true,
            }
        });
    }
}

/// Generate the bindings module and shim from parsed inputs.
///
/// Pure: the same inputs always give byte-identical outputs.
pub fn generate_bindings(
    config: &GenConfig,
    api: &ApiDescriptor,
    layout_a: &LayoutReport,
    layout_b: &LayoutReport,
) -> Result<GeneratedOutput> {
    let mut stage = Stage::new(config, api)?;

    tracing::info!("Stage 1: Reconciling layouts");
    let excluded = &config.filters.excluded_callbacks;
    let callback_structs: Vec<&StructDescriptor> = api
        .callback_structs
        .iter()
        .filter(|s| {
            let keep = !excluded.contains(&s.name);
            if !keep {
                tracing::debug!("Excluding callback {}", s.name);
            }
            keep
        })
        .collect();
    let reports = PlatformReports {
        a: layout_a,
        b: layout_b,
        platform_a: &config.platform_a,
        platform_b: &config.platform_b,
    };
    let layouts = LayoutTable::build(
        &reports,
        callback_structs.iter().copied().chain(&api.structs),
    );
    for layout in layouts.iter().filter_map(|(_, l)| l.as_ref().ok()) {
        stage.report.conditional_notes.extend(
            layout.conditional_notes(&config.platform_a.name, &config.platform_b.name),
        );
    }

    tracing::info!("Stage 2: Resolving typedefs, enums and constants");
    let mut extra_typedefs = stage.typedefs(
        config
            .extra_typedefs
            .iter()
            .map(|(name, ty)| (name.as_str(), ty.as_str())),
    );
    let mut typedefs = stage.typedefs(
        api.typedefs
            .iter()
            .filter(|t| !config.extra_typedefs.contains_key(&t.typedef))
            .map(|t| (t.typedef.as_str(), t.ty.as_str())),
    );
    let enums = stage.enums(api);
    let consts: Vec<ConstSpec> = api
        .consts
        .iter()
        .filter_map(|c| stage.const_spec(None, c))
        .collect();

    tracing::info!("Stage 3: Building structs and callbacks");
    let mut callback_specs = Vec::new();
    for s in &callback_structs {
        match stage.struct_spec(&layouts, s) {
            Some(spec) => callback_specs.push(spec),
            None => {
                stage.dropped.insert(s.name.clone());
            }
        }
    }
    let mut struct_specs = Vec::new();
    for s in &api.structs {
        match stage.struct_spec(&layouts, s) {
            Some(spec) => struct_specs.push(spec),
            None => {
                stage.dropped.insert(s.name.clone());
            }
        }
    }

    let planning = plan_callbacks(&callback_specs, &stage.index, &config.shim.deny);
    let rejected: BTreeSet<String> = planning.rejected.iter().map(|(n, _)| n.clone()).collect();
    for (name, error) in planning.rejected {
        stage.report.record(name, error);
    }
    callback_specs.retain(|s| !rejected.contains(&s.name));
    stage.dropped.extend(rejected);

    prune_dropped(
        [&mut extra_typedefs, &mut typedefs],
        [&mut callback_specs, &mut struct_specs],
        &mut stage.dropped,
        &mut stage.report,
    );
    let callbacks: Vec<_> = planning
        .plans
        .into_iter()
        .filter(|p| callback_specs.iter().any(|s| s.name == p.name))
        .collect();

    for spec in callback_specs.iter_mut().chain(struct_specs.iter_mut()) {
        for field in &mut spec.fields {
            to_handles(&mut field.ty, &stage.index);
            field.default = default_value(&field.ty, &stage.index, &stage.resolver, 0);
        }
    }

    tracing::info!("Stage 4: Building interfaces");
    let mut interfaces = Vec::with_capacity(api.interfaces.len());
    for i in &api.interfaces {
        let methods = stage.methods(&i.classname, &i.methods);
        let accessors = i
            .accessors
            .iter()
            .map(|a| AccessorSpec {
                name: a.name.clone(),
                name_flat: a.name_flat.clone(),
            })
            .collect();
        tracing::debug!("Emitting interface {}", i.classname);
        interfaces.push(InterfaceSpec {
            name: i.classname.clone(),
            accessors,
            methods,
        });
    }

    let mut report = stage.report;
    report.typedefs_emitted = extra_typedefs.len() + typedefs.len();
    report.enums_emitted = enums.len();
    report.consts_emitted = consts.len();
    report.structs_emitted = callback_specs.len() + struct_specs.len();
    report.callbacks_emitted = callbacks.len();
    report.interfaces_emitted = interfaces.len();
    report.methods_emitted = callback_specs
        .iter()
        .chain(&struct_specs)
        .map(|s| s.methods.len())
        .chain(interfaces.iter().map(|i| i.methods.len()))
        .sum();

    tracing::info!("Stage 5: Rendering outputs");
    let module = BindingsModule {
        extra_typedefs,
        opaque_types: config.opaque_types.clone(),
        typedefs,
        enums,
        consts,
        callback_structs: callback_specs,
        structs: struct_specs,
        interfaces,
        callbacks,
    };
    let ctx = RenderContext {
        platform_cfg: config.platform_cfg(),
        pack_a: config.platform_a.pack_size,
        pack_b: config.platform_b.pack_size,
        shim_prefix: &config.naming.shim_prefix,
        link_name: config.link_name.as_deref(),
        root_interface: config.shim.root_interface.as_deref(),
        has_root_accessor: config.shim.root_accessor.is_some(),
    };
    let rust = module.render(&ctx);

    let shim = ShimRenderer::new()
        .context("Failed to parse shim template")?
        .render(
            &ShimOptions {
                includes: &config.shim.includes,
                prefix: &config.naming.shim_prefix,
                root_accessor: config.shim.root_accessor.as_deref(),
                root_interface: config.shim.root_interface.as_deref(),
            },
            &module.callbacks,
        )
        .context("Failed to render shim")?;

    Ok(GeneratedOutput { rust, shim, report })
}

/// Parsed inputs.
#[derive(Debug)]
pub struct Inputs {
    pub api: ApiDescriptor,
    pub layout_a: LayoutReport,
    pub layout_b: LayoutReport,
}

/// File-level driver around [`generate_bindings`].
pub struct Generator {
    config: GenConfig,
    base_dir: PathBuf,
}

impl Generator {
    /// Relative paths in `config` resolve against `base_dir`.
    pub fn new(config: GenConfig, base_dir: PathBuf) -> Self {
        Self { config, base_dir }
    }

    pub fn from_config_file(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from: {:?}", path);
        let config = GenConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self::new(config, base_dir))
    }

    pub fn config(&self) -> &GenConfig {
        &self.config
    }

    fn path(&self, path: &Path) -> PathBuf {
        GenConfig::resolve_path(&self.base_dir, path)
    }

    pub fn load_inputs(&self) -> Result<Inputs> {
        let api_path = self.path(&self.config.inputs.api);
        tracing::info!("Loading API descriptor: {:?}", api_path);
        let text = fs::read_to_string(&api_path)
            .with_context(|| format!("Failed to read {}", api_path.display()))?;
        let api = ApiDescriptor::from_json(&text)
            .with_context(|| format!("Failed to parse {}", api_path.display()))?;

        let layout_a = self.load_layout(&self.config.inputs.layout_a)?;
        let layout_b = self.load_layout(&self.config.inputs.layout_b)?;
        Ok(Inputs {
            api,
            layout_a,
            layout_b,
        })
    }

    fn load_layout(&self, path: &Path) -> Result<LayoutReport> {
        let path = self.path(path);
        tracing::info!("Loading layout report: {:?}", path);
        let text =
            fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        LayoutReport::from_json(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Reconcile and emit in memory without writing anything.
    pub fn check(&self) -> Result<GenerationReport> {
        tracing::info!("Starting binding check");
        let inputs = self.load_inputs()?;
        let output = generate_bindings(&self.config, &inputs.api, &inputs.layout_a, &inputs.layout_b)?;
        Ok(output.report)
    }

    /// Generate and write both outputs.
    pub fn generate(&self) -> Result<GenerationReport> {
        tracing::info!("Starting binding generation");
        let inputs = self.load_inputs()?;
        let output = generate_bindings(&self.config, &inputs.api, &inputs.layout_a, &inputs.layout_b)?;
        let mut report = output.report;

        for (path, content) in [
            (&self.config.outputs.rust, &output.rust),
            (&self.config.outputs.shim, &output.shim),
        ] {
            let path = self.path(path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            report.files_written.push(path);
        }

        tracing::info!("[OK] Generation complete");
        Ok(report)
    }
}
