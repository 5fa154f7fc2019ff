// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

pub mod callbacks;
pub mod consts;
pub mod layout;
pub mod params;
pub mod resolver;
pub mod rust_backend;
pub mod shim;
pub mod types;

pub use callbacks::{plan_callbacks, CallbackPlan};
pub use layout::{FieldAlignment, LayoutTable, PlatformReports, PlatformValue, ReconciledLayout};
pub use params::{infer_shapes, MethodPlan, ParamInput, ParamRole, ParameterDescriptor};
pub use resolver::{resolve, ResolveContext, TypeResolver};
pub use rust_backend::{BindingsModule, RenderContext, StructSpec};
pub use shim::{ShimOptions, ShimRenderer};
pub use types::{Primitive, TypeExpr};
