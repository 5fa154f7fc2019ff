// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! vbind-gen - binding generator for vendor C APIs.
//!
//! Reads a JSON API descriptor and two platform layout reports, and emits a
//! Rust bindings module whose declared layouts match both platforms plus a
//! C++ shim the runtime uses to cross-check them.

pub mod codegen;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod generator;

pub use config::{ConfigError, GenConfig};
pub use descriptor::{ApiDescriptor, LayoutReport};
pub use error::{GenError, UnsupportedType};
pub use generator::{generate_bindings, GeneratedOutput, GenerationReport, Generator};
