// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! C++ introspection shim.
//!
//! Compiled against the vendor headers, the shim answers layout questions by
//! callback id so the generated declarations can be cross-checked at runtime.

use serde::Serialize;
use tera::{Context, Tera};

use super::callbacks::CallbackPlan;

const SHIM_TEMPLATE: &str = r#"// Generated by vbind-gen. Do not edit.

{% for include in includes %}#include "{{ include }}"
{% endfor %}#include <cstddef>
#include <cstdint>

extern "C" {
{% if root_accessor %}
{{ root_interface }} *{{ prefix }}_root_client() {
    return {{ root_accessor }}();
}
{% endif %}
int32_t {{ prefix }}_callback_size(int32_t id) {
    switch (id) {
{% for cb in callbacks %}    {{ cb.comment }}case {{ cb.id }}: return (int32_t)sizeof({{ cb.name }});
{% endfor %}    default: return 0;
    }
}

int32_t {{ prefix }}_callback_align(int32_t id) {
    switch (id) {
{% for cb in callbacks %}    {{ cb.comment }}case {{ cb.id }}: return (int32_t)alignof({{ cb.name }});
{% endfor %}    default: return 0;
    }
}

int32_t {{ prefix }}_callback_field_size(int32_t id, int32_t field) {
    switch (id) {
{% for cb in callbacks %}    {{ cb.comment }}case {{ cb.id }}:
{% for f in cb.fields %}    {{ cb.comment }}    if (field == {{ loop.index0 }}) return (int32_t)sizeof({{ cb.name }}::{{ f }});
{% endfor %}    {{ cb.comment }}    return 0;
{% endfor %}    default: return 0;
    }
}

int32_t {{ prefix }}_callback_field_align(int32_t id, int32_t field) {
    switch (id) {
{% for cb in callbacks %}    {{ cb.comment }}case {{ cb.id }}: {
    {{ cb.comment }}    const {{ cb.name }} *p = nullptr;
    {{ cb.comment }}    (void)p;
{% for f in cb.fields %}    {{ cb.comment }}    if (field == {{ loop.index0 }}) return (int32_t)alignof(p->{{ f }});
{% endfor %}    {{ cb.comment }}    return 0;
    {{ cb.comment }}}
{% endfor %}    default: return 0;
    }
}
}
"#;

/// Settings for one shim rendering.
#[derive(Debug, Clone)]
pub struct ShimOptions<'a> {
    pub includes: &'a [String],
    pub prefix: &'a str,
    pub root_accessor: Option<&'a str>,
    pub root_interface: Option<&'a str>,
}

/// Template view of one callback.
#[derive(Serialize)]
struct ShimCallback<'a> {
    id: i32,
    name: &'a str,
    fields: &'a [String],
    /// Prefix commenting out every line of a denied callback.
    comment: &'static str,
}

/// Tera renderer holding the embedded shim template.
pub struct ShimRenderer {
    tera: Tera,
}

impl ShimRenderer {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template("shim.cpp", SHIM_TEMPLATE)?;
        Ok(Self { tera })
    }

    pub fn render(&self, options: &ShimOptions<'_>, callbacks: &[CallbackPlan]) -> Result<String, tera::Error> {
        let mut ctx = Context::new();
        ctx.insert("includes", options.includes);
        ctx.insert("prefix", options.prefix);
        ctx.insert("root_accessor", &options.root_accessor);
        ctx.insert("root_interface", options.root_interface.unwrap_or("void"));
        let callbacks: Vec<ShimCallback<'_>> = callbacks
            .iter()
            .map(|cb| ShimCallback {
                id: cb.id,
                name: &cb.name,
                fields: &cb.fields,
                comment: if cb.shim_enabled { "" } else { "// " },
            })
            .collect();
        ctx.insert("callbacks", &callbacks);
        self.tera.render("shim.cpp", &ctx)
    }
}
