// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cross-platform layout reconciliation.
//!
//! Two platform reports are compared per struct and per field, never
//! averaged. Agreeing values become literals; differing alignments whose
//! larger value is the pack size of the platform reporting it become the
//! pack-size symbol; anything else is platform-conditional.

use std::collections::BTreeMap;

use crate::config::PlatformConfig;
use crate::descriptor::{LayoutReport, StructDescriptor, StructFact};
use crate::error::GenError;

/// A size, alignment or offset that may depend on the target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformValue {
    Literal(usize),
    /// `a` on platform A, `b` everywhere else.
    Conditional { a: usize, b: usize },
    /// The target's default pack size.
    PackSize,
}

impl PlatformValue {
    /// Reconcile an alignment.
    pub fn alignment(a: usize, b: usize, pack_a: usize, pack_b: usize) -> Self {
        if a == b {
            PlatformValue::Literal(a)
        } else if (a > b && a == pack_a) || (b > a && b == pack_b) {
            PlatformValue::PackSize
        } else {
            PlatformValue::Conditional { a, b }
        }
    }

    /// Reconcile a size or offset; never the pack-size symbol.
    pub fn exact(a: usize, b: usize) -> Self {
        if a == b {
            PlatformValue::Literal(a)
        } else {
            PlatformValue::Conditional { a, b }
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, PlatformValue::Conditional { .. })
    }

    /// `(value on A, value on B)`.
    pub fn split(&self, pack_a: usize, pack_b: usize) -> (usize, usize) {
        match *self {
            PlatformValue::Literal(v) => (v, v),
            PlatformValue::Conditional { a, b } => (a, b),
            PlatformValue::PackSize => (pack_a, pack_b),
        }
    }

    fn at_least(self, min: usize) -> Self {
        match self {
            PlatformValue::Literal(v) => PlatformValue::Literal(v.max(min)),
            PlatformValue::Conditional { a, b } => PlatformValue::exact(a.max(min), b.max(min)),
            PlatformValue::PackSize => PlatformValue::PackSize,
        }
    }
}

/// Reconciled alignment of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAlignment {
    Resolved(PlatformValue),
    /// At least one report lacks the field.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: String,
    pub align: FieldAlignment,
    /// Present when both reports carry an offset.
    pub offset: Option<PlatformValue>,
}

/// Portable layout of one struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledLayout {
    pub name: String,
    pub size: PlatformValue,
    pub align: PlatformValue,
    pub fields: Vec<FieldLayout>,
    /// The declaration gets one `_padding: u8` field.
    pub filler: bool,
    /// Non-fatal `MissingFieldFact`s.
    pub diagnostics: Vec<GenError>,
}

impl ReconciledLayout {
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Human readable notes for every platform-conditional value.
    pub fn conditional_notes(&self, a: &str, b: &str) -> Vec<String> {
        let mut notes = Vec::new();
        let mut note = |what: String, value: &PlatformValue| {
            if let PlatformValue::Conditional { a: va, b: vb } = value {
                notes.push(format!("{what}: {va} on {a}, {vb} on {b}"));
            }
        };
        note(format!("{}.size", self.name), &self.size);
        note(format!("{}.align", self.name), &self.align);
        for field in &self.fields {
            if let FieldAlignment::Resolved(value) = &field.align {
                note(format!("{}.{}.align", self.name, field.name), value);
            }
            if let Some(offset) = &field.offset {
                note(format!("{}.{}.offset", self.name, field.name), offset);
            }
        }
        notes
    }
}

/// The two platform reports plus the platform settings.
#[derive(Debug, Clone, Copy)]
pub struct PlatformReports<'a> {
    pub a: &'a LayoutReport,
    pub b: &'a LayoutReport,
    pub platform_a: &'a PlatformConfig,
    pub platform_b: &'a PlatformConfig,
}

impl<'a> PlatformReports<'a> {
    fn facts(&self, name: &str) -> Result<(&'a StructFact, &'a StructFact), GenError> {
        let missing = |platform: &PlatformConfig| GenError::MissingLayoutFact {
            name: name.to_string(),
            platform: platform.name.clone(),
        };
        let a = self.a.get(name).ok_or_else(|| missing(self.platform_a))?;
        let b = self.b.get(name).ok_or_else(|| missing(self.platform_b))?;
        Ok((a, b))
    }

    /// Reconcile one struct.
    pub fn reconcile(&self, strukt: &StructDescriptor) -> Result<ReconciledLayout, GenError> {
        let (fact_a, fact_b) = self.facts(&strukt.name)?;
        let (pack_a, pack_b) = (self.platform_a.pack_size, self.platform_b.pack_size);

        let mut diagnostics = Vec::new();
        let mut fields = Vec::with_capacity(strukt.fields.len());
        for field in &strukt.fields {
            let name = &field.fieldname;
            let (fa, fb) = (fact_a.field(name), fact_b.field(name));
            for (fact, platform) in [(fa, self.platform_a), (fb, self.platform_b)] {
                if fact.is_none() {
                    diagnostics.push(GenError::MissingFieldFact {
                        strukt: strukt.name.clone(),
                        field: name.clone(),
                        platform: platform.name.clone(),
                    });
                }
            }
            let layout = match (fa, fb) {
                (Some(fa), Some(fb)) => FieldLayout {
                    name: name.clone(),
                    align: FieldAlignment::Resolved(PlatformValue::alignment(
                        fa.align, fb.align, pack_a, pack_b,
                    )),
                    offset: fa.offset.zip(fb.offset).map(|(a, b)| PlatformValue::exact(a, b)),
                },
                _ => FieldLayout {
                    name: name.clone(),
                    align: FieldAlignment::Unresolved,
                    offset: None,
                },
            };
            fields.push(layout);
        }

        let filler = strukt.fields.is_empty();
        let mut size = PlatformValue::exact(fact_a.size, fact_b.size);
        if filler {
            size = size.at_least(1);
        }

        Ok(ReconciledLayout {
            name: strukt.name.clone(),
            size,
            align: PlatformValue::alignment(fact_a.align, fact_b.align, pack_a, pack_b),
            fields,
            filler,
            diagnostics,
        })
    }
}

/// Reconciled layouts of every struct, computed once per run.
#[derive(Debug, Clone, Default)]
pub struct LayoutTable {
    entries: BTreeMap<String, Result<ReconciledLayout, GenError>>,
}

impl LayoutTable {
    pub fn build<'s>(
        reports: &PlatformReports<'_>,
        structs: impl IntoIterator<Item = &'s StructDescriptor>,
    ) -> Self {
        let mut entries = BTreeMap::new();
        for strukt in structs {
            entries
                .entry(strukt.name.clone())
                .or_insert_with(|| reports.reconcile(strukt));
        }
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&Result<ReconciledLayout, GenError>> {
        self.entries.get(name)
    }

    pub fn layout(&self, name: &str) -> Option<&ReconciledLayout> {
        self.entries.get(name).and_then(|r| r.as_ref().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Result<ReconciledLayout, GenError>)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, FieldFact};

    fn platforms() -> (PlatformConfig, PlatformConfig) {
        (
            PlatformConfig {
                name: "windows".into(),
                cfg: Some("windows".into()),
                pack_size: 8,
            },
            PlatformConfig {
                name: "unix".into(),
                cfg: None,
                pack_size: 4,
            },
        )
    }

    fn fact(size: usize, align: usize, fields: &[(&str, usize, usize, usize)]) -> StructFact {
        StructFact {
            size,
            align,
            fields: fields
                .iter()
                .map(|(name, size, align, offset)| FieldFact {
                    field: name.to_string(),
                    size: *size,
                    align: *align,
                    offset: Some(*offset),
                })
                .collect(),
        }
    }

    fn strukt(name: &str, fields: &[(&str, &str)]) -> StructDescriptor {
        StructDescriptor {
            name: name.into(),
            fields: fields
                .iter()
                .map(|(n, t)| FieldDescriptor {
                    fieldname: n.to_string(),
                    fieldtype: t.to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn report(entries: Vec<(&str, StructFact)>) -> LayoutReport {
        LayoutReport {
            structs: entries
                .into_iter()
                .map(|(n, f)| (n.to_string(), f))
                .collect(),
        }
    }

    #[test]
    fn test_alignment_policy() {
        assert_eq!(PlatformValue::alignment(4, 4, 8, 4), PlatformValue::Literal(4));
        assert_eq!(PlatformValue::alignment(8, 4, 8, 4), PlatformValue::PackSize);
        assert_eq!(
            PlatformValue::alignment(4, 8, 8, 4),
            PlatformValue::Conditional { a: 4, b: 8 }
        );
        assert_eq!(PlatformValue::alignment(8, 2, 8, 4), PlatformValue::PackSize);
        assert_eq!(PlatformValue::alignment(2, 4, 8, 4), PlatformValue::PackSize);
        assert_eq!(
            PlatformValue::alignment(2, 1, 8, 4),
            PlatformValue::Conditional { a: 2, b: 1 }
        );
        assert_eq!(PlatformValue::exact(16, 12), PlatformValue::Conditional { a: 16, b: 12 });
    }

    #[test]
    fn test_foo_scenario() {
        let (pa, pb) = platforms();
        let a = report(vec![("Foo_t", fact(16, 8, &[("a", 4, 4, 0), ("b", 8, 8, 8)]))]);
        let b = report(vec![("Foo_t", fact(12, 4, &[("a", 4, 4, 0), ("b", 8, 4, 4)]))]);
        let reports = PlatformReports {
            a: &a,
            b: &b,
            platform_a: &pa,
            platform_b: &pb,
        };
        let layout = reports
            .reconcile(&strukt("Foo_t", &[("a", "int32"), ("b", "uint64")]))
            .expect("reconciled");

        assert_eq!(layout.align, PlatformValue::PackSize);
        assert_eq!(layout.size, PlatformValue::Conditional { a: 16, b: 12 });
        let b_field = layout.field("b").expect("b");
        assert_eq!(b_field.align, FieldAlignment::Resolved(PlatformValue::PackSize));
        assert_eq!(b_field.offset, Some(PlatformValue::Conditional { a: 8, b: 4 }));
        let a_field = layout.field("a").expect("a");
        assert_eq!(a_field.align, FieldAlignment::Resolved(PlatformValue::Literal(4)));
        assert_eq!(a_field.offset, Some(PlatformValue::Literal(0)));
        assert!(layout.diagnostics.is_empty());
        assert!(!layout.filler);

        let notes = layout.conditional_notes("windows", "unix");
        assert!(notes.contains(&"Foo_t.size: 16 on windows, 12 on unix".to_string()));
        assert!(notes.contains(&"Foo_t.b.offset: 8 on windows, 4 on unix".to_string()));
    }

    #[test]
    fn test_agreeing_reports_are_literal() {
        let (pa, pb) = platforms();
        let same = fact(8, 4, &[("x", 4, 4, 0), ("y", 4, 4, 4)]);
        let a = report(vec![("Point_t", same.clone())]);
        let b = report(vec![("Point_t", same)]);
        let reports = PlatformReports {
            a: &a,
            b: &b,
            platform_a: &pa,
            platform_b: &pb,
        };
        let layout = reports
            .reconcile(&strukt("Point_t", &[("x", "float"), ("y", "float")]))
            .expect("reconciled");
        assert_eq!(layout.size, PlatformValue::Literal(8));
        assert_eq!(layout.align, PlatformValue::Literal(4));
        assert!(layout.conditional_notes("a", "b").is_empty());
    }

    #[test]
    fn test_missing_struct_fact() {
        let (pa, pb) = platforms();
        let a = report(vec![("Foo_t", fact(4, 4, &[]))]);
        let b = report(vec![]);
        let reports = PlatformReports {
            a: &a,
            b: &b,
            platform_a: &pa,
            platform_b: &pb,
        };
        let err = reports.reconcile(&strukt("Foo_t", &[])).expect_err("missing");
        assert_eq!(
            err,
            GenError::MissingLayoutFact {
                name: "Foo_t".into(),
                platform: "unix".into()
            }
        );
    }

    #[test]
    fn test_missing_field_fact_is_unresolved() {
        let (pa, pb) = platforms();
        let a = report(vec![("Foo_t", fact(8, 4, &[("a", 4, 4, 0), ("b", 4, 4, 4)]))]);
        let b = report(vec![("Foo_t", fact(8, 4, &[("a", 4, 4, 0)]))]);
        let reports = PlatformReports {
            a: &a,
            b: &b,
            platform_a: &pa,
            platform_b: &pb,
        };
        let layout = reports
            .reconcile(&strukt("Foo_t", &[("a", "int"), ("b", "int")]))
            .expect("non-fatal");
        assert_eq!(layout.field("b").map(|f| f.align), Some(FieldAlignment::Unresolved));
        assert_eq!(layout.diagnostics.len(), 1);
        assert!(matches!(
            &layout.diagnostics[0],
            GenError::MissingFieldFact { field, platform, .. } if field == "b" && platform == "unix"
        ));
    }

    #[test]
    fn test_zero_field_struct_gets_filler() {
        let (pa, pb) = platforms();
        let a = report(vec![("Empty_t", fact(0, 1, &[]))]);
        let b = report(vec![("Empty_t", fact(1, 1, &[]))]);
        let reports = PlatformReports {
            a: &a,
            b: &b,
            platform_a: &pa,
            platform_b: &pb,
        };
        let layout = reports.reconcile(&strukt("Empty_t", &[])).expect("ok");
        assert!(layout.filler);
        assert_eq!(layout.size, PlatformValue::Literal(1));
    }

    #[test]
    fn test_layout_table_keeps_failures_per_struct() {
        let (pa, pb) = platforms();
        let a = report(vec![("A_t", fact(4, 4, &[("x", 4, 4, 0)]))]);
        let b = report(vec![("A_t", fact(4, 4, &[("x", 4, 4, 0)]))]);
        let reports = PlatformReports {
            a: &a,
            b: &b,
            platform_a: &pa,
            platform_b: &pb,
        };
        let structs = [strukt("A_t", &[("x", "int")]), strukt("B_t", &[("y", "int")])];
        let table = LayoutTable::build(&reports, &structs);
        assert!(table.layout("A_t").is_some());
        assert!(matches!(table.get("B_t"), Some(Err(GenError::MissingLayoutFact { .. }))));
        assert!(table.get("C_t").is_none());
    }
}
