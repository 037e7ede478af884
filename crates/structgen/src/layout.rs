// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field layout reconstruction.
//!
//! Turns the unordered field list of an explicitly laid out type into an
//! ordered member list whose extents and gaps sum to the declared size.
//! Fields sharing an offset are folded into a synthesized union.

use crate::config::ExportConfig;
use crate::error::Diagnostic;
use crate::metadata::{FieldMetadata, TypeMetadata};
use crate::naming::safe_snake_case;
use crate::structs::{Member, MemberKind, StructDecl};
use crate::type_ref::TypeRef;

/// Smallest size of a synthesized union.
pub const MIN_UNION_SIZE: usize = 8;

/// A field with its resolved type and effective size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSlot {
    /// Source field name.
    pub name: String,
    pub ty: TypeRef,
    pub offset: usize,
    pub size: usize,
}

impl FieldSlot {
    fn member(&self, offset: usize) -> Member {
        Member::new(
            safe_snake_case(&self.name),
            self.ty.clone(),
            offset,
            self.size,
            MemberKind::Field,
        )
    }
}

/// Result of reconstructing one owner.
#[derive(Debug, Default)]
pub struct LayoutPlan {
    pub members: Vec<Member>,
    /// Unions synthesized for shared offsets, in owner order.
    pub unions: Vec<StructDecl>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Fields of `meta` that occupy instance storage and are not excluded by
/// configuration.
pub fn storage_fields<'a>(
    meta: &'a TypeMetadata,
    config: &'a ExportConfig,
) -> impl Iterator<Item = &'a FieldMetadata> + 'a {
    meta.fields
        .iter()
        .filter(move |field| field.has_storage() && !config.is_field_excluded(&meta.name, &field.name))
}

/// Padding from `cursor` up to `target`.
///
/// Each step picks the largest width in {8, 4, 2, 1} that `cursor` is
/// aligned to and that still fits. Wide steps swallow as many whole widths as
/// remain.
pub fn fill_gaps(mut cursor: usize, target: usize) -> Vec<Member> {
    let mut gaps = Vec::new();
    while cursor < target {
        let remaining = target - cursor;
        let width = [8, 4, 2, 1]
            .into_iter()
            .find(|w| cursor % w == 0 && remaining >= *w)
            .unwrap_or(1);
        let span = if width >= 4 {
            remaining - remaining % width
        } else {
            width
        };
        gaps.push(Member::gap(cursor, span));
        cursor += span;
    }
    gaps
}

/// Lay `fields` over each other at offset 0, largest first. The union is
/// padded to at least `min_size` bytes.
pub fn union_layout(type_ref: TypeRef, fields: &[FieldSlot], min_size: usize) -> StructDecl {
    let mut ordered: Vec<&FieldSlot> = fields.iter().collect();
    ordered.sort_by(|a, b| b.size.cmp(&a.size));

    let widest = ordered.first().map_or(0, |f| f.size);
    let size = widest.max(min_size);

    let mut decl = StructDecl::new_union(type_ref, size);
    for field in ordered {
        decl.push_member(field.member(0));
    }
    if widest < size {
        decl.push_member(Member::gap(0, size));
    }
    decl
}

/// Reconstruct the member list of `owner` from its storage fields.
pub fn reconstruct(
    owner: &TypeRef,
    size: usize,
    mut fields: Vec<FieldSlot>,
    config: &ExportConfig,
) -> LayoutPlan {
    let mut plan = LayoutPlan::default();
    let mut cursor = 0;

    fields.sort_by_key(|f| f.offset);

    let mut start = 0;
    while start < fields.len() {
        let offset = fields[start].offset;
        let end = fields[start..]
            .iter()
            .position(|f| f.offset != offset)
            .map_or(fields.len(), |n| start + n);
        let group = &fields[start..end];
        start = end;

        if cursor > offset {
            let diagnostic = Diagnostic::LayoutOverrun {
                type_name: owner.canonical_name(),
                field: group[0].name.clone(),
                cursor,
                offset,
            };
            tracing::warn!("{}", diagnostic);
            plan.diagnostics.push(diagnostic);
            break;
        }

        plan.members.extend(fill_gaps(cursor, offset));

        let candidates: Vec<FieldSlot> = if group.len() > 1 {
            let kept: Vec<FieldSlot> = group
                .iter()
                .filter(|f| !config.is_vtable_marker(&f.name))
                .cloned()
                .collect();
            if kept.is_empty() {
                vec![group[0].clone()]
            } else {
                kept
            }
        } else {
            group.to_vec()
        };

        if let [single] = candidates.as_slice() {
            plan.members.push(single.member(offset));
            cursor = offset.saturating_add(single.size);
            continue;
        }

        let union_name = match plan.unions.len() {
            0 => format!("{}_Union", owner.name()),
            n => format!("{}_Union_{}", owner.name(), n),
        };
        let union_ref = TypeRef::local(&owner.module_path(), union_name);
        let union = union_layout(union_ref.clone(), &candidates, MIN_UNION_SIZE);

        plan.members.push(Member::new(
            format!("_union_0x{offset:x}"),
            union_ref,
            offset,
            union.size(),
            MemberKind::Union,
        ));
        cursor = offset.saturating_add(union.size());
        plan.unions.push(union);
    }

    plan.members.extend(fill_gaps(cursor, size));
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> TypeRef {
        TypeRef::local(&["game".to_string()], "Owner")
    }

    fn slot(name: &str, ty: &str, offset: usize, size: usize) -> FieldSlot {
        FieldSlot {
            name: name.to_string(),
            ty: TypeRef::parse(ty).expect("type"),
            offset,
            size,
        }
    }

    fn extents(members: &[Member]) -> Vec<(usize, usize)> {
        members.iter().map(|m| (m.offset, m.size)).collect()
    }

    #[test]
    fn test_gap_policy() {
        assert_eq!(extents(&fill_gaps(3, 12)), vec![(3, 1), (4, 8)]);
        assert_eq!(extents(&fill_gaps(4, 12)), vec![(4, 8)]);
        assert_eq!(extents(&fill_gaps(0, 0x10)), vec![(0, 0x10)]);
        assert_eq!(extents(&fill_gaps(1, 8)), vec![(1, 1), (2, 2), (4, 4)]);
        assert_eq!(extents(&fill_gaps(0, 7)), vec![(0, 4), (4, 2), (6, 1)]);
        assert!(fill_gaps(8, 8).is_empty());
        assert!(fill_gaps(9, 8).is_empty());
    }

    #[test]
    fn test_single_fields_with_padding() {
        let config = ExportConfig::default();
        let plan = reconstruct(
            &owner(),
            0x10,
            vec![slot("B", "f32", 0xC, 4), slot("A", "i32", 0, 4)],
            &config,
        );
        assert!(plan.diagnostics.is_empty());
        assert!(plan.unions.is_empty());
        let names: Vec<&str> = plan.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "_gap_0x4", "b"]);
        assert_eq!(plan.members[1].ty.to_string(), "[u8; 0x8]");
        let total: usize = plan.members.iter().map(|m| m.size).sum();
        assert_eq!(total, 0x10);
    }

    #[test]
    fn test_shared_offset_becomes_union() {
        let config = ExportConfig::default();
        let plan = reconstruct(
            &owner(),
            0x10,
            vec![slot("A", "u64", 0, 8), slot("X", "i32", 8, 4), slot("Y", "f64", 8, 8)],
            &config,
        );
        assert_eq!(plan.unions.len(), 1);
        let union = &plan.unions[0];
        assert_eq!(union.type_ref().to_string(), "crate::game::Owner_Union");
        assert_eq!(union.size(), 8);
        assert!(union.is_union());
        let union_members: Vec<&str> = union.members().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(union_members, vec!["y", "x"]);
        assert!(union.members().iter().all(|m| m.offset == 0));

        let field = &plan.members[1];
        assert_eq!(field.name, "_union_0x8");
        assert_eq!(field.kind, MemberKind::Union);
        assert_eq!(field.ty.to_string(), "crate::game::Owner_Union");
        assert_eq!(plan.members.len(), 2);
    }

    #[test]
    fn test_union_size_floor_and_numbering() {
        let config = ExportConfig::default();
        let plan = reconstruct(
            &owner(),
            0x10,
            vec![
                slot("A", "u8", 0, 1),
                slot("B", "u16", 0, 2),
                slot("C", "u8", 8, 1),
                slot("D", "i8", 8, 1),
            ],
            &config,
        );
        assert_eq!(plan.unions.len(), 2);
        assert_eq!(plan.unions[1].type_ref().name(), "Owner_Union_1");
        for union in &plan.unions {
            assert_eq!(union.size(), MIN_UNION_SIZE);
            let gap = union.members().last().expect("padding");
            assert_eq!(gap.kind, MemberKind::Gap);
            assert_eq!(gap.size, MIN_UNION_SIZE);
        }
        assert_eq!(extents(&plan.members), vec![(0, 8), (8, 8)]);
    }

    #[test]
    fn test_vtable_marker_collapses_group() {
        let config = ExportConfig::default();
        let plan = reconstruct(
            &owner(),
            0x10,
            vec![
                slot("VTable", "*mut usize", 0, 8),
                slot("Base", "crate::game::Base", 0, 8),
                slot("Value", "u64", 8, 8),
            ],
            &config,
        );
        assert!(plan.unions.is_empty());
        assert_eq!(plan.members[0].name, "base");
        assert_eq!(plan.members[1].name, "value");
    }

    #[test]
    fn test_overrun_truncates_and_pads() {
        let config = ExportConfig::default();
        let plan = reconstruct(
            &owner(),
            0x20,
            vec![
                slot("Wide", "[u8; 0x10]", 0, 0x10),
                slot("Inside", "u32", 0x8, 4),
                slot("Later", "u32", 0x18, 4),
            ],
            &config,
        );
        assert_eq!(
            plan.diagnostics,
            vec![Diagnostic::LayoutOverrun {
                type_name: "crate::game::Owner".into(),
                field: "Inside".into(),
                cursor: 0x10,
                offset: 0x8,
            }]
        );
        assert_eq!(extents(&plan.members), vec![(0, 0x10), (0x10, 0x10)]);
        assert!(plan.members.iter().all(|m| m.name != "later"));
    }
}
