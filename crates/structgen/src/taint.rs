// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Copy-taint analysis.
//!
//! A declaration is copy-tainted when it cannot implement `Copy`: it is a
//! seeded wrapper primitive, or one of its members references a tainted
//! declaration (directly, behind a pointer or as a generic argument). The set
//! only grows; propagation repeats whole-registry passes until one adds
//! nothing.

use crate::registry::{Registry, TypeDecl};
use crate::structs::MemberKind;
use crate::type_ref::TypeRef;
use std::collections::BTreeSet;

/// Canonical names of declarations that must not derive `Copy`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaintSet {
    names: BTreeSet<String>,
}

impl TaintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with every primitive flagged as copy-tainted.
    pub fn seeded(registry: &Registry) -> Self {
        let mut set = Self::new();
        for decl in registry.iter() {
            if let TypeDecl::Primitive(primitive) = decl {
                if primitive.is_copy_tainted() {
                    set.mark(primitive.canonical_name());
                }
            }
        }
        set
    }

    /// Returns `true` if `name` was not tainted before.
    pub fn mark(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// `true` if `ty` or any nested generic argument resolves to a tainted
/// declaration.
pub fn references_tainted(registry: &Registry, taint: &TaintSet, ty: &TypeRef) -> bool {
    let mut hit = false;
    ty.for_each_ref(&mut |r| {
        if !hit {
            hit = registry.resolve_key(r).is_some_and(|key| taint.contains(key));
        }
    });
    hit
}

/// Run passes until a fixed point. Returns the number of declarations newly
/// tainted by each pass; the last entry is always `0`.
pub fn propagate(registry: &mut Registry, taint: &mut TaintSet) -> Vec<usize> {
    let mut passes = Vec::new();

    loop {
        let mut marked = 0;

        for idx in 0..registry.len() {
            let key = match registry.decl_at(idx) {
                TypeDecl::Struct(decl) => {
                    let key = decl.key();
                    let tainted = !taint.contains(&key)
                        && decl
                            .members()
                            .iter()
                            .any(|m| references_tainted(registry, taint, &m.ty));
                    if !tainted {
                        continue;
                    }
                    key
                }
                _ => continue,
            };

            taint.mark(key);
            marked += 1;
            wrap_union_members(registry, taint, idx);
        }

        for idx in 0..registry.len() {
            let tainted_union = registry
                .decl_at(idx)
                .as_struct()
                .is_some_and(|decl| decl.is_union() && taint.contains(&decl.key()));
            if tainted_union {
                wrap_union_members(registry, taint, idx);
            }
        }

        tracing::info!("Copy-taint pass {}: {} newly tainted", passes.len() + 1, marked);
        passes.push(marked);
        if marked == 0 {
            break;
        }
    }

    passes
}

/// Wrap every union member referencing a tainted declaration in
/// `ManuallyDrop`. Already wrapped members are left alone.
fn wrap_union_members(registry: &mut Registry, taint: &TaintSet, idx: usize) -> usize {
    let targets: Vec<usize> = match registry.decl_at(idx).as_struct() {
        Some(decl) if decl.is_union() => decl
            .members()
            .iter()
            .enumerate()
            .filter(|(_, m)| {
                m.kind != MemberKind::Gap
                    && !m.ty.is_manually_drop()
                    && references_tainted(registry, taint, &m.ty)
            })
            .map(|(i, _)| i)
            .collect(),
        _ => return 0,
    };

    if let Some(decl) = registry.decl_at_mut(idx).as_struct_mut() {
        for i in &targets {
            let member = &mut decl.members_mut()[*i];
            member.ty = member.ty.clone().manually_drop();
        }
    }
    targets.len()
}
