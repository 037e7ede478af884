// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Declaration registry keyed by canonical name.

use crate::enums::EnumDecl;
use crate::error::{ExportError, Result};
use crate::primitive::PrimitiveDecl;
use crate::structs::StructDecl;
use crate::type_ref::TypeRef;
use std::collections::HashMap;

/// Every kind of declaration the exporter knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDecl {
    Struct(StructDecl),
    Enum(EnumDecl),
    Primitive(PrimitiveDecl),
}

impl TypeDecl {
    pub fn type_ref(&self) -> &TypeRef {
        match self {
            Self::Struct(decl) => decl.type_ref(),
            Self::Enum(decl) => decl.type_ref(),
            Self::Primitive(decl) => decl.type_ref(),
        }
    }

    /// Registry key.
    pub fn key(&self) -> String {
        match self {
            Self::Struct(decl) => decl.key(),
            Self::Enum(decl) => decl.type_ref().canonical_name(),
            Self::Primitive(decl) => decl.canonical_name(),
        }
    }

    pub fn as_struct(&self) -> Option<&StructDecl> {
        match self {
            Self::Struct(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn as_struct_mut(&mut self) -> Option<&mut StructDecl> {
        match self {
            Self::Struct(decl) => Some(decl),
            _ => None,
        }
    }

    /// Declarations that appear in the generated module tree.
    pub fn is_emitted(&self) -> bool {
        !matches!(self, Self::Primitive(_))
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Struct(decl) if decl.is_union() => "union",
            Self::Struct(_) => "struct",
            Self::Enum(_) => "enum",
            Self::Primitive(_) => "primitive",
        }
    }
}

/// Registered declarations in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    decls: Vec<TypeDecl>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration under its key. A key registers at most once.
    pub fn register(&mut self, decl: TypeDecl) -> Result<()> {
        let key = decl.key();
        if self.index.contains_key(&key) {
            return Err(ExportError::DuplicateRegistration {
                module: decl.type_ref().module_path().join("::"),
                name: key,
            });
        }
        tracing::debug!("Registered {} {}", decl.kind_name(), key);
        self.index.insert(key, self.decls.len());
        self.decls.push(decl);
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&TypeDecl> {
        self.index.get(key).map(|idx| &self.decls[*idx])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut TypeDecl> {
        let idx = *self.index.get(key)?;
        self.decls.get_mut(idx)
    }

    /// Key of the declaration a reference resolves to: the exact canonical
    /// name first, then the erased generic form.
    pub fn resolve_key(&self, type_ref: &TypeRef) -> Option<&str> {
        let canonical = type_ref.canonical_name();
        if let Some((key, _)) = self.index.get_key_value(&canonical) {
            return Some(key.as_str());
        }
        let erased = type_ref.erased_name();
        self.index.get_key_value(&erased).map(|(key, _)| key.as_str())
    }

    pub fn resolve(&self, type_ref: &TypeRef) -> Option<&TypeDecl> {
        self.resolve_key(type_ref).and_then(|key| self.get(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDecl> {
        self.decls.iter()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub(crate) fn decl_at(&self, idx: usize) -> &TypeDecl {
        &self.decls[idx]
    }

    pub(crate) fn decl_at_mut(&mut self, idx: usize) -> &mut TypeDecl {
        &mut self.decls[idx]
    }
}
