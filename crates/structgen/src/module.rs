// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hierarchical namespace tree mirroring the source namespaces.
//!
//! Modules own their child modules and the names of the declarations placed
//! in them; the declarations themselves live in the
//! [`Registry`](crate::registry::Registry). Members are kept sorted by name so
//! emitted output does not depend on discovery order.

use crate::error::{ExportError, Result};
use std::collections::BTreeMap;

/// Entry in a module.
#[derive(Debug, Clone)]
pub enum ModuleMember {
    Module(Module),
    /// Canonical name of a registered declaration.
    Decl(String),
}

/// Node of the namespace tree. The root has an empty path.
#[derive(Debug, Clone, Default)]
pub struct Module {
    path: Vec<String>,
    members: BTreeMap<String, ModuleMember>,
}

impl Module {
    pub fn root() -> Self {
        Self::default()
    }

    /// Last path segment (empty for the root).
    pub fn name(&self) -> &str {
        self.path.last().map_or("", String::as_str)
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// `crate::a::b` style path, used in messages.
    pub fn full_name(&self) -> String {
        if self.path.is_empty() {
            "crate".to_string()
        } else {
            format!("crate::{}", self.path.join("::"))
        }
    }

    /// Return the child module `name`, creating it when absent.
    pub fn get_or_add_module(&mut self, name: &str) -> Result<&mut Module> {
        let full_name = self.full_name();
        let mut child_path = self.path.clone();
        child_path.push(name.to_string());

        let member = self
            .members
            .entry(name.to_string())
            .or_insert_with(|| {
                ModuleMember::Module(Module {
                    path: child_path,
                    members: BTreeMap::new(),
                })
            });

        match member {
            ModuleMember::Module(module) => Ok(module),
            ModuleMember::Decl(_) => Err(ExportError::DuplicateRegistration {
                module: full_name,
                name: name.to_string(),
            }),
        }
    }

    /// Walk (and create) the module chain for `path`.
    pub fn module_mut(&mut self, path: &[String]) -> Result<&mut Module> {
        let mut module = self;
        for segment in path {
            module = module.get_or_add_module(segment)?;
        }
        Ok(module)
    }

    /// Look up an existing module without creating anything.
    pub fn find(&self, path: &[String]) -> Option<&Module> {
        let mut module = self;
        for segment in path {
            match module.members.get(segment) {
                Some(ModuleMember::Module(child)) => module = child,
                _ => return None,
            }
        }
        Some(module)
    }

    /// Place a declaration under `name`. Any existing member with that name
    /// is a conflict.
    pub fn add_decl(&mut self, name: &str, canonical: impl Into<String>) -> Result<()> {
        if self.members.contains_key(name) {
            return Err(ExportError::DuplicateRegistration {
                module: self.full_name(),
                name: name.to_string(),
            });
        }
        self.members
            .insert(name.to_string(), ModuleMember::Decl(canonical.into()));
        Ok(())
    }

    pub fn members(&self) -> impl Iterator<Item = (&String, &ModuleMember)> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// `true` when the module holds no declarations at any depth.
    pub fn is_effectively_empty(&self) -> bool {
        self.members.values().all(|member| match member {
            ModuleMember::Module(module) => module.is_effectively_empty(),
            ModuleMember::Decl(_) => false,
        })
    }
}
