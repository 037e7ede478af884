// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Enum declarations.

use crate::emit::CodeWriter;
use crate::error::Diagnostic;
use crate::metadata::{Scalar, TypeMetadata};
use crate::naming::escape_keyword;
use crate::primitive::{repr_name, value_range};
use crate::type_ref::TypeRef;
use std::collections::{HashMap, HashSet};

/// Width assumed when the metadata omits the underlying type.
const DEFAULT_UNDERLYING: Scalar = Scalar::Int32;

/// Underlying width of an enum described by `meta`.
pub fn underlying_of(meta: &TypeMetadata) -> Scalar {
    meta.underlying.unwrap_or(DEFAULT_UNDERLYING)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub value: i128,
}

/// Constant naming a value already taken by an earlier variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDecl {
    type_ref: TypeRef,
    underlying: Scalar,
    variants: Vec<Variant>,
    aliases: Vec<Alias>,
    malformed: Option<String>,
}

impl EnumDecl {
    /// Build from metadata. Malformed metadata yields an empty-bodied enum
    /// plus a diagnostic instead of an error.
    pub fn from_metadata(type_ref: TypeRef, meta: &TypeMetadata) -> (Self, Option<Diagnostic>) {
        let underlying = underlying_of(meta);
        let mut decl = Self {
            type_ref,
            underlying,
            variants: Vec::new(),
            aliases: Vec::new(),
            malformed: None,
        };

        if let Err(reason) = decl.fill(meta) {
            tracing::warn!("Malformed enum {}: {}", decl.type_ref.canonical_name(), reason);
            decl.variants.clear();
            decl.aliases.clear();
            let diagnostic = Diagnostic::MalformedEnum {
                type_name: decl.type_ref.canonical_name(),
                reason: reason.clone(),
            };
            decl.malformed = Some(reason);
            return (decl, Some(diagnostic));
        }

        (decl, None)
    }

    fn fill(&mut self, meta: &TypeMetadata) -> std::result::Result<(), String> {
        let (min, max) = value_range(self.underlying)
            .ok_or_else(|| format!("non-integer underlying type {:?}", self.underlying))?;
        let variants = meta
            .variants
            .as_ref()
            .ok_or_else(|| "variants could not be enumerated".to_string())?;

        let mut seen_names = HashSet::new();
        let mut by_value: HashMap<i128, String> = HashMap::new();

        for variant in variants {
            if !seen_names.insert(variant.name.as_str()) {
                return Err(format!("duplicate variant name {}", variant.name));
            }
            if variant.value < min || variant.value > max {
                return Err(format!(
                    "value {} of {} does not fit {:?}",
                    variant.value, variant.name, self.underlying
                ));
            }

            let ident = escape_keyword(&variant.name);
            match by_value.get(&variant.value) {
                Some(target) => self.aliases.push(Alias {
                    name: ident,
                    target: target.clone(),
                }),
                None => {
                    by_value.insert(variant.value, ident.clone());
                    self.variants.push(Variant {
                        name: ident,
                        value: variant.value,
                    });
                }
            }
        }

        Ok(())
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    pub fn underlying(&self) -> Scalar {
        self.underlying
    }

    pub fn size(&self) -> usize {
        self.underlying.size()
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }

    pub fn is_malformed(&self) -> bool {
        self.malformed.is_some()
    }

    pub fn emit(&self, w: &mut CodeWriter) {
        let name = self.type_ref.name();
        let repr = repr_name(self.underlying).unwrap_or("C");
        w.line(format!("#[repr({repr})]"));

        if let Some(reason) = &self.malformed {
            w.block(format!("pub enum {name}"), |w| {
                w.line(format!("// enum metadata unavailable: {reason}"));
            });
            return;
        }

        w.line("#[derive(Copy, Clone, Debug)]");
        w.block(format!("pub enum {name}"), |w| {
            for variant in &self.variants {
                w.line(format!("{} = {},", variant.name, variant.value));
            }
        });

        if !self.aliases.is_empty() {
            w.blank();
            w.line("#[allow(non_upper_case_globals)]");
            w.block(format!("impl {name}"), |w| {
                for alias in &self.aliases {
                    w.line(format!(
                        "pub const {}: {name} = {name}::{};",
                        alias.name, alias.target
                    ));
                }
            });
        }
    }
}
