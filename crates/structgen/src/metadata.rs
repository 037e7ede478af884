// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Input model supplied by the metadata-introspection collaborator.
//!
//! The collaborator walks the source type library and serialises every type
//! it finds as JSON. Nothing here is interpreted yet: names are still source
//! names (`FFXIVClientStructs.FFXIV.Client.Game.Character.Character`) and
//! field shapes are still source shapes.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Scalar shapes of the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    Bool,
    Char,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    IntPtr,
    UIntPtr,
}

impl Scalar {
    /// Effective storage size under the source library's marshaling
    /// convention (booleans occupy one byte).
    pub const fn size(self) -> usize {
        match self {
            Self::Bool | Self::SByte | Self::Byte => 1,
            Self::Char | Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Single => 4,
            Self::Int64 | Self::UInt64 | Self::Double | Self::IntPtr | Self::UIntPtr => 8,
        }
    }

    pub const fn is_integer(self) -> bool {
        !matches!(self, Self::Bool | Self::Single | Self::Double)
    }
}

/// Shape of a field, parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Void,
    Scalar {
        scalar: Scalar,
    },
    Pointer {
        pointee: Box<Shape>,
    },
    Named {
        name: String,
        #[serde(default)]
        args: Vec<Shape>,
    },
    /// Unbound generic parameter of an open generic definition.
    Param {
        name: String,
    },
}

impl Shape {
    pub fn scalar(scalar: Scalar) -> Self {
        Self::Scalar { scalar }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<Shape>) -> Self {
        Self::Named {
            name: name.into(),
            args,
        }
    }

    pub fn pointer(pointee: Shape) -> Self {
        Self::Pointer {
            pointee: Box::new(pointee),
        }
    }

    /// Split into the innermost non-pointer shape and the pointer depth.
    pub fn peel_pointers(&self) -> (&Shape, usize) {
        let mut shape = self;
        let mut depth = 0;
        while let Self::Pointer { pointee } = shape {
            shape = pointee;
            depth += 1;
        }
        (shape, depth)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Scalar { scalar } => write!(f, "{scalar:?}"),
            Self::Pointer { pointee } => write!(f, "{pointee}*"),
            Self::Named { name, args } if args.is_empty() => f.write_str(name),
            Self::Named { name, args } => {
                let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "{name}<{}>", rendered.join(", "))
            }
            Self::Param { name } => f.write_str(name),
        }
    }
}

/// Category of a described type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeCategory {
    Struct,
    Union,
    Enum,
}

/// Declared memory layout of a composite type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    #[default]
    Explicit,
    Sequential,
    Auto,
}

/// One field of a composite type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub name: String,
    /// Field shape; the element shape for inline fixed arrays.
    pub shape: Shape,
    pub offset: usize,
    /// Element count of an inline fixed-size array.
    #[serde(default)]
    pub fixed_length: Option<usize>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub is_static: bool,
    /// Compile-time constant.
    #[serde(default)]
    pub is_literal: bool,
    /// Compiler-generated housekeeping field.
    #[serde(default)]
    pub synthetic: bool,
}

impl FieldMetadata {
    pub fn new(name: impl Into<String>, shape: Shape, offset: usize) -> Self {
        Self {
            name: name.into(),
            shape,
            offset,
            fixed_length: None,
            deprecated: false,
            is_static: false,
            is_literal: false,
            synthetic: false,
        }
    }

    #[must_use]
    pub fn fixed(mut self, length: usize) -> Self {
        self.fixed_length = Some(length);
        self
    }

    /// Fields that carry no instance storage.
    pub fn has_storage(&self) -> bool {
        !(self.deprecated || self.is_static || self.is_literal || self.synthetic)
    }
}

/// One enum constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantMetadata {
    pub name: String,
    pub value: i128,
}

/// Byte-pattern based location of a static address or vtable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticAddressMetadata {
    pub signature: String,
    #[serde(default)]
    pub offset: isize,
    /// The pattern locates a pointer to the address rather than the address.
    #[serde(default)]
    pub is_pointer: bool,
}

/// How a native function is located at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FunctionBinding {
    MemberFunction { signature: String },
    VirtualFunction { index: usize },
    StaticAddress(StaticAddressMetadata),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamMetadata {
    pub name: String,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionMetadata {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamMetadata>,
    #[serde(default = "void_shape")]
    pub returns: Shape,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub deprecated: bool,
    /// Methods without a binding are not native functions and are ignored.
    #[serde(default)]
    pub binding: Option<FunctionBinding>,
}

fn void_shape() -> Shape {
    Shape::Void
}

/// Full description of one source type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMetadata {
    pub name: String,
    pub kind: TypeCategory,
    #[serde(default)]
    pub layout: LayoutKind,
    #[serde(default)]
    pub size: usize,
    /// Parameters of an open generic definition.
    #[serde(default)]
    pub generic_params: Vec<String>,
    /// Arguments of a closed generic instantiation.
    #[serde(default)]
    pub args: Vec<Shape>,
    #[serde(default)]
    pub fields: Vec<FieldMetadata>,
    /// Underlying integer width of an enum.
    #[serde(default)]
    pub underlying: Option<Scalar>,
    /// Enum constants; `None` when the collaborator could not enumerate them.
    #[serde(default)]
    pub variants: Option<Vec<VariantMetadata>>,
    #[serde(default)]
    pub functions: Vec<FunctionMetadata>,
    #[serde(default)]
    pub vtable: Option<StaticAddressMetadata>,
}

impl TypeMetadata {
    pub fn new(name: impl Into<String>, kind: TypeCategory, size: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            layout: LayoutKind::Explicit,
            size,
            generic_params: Vec::new(),
            args: Vec::new(),
            fields: Vec::new(),
            underlying: None,
            variants: None,
            functions: Vec::new(),
            vtable: None,
        }
    }

    pub fn new_struct(name: impl Into<String>, size: usize) -> Self {
        Self::new(name, TypeCategory::Struct, size)
    }

    pub fn new_enum(name: impl Into<String>, underlying: Scalar, variants: Vec<(&str, i128)>) -> Self {
        let mut meta = Self::new(name, TypeCategory::Enum, underlying.size());
        meta.underlying = Some(underlying);
        meta.variants = Some(
            variants
                .into_iter()
                .map(|(name, value)| VariantMetadata {
                    name: name.to_string(),
                    value,
                })
                .collect(),
        );
        meta
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Vec<FieldMetadata>) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn with_functions(mut self, functions: Vec<FunctionMetadata>) -> Self {
        self.functions = functions;
        self
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TypeCategory::Enum
    }

    pub fn is_open_generic(&self) -> bool {
        !self.generic_params.is_empty() && self.args.is_empty()
    }
}

/// Document handed over by the collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub types: Vec<TypeMetadata>,
}

/// Indexed collection of every described type.
#[derive(Debug, Clone, Default)]
pub struct TypeLibrary {
    types: Vec<TypeMetadata>,
    by_name: HashMap<String, Vec<usize>>,
}

impl TypeLibrary {
    pub fn new(types: Vec<TypeMetadata>) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, meta) in types.iter().enumerate() {
            by_name.entry(meta.name.clone()).or_default().push(idx);
        }
        Self { types, by_name }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: MetadataDocument = serde_json::from_str(json)?;
        Ok(Self::new(document.types))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn types(&self) -> &[TypeMetadata] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Non-instantiated entry for `name` (plain type or open generic
    /// definition).
    pub fn definition(&self, name: &str) -> Option<&TypeMetadata> {
        self.entries(name).find(|meta| meta.args.is_empty())
    }

    /// Closed instantiation of `name` with exactly `args`.
    pub fn instantiation(&self, name: &str, args: &[Shape]) -> Option<&TypeMetadata> {
        self.entries(name).find(|meta| meta.args == args)
    }

    fn entries<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a TypeMetadata> + 'a {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .map(move |idx| &self.types[*idx])
    }
}
