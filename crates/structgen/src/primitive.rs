// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Primitive catalog.
//!
//! Maps source scalar shapes (at a given pointer depth) onto target
//! primitives, and lists the runtime-provided wrapper types that are
//! registered before any composite is built.

use crate::metadata::Scalar;
use crate::type_ref::{TypeRef, CRATE_ROOT, STD_ROOT};

/// Module holding the runtime's container wrappers.
pub const CPP_STD_MODULE: &str = "cpp_std";

/// Container wrappers that own heap memory and never implement `Copy`.
pub const TAINTED_WRAPPERS: &[&str] = &["Map", "Deque", "Vector", "Set"];

/// A type the generated code references but never declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveDecl {
    type_ref: TypeRef,
    copy_tainted: bool,
}

impl PrimitiveDecl {
    pub fn new(type_ref: TypeRef) -> Self {
        Self {
            type_ref: type_ref.base(),
            copy_tainted: false,
        }
    }

    /// Erased generic wrapper (`Name<>`).
    pub fn wrapper(type_ref: TypeRef) -> Self {
        Self::new(type_ref.with_generics(Vec::new()))
    }

    #[must_use]
    pub fn tainted(mut self) -> Self {
        self.copy_tainted = true;
        self
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    pub fn canonical_name(&self) -> String {
        self.type_ref.canonical_name()
    }

    /// Seeds the copy-taint set.
    pub fn is_copy_tainted(&self) -> bool {
        self.copy_tainted
    }
}

fn prim(name: &str) -> TypeRef {
    TypeRef::path([name])
}

fn c_void() -> TypeRef {
    TypeRef::path([STD_ROOT, "ffi", "c_void"])
}

fn phantom_data() -> TypeRef {
    TypeRef::path([STD_ROOT, "marker", "PhantomData"])
}

fn manually_drop() -> TypeRef {
    TypeRef::path([STD_ROOT, "mem", "ManuallyDrop"])
}

/// Reference to `std::marker::PhantomData<param>`.
pub fn phantom_of(param: TypeRef) -> TypeRef {
    phantom_data().with_generics(vec![param])
}

/// Target of `void` at the given pointer depth.
///
/// Bare `void` is the unit type; pointers to it are `c_void` pointers.
pub fn void_ref(depth: usize) -> TypeRef {
    if depth == 0 {
        prim("()")
    } else {
        c_void().with_pointer_depth(depth)
    }
}

/// Untyped pointer used for references into namespaces nothing maps.
pub fn opaque_pointer(depth: usize) -> TypeRef {
    c_void().with_pointer_depth(depth.max(1))
}

/// Target of a scalar at the given pointer depth, if the combination is
/// supported.
pub fn scalar_ref(scalar: Scalar, depth: usize) -> Option<TypeRef> {
    let (target, max_depth) = match scalar {
        Scalar::SByte => ("i8", 2),
        Scalar::Byte => ("u8", 2),
        Scalar::Bool => ("bool", 2),
        Scalar::Char => ("u16", usize::MAX),
        Scalar::Single => ("f32", 1),
        Scalar::Double => ("f64", 1),
        Scalar::Int16 => ("i16", 1),
        Scalar::Int32 => ("i32", 1),
        Scalar::Int64 => ("i64", 1),
        Scalar::UInt16 => ("u16", 1),
        Scalar::UInt32 => ("u32", 1),
        Scalar::UInt64 => ("u64", 1),
        // Native-width integers are modelled as pointers.
        Scalar::IntPtr | Scalar::UIntPtr => {
            return (depth <= 1).then(|| prim("usize").with_pointer_depth(depth + 1));
        }
    };
    (depth <= max_depth).then(|| prim(target).with_pointer_depth(depth))
}

/// Target integer type named in `#[repr(..)]` for an enum width.
pub fn repr_name(scalar: Scalar) -> Option<&'static str> {
    match scalar {
        Scalar::SByte => Some("i8"),
        Scalar::Byte => Some("u8"),
        Scalar::Int16 => Some("i16"),
        Scalar::UInt16 | Scalar::Char => Some("u16"),
        Scalar::Int32 => Some("i32"),
        Scalar::UInt32 => Some("u32"),
        Scalar::Int64 => Some("i64"),
        Scalar::UInt64 => Some("u64"),
        Scalar::IntPtr => Some("isize"),
        Scalar::UIntPtr => Some("usize"),
        Scalar::Bool | Scalar::Single | Scalar::Double => None,
    }
}

/// Inclusive value range representable by an integer width.
pub fn value_range(scalar: Scalar) -> Option<(i128, i128)> {
    let range = match scalar {
        Scalar::SByte => (i8::MIN.into(), i8::MAX.into()),
        Scalar::Byte => (0, u8::MAX.into()),
        Scalar::Int16 => (i16::MIN.into(), i16::MAX.into()),
        Scalar::UInt16 | Scalar::Char => (0, u16::MAX.into()),
        Scalar::Int32 => (i32::MIN.into(), i32::MAX.into()),
        Scalar::UInt32 => (0, u32::MAX.into()),
        Scalar::Int64 | Scalar::IntPtr => (i64::MIN.into(), i64::MAX.into()),
        Scalar::UInt64 | Scalar::UIntPtr => (0, u64::MAX.into()),
        Scalar::Bool | Scalar::Single | Scalar::Double => return None,
    };
    Some(range)
}

/// Every primitive registered before the type graph is built.
pub fn builtin_primitives() -> Vec<PrimitiveDecl> {
    let mut decls: Vec<PrimitiveDecl> = [
        "()", "bool", "i8", "u8", "i16", "u16", "i32", "u32", "i64", "u64", "f32", "f64",
        "usize",
    ]
    .iter()
    .map(|name| PrimitiveDecl::new(prim(name)))
    .collect();

    decls.push(PrimitiveDecl::new(c_void()));
    decls.push(PrimitiveDecl::wrapper(phantom_data()));
    decls.push(PrimitiveDecl::wrapper(manually_drop()));

    for wrapper in TAINTED_WRAPPERS {
        let path = TypeRef::path([CRATE_ROOT, CPP_STD_MODULE, wrapper]);
        decls.push(PrimitiveDecl::wrapper(path).tainted());
    }

    decls
}
