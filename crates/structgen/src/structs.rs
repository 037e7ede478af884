// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Struct and union declarations.

use crate::emit::CodeWriter;
use crate::function::{self, FunctionDecl, StaticAddressDescriptor};
use crate::type_ref::TypeRef;

/// Role of a member in the reconstructed layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Field described by the metadata.
    Field,
    /// Padding covering bytes no field claims.
    Gap,
    /// Synthesized union of fields sharing an offset.
    Union,
    /// `PhantomData` marker of an open generic parameter.
    Phantom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub ty: TypeRef,
    pub offset: usize,
    pub size: usize,
    pub kind: MemberKind,
}

impl Member {
    pub fn new(
        name: impl Into<String>,
        ty: TypeRef,
        offset: usize,
        size: usize,
        kind: MemberKind,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            offset,
            size,
            kind,
        }
    }

    /// Padding member `_gap_0x<offset>`.
    pub fn gap(offset: usize, size: usize) -> Self {
        let element = TypeRef::path(["u8"]);
        let ty = if size == 1 {
            element
        } else {
            element.with_array_len(size)
        };
        Self::new(format!("_gap_0x{offset:x}"), ty, offset, size, MemberKind::Gap)
    }

    pub fn is_public(&self) -> bool {
        self.kind != MemberKind::Gap
    }
}

/// Derive attribute selected for a struct or union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derive {
    CopyClone,
    Clone,
    None,
}

impl Derive {
    fn attribute(self) -> Option<&'static str> {
        match self {
            Self::CopyClone => Some("#[derive(Copy, Clone)]"),
            Self::Clone => Some("#[derive(Clone)]"),
            Self::None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDecl {
    type_ref: TypeRef,
    size: usize,
    is_union: bool,
    opaque: bool,
    members: Vec<Member>,
    functions: Vec<FunctionDecl>,
    vtable: Option<StaticAddressDescriptor>,
}

impl StructDecl {
    pub fn new(type_ref: TypeRef, size: usize) -> Self {
        Self {
            type_ref: type_ref.base(),
            size,
            is_union: false,
            opaque: false,
            members: Vec::new(),
            functions: Vec::new(),
            vtable: None,
        }
    }

    pub fn new_union(type_ref: TypeRef, size: usize) -> Self {
        Self {
            is_union: true,
            ..Self::new(type_ref, size)
        }
    }

    /// Storage-less type of non-zero size, emitted as `Name(pub [u8; size])`.
    pub fn new_opaque(type_ref: TypeRef, size: usize) -> Self {
        Self {
            opaque: true,
            ..Self::new(type_ref, size)
        }
    }

    /// Registry key. Open generics register under their erased name.
    pub fn key(&self) -> String {
        if self.is_open_generic() {
            self.type_ref.erased_name()
        } else {
            self.type_ref.canonical_name()
        }
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_union(&self) -> bool {
        self.is_union
    }

    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    pub fn is_open_generic(&self) -> bool {
        self.type_ref.generics().is_some_and(|args| !args.is_empty())
            && self.members.iter().all(|m| m.kind == MemberKind::Phantom)
            && self.size == 0
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut [Member] {
        &mut self.members
    }

    pub fn push_member(&mut self, member: Member) {
        self.members.push(member);
    }

    pub fn set_members(&mut self, members: Vec<Member>) {
        self.members = members;
    }

    pub fn functions(&self) -> &[FunctionDecl] {
        &self.functions
    }

    pub fn set_functions(&mut self, functions: Vec<FunctionDecl>) {
        self.functions = functions;
    }

    pub fn vtable(&self) -> Option<&StaticAddressDescriptor> {
        self.vtable.as_ref()
    }

    pub fn set_vtable(&mut self, vtable: Option<StaticAddressDescriptor>) {
        self.vtable = vtable;
    }

    /// Carries a virtual table cell.
    pub fn has_vtable_cell(&self) -> bool {
        self.vtable.is_some() || self.functions.iter().any(FunctionDecl::is_virtual)
    }

    /// Any member wrapped in `ManuallyDrop`.
    pub fn has_manually_drop(&self) -> bool {
        self.members.iter().any(|m| m.ty.is_manually_drop())
    }

    /// Select derives from the copy-taint state and the `no_derive` list.
    pub fn derive(&self, tainted: bool, suppressed: bool) -> Derive {
        if suppressed || (self.is_union && self.has_manually_drop()) {
            Derive::None
        } else if tainted {
            Derive::Clone
        } else {
            Derive::CopyClone
        }
    }

    fn size_comment(&self) -> String {
        if self.is_open_generic() {
            " /* Size=unknown (generic type with parameters) */".to_string()
        } else {
            format!(" /* Size=0x{:X} */", self.size)
        }
    }

    /// Emit the declaration, its owner `impl` and its function descriptors.
    pub fn emit(&self, w: &mut CodeWriter, derive: Derive) {
        let keyword = if self.is_union { "union" } else { "struct" };
        let decl_name = self.type_ref.decl_name();
        let size_comment = self.size_comment();

        w.line("#[repr(C)]");
        if let Some(attribute) = derive.attribute() {
            w.line(attribute);
        }

        if self.opaque {
            w.line(format!(
                "pub {keyword} {decl_name}(pub [u8; 0x{:X}]);{size_comment}",
                self.size
            ));
        } else if self.members.is_empty() {
            w.line(format!("pub {keyword} {decl_name};{size_comment}"));
        } else {
            w.line(format!("pub {keyword} {decl_name} {{{size_comment}"));
            w.indent();
            // Offsets are padded to the digit count of the declared size.
            let width = format!("{:X}", self.size).len();
            for member in &self.members {
                let visibility = if member.is_public() { "pub " } else { "" };
                w.line(format!(
                    "/* 0x{:0width$X} */ {visibility}{}: {},",
                    member.offset, member.name, member.ty
                ));
            }
            w.dedent();
            w.line("}");
        }

        self.emit_impl(w);

        for function in &self.functions {
            w.blank();
            function.emit(w);
        }
    }

    fn emit_impl(&self, w: &mut CodeWriter) {
        if self.functions.is_empty() && !self.has_vtable_cell() {
            return;
        }

        let name = self.type_ref.name();
        if self.has_vtable_cell() {
            w.blank();
            function::emit_vtable_cell(w, &self.type_ref);
        }

        w.blank();
        w.block(format!("impl {name}"), |w| {
            let mut first = true;
            if self.has_vtable_cell() {
                function::emit_vtable_accessors(w, &self.type_ref, self.vtable.as_ref());
                first = false;
            }
            for function in &self.functions {
                if !first {
                    w.blank();
                }
                function.emit_accessor(w);
                first = false;
            }
        });
    }
}
