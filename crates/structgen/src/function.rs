// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native function descriptors and their resolution scaffolding.
//!
//! Every descriptor becomes a unit struct backed by a process-wide address
//! cell. The cell starts at `0` (unresolved) and is written once by the
//! external resolver, either from a byte-pattern scan or from the owner's
//! virtual table. The generated `call` trampoline reads the cell and
//! transmutes the address into a function pointer of the declared shape.

use crate::emit::CodeWriter;
use crate::error::{ExportError, Result};
use crate::naming::{escape_keyword, safe_snake_case, static_ident};
use crate::type_ref::TypeRef;
use std::fmt;

const ATOMIC_USIZE: &str = "std::sync::atomic::AtomicUsize";
const SIGNATURE_TYPE: &str = "crate::resolution::Signature";
const STATIC_ADDRESS_TYPE: &str = "crate::resolution::StaticAddressSignature";

/// Parsed byte pattern (`"48 8B ?? E8"`). Wildcard positions hold `0` with a
/// `false` mask bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pattern: String,
    bytes: Vec<u8>,
    mask: Vec<bool>,
}

impl Signature {
    /// Parse a whitespace-separated pattern of hex bytes and `??` wildcards.
    pub fn parse(owner: &str, pattern: &str) -> Result<Self> {
        let invalid = || ExportError::InvalidSignature {
            owner: owner.to_string(),
            pattern: pattern.to_string(),
        };

        let mut bytes = Vec::new();
        let mut mask = Vec::new();
        for token in pattern.split_whitespace() {
            if token == "??" || token == "?" {
                bytes.push(0);
                mask.push(false);
            } else if token.len() == 2 {
                bytes.push(u8::from_str_radix(token, 16).map_err(|_| invalid())?);
                mask.push(true);
            } else {
                return Err(invalid());
            }
        }

        if bytes.is_empty() || !mask.iter().any(|m| *m) {
            return Err(invalid());
        }

        Ok(Self {
            pattern: bytes_to_pattern(&bytes, &mask),
            bytes,
            mask,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Constant expression building the runtime `Signature`.
    pub fn render(&self) -> String {
        let bytes: Vec<String> = self.bytes.iter().map(|b| format!("0x{b:02X}")).collect();
        let mask: Vec<&str> = self
            .mask
            .iter()
            .map(|m| if *m { "true" } else { "false" })
            .collect();
        format!(
            "{SIGNATURE_TYPE}::new({:?}, &[{}], &[{}])",
            self.pattern,
            bytes.join(", "),
            mask.join(", ")
        )
    }
}

fn bytes_to_pattern(bytes: &[u8], mask: &[bool]) -> String {
    let tokens: Vec<String> = bytes
        .iter()
        .zip(mask)
        .map(|(b, m)| if *m { format!("{b:02X}") } else { "??".to_string() })
        .collect();
    tokens.join(" ")
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Pattern locating a static address: the scan hit plus `offset`, optionally
/// dereferenced once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAddressDescriptor {
    pub signature: Signature,
    pub offset: isize,
    pub is_pointer: bool,
}

impl StaticAddressDescriptor {
    pub fn render(&self) -> String {
        format!(
            "{STATIC_ADDRESS_TYPE}::new({}, {}, {})",
            self.signature.render(),
            self.offset,
            self.is_pointer
        )
    }
}

/// How a descriptor's address is found at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Signature(Signature),
    VirtualIndex(usize),
    StaticAddress(StaticAddressDescriptor),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
}

/// One native function bound to its owning struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    owner: TypeRef,
    name: String,
    generated_name: String,
    accessor: String,
    binding: Binding,
    params: Vec<Param>,
    returns: TypeRef,
    is_static: bool,
}

impl FunctionDecl {
    /// Build a descriptor. `overload` is the number of earlier descriptors on
    /// the same owner sharing `name`.
    pub fn new(
        owner: TypeRef,
        name: impl Into<String>,
        overload: usize,
        binding: Binding,
        params: Vec<Param>,
        returns: TypeRef,
        is_static: bool,
    ) -> Result<Self> {
        let name = name.into();
        let owner = owner.base();

        if let Binding::StaticAddress(_) = binding {
            if !params.is_empty() || !returns.is_pointer() {
                return Err(ExportError::UnsupportedShape {
                    context: format!("{}::{}", owner.canonical_name(), name),
                    shape: format!("static address returning {returns}"),
                });
            }
        }

        let suffix = match overload {
            0 => String::new(),
            n => format!("_{n}"),
        };
        let generated_name = format!("{}_Fn_{}{}", owner.name(), name, suffix);
        let accessor = format!("{}{}", safe_snake_case(&name).trim_start_matches("r#"), suffix);
        let accessor = escape_keyword(&accessor);

        let params = params
            .into_iter()
            .map(|param| Param {
                name: param_ident(&param.name),
                ty: param.ty,
            })
            .collect();

        Ok(Self {
            owner,
            name,
            generated_name,
            accessor,
            binding,
            params,
            returns,
            is_static,
        })
    }

    pub fn owner(&self) -> &TypeRef {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Owner_Fn_Name` (with overload suffix).
    pub fn generated_name(&self) -> &str {
        &self.generated_name
    }

    /// Owner method returning this descriptor.
    pub fn accessor(&self) -> &str {
        &self.accessor
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn returns(&self) -> &TypeRef {
        &self.returns
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self.binding, Binding::VirtualIndex(_))
    }

    /// Full path of the generated descriptor struct.
    pub fn path(&self) -> TypeRef {
        TypeRef::local(&self.owner.module_path(), self.generated_name.clone())
    }

    fn cell_ident(&self) -> String {
        static_ident(&self.generated_name)
    }

    /// Parameter list of the native function, `this` first for instance
    /// methods.
    fn native_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.params.len() + 1);
        if !self.is_static && !matches!(self.binding, Binding::StaticAddress(_)) {
            params.push((
                "this".to_string(),
                self.owner.clone().pointer_to().to_string(),
            ));
        }
        params.extend(self.params.iter().map(|p| (p.name.clone(), p.ty.to_string())));
        params
    }

    fn return_suffix(&self) -> String {
        if self.returns.name() == "()" && !self.returns.is_pointer() {
            String::new()
        } else {
            format!(" -> {}", self.returns)
        }
    }

    /// Emit the descriptor struct, its cell and the trampoline.
    pub fn emit(&self, w: &mut CodeWriter) {
        let cell = self.cell_ident();
        let ident = &self.generated_name;

        w.line(format!("static {cell}: {ATOMIC_USIZE} = {ATOMIC_USIZE}::new(0);"));
        w.blank();
        w.line("#[derive(Copy, Clone)]");
        w.line(format!("pub struct {ident};"));
        w.blank();
        w.block(format!("impl {ident}"), |w| {
            w.line(format!(
                "pub const NAME: &'static str = \"{}.{}\";",
                self.owner.name(),
                self.name
            ));
            match &self.binding {
                Binding::Signature(signature) => w.line(format!(
                    "pub const SIGNATURE: {SIGNATURE_TYPE} = {};",
                    signature.render()
                )),
                Binding::VirtualIndex(index) => {
                    w.line(format!("pub const VIRTUAL_INDEX: usize = {index};"))
                }
                Binding::StaticAddress(descriptor) => w.line(format!(
                    "pub const STATIC_ADDRESS: {STATIC_ADDRESS_TYPE} = {};",
                    descriptor.render()
                )),
            }
            w.blank();
            emit_cell_accessors(w, &cell, "address", "set_address", true);

            if let Binding::VirtualIndex(_) = self.binding {
                w.blank();
                w.line("/// # Safety");
                w.line("/// `vtable` must be the address of the owner's virtual table.");
                w.block(
                    "pub unsafe fn resolve_from_vtable(&self, vtable: usize) -> bool",
                    |w| {
                        w.line("let slot = (vtable as *const usize).add(Self::VIRTUAL_INDEX);");
                        w.line("self.set_address(slot.read())");
                    },
                );
            }

            w.blank();
            self.emit_call(w);
        });
    }

    fn emit_call(&self, w: &mut CodeWriter) {
        let params = self.native_params();
        let declared: Vec<String> = params.iter().map(|(n, t)| format!("{n}: {t}")).collect();
        let types: Vec<&str> = params.iter().map(|(_, t)| t.as_str()).collect();
        let names: Vec<&str> = params.iter().map(|(n, _)| n.as_str()).collect();
        let ret = self.return_suffix();

        let mut header = String::from("pub unsafe fn call(&self");
        for param in &declared {
            header.push_str(", ");
            header.push_str(param);
        }
        header.push(')');
        header.push_str(&ret);

        w.line("/// # Safety");
        w.line("/// The resolved address must match the declared native signature.");
        w.block(header, |w| {
            w.line("let address = match self.address() {");
            w.indent();
            w.line("Some(address) => address,");
            w.line("None => panic!(\"{} called before its address was resolved\", Self::NAME),");
            w.dedent();
            w.line("};");
            if let Binding::StaticAddress(_) = self.binding {
                w.line(format!("address as {}", self.returns));
            } else {
                w.line(format!(
                    "let function: unsafe extern \"C\" fn({}){ret} = std::mem::transmute(address);",
                    types.join(", ")
                ));
                w.line(format!("function({})", names.join(", ")));
            }
        });
    }

    /// Emit the owner method returning this descriptor.
    pub fn emit_accessor(&self, w: &mut CodeWriter) {
        w.block(
            format!("pub fn {}() -> {}", self.accessor, self.generated_name),
            |w| w.line(&self.generated_name),
        );
    }
}

fn param_ident(name: &str) -> String {
    let ident = safe_snake_case(name);
    if ident == "this" {
        "this_".to_string()
    } else {
        ident
    }
}

/// Emit `getter() -> Option<usize>` and `setter(usize) -> bool` over an
/// address cell. Descriptor cells take `&self`, owner cells are associated
/// functions.
pub(crate) fn emit_cell_accessors(
    w: &mut CodeWriter,
    cell: &str,
    getter: &str,
    setter: &str,
    by_ref: bool,
) {
    let receiver = if by_ref { "&self" } else { "" };
    let setter_args = if by_ref {
        "&self, address: usize"
    } else {
        "address: usize"
    };

    w.block(format!("pub fn {getter}({receiver}) -> Option<usize>"), |w| {
        w.block(
            format!("match {cell}.load(std::sync::atomic::Ordering::Acquire)"),
            |w| {
                w.line("0 => None,");
                w.line("address => Some(address),");
            },
        );
    });
    w.blank();
    w.line("/// Store the resolved address. Only the first non-zero write wins.");
    w.block(format!("pub fn {setter}({setter_args}) -> bool"), |w| {
        w.line(format!("address != 0 && {cell}"));
        w.indent();
        w.line(".compare_exchange(");
        w.indent();
        w.line("0,");
        w.line("address,");
        w.line("std::sync::atomic::Ordering::AcqRel,");
        w.line("std::sync::atomic::Ordering::Acquire,");
        w.dedent();
        w.line(")");
        w.line(".is_ok()");
        w.dedent();
    });
}

/// Identifier of an owner's virtual table cell.
pub fn vtable_cell_ident(owner: &TypeRef) -> String {
    static_ident(&format!("{}_VTABLE", owner.name()))
}

/// Emit the virtual table cell declaration of an owner struct.
pub fn emit_vtable_cell(w: &mut CodeWriter, owner: &TypeRef) {
    w.line(format!(
        "static {}: {ATOMIC_USIZE} = {ATOMIC_USIZE}::new(0);",
        vtable_cell_ident(owner)
    ));
}

/// Emit the owner's virtual table accessors (inside its `impl` block).
pub fn emit_vtable_accessors(
    w: &mut CodeWriter,
    owner: &TypeRef,
    descriptor: Option<&StaticAddressDescriptor>,
) {
    if let Some(descriptor) = descriptor {
        w.line(format!(
            "pub const VTABLE_SIGNATURE: {STATIC_ADDRESS_TYPE} = {};",
            descriptor.render()
        ));
        w.blank();
    }
    emit_cell_accessors(
        w,
        &vtable_cell_ident(owner),
        "vtable_address",
        "set_vtable_address",
        false,
    );
}

/// Everything the root `resolution` module wires together.
#[derive(Debug, Default)]
pub struct ResolutionIndex<'a> {
    /// Owners carrying a `VTABLE_SIGNATURE`.
    pub vtables: Vec<&'a TypeRef>,
    pub functions: Vec<&'a FunctionDecl>,
}

/// Emit the root `resolution` module.
pub fn emit_resolution_module(w: &mut CodeWriter, index: &ResolutionIndex<'_>) {
    w.block("pub mod resolution", |w| {
        emit_runtime_types(w);

        w.blank();
        w.line("/// Resolve every virtual table address. Returns the number of tables set.");
        w.block(
            "pub fn resolve_vtables(resolver: StaticAddressResolver) -> usize",
            |w| {
                w.line("let mut resolved = 0;");
                for owner in &index.vtables {
                    w.block(
                        format!("if let Some(address) = resolver(&{owner}::VTABLE_SIGNATURE)"),
                        |w| {
                            w.line(format!(
                                "resolved += usize::from({owner}::set_vtable_address(address));"
                            ));
                        },
                    );
                }
                w.line("resolved");
            },
        );

        w.blank();
        w.block(
            "pub fn resolve_member_functions(resolver: SignatureResolver) -> usize",
            |w| {
                w.line("let mut resolved = 0;");
                for function in &index.functions {
                    if let Binding::Signature(_) = function.binding() {
                        let path = function.path();
                        w.block(
                            format!("if let Some(address) = resolver(&{path}::SIGNATURE)"),
                            |w| {
                                w.line(format!("resolved += usize::from({path}.set_address(address));"));
                            },
                        );
                    }
                }
                w.line("resolved");
            },
        );

        w.blank();
        w.block(
            "pub fn resolve_static_addresses(resolver: StaticAddressResolver) -> usize",
            |w| {
                w.line("let mut resolved = 0;");
                for function in &index.functions {
                    if let Binding::StaticAddress(_) = function.binding() {
                        let path = function.path();
                        w.block(
                            format!("if let Some(address) = resolver(&{path}::STATIC_ADDRESS)"),
                            |w| {
                                w.line(format!("resolved += usize::from({path}.set_address(address));"));
                            },
                        );
                    }
                }
                w.line("resolved");
            },
        );

        w.blank();
        w.line("/// Resolve virtual functions from their owners' table addresses.");
        w.line("///");
        w.line("/// # Safety");
        w.line("/// Every resolved table address must point to a readable virtual table.");
        w.block("pub unsafe fn resolve_virtual_functions() -> usize", |w| {
            w.line("let mut resolved = 0;");
            for function in &index.functions {
                if function.is_virtual() {
                    let owner = function.owner();
                    let path = function.path();
                    w.block(
                        format!("if let Some(vtable) = {owner}::vtable_address()"),
                        |w| {
                            w.line(format!(
                                "resolved += usize::from({path}.resolve_from_vtable(vtable));"
                            ));
                        },
                    );
                }
            }
            w.line("resolved");
        });

        w.blank();
        w.line("/// # Safety");
        w.line("/// See [`resolve_virtual_functions`].");
        w.block(
            "pub unsafe fn resolve_all(signatures: SignatureResolver, static_addresses: StaticAddressResolver) -> usize",
            |w| {
                w.line("resolve_vtables(static_addresses)");
                w.indent();
                w.line("+ resolve_member_functions(signatures)");
                w.line("+ resolve_static_addresses(static_addresses)");
                w.line("+ resolve_virtual_functions()");
                w.dedent();
            },
        );
    });
}

fn emit_runtime_types(w: &mut CodeWriter) {
    w.line("#[derive(Copy, Clone, Debug)]");
    w.block("pub struct Signature", |w| {
        w.line("pub pattern: &'static str,");
        w.line("pub bytes: &'static [u8],");
        w.line("pub mask: &'static [bool],");
    });
    w.blank();
    w.block("impl Signature", |w| {
        w.block(
            "pub const fn new(pattern: &'static str, bytes: &'static [u8], mask: &'static [bool]) -> Self",
            |w| w.line("Self { pattern, bytes, mask }"),
        );
    });
    w.blank();
    w.line("#[derive(Copy, Clone, Debug)]");
    w.block("pub struct StaticAddressSignature", |w| {
        w.line("pub signature: Signature,");
        w.line("pub offset: isize,");
        w.line("pub is_pointer: bool,");
    });
    w.blank();
    w.block("impl StaticAddressSignature", |w| {
        w.block(
            "pub const fn new(signature: Signature, offset: isize, is_pointer: bool) -> Self",
            |w| {
                w.line("Self {");
                w.indent();
                w.line("signature,");
                w.line("offset,");
                w.line("is_pointer,");
                w.dedent();
                w.line("}");
            },
        );
    });
    w.blank();
    w.line("/// Scans for a byte pattern and returns the matching function address.");
    w.line("pub type SignatureResolver = fn(&Signature) -> Option<usize>;");
    w.line("/// Scans for a byte pattern and returns the static address it locates.");
    w.line("pub type StaticAddressResolver = fn(&StaticAddressSignature) -> Option<usize>;");
}
