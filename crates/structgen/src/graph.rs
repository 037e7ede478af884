// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type-graph construction.
//!
//! [`TypeGraph::ensure_metadata`] registers a described type after first
//! registering everything it structurally depends on: member types, pointer
//! targets, array elements, generic arguments and function signatures.
//! Types already registered, or currently being built further up the stack,
//! resolve to their reference without being built again, which cuts cycles
//! through pointers.

use crate::config::ExportConfig;
use crate::enums::{underlying_of, EnumDecl};
use crate::error::{ExportError, Result};
use crate::export::ExportContext;
use crate::function::{Binding, FunctionDecl, Param, Signature, StaticAddressDescriptor};
use crate::layout::{self, FieldSlot};
use crate::metadata::{
    FunctionBinding, LayoutKind, Shape, StaticAddressMetadata, TypeCategory, TypeLibrary,
    TypeMetadata,
};
use crate::naming::{safe_snake_case, type_ident};
use crate::primitive::{
    builtin_primitives, opaque_pointer, phantom_of, scalar_ref, void_ref, PrimitiveDecl,
};
use crate::registry::TypeDecl;
use crate::structs::{Member, MemberKind, StructDecl};
use crate::type_ref::TypeRef;
use std::collections::HashMap;

/// Storage size of every pointer.
pub const POINTER_SIZE: usize = 8;

/// A resolved shape: its target reference and effective storage size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub ty: TypeRef,
    pub size: usize,
}

/// Where a source name lands in the generated crate.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    modules: Vec<String>,
    ident: String,
    export: bool,
}

impl Target {
    fn type_ref(&self) -> TypeRef {
        TypeRef::local(&self.modules, self.ident.clone())
    }
}

/// Builds declarations from a [`TypeLibrary`] into an [`ExportContext`].
pub struct TypeGraph<'a> {
    library: &'a TypeLibrary,
    config: &'a ExportConfig,
    ctx: &'a mut ExportContext,
    in_progress: Vec<String>,
    /// Closed instantiations by registry key: source name and arguments.
    instantiations: HashMap<String, (String, Vec<TypeRef>)>,
}

impl<'a> TypeGraph<'a> {
    pub fn new(
        library: &'a TypeLibrary,
        config: &'a ExportConfig,
        ctx: &'a mut ExportContext,
    ) -> Self {
        Self {
            library,
            config,
            ctx,
            in_progress: Vec::new(),
            instantiations: HashMap::new(),
        }
    }

    /// Register the primitive catalog and the configured external types.
    pub fn populate_primitives(&mut self) -> Result<()> {
        for primitive in builtin_primitives() {
            self.register_primitive(primitive)?;
        }

        for external in &self.config.external_types {
            let target = TypeRef::parse(&external.target)?;
            let primitive = if target.generics().is_some() {
                PrimitiveDecl::wrapper(target)
            } else {
                PrimitiveDecl::new(target)
            };
            let primitive = if external.copy_tainted {
                primitive.tainted()
            } else {
                primitive
            };
            self.register_primitive(primitive)?;
        }

        Ok(())
    }

    fn register_primitive(&mut self, primitive: PrimitiveDecl) -> Result<()> {
        if self.ctx.registry.contains(&primitive.canonical_name()) {
            return Ok(());
        }
        self.ctx.registry.register(TypeDecl::Primitive(primitive))
    }

    /// Types that become declarations: exported namespace, and either an
    /// enum or a type with an explicit or sequential layout.
    pub fn is_candidate(&self, meta: &TypeMetadata) -> bool {
        let exported = self
            .config
            .namespace_for(&meta.name)
            .is_some_and(|mapping| mapping.export);
        exported && (meta.is_enum() || meta.layout != LayoutKind::Auto)
    }

    /// Ensure every candidate of the library. Returns the number of
    /// candidates visited.
    pub fn ensure_all(&mut self) -> Result<usize> {
        let library = self.library;
        let mut visited = 0;
        for meta in library.types() {
            if self.ensure_metadata(meta)?.is_some() {
                visited += 1;
            }
        }
        Ok(visited)
    }

    /// Ensure the definition named `name`.
    pub fn ensure_named(&mut self, name: &str) -> Result<Option<TypeRef>> {
        let library = self.library;
        let meta = library
            .definition(name)
            .ok_or_else(|| ExportError::UnknownType {
                name: name.to_string(),
                context: "export root".to_string(),
            })?;
        self.ensure_metadata(meta)
    }

    /// Ensure one described type. Returns `None` for non-candidates.
    pub fn ensure_metadata(&mut self, meta: &TypeMetadata) -> Result<Option<TypeRef>> {
        if !self.is_candidate(meta) {
            tracing::debug!("Skipping {} (not exported)", meta.name);
            return Ok(None);
        }

        if meta.is_open_generic() {
            let target = self.target_of(&meta.name).ok_or_else(|| unsupported(&meta.name, &meta.name))?;
            return self.ensure_open_generic(meta, &target).map(Some);
        }

        self.reference_named(&meta.name, &meta.args, &meta.name)
            .map(Some)
    }

    /// Resolve a field, parameter or return shape, ensuring every type it
    /// names.
    pub fn resolve_shape(&mut self, shape: &Shape, context: &str) -> Result<Resolved> {
        let (inner, depth) = shape.peel_pointers();
        if depth > 2 {
            tracing::debug!("Pointer depth {} in {}", depth, context);
        }

        match inner {
            Shape::Void => Ok(Resolved {
                ty: void_ref(depth),
                size: if depth > 0 { POINTER_SIZE } else { 0 },
            }),
            Shape::Scalar { scalar } => {
                let ty =
                    scalar_ref(*scalar, depth).ok_or_else(|| unsupported(context, shape))?;
                let size = if depth > 0 {
                    POINTER_SIZE
                } else {
                    scalar.size()
                };
                Ok(Resolved { ty, size })
            }
            Shape::Named { name, args } => self.resolve_named(name, args, depth, context),
            Shape::Param { .. } | Shape::Pointer { .. } => Err(unsupported(context, shape)),
        }
    }

    fn resolve_named(
        &mut self,
        name: &str,
        args: &[Shape],
        depth: usize,
        context: &str,
    ) -> Result<Resolved> {
        if self.config.is_pointer_wrapper(name) {
            let [pointee] = args else {
                return Err(unsupported(context, name));
            };
            let inner = self.resolve_shape(pointee, context)?;
            if inner.ty.array_len().is_some() {
                return Err(unsupported(context, name));
            }
            let total = inner.ty.pointer_depth() + depth + 1;
            return Ok(Resolved {
                ty: inner.ty.with_pointer_depth(total),
                size: POINTER_SIZE,
            });
        }

        if self.config.external_type(name).is_none() && self.target_of(name).is_none() {
            if depth > 0 {
                tracing::debug!("Unmapped pointee {} in {}, using c_void", name, context);
                return Ok(Resolved {
                    ty: opaque_pointer(depth),
                    size: POINTER_SIZE,
                });
            }
            return Err(unsupported(context, name));
        }

        let ty = self.reference_named(name, args, context)?;
        let size = if depth > 0 {
            POINTER_SIZE
        } else {
            self.named_size(name, args, context)?
        };
        Ok(Resolved {
            ty: ty.with_pointer_depth(depth),
            size,
        })
    }

    /// Reference to a named type, ensuring its declaration.
    fn reference_named(&mut self, name: &str, args: &[Shape], context: &str) -> Result<TypeRef> {
        let library = self.library;

        if let Some(external) = self.config.external_type(name) {
            return TypeRef::parse(&external.target);
        }

        let target = self
            .target_of(name)
            .ok_or_else(|| unsupported(context, name))?;

        if !target.export {
            let ty = if args.is_empty() {
                target.type_ref()
            } else {
                let resolved = self.resolve_args(args, context)?;
                target.type_ref().with_generics(resolved)
            };
            self.register_primitive(PrimitiveDecl::new(ty.clone().erased()))?;
            return Ok(ty);
        }

        if args.is_empty() {
            let meta = library.definition(name).ok_or_else(|| unknown(name, context))?;
            let ty = target.type_ref();
            if self.is_candidate(meta) {
                self.ensure_as(meta, ty.clone())?;
            }
            return Ok(ty);
        }

        let resolved = self.resolve_args(args, context)?;

        if let Some(meta) = library.instantiation(name, args) {
            let mut ident = target.ident.clone();
            for arg in &resolved {
                ident.push('_');
                ident.push_str(&arg.mangle());
            }
            let ty = TypeRef::local(&target.modules, ident);
            self.claim_instantiation(&ty, name, &resolved)?;
            if self.is_candidate(meta) {
                self.ensure_as(meta, ty.clone())?;
            }
            return Ok(ty);
        }

        let definition = library.definition(name).ok_or_else(|| unknown(name, context))?;
        if definition.generic_params.len() != args.len() {
            return Err(unsupported(context, &format!("{name} with {} arguments", args.len())));
        }
        if self.is_candidate(definition) {
            self.ensure_open_generic(definition, &target)?;
        }
        Ok(target.type_ref().with_generics(resolved))
    }

    /// Mangled names must map back to exactly one source instantiation.
    fn claim_instantiation(&mut self, ty: &TypeRef, name: &str, args: &[TypeRef]) -> Result<()> {
        let key = ty.canonical_name();
        match self.instantiations.get(&key) {
            Some((source, claimed)) if source == name && claimed.as_slice() == args => Ok(()),
            Some(_) => Err(ExportError::DuplicateRegistration {
                module: ty.module_path().join("::"),
                name: ty.name().to_string(),
            }),
            None => {
                self.instantiations
                    .insert(key, (name.to_string(), args.to_vec()));
                Ok(())
            }
        }
    }

    fn resolve_args(&mut self, args: &[Shape], context: &str) -> Result<Vec<TypeRef>> {
        args.iter()
            .map(|arg| self.resolve_shape(arg, context).map(|r| r.ty))
            .collect()
    }

    /// Storage size of a named type used by value.
    fn named_size(&self, name: &str, args: &[Shape], context: &str) -> Result<usize> {
        if let Some(size) = self.config.external_type(name).and_then(|e| e.size) {
            return Ok(size);
        }

        let meta = if args.is_empty() {
            self.library.definition(name)
        } else {
            self.library
                .instantiation(name, args)
                .or_else(|| self.library.definition(name))
        };
        let meta = meta.ok_or_else(|| unknown(name, context))?;

        if meta.is_enum() {
            return Ok(underlying_of(meta).size());
        }
        if !args.is_empty() && meta.args.is_empty() && meta.size == 0 {
            return Err(unknown(&format!("{name} instantiation"), context));
        }
        Ok(meta.size)
    }

    fn target_of(&self, name: &str) -> Option<Target> {
        let mapping = self.config.namespace_for(name)?;
        let rest = mapping.strip(name)?;

        let mut parts: Vec<&str> = rest.split('.').collect();
        let last = parts.pop()?;

        let mut modules = mapping.target.clone();
        modules.extend(parts.iter().map(|part| safe_snake_case(part)));

        let mut ident = type_ident(last);
        if let Some(prefix) = &mapping.strip_type_prefix {
            if let Some(stripped) = ident.strip_prefix(prefix.as_str()) {
                if !stripped.is_empty() {
                    ident = stripped.to_string();
                }
            }
        }

        Some(Target {
            modules,
            ident,
            export: mapping.export,
        })
    }

    fn is_pending(&self, key: &str) -> bool {
        self.ctx.registry.contains(key) || self.in_progress.iter().any(|k| k == key)
    }

    fn ensure_as(&mut self, meta: &TypeMetadata, ty: TypeRef) -> Result<()> {
        let key = ty.canonical_name();
        if self.is_pending(&key) {
            return Ok(());
        }

        self.in_progress.push(key);
        let result = self.build(meta, ty);
        self.in_progress.pop();
        result
    }

    /// Placeholder `Name<T1, ..>` registered under `Name<>`.
    fn ensure_open_generic(&mut self, meta: &TypeMetadata, target: &Target) -> Result<TypeRef> {
        let params: Vec<TypeRef> = (1..=meta.generic_params.len())
            .map(|i| TypeRef::path([format!("T{i}")]))
            .collect();
        let ty = target.type_ref().with_generics(params.clone());
        let key = ty.erased_name();
        if self.is_pending(&key) {
            return Ok(ty);
        }

        let mut decl = StructDecl::new(ty.clone(), 0);
        for (i, param) in params.into_iter().enumerate() {
            decl.push_member(Member::new(
                format!("__phantom_t{}", i + 1),
                phantom_of(param),
                0,
                0,
                MemberKind::Phantom,
            ));
        }
        self.place(TypeDecl::Struct(decl))?;
        Ok(ty)
    }

    fn build(&mut self, meta: &TypeMetadata, ty: TypeRef) -> Result<()> {
        match meta.kind {
            TypeCategory::Enum => {
                let (decl, diagnostic) = EnumDecl::from_metadata(ty, meta);
                self.ctx.diagnostics.extend(diagnostic);
                self.place(TypeDecl::Enum(decl))
            }
            TypeCategory::Struct | TypeCategory::Union => self.build_struct(meta, ty),
        }
    }

    fn build_struct(&mut self, meta: &TypeMetadata, ty: TypeRef) -> Result<()> {
        let config = self.config;
        let mut slots = Vec::new();
        for field in layout::storage_fields(meta, config) {
            let context = format!("{}.{}", meta.name, field.name);
            let resolved = self.resolve_shape(&field.shape, &context)?;
            let (field_ty, size) = match field.fixed_length {
                Some(len) => {
                    let size = resolved.size.checked_mul(len).ok_or_else(|| {
                        invalid(&context, format!("{} x {len} bytes overflows", resolved.size))
                    })?;
                    (resolved.ty.with_array_len(len), size)
                }
                None => (resolved.ty, resolved.size),
            };
            // Also covers the smallest union a shared offset may need.
            if field.offset.checked_add(size.max(layout::MIN_UNION_SIZE)).is_none() {
                return Err(invalid(
                    &context,
                    format!("offset 0x{:x} + 0x{size:x} bytes overflows", field.offset),
                ));
            }
            slots.push(FieldSlot {
                name: field.name.clone(),
                ty: field_ty,
                offset: field.offset,
                size,
            });
        }

        let mut decl = if slots.is_empty() && meta.size > 0 {
            StructDecl::new_opaque(ty.clone(), meta.size)
        } else if meta.kind == TypeCategory::Union {
            layout::union_layout(ty.clone(), &slots, meta.size)
        } else {
            let plan = layout::reconstruct(&ty, meta.size, slots, config);
            self.ctx.diagnostics.extend(plan.diagnostics);
            for union in plan.unions {
                self.place(TypeDecl::Struct(union))?;
            }
            let mut decl = StructDecl::new(ty.clone(), meta.size);
            decl.set_members(plan.members);
            decl
        };

        decl.set_functions(self.build_functions(meta, &ty)?);
        let vtable = match &meta.vtable {
            Some(vtable) => Some(static_address(&meta.name, vtable)?),
            None => None,
        };
        decl.set_vtable(vtable);

        self.place(TypeDecl::Struct(decl))
    }

    fn build_functions(&mut self, meta: &TypeMetadata, owner: &TypeRef) -> Result<Vec<FunctionDecl>> {
        let mut functions = Vec::new();
        let mut overloads: HashMap<&str, usize> = HashMap::new();

        for function in &meta.functions {
            let Some(binding) = &function.binding else {
                continue;
            };
            if function.deprecated {
                continue;
            }

            let context = format!("{}.{}", meta.name, function.name);
            let binding = match binding {
                FunctionBinding::MemberFunction { signature } => {
                    Binding::Signature(Signature::parse(&context, signature)?)
                }
                FunctionBinding::VirtualFunction { index } => Binding::VirtualIndex(*index),
                FunctionBinding::StaticAddress(descriptor) => {
                    Binding::StaticAddress(static_address(&context, descriptor)?)
                }
            };

            let mut params = Vec::with_capacity(function.params.len());
            for param in &function.params {
                params.push(Param {
                    name: param.name.clone(),
                    ty: self.resolve_shape(&param.shape, &context)?.ty,
                });
            }
            let returns = self.resolve_shape(&function.returns, &context)?.ty;

            let overload = overloads.entry(function.name.as_str()).or_insert(0);
            functions.push(FunctionDecl::new(
                owner.clone(),
                function.name.clone(),
                *overload,
                binding,
                params,
                returns,
                function.is_static,
            )?);
            *overload += 1;
        }

        Ok(functions)
    }

    /// Register a declaration and claim its name in the owning module.
    fn place(&mut self, decl: TypeDecl) -> Result<()> {
        let type_ref = decl.type_ref();
        let key = decl.key();
        self.ctx
            .root
            .module_mut(&type_ref.module_path())?
            .add_decl(type_ref.name(), key)?;
        self.ctx.registry.register(decl)
    }
}

fn static_address(owner: &str, meta: &StaticAddressMetadata) -> Result<StaticAddressDescriptor> {
    Ok(StaticAddressDescriptor {
        signature: Signature::parse(owner, &meta.signature)?,
        offset: meta.offset,
        is_pointer: meta.is_pointer,
    })
}

fn unsupported(context: &str, shape: impl ToString) -> ExportError {
    ExportError::UnsupportedShape {
        context: context.to_string(),
        shape: shape.to_string(),
    }
}

fn invalid(context: &str, reason: String) -> ExportError {
    ExportError::InvalidMetadata {
        context: context.to_string(),
        reason,
    }
}

fn unknown(name: &str, context: &str) -> ExportError {
    ExportError::UnknownType {
        name: name.to_string(),
        context: context.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NamespaceMapping;
    use crate::metadata::{FieldMetadata, Scalar};

    fn config() -> ExportConfig {
        let mut config = ExportConfig::for_namespace("App", &["app"]);
        config.namespaces.push(
            NamespaceMapping::new("App.STD", &["cpp_std"])
                .external()
                .strip_prefix("Std"),
        );
        config
    }

    fn with_graph<T>(
        types: Vec<TypeMetadata>,
        run: impl FnOnce(&mut TypeGraph<'_>) -> T,
    ) -> (T, ExportContext) {
        let library = TypeLibrary::new(types);
        let config = config();
        let mut ctx = ExportContext::default();
        let out = {
            let mut graph = TypeGraph::new(&library, &config, &mut ctx);
            graph.populate_primitives().expect("primitives");
            run(&mut graph)
        };
        (out, ctx)
    }

    #[test]
    fn test_target_mapping() {
        let ((), _) = with_graph(Vec::new(), |graph| {
            let target = graph.target_of("App.Client.UI.AddonText+Line").expect("target");
            assert_eq!(target.modules, vec!["app", "client", "ui"]);
            assert_eq!(target.ident, "AddonText_Line");
            assert!(target.export);

            let target = graph.target_of("App.STD.StdVector`1").expect("target");
            assert_eq!(target.type_ref().to_string(), "crate::cpp_std::Vector");
            assert!(!target.export);

            assert!(graph.target_of("System.Object").is_none());
        });
    }

    #[test]
    fn test_self_pointer_cycle() {
        let node = TypeMetadata::new_struct("App.Node", 0x10).with_fields(vec![
            FieldMetadata::new("Next", Shape::pointer(Shape::named("App.Node")), 0),
            FieldMetadata::new("Value", Shape::scalar(Scalar::Int32), 8),
        ]);
        let (result, ctx) = with_graph(vec![node], |graph| graph.ensure_named("App.Node"));
        let ty = result.expect("ensure").expect("candidate");
        assert_eq!(ty.to_string(), "crate::app::Node");

        let decl = ctx
            .registry
            .get("crate::app::Node")
            .and_then(TypeDecl::as_struct)
            .expect("node");
        assert_eq!(decl.members()[0].ty.to_string(), "*mut crate::app::Node");
        assert_eq!(decl.members().len(), 3);
    }

    #[test]
    fn test_unmapped_pointee_becomes_c_void() {
        let holder = TypeMetadata::new_struct("App.Holder", 8).with_fields(vec![
            FieldMetadata::new("Obj", Shape::pointer(Shape::named("System.Object")), 0),
        ]);
        let (result, ctx) = with_graph(vec![holder.clone()], |graph| graph.ensure_named("App.Holder"));
        result.expect("ensure");
        let decl = ctx
            .registry
            .get("crate::app::Holder")
            .and_then(TypeDecl::as_struct)
            .expect("holder");
        assert_eq!(decl.members()[0].ty.to_string(), "*mut std::ffi::c_void");

        let by_value = TypeMetadata::new_struct("App.Holder", 8).with_fields(vec![
            FieldMetadata::new("Obj", Shape::named("System.Object"), 0),
        ]);
        let (result, _) = with_graph(vec![by_value], |graph| graph.ensure_named("App.Holder"));
        assert!(matches!(result, Err(ExportError::UnsupportedShape { .. })));
    }

    #[test]
    fn test_unsupported_scalar_depth_is_fatal() {
        let bad = TypeMetadata::new_struct("App.Bad", 8).with_fields(vec![FieldMetadata::new(
            "Deep",
            Shape::pointer(Shape::pointer(Shape::scalar(Scalar::Single))),
            0,
        )]);
        let (result, _) = with_graph(vec![bad], |graph| graph.ensure_named("App.Bad"));
        assert!(matches!(result, Err(ExportError::UnsupportedShape { .. })));
    }

    #[test]
    fn test_generic_placeholder_and_instantiation() {
        let mut open = TypeMetadata::new_struct("App.Pair`2", 0);
        open.generic_params = vec!["TKey".into(), "TValue".into()];
        let mut closed = TypeMetadata::new_struct("App.Pair`2", 8).with_fields(vec![
            FieldMetadata::new("Key", Shape::scalar(Scalar::Int32), 0),
            FieldMetadata::new("Value", Shape::scalar(Scalar::Single), 4),
        ]);
        closed.args = vec![Shape::scalar(Scalar::Int32), Shape::scalar(Scalar::Single)];
        let holder = TypeMetadata::new_struct("App.Holder", 0x10).with_fields(vec![
            FieldMetadata::new(
                "Known",
                Shape::generic(
                    "App.Pair`2",
                    vec![Shape::scalar(Scalar::Int32), Shape::scalar(Scalar::Single)],
                ),
                0,
            ),
            FieldMetadata::new(
                "Other",
                Shape::pointer(Shape::generic(
                    "App.Pair`2",
                    vec![Shape::scalar(Scalar::Byte), Shape::scalar(Scalar::Byte)],
                )),
                8,
            ),
        ]);

        let (result, ctx) = with_graph(vec![open, closed, holder], |graph| {
            graph.ensure_named("App.Holder")
        });
        result.expect("ensure");

        let holder = ctx
            .registry
            .get("crate::app::Holder")
            .and_then(TypeDecl::as_struct)
            .expect("holder");
        assert_eq!(holder.members()[0].ty.to_string(), "crate::app::Pair_i32_f32");
        assert_eq!(holder.members()[1].ty.to_string(), "*mut crate::app::Pair<u8, u8>");

        let placeholder = ctx
            .registry
            .get("crate::app::Pair<>")
            .and_then(TypeDecl::as_struct)
            .expect("placeholder");
        assert!(placeholder.is_open_generic());
        assert_eq!(placeholder.type_ref().decl_name(), "Pair<T1, T2>");
        assert!(ctx.registry.contains("crate::app::Pair_i32_f32"));
    }

    #[test]
    fn test_external_namespace_registers_primitive() {
        let mut vector = TypeMetadata::new_struct("App.STD.StdVector`1", 24);
        vector.args = vec![Shape::scalar(Scalar::UInt32)];
        let holder = TypeMetadata::new_struct("App.Holder", 24).with_fields(vec![
            FieldMetadata::new(
                "Items",
                Shape::generic("App.STD.StdVector`1", vec![Shape::scalar(Scalar::UInt32)]),
                0,
            ),
        ]);

        let (result, ctx) = with_graph(vec![vector, holder], |graph| graph.ensure_named("App.Holder"));
        result.expect("ensure");
        let holder = ctx
            .registry
            .get("crate::app::Holder")
            .and_then(TypeDecl::as_struct)
            .expect("holder");
        assert_eq!(holder.members()[0].ty.to_string(), "crate::cpp_std::Vector<u32>");
        assert_eq!(holder.members().len(), 1);
        assert!(ctx.root.find(&["cpp_std".to_string()]).is_none());
    }

    #[test]
    fn test_auto_layout_is_skipped() {
        let mut auto = TypeMetadata::new_struct("App.Managed", 8);
        auto.layout = LayoutKind::Auto;
        let (result, ctx) = with_graph(vec![auto], |graph| graph.ensure_named("App.Managed"));
        assert!(result.expect("ensure").is_none());
        assert!(!ctx.registry.contains("crate::app::Managed"));
    }

    #[test]
    fn test_overflowing_extents_are_invalid_metadata() {
        let mut huge = FieldMetadata::new("Table", Shape::scalar(Scalar::Int32), 0);
        huge.fixed_length = Some(usize::MAX / 2);
        let array = TypeMetadata::new_struct("App.Table", 8).with_fields(vec![huge]);
        let (result, _) = with_graph(vec![array], |graph| graph.ensure_named("App.Table"));
        assert!(matches!(result, Err(ExportError::InvalidMetadata { .. })));

        let far = TypeMetadata::new_struct("App.Far", 8).with_fields(vec![FieldMetadata::new(
            "Tail",
            Shape::scalar(Scalar::Int32),
            usize::MAX - 2,
        )]);
        let (result, _) = with_graph(vec![far], |graph| graph.ensure_named("App.Far"));
        assert!(matches!(result, Err(ExportError::InvalidMetadata { .. })));
    }

    #[test]
    fn test_instantiation_name_claimed_once() {
        let ((), _) = with_graph(Vec::new(), |graph| {
            let ty = TypeRef::local(&["app".to_string()], "Box_app_a_Foo");
            let args = vec![TypeRef::local(&["app".to_string(), "a".to_string()], "Foo")];
            let other = vec![TypeRef::local(&["app".to_string()], "a_Foo")];

            graph.claim_instantiation(&ty, "App.Box`1", &args).expect("first claim");
            graph.claim_instantiation(&ty, "App.Box`1", &args).expect("same claim");
            assert!(matches!(
                graph.claim_instantiation(&ty, "App.Box`1", &other),
                Err(ExportError::DuplicateRegistration { .. })
            ));
            assert!(matches!(
                graph.claim_instantiation(&ty, "App.Crate`1", &args),
                Err(ExportError::DuplicateRegistration { .. })
            ));
        });
    }
}
