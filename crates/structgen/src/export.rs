// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Export driver.
//!
//! One run owns one [`ExportContext`]: primitives are registered first, then
//! every candidate of the library is ensured, the copy-taint fixed point runs
//! over the complete registry, and finally the module tree is serialized
//! depth-first.

use crate::config::ExportConfig;
use crate::emit::CodeWriter;
use crate::error::{Diagnostic, Result};
use crate::function::{self, ResolutionIndex};
use crate::graph::TypeGraph;
use crate::metadata::TypeLibrary;
use crate::module::{Module, ModuleMember};
use crate::registry::{Registry, TypeDecl};
use crate::taint::{self, TaintSet};

/// Lints the generated names trip by construction.
const MODULE_ALLOWS: &str =
    "#[allow(non_camel_case_types, non_snake_case, non_upper_case_globals, dead_code)]";

/// State of one export run.
#[derive(Debug, Default)]
pub struct ExportContext {
    pub registry: Registry,
    pub root: Module,
    pub taint: TaintSet,
    pub diagnostics: Vec<Diagnostic>,
    /// Newly tainted declarations per propagation pass.
    pub taint_passes: Vec<usize>,
}

/// Summary of an export run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Declarations in the registry, primitives included.
    pub registered: usize,
    /// Declarations written to the output.
    pub emitted: usize,
    /// Copy-tainted declarations, seeds included.
    pub tainted: usize,
    pub taint_passes: Vec<usize>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub text: String,
    pub report: ExportReport,
}

/// Runs the export pipeline over one library.
pub struct Exporter<'a> {
    library: &'a TypeLibrary,
    config: &'a ExportConfig,
}

impl<'a> Exporter<'a> {
    pub fn new(library: &'a TypeLibrary, config: &'a ExportConfig) -> Self {
        Self { library, config }
    }

    /// Build the registry and run the taint analysis.
    pub fn build(&self) -> Result<ExportContext> {
        self.config.validate()?;

        let mut ctx = ExportContext::default();
        {
            let mut graph = TypeGraph::new(self.library, self.config, &mut ctx);
            graph.populate_primitives()?;
            let visited = graph.ensure_all()?;
            tracing::info!("Ensured {} candidate types", visited);
        }
        tracing::info!("Registered {} declarations", ctx.registry.len());

        ctx.taint = TaintSet::seeded(&ctx.registry);
        ctx.taint_passes = taint::propagate(&mut ctx.registry, &mut ctx.taint);

        Ok(ctx)
    }

    /// Serialize a built context.
    pub fn emit(&self, ctx: &ExportContext) -> String {
        let mut w = CodeWriter::new(self.config.indent_width);

        if let Some(revision) = &self.config.revision {
            w.line(format!("// rev: {revision}"));
            w.blank();
        }

        let mut first = true;
        for (_, member) in ctx.root.members() {
            match member {
                ModuleMember::Module(module) if module.is_effectively_empty() => continue,
                ModuleMember::Module(module) => {
                    separate(&mut w, &mut first);
                    w.line(MODULE_ALLOWS);
                    self.emit_module(&mut w, ctx, module);
                }
                ModuleMember::Decl(key) => {
                    separate(&mut w, &mut first);
                    self.emit_decl(&mut w, ctx, key);
                }
            }
        }

        separate(&mut w, &mut first);
        w.line(MODULE_ALLOWS);
        function::emit_resolution_module(&mut w, &resolution_index(&ctx.registry));

        w.finish()
    }

    /// Build and emit.
    pub fn run(&self) -> Result<ExportOutput> {
        let ctx = self.build()?;
        let text = self.emit(&ctx);
        let report = ExportReport {
            registered: ctx.registry.len(),
            emitted: ctx.registry.iter().filter(|d| d.is_emitted()).count(),
            tainted: ctx.taint.len(),
            taint_passes: ctx.taint_passes.clone(),
            diagnostics: ctx.diagnostics.clone(),
        };
        tracing::info!(
            "Exported {} declarations ({} diagnostics)",
            report.emitted,
            report.diagnostics.len()
        );
        Ok(ExportOutput { text, report })
    }

    fn emit_module(&self, w: &mut CodeWriter, ctx: &ExportContext, module: &Module) {
        w.block(format!("pub mod {}", module.name()), |w| {
            let mut first = true;
            for (_, member) in module.members() {
                match member {
                    ModuleMember::Module(child) if child.is_effectively_empty() => continue,
                    ModuleMember::Module(child) => {
                        separate(w, &mut first);
                        self.emit_module(w, ctx, child);
                    }
                    ModuleMember::Decl(key) => {
                        separate(w, &mut first);
                        self.emit_decl(w, ctx, key);
                    }
                }
            }
        });
    }

    fn emit_decl(&self, w: &mut CodeWriter, ctx: &ExportContext, key: &str) {
        match ctx.registry.get(key) {
            Some(TypeDecl::Struct(decl)) => {
                let derive = decl.derive(
                    ctx.taint.contains(key),
                    self.config.suppresses_derive(key),
                );
                decl.emit(w, derive);
            }
            Some(TypeDecl::Enum(decl)) => decl.emit(w),
            Some(TypeDecl::Primitive(_)) | None => {
                tracing::debug!("Module entry {} has no emitted declaration", key);
            }
        }
    }
}

fn separate(w: &mut CodeWriter, first: &mut bool) {
    if !*first {
        w.blank();
    }
    *first = false;
}

/// Vtable owners and functions, ordered by owner key.
fn resolution_index(registry: &Registry) -> ResolutionIndex<'_> {
    let mut structs: Vec<_> = registry.iter().filter_map(TypeDecl::as_struct).collect();
    structs.sort_by_key(|decl| decl.key());

    let mut index = ResolutionIndex::default();
    for decl in structs {
        if decl.vtable().is_some() {
            index.vtables.push(decl.type_ref());
        }
        index.functions.extend(decl.functions());
    }
    index
}

/// Export `library` with `config` in one call.
pub fn export(library: &TypeLibrary, config: &ExportConfig) -> Result<ExportOutput> {
    Exporter::new(library, config).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{FieldMetadata, Scalar, Shape, TypeMetadata};

    #[test]
    fn test_revision_header_and_resolution_module() {
        let mut config = ExportConfig::for_namespace("App", &["app"]);
        config.revision = Some("deadbeef".into());
        let library = TypeLibrary::new(vec![TypeMetadata::new_struct("App.Empty", 4)
            .with_fields(vec![FieldMetadata::new("X", Shape::scalar(Scalar::Int32), 0)])]);

        let output = export(&library, &config).expect("export");
        assert!(output.text.starts_with("// rev: deadbeef\n\n"));
        assert!(output.text.contains("pub mod app {"));
        assert!(output.text.contains("pub mod resolution {"));
        assert_eq!(output.report.emitted, 1);
        assert_eq!(output.report.taint_passes, vec![0]);
    }

    #[test]
    fn test_empty_modules_are_not_emitted() {
        let config = ExportConfig::for_namespace("App", &["app"]);
        let mut ctx = ExportContext::default();
        ctx.root
            .module_mut(&["app".to_string(), "nothing".to_string()])
            .expect("module");
        let library = TypeLibrary::default();
        let text = Exporter::new(&library, &config).emit(&ctx);
        assert!(!text.contains("pub mod app"));
        assert!(text.contains("pub mod resolution"));
    }

    #[test]
    fn test_invalid_config_aborts() {
        let mut config = ExportConfig::for_namespace("App", &["app"]);
        config.indent_width = 0;
        let library = TypeLibrary::default();
        assert!(export(&library, &config).is_err());
    }
}
