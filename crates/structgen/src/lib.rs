// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Struct layout exporter
//!
//! Translates externally described type layouts (structs, unions and enums
//! with explicit byte offsets) into Rust declarations with a fixed
//! representation, plus lazily resolved trampolines for native functions.
//!
//! # Features
//!
//! - **Layout reconstruction**: gap padding and union synthesis for shared
//!   offsets, with overrun diagnostics
//! - **Copy analysis**: fixed-point copy-taint propagation deciding which
//!   types derive `Copy`
//! - **Function scaffolding**: address cells, setters and call trampolines
//!   resolved from byte patterns or virtual tables
//!
//! # Quick Start
//!
//! ```bash
//! structgen-export --metadata types.json --output generated.rs
//!
//! # With a configuration file
//! structgen-export --config structgen.toml --metadata types.json
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! revision = "2024.06.01"
//!
//! [[namespaces]]
//! source = "FFXIVClientStructs.FFXIV"
//! target = ["ffxiv"]
//!
//! [[field_exclusions]]
//! owner = "FFXIVClientStructs.FFXIV.Client.Graphics.Scene.Human"
//! field = "EquipSlotData"
//! ```

pub mod config;
pub mod emit;
pub mod enums;
pub mod error;
pub mod export;
pub mod function;
pub mod graph;
pub mod layout;
pub mod metadata;
pub mod module;
pub mod naming;
pub mod primitive;
pub mod registry;
pub mod structs;
pub mod taint;
pub mod type_ref;

pub use config::{ExportConfig, ExternalType, FieldExclusion, NamespaceMapping};
pub use error::{ConfigError, Diagnostic, ExportError, Result};
pub use export::{export, ExportContext, ExportOutput, ExportReport, Exporter};
pub use metadata::{MetadataDocument, TypeLibrary, TypeMetadata};
pub use registry::{Registry, TypeDecl};
pub use type_ref::TypeRef;
