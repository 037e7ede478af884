// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Export configuration.
//!
//! Supports both programmatic and file-based configuration. The defaults
//! describe the FFXIVClientStructs type library; a TOML file can replace any
//! table.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Mapping of one source namespace onto a generated module root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMapping {
    /// Dotted source namespace prefix (`FFXIVClientStructs.FFXIV`).
    pub source: String,

    /// Module path the namespace maps to (`ffxiv`, `cpp_std`). Empty maps
    /// straight to the crate root.
    #[serde(default)]
    pub target: Vec<String>,

    /// Whether types under this namespace are exported. Non-exported
    /// namespaces are provided by the runtime crate and only referenced.
    #[serde(default = "default_true")]
    pub export: bool,

    /// Prefix removed from type names (`StdVector` -> `Vector`).
    #[serde(default)]
    pub strip_type_prefix: Option<String>,
}

impl NamespaceMapping {
    pub fn new(source: impl Into<String>, target: &[&str]) -> Self {
        Self {
            source: source.into(),
            target: target.iter().map(|s| (*s).to_string()).collect(),
            export: true,
            strip_type_prefix: None,
        }
    }

    #[must_use]
    pub fn external(mut self) -> Self {
        self.export = false;
        self
    }

    #[must_use]
    pub fn strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.strip_type_prefix = Some(prefix.into());
        self
    }

    /// Remainder of `name` after this namespace, if it matches.
    pub fn strip<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_prefix(self.source.as_str())?.strip_prefix('.')
    }
}

/// Field suppressed from one owner's layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldExclusion {
    /// Source name of the owning type.
    pub owner: String,
    /// Source field name.
    pub field: String,
}

/// Source type provided by the runtime crate under a fixed target path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalType {
    /// Source type name (`System.Numerics.Vector3`).
    pub source: String,
    /// Target type reference (`crate::math::Vector3`).
    pub target: String,
    /// Target type does not implement `Copy`.
    #[serde(default)]
    pub copy_tainted: bool,
    /// Storage size, when the metadata does not describe the source type.
    #[serde(default)]
    pub size: Option<usize>,
}

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Revision recorded as the first output line (`// rev: ...`).
    #[serde(default)]
    pub revision: Option<String>,

    /// Spaces per indentation level.
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,

    /// Source namespaces and where they land.
    #[serde(default = "default_namespaces")]
    pub namespaces: Vec<NamespaceMapping>,

    /// Generic source types that are plain pointers to their argument.
    #[serde(default = "default_pointer_wrappers")]
    pub pointer_wrappers: Vec<String>,

    /// Field names marking a virtual table pointer (case-insensitive).
    #[serde(default = "default_vtable_markers")]
    pub vtable_markers: Vec<String>,

    /// Known deliberate layout exceptions.
    #[serde(default = "default_field_exclusions")]
    pub field_exclusions: Vec<FieldExclusion>,

    /// Canonical names that never receive derive attributes.
    #[serde(default = "default_no_derive")]
    pub no_derive: Vec<String>,

    /// Source types mapped onto runtime-provided types.
    #[serde(default)]
    pub external_types: Vec<ExternalType>,
}

fn default_true() -> bool {
    true
}

fn default_indent_width() -> usize {
    4
}

fn default_namespaces() -> Vec<NamespaceMapping> {
    vec![
        NamespaceMapping::new("FFXIVClientStructs.FFXIV", &["ffxiv"]),
        NamespaceMapping::new("FFXIVClientStructs.Havok", &["havok"]),
        NamespaceMapping::new("FFXIVClientStructs.STD", &["cpp_std"])
            .external()
            .strip_prefix("Std"),
        NamespaceMapping::new("FFXIVClientStructs.Interop", &[]).external(),
    ]
}

fn default_pointer_wrappers() -> Vec<String> {
    vec!["FFXIVClientStructs.Interop.Pointer`1".to_string()]
}

fn default_vtable_markers() -> Vec<String> {
    vec!["vtbl".to_string(), "vtable".to_string()]
}

fn default_field_exclusions() -> Vec<FieldExclusion> {
    // Raw byte view aliasing the individually-offset equipment slots.
    vec![FieldExclusion {
        owner: "FFXIVClientStructs.FFXIV.Client.Graphics.Scene.Human".to_string(),
        field: "EquipSlotData".to_string(),
    }]
}

fn default_no_derive() -> Vec<String> {
    [
        "crate::ffxiv::client::ui::misc::ItemOrderModule_Union",
        "crate::ffxiv::client::ui::misc::ItemOrderModule",
        "crate::ffxiv::client::system::resource::ResourceGraph_CategoryContainer",
        "crate::ffxiv::client::system::resource::ResourceGraph",
        "crate::ffxiv::component::gui::AtkStage",
        "crate::ffxiv::component::gui::AtkValue",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            revision: None,
            indent_width: default_indent_width(),
            namespaces: default_namespaces(),
            pointer_wrappers: default_pointer_wrappers(),
            vtable_markers: default_vtable_markers(),
            field_exclusions: default_field_exclusions(),
            no_derive: default_no_derive(),
            external_types: Vec::new(),
        }
    }
}

impl ExportConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration with a single exported namespace, mostly for tests and
    /// small libraries.
    pub fn for_namespace(source: impl Into<String>, target: &[&str]) -> Self {
        Self {
            namespaces: vec![NamespaceMapping::new(source, target)],
            pointer_wrappers: Vec::new(),
            field_exclusions: Vec::new(),
            no_derive: Vec::new(),
            ..Default::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespaces.is_empty() {
            return Err(ConfigError::Invalid("No namespaces configured".into()));
        }
        if self.indent_width == 0 {
            return Err(ConfigError::Invalid("indent_width must be non-zero".into()));
        }

        for (i, mapping) in self.namespaces.iter().enumerate() {
            if mapping.source.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Namespace {} has an empty source prefix",
                    i
                )));
            }
            if self.namespaces[..i].iter().any(|m| m.source == mapping.source) {
                return Err(ConfigError::Invalid(format!(
                    "Namespace {} is configured twice",
                    mapping.source
                )));
            }
        }

        for external in &self.external_types {
            if external.source.is_empty() || external.target.is_empty() {
                return Err(ConfigError::Invalid(
                    "External type with empty source or target".into(),
                ));
            }
        }

        Ok(())
    }

    /// Most specific namespace mapping for a source name.
    pub fn namespace_for(&self, name: &str) -> Option<&NamespaceMapping> {
        self.namespaces
            .iter()
            .filter(|mapping| mapping.strip(name).is_some())
            .max_by_key(|mapping| mapping.source.len())
    }

    pub fn is_pointer_wrapper(&self, name: &str) -> bool {
        self.pointer_wrappers.iter().any(|w| w == name)
    }

    pub fn is_vtable_marker(&self, field: &str) -> bool {
        self.vtable_markers
            .iter()
            .any(|marker| marker.eq_ignore_ascii_case(field))
    }

    pub fn is_field_excluded(&self, owner: &str, field: &str) -> bool {
        self.field_exclusions
            .iter()
            .any(|e| e.owner == owner && e.field == field)
    }

    pub fn suppresses_derive(&self, canonical: &str) -> bool {
        self.no_derive.iter().any(|n| n == canonical)
    }

    pub fn external_type(&self, source: &str) -> Option<&ExternalType> {
        self.external_types.iter().find(|e| e.source == source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExportConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.is_vtable_marker("VTable"));
        assert!(config.is_vtable_marker("vtbl"));
        assert!(!config.is_vtable_marker("Vtbl2"));
        assert!(config.is_field_excluded(
            "FFXIVClientStructs.FFXIV.Client.Graphics.Scene.Human",
            "EquipSlotData"
        ));
    }

    #[test]
    fn test_namespace_lookup_prefers_longest() {
        let mut config = ExportConfig::default();
        config
            .namespaces
            .push(NamespaceMapping::new("FFXIVClientStructs.FFXIV.Client", &["client"]));

        let mapping = config
            .namespace_for("FFXIVClientStructs.FFXIV.Client.Game.Character")
            .expect("mapping");
        assert_eq!(mapping.target, vec!["client"]);
        assert!(config.namespace_for("FFXIVClientStructs.FFXIVX.Foo").is_none());
        assert!(config.namespace_for("System.Numerics.Vector3").is_none());
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            r#"
revision = "abc123"

[[namespaces]]
source = "App"
target = ["app"]

[[external_types]]
source = "System.Numerics.Vector3"
target = "crate::math::Vector3"
"#
        )
        .expect("write");

        let config = ExportConfig::from_file(file.path()).expect("load");
        assert_eq!(config.revision.as_deref(), Some("abc123"));
        assert_eq!(config.namespaces.len(), 1);
        assert!(config.namespaces[0].export);
        assert_eq!(config.indent_width, 4);
        assert_eq!(config.vtable_markers, default_vtable_markers());
        assert!(config.external_type("System.Numerics.Vector3").is_some());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut config = ExportConfig::for_namespace("App", &["app"]);
        config.namespaces.push(NamespaceMapping::new("App", &["other"]));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let err = ExportConfig::from_toml_str("namespaces = []").expect_err("empty");
        assert!(err.to_string().contains("No namespaces"));
    }
}
