// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error and diagnostic types for the export pipeline.
//!
//! Fatal conditions abort the whole run through [`ExportError`]. Conditions
//! that only degrade a single declaration are collected as [`Diagnostic`]s
//! and reported alongside the generated text.

use std::fmt;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that abort an export run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metadata parse error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// A scalar, pointer or generic shape with no known mapping.
    #[error("Unsupported shape in {context}: {shape}")]
    UnsupportedShape { context: String, shape: String },

    /// A named type that the metadata library does not describe.
    #[error("Unknown type {name} (referenced from {context})")]
    UnknownType { name: String, context: String },

    /// Two different kinds of entries claim the same module path.
    #[error("Duplicate registration of {name} in module {module}")]
    DuplicateRegistration { module: String, name: String },

    /// Offsets, sizes or extents that do not fit the address space.
    #[error("Invalid metadata for {context}: {reason}")]
    InvalidMetadata { context: String, reason: String },

    #[error("Invalid byte-pattern signature for {owner}: {pattern}")]
    InvalidSignature { owner: String, pattern: String },

    #[error("Invalid type reference {text:?}: {reason}")]
    InvalidTypeRef { text: String, reason: &'static str },
}

/// Recoverable conditions reported after an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The running cursor passed a field's declared offset; the type was
    /// truncated at that field.
    LayoutOverrun {
        type_name: String,
        field: String,
        cursor: usize,
        offset: usize,
    },
    /// Enum metadata could not be turned into variants; an empty-bodied enum
    /// was emitted instead.
    MalformedEnum { type_name: String, reason: String },
}

impl Diagnostic {
    /// Canonical name of the affected declaration.
    pub fn type_name(&self) -> &str {
        match self {
            Self::LayoutOverrun { type_name, .. } | Self::MalformedEnum { type_name, .. } => {
                type_name
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LayoutOverrun {
                type_name,
                field,
                cursor,
                offset,
            } => write!(
                f,
                "layout overrun in {type_name}.{field}: cursor 0x{cursor:X} > offset 0x{offset:X}"
            ),
            Self::MalformedEnum { type_name, reason } => {
                write!(f, "malformed enum {type_name}: {reason}")
            }
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, ExportError>;
