// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structured type references.
//!
//! A [`TypeRef`] is a segmented path (`crate::ffxiv::client::Character`),
//! an optional generic argument list, a pointer depth and an optional fixed
//! array extent. It is built once while reading metadata and only rendered to
//! text at emission time.
//!
//! Pointer markers are not part of the path, so `T`, `*mut T` and
//! `*mut *mut T` share the same canonical name and resolve to the same
//! declaration.

use crate::error::{ExportError, Result};
use std::fmt;
use std::str::FromStr;

/// Leading segment of paths local to the generated crate.
pub const CRATE_ROOT: &str = "crate";
/// Leading segment of paths into the standard library.
pub const STD_ROOT: &str = "std";

/// Reference to a (possibly pointer-wrapped or arrayed) type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    segments: Vec<String>,
    generics: Option<Vec<TypeRef>>,
    pointer_depth: usize,
    array_len: Option<usize>,
}

impl TypeRef {
    /// Reference to a path given as segments (`["crate", "ffxiv", "Foo"]`).
    pub fn path<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            generics: None,
            pointer_depth: 0,
            array_len: None,
        }
    }

    /// Reference to a declaration inside the generated crate.
    pub fn local(modules: &[String], name: impl Into<String>) -> Self {
        let mut segments = Vec::with_capacity(modules.len() + 2);
        segments.push(CRATE_ROOT.to_string());
        segments.extend(modules.iter().cloned());
        segments.push(name.into());
        Self::path(segments)
    }

    /// Parse the textual form of a reference.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = Parser { text, rest: text };
        let parsed = parser.parse_ref()?;
        parser.skip_ws();
        if !parser.rest.is_empty() {
            return Err(parser.error("trailing input"));
        }
        Ok(parsed)
    }

    #[must_use]
    pub fn with_generics(mut self, args: Vec<TypeRef>) -> Self {
        self.generics = Some(args);
        self
    }

    /// Generic form with the argument list erased (`Name<>`).
    #[must_use]
    pub fn erased(mut self) -> Self {
        if self.generics.is_some() {
            self.generics = Some(Vec::new());
        }
        self.pointer_depth = 0;
        self.array_len = None;
        self
    }

    #[must_use]
    pub fn with_pointer_depth(mut self, depth: usize) -> Self {
        self.pointer_depth = depth;
        self
    }

    /// One more level of indirection.
    #[must_use]
    pub fn pointer_to(mut self) -> Self {
        self.pointer_depth += 1;
        self
    }

    #[must_use]
    pub fn with_array_len(mut self, len: usize) -> Self {
        self.array_len = Some(len);
        self
    }

    /// Strip pointer and array decoration.
    #[must_use]
    pub fn base(&self) -> Self {
        Self {
            segments: self.segments.clone(),
            generics: self.generics.clone(),
            pointer_depth: 0,
            array_len: None,
        }
    }

    /// Wrap the whole reference in `std::mem::ManuallyDrop<..>`.
    #[must_use]
    pub fn manually_drop(self) -> Self {
        Self::path([STD_ROOT, "mem", "ManuallyDrop"]).with_generics(vec![self])
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last path segment, without generic arguments.
    pub fn name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    pub fn generics(&self) -> Option<&[TypeRef]> {
        self.generics.as_deref()
    }

    pub fn pointer_depth(&self) -> usize {
        self.pointer_depth
    }

    pub fn array_len(&self) -> Option<usize> {
        self.array_len
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer_depth > 0
    }

    /// `true` for `std::mem::ManuallyDrop<..>` wrappers.
    pub fn is_manually_drop(&self) -> bool {
        self.segments.len() == 3
            && self.segments[0] == STD_ROOT
            && self.segments[1] == "mem"
            && self.segments[2] == "ManuallyDrop"
    }

    /// Registry key: full path plus generic arguments, no pointer or array
    /// decoration.
    pub fn canonical_name(&self) -> String {
        let mut out = self.segments.join("::");
        push_generics(&mut out, self.generics.as_deref());
        out
    }

    /// Registry key with the generic arguments erased (`Name<>`).
    pub fn erased_name(&self) -> String {
        let mut out = self.segments.join("::");
        if self.generics.is_some() {
            out.push_str("<>");
        }
        out
    }

    /// Name used on the declaration itself (`Foo`, `Foo<T1, T2>`).
    pub fn decl_name(&self) -> String {
        let mut out = self.name().to_string();
        push_generics(&mut out, self.generics.as_deref());
        out
    }

    /// Module path owning the referenced declaration.
    ///
    /// Paths under `crate` own every segment between the root and the name;
    /// `std` paths and bare primitives live at the root.
    pub fn module_path(&self) -> Vec<String> {
        match self.segments.first().map(String::as_str) {
            Some(CRATE_ROOT) if self.segments.len() > 2 => {
                self.segments[1..self.segments.len() - 1].to_vec()
            }
            _ => Vec::new(),
        }
    }

    /// Single identifier fragment used when mangling closed generic
    /// instantiations into a declaration name.
    ///
    /// Paths under `crate` keep their module segments so same-named types
    /// from different modules mangle apart.
    pub fn mangle(&self) -> String {
        let mut out = "Ptr_".repeat(self.pointer_depth);
        let segments = match self.segments.first().map(String::as_str) {
            Some(CRATE_ROOT) => &self.segments[1..],
            _ => &self.segments[self.segments.len().saturating_sub(1)..],
        };
        let parts: Vec<&str> = segments.iter().map(|s| s.trim_start_matches("r#")).collect();
        out.push_str(&parts.join("_"));
        if let Some(args) = &self.generics {
            for arg in args {
                out.push('_');
                out.push_str(&arg.mangle());
            }
        }
        if let Some(len) = self.array_len {
            out.push_str(&format!("_x{len}"));
        }
        out
    }

    /// Visit this reference and every nested generic argument.
    pub fn for_each_ref<'a>(&'a self, visit: &mut impl FnMut(&'a TypeRef)) {
        visit(self);
        if let Some(args) = &self.generics {
            for arg in args {
                arg.for_each_ref(visit);
            }
        }
    }

    fn fmt_element(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.pointer_depth {
            f.write_str("*mut ")?;
        }
        f.write_str(&self.canonical_name())
    }
}

fn push_generics(out: &mut String, generics: Option<&[TypeRef]>) {
    if let Some(args) = generics {
        out.push('<');
        let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
        out.push_str(&rendered.join(", "));
        out.push('>');
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.array_len {
            Some(len) => {
                f.write_str("[")?;
                self.fmt_element(f)?;
                write!(f, "; 0x{len:X}]")
            }
            None => self.fmt_element(f),
        }
    }
}

impl FromStr for TypeRef {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

struct Parser<'a> {
    text: &'a str,
    rest: &'a str,
}

impl Parser<'_> {
    fn error(&self, reason: &'static str) -> ExportError {
        ExportError::InvalidTypeRef {
            text: self.text.to_string(),
            reason,
        }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn expect(&mut self, token: &str, reason: &'static str) -> Result<()> {
        self.skip_ws();
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    fn parse_ref(&mut self) -> Result<TypeRef> {
        self.skip_ws();
        let mut depth = 0;
        loop {
            if self.eat("*mut ") || self.eat("*const ") || self.eat("*") {
                depth += 1;
                self.skip_ws();
            } else {
                break;
            }
        }

        if self.eat("[") {
            if depth > 0 {
                return Err(self.error("pointers to arrays are not representable"));
            }
            let element = self.parse_ref()?;
            if element.array_len.is_some() {
                return Err(self.error("nested arrays are not representable"));
            }
            self.expect(";", "expected ';' in array type")?;
            self.skip_ws();
            let len = self.parse_len()?;
            self.expect("]", "expected ']' after array length")?;
            return Ok(element.with_array_len(len));
        }

        let segments = if self.eat("()") {
            vec!["()".to_string()]
        } else {
            self.parse_segments()?
        };

        self.skip_ws();
        let generics = if self.eat("<") {
            let mut args = Vec::new();
            self.skip_ws();
            if !self.eat(">") {
                loop {
                    args.push(self.parse_ref()?);
                    self.skip_ws();
                    if self.eat(",") {
                        continue;
                    }
                    self.expect(">", "expected '>' closing generic arguments")?;
                    break;
                }
            }
            Some(args)
        } else {
            None
        };

        Ok(TypeRef {
            segments,
            generics,
            pointer_depth: depth,
            array_len: None,
        })
    }

    fn parse_segments(&mut self) -> Result<Vec<String>> {
        let mut segments = Vec::new();
        loop {
            let end = self
                .rest
                .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '#'))
                .unwrap_or(self.rest.len());
            if end == 0 {
                return Err(self.error("expected identifier"));
            }
            segments.push(self.rest[..end].to_string());
            self.rest = &self.rest[end..];
            if !self.eat("::") {
                return Ok(segments);
            }
        }
    }

    fn parse_len(&mut self) -> Result<usize> {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(self.rest.len());
        let literal = self.rest[..end].replace('_', "");
        self.rest = &self.rest[end..];
        let parsed = match literal.strip_prefix("0x").or_else(|| literal.strip_prefix("0X")) {
            Some(hex) => usize::from_str_radix(hex, 16),
            None => literal.parse(),
        };
        parsed.map_err(|_| self.error("invalid array length"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_pointers() {
        let plain = TypeRef::parse("crate::ffxiv::client::Character").expect("parse");
        let single = TypeRef::parse("*mut crate::ffxiv::client::Character").expect("parse");
        let double = TypeRef::parse("*mut *mut crate::ffxiv::client::Character").expect("parse");

        assert_eq!(plain.pointer_depth(), 0);
        assert_eq!(single.pointer_depth(), 1);
        assert_eq!(double.pointer_depth(), 2);
        assert_eq!(plain.canonical_name(), double.canonical_name());
        assert_eq!(single.module_path(), vec!["ffxiv", "client"]);
        assert_eq!(double.module_path(), plain.module_path());
    }

    #[test]
    fn test_parse_array_and_generics() {
        let array = TypeRef::parse("[u8; 0x10]").expect("parse");
        assert_eq!(array.array_len(), Some(16));
        assert_eq!(array.name(), "u8");
        assert_eq!(array.to_string(), "[u8; 0x10]");

        let generic =
            TypeRef::parse("crate::cpp_std::Vector<*mut crate::ffxiv::Foo>").expect("parse");
        assert_eq!(generic.generics().map(<[TypeRef]>::len), Some(1));
        assert_eq!(generic.erased_name(), "crate::cpp_std::Vector<>");
        assert_eq!(generic.to_string(), "crate::cpp_std::Vector<*mut crate::ffxiv::Foo>");

        let erased = TypeRef::parse("std::marker::PhantomData<>").expect("parse");
        assert_eq!(erased.canonical_name(), "std::marker::PhantomData<>");
        assert!(erased.module_path().is_empty());
    }

    #[test]
    fn test_parse_deep_pointer_is_tolerated() {
        let triple = TypeRef::parse("*mut *mut *mut u8").expect("parse");
        assert_eq!(triple.pointer_depth(), 3);
        assert_eq!(triple.to_string(), "*mut *mut *mut u8");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(TypeRef::parse("crate::Foo<u8").is_err());
        assert!(TypeRef::parse("[u8; zz]").is_err());
        assert!(TypeRef::parse("*mut [u8; 4]").is_err());
        assert!(TypeRef::parse("crate::Foo bar").is_err());
    }

    #[test]
    fn test_array_of_pointers_renders_inside_brackets() {
        let r = TypeRef::parse("u8").expect("parse").pointer_to().with_array_len(4);
        assert_eq!(r.to_string(), "[*mut u8; 0x4]");
        assert_eq!(TypeRef::parse(&r.to_string()).expect("reparse"), r);
    }

    #[test]
    fn test_manually_drop_wrap() {
        let inner = TypeRef::local(&["cpp_std".to_string()], "Vector")
            .with_generics(vec![TypeRef::path(["u32"])]);
        let wrapped = inner.manually_drop();
        assert!(wrapped.is_manually_drop());
        assert_eq!(
            wrapped.to_string(),
            "std::mem::ManuallyDrop<crate::cpp_std::Vector<u32>>"
        );
    }

    #[test]
    fn test_mangle() {
        let r = TypeRef::parse("crate::ffxiv::Pair<*mut u8, crate::ffxiv::Bar>").expect("parse");
        assert_eq!(r.mangle(), "ffxiv_Pair_Ptr_u8_ffxiv_Bar");

        let std_arg = TypeRef::parse("std::ffi::c_void").expect("parse");
        assert_eq!(std_arg.mangle(), "c_void");
    }
}
