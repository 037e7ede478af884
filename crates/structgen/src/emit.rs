// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Indentation-aware line writer for generated source.

/// Accumulates generated lines at the current nesting depth.
#[derive(Debug, Clone)]
pub struct CodeWriter {
    out: String,
    unit: String,
    level: usize,
}

impl CodeWriter {
    pub fn new(indent_width: usize) -> Self {
        Self {
            out: String::new(),
            unit: " ".repeat(indent_width),
            level: 0,
        }
    }

    /// Emit one line at the current depth. Empty input emits a bare newline.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.level {
                self.out.push_str(&self.unit);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    pub fn indent(&mut self) {
        self.level += 1;
    }

    pub fn dedent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    /// Emit `header {`, the body one level deeper, then `}`.
    pub fn block(&mut self, header: impl AsRef<str>, body: impl FnOnce(&mut Self)) {
        self.line(format!("{} {{", header.as_ref()));
        self.indent();
        body(self);
        self.dedent();
        self.line("}");
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_blocks() {
        let mut w = CodeWriter::new(4);
        w.block("pub mod a", |w| {
            w.line("pub struct B;");
            w.blank();
            w.block("impl B", |w| w.line("pub fn c() {}"));
        });
        assert_eq!(
            w.finish(),
            "pub mod a {\n    pub struct B;\n\n    impl B {\n        pub fn c() {}\n    }\n}\n"
        );
    }

    #[test]
    fn test_dedent_saturates() {
        let mut w = CodeWriter::new(2);
        w.dedent();
        w.indent();
        w.line("x");
        assert_eq!(w.level(), 1);
        assert_eq!(w.as_str(), "  x\n");
    }
}
