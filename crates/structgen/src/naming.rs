// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Identifier conversion for generated Rust code.
//!
//! Source names use capitalised words (`GetTargetId`, `HPMax`). Modules,
//! fields and functions are emitted in snake case, with contiguous capital
//! runs folded into a single lowercase run so acronyms stay readable.

/// Reserved words of the output language (strict, reserved and weak keywords
/// that cannot appear as plain identifiers).
pub const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use",
    "where", "while", "async", "await", "dyn", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try", "gen",
];

/// Keywords that refer to the current item or path root and cannot be
/// written as raw identifiers.
const PATH_KEYWORDS: &[&str] = &["self", "Self", "super", "crate"];

/// Returns `true` if `ident` is a reserved word.
pub fn is_keyword(ident: &str) -> bool {
    RUST_KEYWORDS.contains(&ident)
}

/// Escape `ident` if it collides with a reserved word.
///
/// Path keywords get a trailing underscore, every other keyword becomes a
/// raw identifier.
pub fn escape_keyword(ident: &str) -> String {
    if PATH_KEYWORDS.contains(&ident) {
        format!("{ident}_")
    } else if is_keyword(ident) {
        format!("r#{ident}")
    } else {
        ident.to_string()
    }
}

/// Convert an `UpperCamelCase` name to an escaped `snake_case` identifier.
///
/// ```
/// use structgen::naming::safe_snake_case;
///
/// assert_eq!(safe_snake_case("GetTargetId"), "get_target_id");
/// assert_eq!(safe_snake_case("HPMax"), "hpmax");
/// assert_eq!(safe_snake_case("Type"), "r#type");
/// assert_eq!(safe_snake_case("Self"), "self_");
/// ```
pub fn safe_snake_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    let mut prev_upper = false;

    for (i, c) in input.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !prev_upper {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_upper = true;
        } else {
            out.push(c);
            prev_upper = false;
        }
    }

    escape_keyword(&out)
}

/// Turn an arbitrary type name into a single identifier segment.
///
/// Nested-type separators (`+`) and generic arity markers (`` `1 ``) from the
/// source naming scheme are removed.
pub fn type_ident(source: &str) -> String {
    let without_arity = match source.find('`') {
        Some(idx) => {
            // `Outer`1+Inner` keeps the nested part after the arity digits
            let rest = source[idx + 1..].trim_start_matches(|c: char| c.is_ascii_digit());
            format!("{}{}", &source[..idx], rest)
        }
        None => source.to_string(),
    };
    without_arity.replace('+', "_")
}

/// Upper-case identifier used for generated `static` items.
pub fn static_ident(name: &str) -> String {
    name.to_ascii_uppercase()
}
