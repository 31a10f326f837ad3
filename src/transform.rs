//! Source rewriting passes.
//!
//! Both passes collect `(start, end, replacement)` edits against the
//! original buffer and apply them back-to-front, so the offsets of pending
//! edits stay valid while the string changes.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::requires::{extract_requires, RequireKind};
use crate::scan::{scan_excluded_ranges, ExcludedRanges};

lazy_static! {
    static ref FUNCTION_DECL_RE: Regex =
        Regex::new(r"\bfunction\s+([A-Za-z_][A-Za-z0-9_]*)\b").unwrap();
}

#[derive(Debug)]
struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// REQUIRE REWRITING
// ═══════════════════════════════════════════════════════════════════════════════

/// Replace every bundled require site with a `__load` call. Sites whose
/// import name is not in `mapping` (external or unresolved) are left
/// untouched; the original quote character is preserved. With an empty
/// mapping this is the identity.
pub fn rewrite_requires(source: &str, mapping: &BTreeMap<String, String>) -> String {
    let mut edits = Vec::new();

    for site in extract_requires(source) {
        let Some(module_id) = mapping.get(&site.module_name) else {
            continue;
        };
        let quote = quote_char(&site.raw_text);
        let replacement = match site.kind {
            RequireKind::Standard | RequireKind::Compact => {
                format!("__load({quote}{module_id}{quote})")
            }
            RequireKind::Pcall => format!("pcall(__load, {quote}{module_id}{quote})"),
        };
        edits.push(Edit {
            start: site.byte_offset,
            end: site.byte_offset + site.raw_text.len(),
            replacement,
        });
    }

    apply_edits(source, edits)
}

fn quote_char(raw_text: &str) -> char {
    raw_text
        .chars()
        .find(|&c| c == '\'' || c == '"')
        .unwrap_or('\'')
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUTO-LOCALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Prefix `local` to every plain `function name(...)` declaration. Dotted
/// and colon forms keep their table, declarations already preceded by the
/// `local` token are left alone, and matches inside strings or comments are
/// skipped. Applying the pass twice is the same as applying it once.
pub fn localize_functions(source: &str) -> String {
    let excluded = scan_excluded_ranges(source);
    let edits = plain_function_decls(source, &excluded)
        .into_iter()
        .map(|decl| Edit {
            start: decl.offset,
            end: decl.offset,
            replacement: "local ".to_string(),
        })
        .collect();
    apply_edits(source, edits)
}

pub(crate) struct FunctionDecl {
    pub name: String,
    pub offset: usize,
}

/// Every `function <ident>(` declaration the localizer would touch:
/// non-dotted, non-colon, not `local`-prefixed, outside excluded ranges.
/// The linter reuses this to spot host-event handlers in modules.
pub(crate) fn plain_function_decls(source: &str, excluded: &ExcludedRanges) -> Vec<FunctionDecl> {
    let bytes = source.as_bytes();
    let mut decls = Vec::new();

    for caps in FUNCTION_DECL_RE.captures_iter(source) {
        let m = caps.get(0).expect("match group 0");
        if excluded.contains(m.start()) {
            continue;
        }
        // `function a.b()` and `function a:b()` assign into a table.
        if matches!(bytes.get(m.end()), Some(&b'.') | Some(&b':')) {
            continue;
        }
        if preceded_by_local(source, m.start()) {
            continue;
        }
        decls.push(FunctionDecl {
            name: caps.get(1).expect("ident group").as_str().to_string(),
            offset: m.start(),
        });
    }

    decls
}

/// True when the token directly before `at` (across spaces/tabs only) is
/// `local`.
fn preceded_by_local(source: &str, at: usize) -> bool {
    let bytes = source.as_bytes();
    let mut i = at;
    while i > 0 && (bytes[i - 1] == b' ' || bytes[i - 1] == b'\t') {
        i -= 1;
    }
    if i < 5 || &source[i - 5..i] != "local" {
        return false;
    }
    i == 5 || !is_ident_byte(bytes[i - 6])
}

fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

// ═══════════════════════════════════════════════════════════════════════════════
// EDIT APPLICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Apply edits back-to-front. Overlapping edits should not occur after
/// extraction de-duplicates; if they do, the earliest-collected wins.
fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.start.cmp(&a.start));

    let mut out = source.to_string();
    let mut applied_floor = usize::MAX;
    for edit in edits {
        if edit.end > applied_floor || edit.end > out.len() {
            continue;
        }
        out.replace_range(edit.start..edit.end, &edit.replacement);
        applied_floor = edit.start;
    }
    out
}
