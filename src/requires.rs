//! Require-site extraction.
//!
//! Finds every textual `require` in a buffer: the parenthesized form, the
//! bare-string form and the protected `pcall(require, ...)` form, with either
//! quote style and any whitespace between tokens. Matches that start inside
//! a string or comment span are discarded.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::scan::{line_col, scan_excluded_ranges, ExcludedRanges};

// ═══════════════════════════════════════════════════════════════════════════════
// SITE TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequireKind {
    /// `require("name")`
    Standard,
    /// `require "name"` - no parentheses.
    Compact,
    /// `pcall(require, "name")`
    Pcall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequireSite {
    pub module_name: String,
    pub kind: RequireKind,
    pub raw_text: String,
    pub byte_offset: usize,
    pub line: u32,
    pub column: u32,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATTERNS
// ═══════════════════════════════════════════════════════════════════════════════

// The regex crate has no backreferences, so each pattern spells out both
// quote styles; the matched quote is recovered from the raw text later.
lazy_static! {
    static ref PCALL_RE: Regex = Regex::new(
        r#"\bpcall\s*\(\s*require\s*,\s*(?:"([^"\n]*)"|'([^'\n]*)')\s*\)"#
    )
    .unwrap();
    static ref STANDARD_RE: Regex = Regex::new(
        r#"\brequire\s*\(\s*(?:"([^"\n]*)"|'([^'\n]*)')\s*\)"#
    )
    .unwrap();
    // Zero whitespace is permitted (`require'x'`); the trailing word
    // boundary on the keyword keeps identifiers like `required` out.
    static ref COMPACT_RE: Regex = Regex::new(
        r#"\brequire\b\s*(?:"([^"\n]*)"|'([^'\n]*)')"#
    )
    .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Extract all require sites from `source`, masking strings and comments.
pub fn extract_requires(source: &str) -> Vec<RequireSite> {
    let excluded = scan_excluded_ranges(source);
    extract_requires_masked(source, &excluded)
}

/// Extract all require sites with a precomputed span mask.
pub fn extract_requires_masked(source: &str, excluded: &ExcludedRanges) -> Vec<RequireSite> {
    let mut sites = Vec::new();
    collect_sites(&PCALL_RE, RequireKind::Pcall, source, excluded, &mut sites);
    collect_sites(&STANDARD_RE, RequireKind::Standard, source, excluded, &mut sites);
    collect_sites(&COMPACT_RE, RequireKind::Compact, source, excluded, &mut sites);
    dedupe_overlaps(sites)
}

fn collect_sites(
    pattern: &Regex,
    kind: RequireKind,
    source: &str,
    excluded: &ExcludedRanges,
    sites: &mut Vec<RequireSite>,
) {
    for caps in pattern.captures_iter(source) {
        let m = caps.get(0).expect("match group 0");
        if excluded.contains(m.start()) {
            continue;
        }
        // A compact match directly followed by `)` is the tail of a
        // standard form; drop it here to avoid double-counting.
        if kind == RequireKind::Compact && next_nonspace(source, m.end()) == Some(b')') {
            continue;
        }
        let module_name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|g| g.as_str().to_string())
            .unwrap_or_default();
        let (line, column) = line_col(source, m.start());
        sites.push(RequireSite {
            module_name,
            kind,
            raw_text: m.as_str().to_string(),
            byte_offset: m.start(),
            line,
            column,
        });
    }
}

fn next_nonspace(source: &str, from: usize) -> Option<u8> {
    source.as_bytes()[from.min(source.len())..]
        .iter()
        .copied()
        .find(|&b| b != b' ' && b != b'\t')
}

/// De-duplicate by byte range: when two matches overlap, the longer raw text
/// wins. The result is sorted by byte offset.
fn dedupe_overlaps(mut sites: Vec<RequireSite>) -> Vec<RequireSite> {
    sites.sort_by(|a, b| {
        a.byte_offset
            .cmp(&b.byte_offset)
            .then(b.raw_text.len().cmp(&a.raw_text.len()))
    });

    let mut kept: Vec<RequireSite> = Vec::with_capacity(sites.len());
    for site in sites {
        let start = site.byte_offset;
        let end = start + site.raw_text.len();
        let overlaps = kept.iter().any(|k| {
            let k_end = k.byte_offset + k.raw_text.len();
            start < k_end && k.byte_offset < end
        });
        if !overlaps {
            kept.push(site);
        }
    }
    kept
}
