//! Static lint analysis over a built dependency graph.
//!
//! Three checks, all advisory: duplicate assignments to external event
//! tables across files, host event handlers declared outside the entry, and
//! imports that are never used. Findings are returned, never raised.

use std::collections::{BTreeMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::graph::DependencyGraph;
use crate::resolve::Resolver;
use crate::scan::{line_col, scan_excluded_ranges, ExcludedRanges};
use crate::transform::plain_function_decls;

// ═══════════════════════════════════════════════════════════════════════════════
// FINDING TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// An assignment (or function declaration) into a property of a variable
/// that aliases an external import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAssignment {
    pub var_name: String,
    pub property_path: String,
    pub module_name: String,
    pub file_path: String,
    pub line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateAssignment {
    pub property_path: String,
    pub occurrences: Vec<ExternalAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoonLoaderEventInModule {
    pub event_name: String,
    pub file_path: String,
    pub line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnusedRequire {
    pub var_name: String,
    pub module_name: String,
    pub file_path: String,
    pub line: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintResult {
    pub duplicate_assignments: Vec<DuplicateAssignment>,
    pub moonloader_events_in_modules: Vec<MoonLoaderEventInModule>,
    pub unused_requires: Vec<UnusedRequire>,
}

impl LintResult {
    pub fn is_empty(&self) -> bool {
        self.duplicate_assignments.is_empty()
            && self.moonloader_events_in_modules.is_empty()
            && self.unused_requires.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATTERNS
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    /// Callback names MoonLoader invokes as globals; defining one outside
    /// the entry source has no effect at runtime.
    static ref MOONLOADER_EVENTS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("main");
        s.insert("onExitScript");
        s.insert("onQuitGame");
        s.insert("onScriptLoad");
        s.insert("onScriptTerminate");
        s.insert("onSystemInitialized");
        s.insert("onScriptMessage");
        s.insert("onSystemMessage");
        s.insert("onReceivePacket");
        s.insert("onReceiveRpc");
        s.insert("onSendPacket");
        s.insert("onSendRpc");
        s.insert("onWindowMessage");
        s.insert("onStartNewGame");
        s.insert("onLoadGame");
        s.insert("onSaveGame");
        s
    };

    /// `local x = require("...")` / `x = require '...'`, both quote styles,
    /// parens optional. Group 1 is the `local` keyword when present.
    static ref IMPORT_ALIAS_RE: Regex = Regex::new(
        r#"(\blocal\s+)?\b([A-Za-z_][A-Za-z0-9_]*)\s*=\s*require\s*\(?\s*(?:"([^"\n]*)"|'([^'\n]*)')"#
    )
    .unwrap();

    /// `alias.prop[.prop...] =` - a plain assignment into a property path.
    static ref PROPERTY_ASSIGN_RE: Regex = Regex::new(
        r"\b([A-Za-z_][A-Za-z0-9_]*)((?:\.[A-Za-z_][A-Za-z0-9_]*)+)\s*=(?:[^=]|\z)"
    )
    .unwrap();

    /// `function alias.prop[.prop...](` - a function declaration targeting a
    /// property path.
    static ref PROPERTY_FUNCTION_RE: Regex = Regex::new(
        r"\bfunction\s+([A-Za-z_][A-Za-z0-9_]*)((?:\.[A-Za-z_][A-Za-z0-9_]*)+)\s*\("
    )
    .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// LINT DRIVER
// ═══════════════════════════════════════════════════════════════════════════════

pub fn lint_graph(graph: &DependencyGraph) -> LintResult {
    let mut grouped: BTreeMap<String, Vec<ExternalAssignment>> = BTreeMap::new();
    let mut events = Vec::new();
    let mut unused = Vec::new();

    for (module_id, module) in &graph.modules {
        let file_path = module.absolute_path.display().to_string();
        let excluded = scan_excluded_ranges(&module.source);
        let imports = collect_imports(&module.source, &excluded);

        for assignment in
            collect_external_assignments(&module.source, &excluded, &imports, &file_path)
        {
            grouped
                .entry(assignment.property_path.clone())
                .or_default()
                .push(assignment);
        }

        if module_id != &graph.entry {
            for decl in plain_function_decls(&module.source, &excluded) {
                if MOONLOADER_EVENTS.contains(decl.name.as_str()) {
                    let (line, _) = line_col(&module.source, decl.offset);
                    events.push(MoonLoaderEventInModule {
                        event_name: decl.name,
                        file_path: file_path.clone(),
                        line,
                    });
                }
            }
        }

        unused.extend(collect_unused_requires(
            &module.source,
            &excluded,
            &imports,
            &file_path,
        ));
    }

    // A duplicate only matters when it spans more than one file; the same
    // table written twice in one module is a local concern.
    let duplicate_assignments = grouped
        .into_iter()
        .filter(|(_, occurrences)| {
            let files: HashSet<&str> =
                occurrences.iter().map(|o| o.file_path.as_str()).collect();
            files.len() > 1
        })
        .map(|(property_path, occurrences)| DuplicateAssignment {
            property_path,
            occurrences,
        })
        .collect();

    LintResult {
        duplicate_assignments,
        moonloader_events_in_modules: events,
        unused_requires: unused,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHECKS
// ═══════════════════════════════════════════════════════════════════════════════

struct ImportAlias {
    var_name: String,
    module_name: String,
    is_local: bool,
    offset: usize,
}

fn collect_imports(source: &str, excluded: &ExcludedRanges) -> Vec<ImportAlias> {
    let mut imports = Vec::new();
    for caps in IMPORT_ALIAS_RE.captures_iter(source) {
        let m = caps.get(0).expect("match group 0");
        if excluded.contains(m.start()) {
            continue;
        }
        let module_name = caps
            .get(3)
            .or_else(|| caps.get(4))
            .map(|g| g.as_str().to_string())
            .unwrap_or_default();
        imports.push(ImportAlias {
            var_name: caps.get(2).expect("ident group").as_str().to_string(),
            module_name,
            is_local: caps.get(1).is_some(),
            offset: m.start(),
        });
    }
    imports
}

fn collect_external_assignments(
    source: &str,
    excluded: &ExcludedRanges,
    imports: &[ImportAlias],
    file_path: &str,
) -> Vec<ExternalAssignment> {
    let external: BTreeMap<&str, &str> = imports
        .iter()
        .filter(|imp| Resolver::is_external(&imp.module_name))
        .map(|imp| (imp.var_name.as_str(), imp.module_name.as_str()))
        .collect();
    if external.is_empty() {
        return Vec::new();
    }

    let mut assignments = Vec::new();
    for pattern in [&*PROPERTY_ASSIGN_RE, &*PROPERTY_FUNCTION_RE] {
        for caps in pattern.captures_iter(source) {
            let m = caps.get(0).expect("match group 0");
            if excluded.contains(m.start()) {
                continue;
            }
            let var_name = caps.get(1).expect("ident group").as_str();
            let Some(module_name) = external.get(var_name) else {
                continue;
            };
            let path_tail = caps.get(2).expect("path group").as_str();
            let (line, _) = line_col(source, m.start());
            assignments.push(ExternalAssignment {
                var_name: var_name.to_string(),
                property_path: format!("{var_name}{path_tail}"),
                module_name: module_name.to_string(),
                file_path: file_path.to_string(),
                line,
            });
        }
    }

    assignments.sort_by_key(|a| a.line);
    assignments
}

fn collect_unused_requires(
    source: &str,
    excluded: &ExcludedRanges,
    imports: &[ImportAlias],
    file_path: &str,
) -> Vec<UnusedRequire> {
    let mut unused = Vec::new();

    for import in imports.iter().filter(|imp| imp.is_local) {
        let (decl_line, _) = line_col(source, import.offset);
        let ident_re = Regex::new(&format!(r"\b{}\b", regex::escape(&import.var_name)))
            .expect("identifier pattern");

        let used = ident_re.find_iter(source).any(|m| {
            if excluded.contains(m.start()) {
                return false;
            }
            let (line, _) = line_col(source, m.start());
            line != decl_line
        });

        if !used {
            unused.push(UnusedRequire {
                var_name: import.var_name.clone(),
                module_name: import.module_name.clone(),
                file_path: file_path.to_string(),
                line: decl_line,
            });
        }
    }

    unused
}
