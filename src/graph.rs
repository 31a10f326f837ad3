//! Dependency graph construction.
//!
//! Reads the entry file, recursively discovers every bundled dependency,
//! rejects cycles and produces the topological order the emitter writes
//! modules in.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BundleError;
use crate::requires::{extract_requires, RequireSite};
use crate::resolve::{Resolution, Resolver};

// ═══════════════════════════════════════════════════════════════════════════════
// GRAPH TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleNode {
    pub module_id: String,
    pub absolute_path: PathBuf,
    pub source: String,
    pub requires: Vec<RequireSite>,
    /// Bundled dependencies only, in first-require order.
    pub dependencies: Vec<String>,
    /// Raw import literal → resolved module id, consumed by the rewriter.
    pub require_mappings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    pub entry: String,
    pub modules: BTreeMap<String, ModuleNode>,
    /// Topological order: every dependency precedes its dependent, the
    /// entry is last.
    pub order: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub entry_path: PathBuf,
    pub source_root: PathBuf,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

pub fn build_dependency_graph(options: &BuildOptions) -> Result<DependencyGraph, BundleError> {
    let resolver = Resolver::new(&options.source_root);
    let entry_id = resolver.module_id_from_path(&options.entry_path);

    let mut modules = BTreeMap::new();
    discover(
        entry_id.clone(),
        options.entry_path.clone(),
        None,
        &resolver,
        &mut modules,
    )?;

    let cycles = detect_cycles(&modules);
    if !cycles.is_empty() {
        return Err(BundleError::CircularDependency { cycles });
    }

    let order = topological_order(&modules, &entry_id);
    debug!(
        modules = modules.len(),
        entry = %entry_id,
        "dependency graph built"
    );

    Ok(DependencyGraph {
        entry: entry_id,
        modules,
        order,
    })
}

fn discover(
    module_id: String,
    path: PathBuf,
    requested_by: Option<(&Path, u32)>,
    resolver: &Resolver,
    modules: &mut BTreeMap<String, ModuleNode>,
) -> Result<(), BundleError> {
    let source = fs::read_to_string(&path).map_err(|_| match requested_by {
        Some((requester, line)) => BundleError::ModuleNotFound {
            module_name: path.display().to_string(),
            required_by: requester.display().to_string(),
            line,
        },
        None => BundleError::ModuleNotFound {
            module_name: path.display().to_string(),
            required_by: "moonpack.json".to_string(),
            line: 0,
        },
    })?;

    let requires = extract_requires(&source);
    debug!(module = %module_id, sites = requires.len(), "scanned module");

    let mut dependencies = Vec::new();
    let mut require_mappings = BTreeMap::new();
    let mut pending: Vec<(String, PathBuf, u32)> = Vec::new();

    for site in &requires {
        match resolver.resolve(&site.module_name, &path) {
            Resolution::External => {
                debug!(module = %module_id, import = %site.module_name, "external import");
            }
            Resolution::NotFound => {
                return Err(BundleError::ModuleNotFound {
                    module_name: site.module_name.clone(),
                    required_by: path.display().to_string(),
                    line: site.line,
                });
            }
            Resolution::Bundled(resolved) => {
                if !dependencies.contains(&resolved.module_id) {
                    dependencies.push(resolved.module_id.clone());
                }
                require_mappings.insert(site.module_name.clone(), resolved.module_id.clone());
                if !modules.contains_key(&resolved.module_id) {
                    pending.push((resolved.module_id, resolved.absolute_path, site.line));
                }
            }
        }
    }

    // Insert before recursing so a cycle back into this module terminates.
    modules.insert(
        module_id.clone(),
        ModuleNode {
            module_id,
            absolute_path: path.clone(),
            source,
            requires,
            dependencies,
            require_mappings,
        },
    );

    for (dep_id, dep_path, line) in pending {
        if !modules.contains_key(&dep_id) {
            discover(dep_id, dep_path, Some((&path, line)), resolver, modules)?;
        }
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// CYCLE DETECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Depth-first sweep over every node collecting all distinct cycles. Each
/// cycle is canonicalized by rotating its node list to the
/// lexicographically smallest rotation, so the same loop entered from
/// different nodes is reported once.
fn detect_cycles(modules: &BTreeMap<String, ModuleNode>) -> Vec<Vec<String>> {
    let mut cycles: Vec<Vec<String>> = Vec::new();
    let mut seen_keys: BTreeSet<String> = BTreeSet::new();
    let mut visited: BTreeSet<String> = BTreeSet::new();

    for start in modules.keys() {
        if visited.contains(start) {
            continue;
        }
        let mut on_stack: BTreeSet<String> = BTreeSet::new();
        let mut path: Vec<String> = Vec::new();
        walk_cycles(
            start, modules, &mut visited, &mut on_stack, &mut path, &mut seen_keys, &mut cycles,
        );
    }

    cycles
}

fn walk_cycles(
    node: &str,
    modules: &BTreeMap<String, ModuleNode>,
    visited: &mut BTreeSet<String>,
    on_stack: &mut BTreeSet<String>,
    path: &mut Vec<String>,
    seen_keys: &mut BTreeSet<String>,
    cycles: &mut Vec<Vec<String>>,
) {
    visited.insert(node.to_string());
    on_stack.insert(node.to_string());
    path.push(node.to_string());

    if let Some(module) = modules.get(node) {
        for dep in &module.dependencies {
            if on_stack.contains(dep) {
                let from = path.iter().position(|n| n == dep).unwrap_or(0);
                let cycle = canonicalize_cycle(&path[from..]);
                let key = cycle.join("\u{1}");
                if seen_keys.insert(key) {
                    cycles.push(cycle);
                }
            } else if !visited.contains(dep) {
                walk_cycles(dep, modules, visited, on_stack, path, seen_keys, cycles);
            }
        }
    }

    path.pop();
    on_stack.remove(node);
}

/// Rotate the node list (without the closing duplicate) to its
/// lexicographically smallest rotation.
fn canonicalize_cycle(nodes: &[String]) -> Vec<String> {
    if nodes.is_empty() {
        return Vec::new();
    }
    let mut best: Vec<String> = nodes.to_vec();
    for shift in 1..nodes.len() {
        let rotated: Vec<String> = nodes[shift..]
            .iter()
            .chain(nodes[..shift].iter())
            .cloned()
            .collect();
        if rotated < best {
            best = rotated;
        }
    }
    best
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOPOLOGICAL ORDER
// ═══════════════════════════════════════════════════════════════════════════════

/// Post-order depth-first traversal from the entry: every dependency is
/// pushed before its dependent, the entry lands last. Dependencies are
/// visited in the order they appear in each node's require list, which
/// makes the order deterministic for a fixed input tree.
fn topological_order(modules: &BTreeMap<String, ModuleNode>, entry: &str) -> Vec<String> {
    let mut order = Vec::with_capacity(modules.len());
    let mut visited = BTreeSet::new();
    visit(entry, modules, &mut visited, &mut order);
    order
}

fn visit(
    node: &str,
    modules: &BTreeMap<String, ModuleNode>,
    visited: &mut BTreeSet<String>,
    order: &mut Vec<String>,
) {
    if !visited.insert(node.to_string()) {
        return;
    }
    if let Some(module) = modules.get(node) {
        for dep in &module.dependencies {
            visit(dep, modules, visited, order);
        }
    }
    order.push(node.to_string());
}
