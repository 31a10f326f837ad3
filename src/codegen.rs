//! Bundle emission.
//!
//! Assembles the final script: header comments and script metadata, the
//! loader shim, every non-entry module wrapped as a deferred thunk in
//! dependency order, then the rewritten entry source.

use tracing::debug;

use crate::config::{Author, Config};
use crate::graph::DependencyGraph;
use crate::transform::{localize_functions, rewrite_requires};

/// Runtime shim prepended to every bundle. `__load` runs each registered
/// thunk at most once and memoizes its value; unregistered names fall
/// through to the host `require`.
const LOADER_SHIM: &str = r#"local __modules = {}
local __loaded = {}

local function __load(name)
    if __loaded[name] then return __loaded[name] end
    if __modules[name] then
        __loaded[name] = __modules[name]()
        return __loaded[name]
    end
    return require(name)
end"#;

/// Generate the complete bundle text for a built graph.
pub fn generate_bundle(graph: &DependencyGraph, config: &Config) -> String {
    let mut blocks: Vec<String> = Vec::new();
    blocks.push(header_block(config));
    blocks.push(LOADER_SHIM.to_string());

    for module_id in &graph.order {
        if module_id == &graph.entry {
            continue;
        }
        let module = &graph.modules[module_id];
        let localized = localize_functions(&module.source);
        let rewritten = rewrite_requires(&localized, &module.require_mappings);
        blocks.push(wrap_module(module_id, &rewritten));
        debug!(module = %module_id, "wrapped module");
    }

    // The entry stays unwrapped and keeps its globals: MoonLoader calls
    // `main` and the event handlers on the top-level chunk.
    let entry = &graph.modules[&graph.entry];
    blocks.push(rewrite_requires(&entry.source, &entry.require_mappings));

    blocks.join("\n\n")
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEADER
// ═══════════════════════════════════════════════════════════════════════════════

fn header_block(config: &Config) -> String {
    let mut lines: Vec<String> = Vec::new();

    match &config.version {
        Some(version) => lines.push(format!("-- {} v{}", config.name, version)),
        None => lines.push(format!("-- {}", config.name)),
    }
    lines.push("-- Bundled with moonpack".to_string());

    lines.push(format!("script_name({})", quote_lua(&config.name)));
    if let Some(version) = &config.version {
        lines.push(format!("script_version({})", quote_lua(version)));
    }
    match &config.author {
        Some(Author::Single(author)) => {
            lines.push(format!("script_author({})", quote_lua(author)));
        }
        Some(Author::Many(authors)) => {
            let quoted: Vec<String> = authors.iter().map(|a| quote_lua(a)).collect();
            lines.push(format!("script_authors({{{}}})", quoted.join(", ")));
        }
        None => {}
    }
    if let Some(description) = &config.description {
        lines.push(format!("script_description({})", quote_lua(description)));
    }
    if let Some(url) = &config.url {
        lines.push(format!("script_url({})", quote_lua(url)));
    }

    lines.join("\n")
}

/// Single-quoted Lua string literal with `\`, `'`, newline and carriage
/// return escaped.
fn quote_lua(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODULE WRAPPING
// ═══════════════════════════════════════════════════════════════════════════════

/// Wrap a rewritten module body as a deferred thunk, indenting every
/// non-empty line by four spaces.
fn wrap_module(module_id: &str, body: &str) -> String {
    let mut out = format!("__modules[\"{module_id}\"] = function()\n");
    for line in body.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push_str("end");
    out
}
