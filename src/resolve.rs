//! Module resolution.
//!
//! Relative-path dialect: an import name starting with `./` or `../` is
//! bundled, every other name is external and passes through to the host
//! `require` at runtime. Resolution joins the requesting file's directory
//! with the import name, appends `.lua` when missing, and prefers the direct
//! file over a `<dir>/init.lua`.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// A bundled module: its map key and the file it was resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedModule {
    pub module_id: String,
    pub absolute_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Not bundled; the require call is left for the host runtime.
    External,
    Bundled(ResolvedModule),
    NotFound,
}

pub struct Resolver {
    source_root: PathBuf,
}

impl Resolver {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Resolver {
            source_root: normalize(&source_root.into()),
        }
    }

    /// An import is external unless it is a relative path.
    pub fn is_external(import_name: &str) -> bool {
        !(import_name.starts_with("./") || import_name.starts_with("../"))
    }

    pub fn resolve(&self, import_name: &str, requester: &Path) -> Resolution {
        if Self::is_external(import_name) {
            return Resolution::External;
        }

        let base = requester.parent().unwrap_or_else(|| Path::new("."));
        let joined = normalize(&base.join(import_name));

        let direct = if joined.extension().is_some_and(|ext| ext == "lua") {
            joined.clone()
        } else {
            PathBuf::from(format!("{}.lua", joined.display()))
        };
        if direct.is_file() {
            return Resolution::Bundled(self.resolved(direct));
        }

        let init = joined.join("init.lua");
        if init.is_file() {
            return Resolution::Bundled(self.resolved(init));
        }

        Resolution::NotFound
    }

    fn resolved(&self, absolute_path: PathBuf) -> ResolvedModule {
        ResolvedModule {
            module_id: self.module_id_from_path(&absolute_path),
            absolute_path,
        }
    }

    /// Canonical module id: the path relative to the source root with the
    /// `.lua` extension stripped, a trailing `/init` collapsed and `/` as
    /// the separator on every platform.
    pub fn module_id_from_path(&self, path: &Path) -> String {
        let normalized = normalize(path);
        let relative = normalized
            .strip_prefix(&self.source_root)
            .unwrap_or(&normalized);

        let mut id = relative.to_string_lossy().replace('\\', "/");
        if let Some(stripped) = id.strip_suffix(".lua") {
            id = stripped.to_string();
        }
        if let Some(stripped) = id.strip_suffix("/init") {
            id = stripped.to_string();
        }
        id
    }
}

/// Resolve `.` and `..` components lexically, without touching the
/// filesystem. Candidate paths may not exist yet when this runs.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
