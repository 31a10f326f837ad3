#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use crate::error::BundleError;
    use crate::graph::{build_dependency_graph, BuildOptions, DependencyGraph};

    fn write_file(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    fn build(root: &Path, entry: &str) -> Result<DependencyGraph, BundleError> {
        build_dependency_graph(&BuildOptions {
            entry_path: root.join(entry),
            source_root: root.to_path_buf(),
        })
    }

    fn index_of(order: &[String], id: &str) -> usize {
        order.iter().position(|n| n == id).unwrap()
    }

    #[test]
    fn test_single_module_graph() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "main.lua", "print('hi')");

        let graph = build(dir.path(), "main.lua").unwrap();
        assert_eq!(graph.entry, "main");
        assert_eq!(graph.order, vec!["main".to_string()]);
        assert!(graph.modules["main"].dependencies.is_empty());
    }

    #[test]
    fn test_chain_orders_dependencies_first() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "main.lua", "local a = require('./a')");
        write_file(dir.path(), "a.lua", "local b = require('./b')\nreturn {}");
        write_file(dir.path(), "b.lua", "return {}");

        let graph = build(dir.path(), "main.lua").unwrap();
        assert_eq!(
            graph.order,
            vec!["b".to_string(), "a".to_string(), "main".to_string()]
        );
    }

    #[test]
    fn test_diamond_topology() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "a.lua",
            "local b = require('./b')\nlocal c = require('./c')",
        );
        write_file(dir.path(), "b.lua", "local d = require('./d')\nreturn {}");
        write_file(dir.path(), "c.lua", "local d = require('./d')\nreturn {}");
        write_file(dir.path(), "d.lua", "return {}");

        let graph = build(dir.path(), "a.lua").unwrap();
        let order = &graph.order;
        assert_eq!(order.len(), 4);
        assert!(index_of(order, "d") < index_of(order, "b"));
        assert!(index_of(order, "d") < index_of(order, "c"));
        assert!(index_of(order, "b") < index_of(order, "a"));
        assert!(index_of(order, "c") < index_of(order, "a"));
        assert_eq!(order.last().unwrap(), "a");
    }

    #[test]
    fn test_every_edge_respects_order() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "main.lua",
            "local a = require('./a')\nlocal b = require('./b')",
        );
        write_file(dir.path(), "a.lua", "local b = require('./b')\nreturn {}");
        write_file(dir.path(), "b.lua", "return {}");

        let graph = build(dir.path(), "main.lua").unwrap();
        for (id, module) in &graph.modules {
            for dep in &module.dependencies {
                assert!(
                    index_of(&graph.order, dep) < index_of(&graph.order, id),
                    "{dep} must precede {id}"
                );
            }
        }
    }

    #[test]
    fn test_external_imports_are_skipped() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "main.lua",
            "local sampev = require('samp.events')\nlocal u = require('./u')",
        );
        write_file(dir.path(), "u.lua", "return {}");

        let graph = build(dir.path(), "main.lua").unwrap();
        assert_eq!(graph.modules.len(), 2);
        assert_eq!(graph.modules["main"].dependencies, vec!["u".to_string()]);
        assert_eq!(
            graph.modules["main"].require_mappings.get("./u"),
            Some(&"u".to_string())
        );
        assert!(graph.modules["main"]
            .require_mappings
            .get("samp.events")
            .is_none());
    }

    #[test]
    fn test_missing_module_fails() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "main.lua", "\nlocal g = require('./ghost')");

        let err = build(dir.path(), "main.lua").unwrap_err();
        match &err {
            BundleError::ModuleNotFound {
                module_name,
                required_by,
                line,
            } => {
                assert_eq!(module_name, "./ghost");
                assert!(required_by.ends_with("main.lua"));
                assert_eq!(*line, 2);
            }
            other => panic!("expected ModuleNotFound, got {other:?}"),
        }
        assert_eq!(err.code(), "MODULE_NOT_FOUND");
    }

    #[test]
    fn test_two_module_cycle() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.lua", "require('./b')");
        write_file(dir.path(), "b.lua", "require('./a')");

        let err = build(dir.path(), "a.lua").unwrap_err();
        match &err {
            BundleError::CircularDependency { cycles } => {
                assert_eq!(cycles.len(), 1);
                assert_eq!(cycles[0], vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected CircularDependency, got {other:?}"),
        }
        assert!(err.to_string().contains("a → b → a"));
    }

    #[test]
    fn test_self_cycle() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.lua", "require('./a')");

        let err = build(dir.path(), "a.lua").unwrap_err();
        match &err {
            BundleError::CircularDependency { cycles } => {
                assert_eq!(cycles, &vec![vec!["a".to_string()]]);
            }
            other => panic!("expected CircularDependency, got {other:?}"),
        }
        assert!(err.to_string().contains("a → a"));
    }

    #[test]
    fn test_cycle_reported_once_regardless_of_entry_point() {
        // a → b → c → a discovered from the entry; the same loop must not
        // be reported once per member.
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "main.lua", "require('./a')");
        write_file(dir.path(), "a.lua", "require('./b')");
        write_file(dir.path(), "b.lua", "require('./c')");
        write_file(dir.path(), "c.lua", "require('./a')");

        let err = build(dir.path(), "main.lua").unwrap_err();
        match &err {
            BundleError::CircularDependency { cycles } => {
                assert_eq!(cycles.len(), 1);
                assert_eq!(
                    cycles[0],
                    vec!["a".to_string(), "b".to_string(), "c".to_string()]
                );
            }
            other => panic!("expected CircularDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_directories_and_init_modules() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "main.lua",
            "local ui = require('./ui')\nlocal log = require('./lib/log')",
        );
        write_file(dir.path(), "ui/init.lua", "return {}");
        write_file(dir.path(), "lib/log.lua", "return {}");

        let graph = build(dir.path(), "main.lua").unwrap();
        assert!(graph.modules.contains_key("ui"));
        assert!(graph.modules.contains_key("lib/log"));
        assert_eq!(graph.order.last().unwrap(), "main");
    }

    #[test]
    fn test_build_is_deterministic() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "main.lua",
            "local a = require('./a')\nlocal b = require('./b')",
        );
        write_file(dir.path(), "a.lua", "return {}");
        write_file(dir.path(), "b.lua", "return {}");

        let first = build(dir.path(), "main.lua").unwrap();
        let second = build(dir.path(), "main.lua").unwrap();
        assert_eq!(first.order, second.order);
        assert_eq!(
            first.modules.keys().collect::<Vec<_>>(),
            second.modules.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_duplicate_requires_collapse_to_one_dependency() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "main.lua",
            "local a = require('./u')\nlocal b = require('./u')",
        );
        write_file(dir.path(), "u.lua", "return {}");

        let graph = build(dir.path(), "main.lua").unwrap();
        assert_eq!(graph.modules["main"].dependencies, vec!["u".to_string()]);
        assert_eq!(graph.order.iter().filter(|id| *id == "u").count(), 1);
    }
}
